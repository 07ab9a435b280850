//! The `ResultStore` trait and the subject-patch types it persists.
//!
//! The trait is implemented by storage backends (e.g. `lumen-store-sqlite`
//! and [`crate::memory::MemoryStore`]). [`crate::ResultCache`] depends on this
//! abstraction, never on a concrete backend.

use std::{collections::BTreeMap, fmt, future::Future, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error,
  category::{ResultCategory, ResultState},
  record::CachedResult,
};

// ─── Subject patches ─────────────────────────────────────────────────────────

/// Which externally owned record a denormalized patch lands on.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum SubjectKind {
  Assessment,
  Module,
  Student,
}

impl SubjectKind {
  pub fn as_str(self) -> &'static str {
    match self {
      Self::Assessment => "assessment",
      Self::Module => "module",
      Self::Student => "student",
    }
  }
}

impl fmt::Display for SubjectKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

impl FromStr for SubjectKind {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "assessment" => Ok(Self::Assessment),
      "module" => Ok(Self::Module),
      "student" => Ok(Self::Student),
      other => Err(Error::UnknownSubjectKind(other.to_owned())),
    }
  }
}

/// A denormalized copy of a cached result, stored in the category-named slot
/// of a subject's own record. At most one exists per
/// `(kind, subject_key, category)`; writing replaces the previous copy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubjectPatch {
  pub kind:             SubjectKind,
  pub subject_key:      String,
  pub category:         ResultCategory,
  pub payload:          serde_json::Value,
  /// Back-reference to the [`CachedResult`] the payload was copied from.
  pub cached_result_id: Uuid,
  pub generated_at:     DateTime<Utc>,
}

// ─── Stats ───────────────────────────────────────────────────────────────────

/// Aggregate record counts. Read-only; intended for debugging.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
  pub total:       u64,
  pub by_state:    BTreeMap<ResultState, u64>,
  pub by_category: BTreeMap<ResultCategory, u64>,
}

impl CacheStats {
  /// Fold a set of records into counts.
  pub fn from_records<'a>(
    records: impl IntoIterator<Item = &'a CachedResult>,
  ) -> Self {
    let mut stats = Self::default();
    for record in records {
      stats.total += 1;
      *stats.by_state.entry(record.state).or_default() += 1;
      *stats.by_category.entry(record.category).or_default() += 1;
    }
    stats
  }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a Lumen result store backend.
///
/// Cached results are append-only: there is no method that updates a stored
/// record, only ones that insert new records or delete a subject's records
/// outright. Subject patches, by contrast, are upserts.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait ResultStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Cached results ────────────────────────────────────────────────────

  /// Persist a fully-built record. The caller assigns id and timestamps.
  fn insert_result(
    &self,
    record: CachedResult,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Retrieve a record by id. Returns `None` if not found.
  fn get_result(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<CachedResult>, Self::Error>> + Send + '_;

  /// The most recent `completed` record for the pair whose `generated_at` is
  /// at or after `since`.
  fn latest_completed<'a>(
    &'a self,
    subject_key: &'a str,
    category: ResultCategory,
    since: DateTime<Utc>,
  ) -> impl Future<Output = Result<Option<CachedResult>, Self::Error>> + Send + 'a;

  /// All records for a subject, newest first, optionally narrowed by
  /// category.
  fn list_results<'a>(
    &'a self,
    subject_key: &'a str,
    category: Option<ResultCategory>,
  ) -> impl Future<Output = Result<Vec<CachedResult>, Self::Error>> + Send + 'a;

  /// Delete every record for a subject (and category, if given). Returns the
  /// number of records removed.
  fn delete_results<'a>(
    &'a self,
    subject_key: &'a str,
    category: Option<ResultCategory>,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + 'a;

  /// Counts by state and by category across all records.
  fn stats(&self) -> impl Future<Output = Result<CacheStats, Self::Error>> + Send + '_;

  // ── Subject patches ───────────────────────────────────────────────────

  /// Write `patch`, replacing any earlier patch in the same slot.
  fn patch_subject(
    &self,
    patch: SubjectPatch,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Read the current patch in a slot. Returns `None` if never written.
  fn get_subject_patch<'a>(
    &'a self,
    kind: SubjectKind,
    subject_key: &'a str,
    category: ResultCategory,
  ) -> impl Future<Output = Result<Option<SubjectPatch>, Self::Error>> + Send + 'a;
}
