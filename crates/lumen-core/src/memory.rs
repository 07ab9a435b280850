//! [`MemoryStore`] — an in-process [`ResultStore`] for tests and embedding.

use std::{
  collections::HashMap,
  sync::{Arc, Mutex, MutexGuard},
};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
  Error, Result,
  category::ResultCategory,
  record::CachedResult,
  store::{CacheStats, ResultStore, SubjectKind, SubjectPatch},
};

type PatchSlot = (SubjectKind, String, ResultCategory);

#[derive(Default)]
struct Inner {
  /// Insertion order doubles as the tie-breaker for equal timestamps.
  results: Vec<CachedResult>,
  patches: HashMap<PatchSlot, SubjectPatch>,
}

/// A result store held entirely in memory.
///
/// Cloning is cheap; clones share the same underlying data.
#[derive(Clone, Default)]
pub struct MemoryStore {
  inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
  pub fn new() -> Self { Self::default() }

  fn lock(&self) -> Result<MutexGuard<'_, Inner>> {
    self.inner.lock().map_err(|_| Error::LockPoisoned)
  }
}

impl ResultStore for MemoryStore {
  type Error = Error;

  async fn insert_result(&self, record: CachedResult) -> Result<()> {
    self.lock()?.results.push(record);
    Ok(())
  }

  async fn get_result(&self, id: Uuid) -> Result<Option<CachedResult>> {
    Ok(
      self
        .lock()?
        .results
        .iter()
        .find(|r| r.result_id == id)
        .cloned(),
    )
  }

  async fn latest_completed(
    &self,
    subject_key: &str,
    category: ResultCategory,
    since: DateTime<Utc>,
  ) -> Result<Option<CachedResult>> {
    let inner = self.lock()?;
    // `max_by_key` keeps the last maximum, i.e. the latest insertion on ties.
    Ok(
      inner
        .results
        .iter()
        .filter(|r| r.subject_key == subject_key && r.category == category)
        .filter(|r| r.is_fresh_since(since))
        .max_by_key(|r| r.generated_at)
        .cloned(),
    )
  }

  async fn list_results(
    &self,
    subject_key: &str,
    category: Option<ResultCategory>,
  ) -> Result<Vec<CachedResult>> {
    let inner = self.lock()?;
    let mut records: Vec<CachedResult> = inner
      .results
      .iter()
      .rev()
      .filter(|r| r.subject_key == subject_key)
      .filter(|r| category.is_none_or(|c| r.category == c))
      .cloned()
      .collect();
    records.sort_by(|a, b| b.generated_at.cmp(&a.generated_at));
    Ok(records)
  }

  async fn delete_results(
    &self,
    subject_key: &str,
    category: Option<ResultCategory>,
  ) -> Result<u64> {
    let mut inner = self.lock()?;
    let before = inner.results.len();
    inner.results.retain(|r| {
      !(r.subject_key == subject_key && category.is_none_or(|c| r.category == c))
    });
    Ok((before - inner.results.len()) as u64)
  }

  async fn stats(&self) -> Result<CacheStats> {
    Ok(CacheStats::from_records(&self.lock()?.results))
  }

  async fn patch_subject(&self, patch: SubjectPatch) -> Result<()> {
    let slot = (patch.kind, patch.subject_key.clone(), patch.category);
    self.lock()?.patches.insert(slot, patch);
    Ok(())
  }

  async fn get_subject_patch(
    &self,
    kind: SubjectKind,
    subject_key: &str,
    category: ResultCategory,
  ) -> Result<Option<SubjectPatch>> {
    let slot = (kind, subject_key.to_owned(), category);
    Ok(self.lock()?.patches.get(&slot).cloned())
  }
}
