//! Cached result records — the unit of storage in the Lumen cache.
//!
//! A record is written once, in a terminal state, and never updated. A cache
//! refresh appends a new record; older ones stay behind as history until the
//! subject is cleared.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::category::{ResultCategory, ResultState};

// ─── Attributes ──────────────────────────────────────────────────────────────

/// Free-form tags attached to a record. The well-known keys get their own
/// fields; anything else lands in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Attributes {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub student_id:     Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub module_id:      Option<String>,
  /// Content sub-type, e.g. `"mcq"` or `"flashcards"` for module content.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub content_type:   Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub schema_version: Option<String>,
  #[serde(flatten)]
  pub extra:          BTreeMap<String, serde_json::Value>,
}

// ─── CachedResult ────────────────────────────────────────────────────────────

/// One generation attempt for a `(subject_key, category)` pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedResult {
  pub result_id:        Uuid,
  /// Opaque owner identifier, usually a student's unique id.
  pub subject_key:      String,
  pub category:         ResultCategory,
  /// The generator's address; kept for auditing, never interpreted.
  pub source_endpoint:  String,
  pub request_payload:  serde_json::Value,
  pub raw_response:     Option<serde_json::Value>,
  /// What a cache hit returns.
  pub processed_result: Option<serde_json::Value>,
  pub state:            ResultState,
  /// Set only when `state` is [`ResultState::Failed`].
  pub failure_reason:   Option<String>,
  pub attributes:       Attributes,
  /// Recency anchor for freshness checks.
  pub generated_at:     DateTime<Utc>,
  pub expires_at:       Option<DateTime<Utc>>,
}

impl CachedResult {
  pub fn is_completed(&self) -> bool { self.state == ResultState::Completed }

  /// Whether this record can serve a hit for a window starting at `since`.
  pub fn is_fresh_since(&self, since: DateTime<Utc>) -> bool {
    self.is_completed() && self.generated_at >= since
  }
}
