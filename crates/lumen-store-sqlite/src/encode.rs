//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings with a fixed nanosecond width and
//! a `Z` suffix, so lexical order in SQL equals chronological order. Payloads
//! and attributes are stored as compact JSON. UUIDs are stored as hyphenated
//! lowercase strings.

use chrono::{DateTime, SecondsFormat, Utc};
use lumen_core::{
  category::{ResultCategory, ResultState},
  record::{Attributes, CachedResult},
  store::{SubjectKind, SubjectPatch},
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Enums ───────────────────────────────────────────────────────────────────

pub fn decode_category(s: &str) -> Result<ResultCategory> { Ok(s.parse()?) }

pub fn decode_state(s: &str) -> Result<ResultState> { Ok(s.parse()?) }

pub fn decode_subject_kind(s: &str) -> Result<SubjectKind> { Ok(s.parse()?) }

// ─── JSON ────────────────────────────────────────────────────────────────────

pub fn encode_json(value: &serde_json::Value) -> String { value.to_string() }

pub fn decode_json(s: &str) -> Result<serde_json::Value> {
  Ok(serde_json::from_str(s)?)
}

pub fn encode_attributes(attributes: &Attributes) -> Result<String> {
  Ok(serde_json::to_string(attributes)?)
}

pub fn decode_attributes(s: &str) -> Result<Attributes> {
  Ok(serde_json::from_str(s)?)
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column list shared by every `cached_results` query; matches
/// [`RawCachedResult::from_row`].
pub const RESULT_COLUMNS: &str = "result_id, subject_key, result_category, \
  source_endpoint, request_payload, raw_response, processed_result, state, \
  failure_reason, attributes, generated_at, expires_at";

/// Raw strings read directly from a `cached_results` row.
pub struct RawCachedResult {
  pub result_id:        String,
  pub subject_key:      String,
  pub result_category:  String,
  pub source_endpoint:  String,
  pub request_payload:  String,
  pub raw_response:     Option<String>,
  pub processed_result: Option<String>,
  pub state:            String,
  pub failure_reason:   Option<String>,
  pub attributes:       String,
  pub generated_at:     String,
  pub expires_at:       Option<String>,
}

impl RawCachedResult {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      result_id:        row.get(0)?,
      subject_key:      row.get(1)?,
      result_category:  row.get(2)?,
      source_endpoint:  row.get(3)?,
      request_payload:  row.get(4)?,
      raw_response:     row.get(5)?,
      processed_result: row.get(6)?,
      state:            row.get(7)?,
      failure_reason:   row.get(8)?,
      attributes:       row.get(9)?,
      generated_at:     row.get(10)?,
      expires_at:       row.get(11)?,
    })
  }

  /// Encode a record for insertion; the inverse of [`Self::into_record`].
  pub fn from_record(record: &CachedResult) -> Result<Self> {
    Ok(Self {
      result_id:        encode_uuid(record.result_id),
      subject_key:      record.subject_key.clone(),
      result_category:  record.category.as_str().to_owned(),
      source_endpoint:  record.source_endpoint.clone(),
      request_payload:  encode_json(&record.request_payload),
      raw_response:     record.raw_response.as_ref().map(encode_json),
      processed_result: record.processed_result.as_ref().map(encode_json),
      state:            record.state.as_str().to_owned(),
      failure_reason:   record.failure_reason.clone(),
      attributes:       encode_attributes(&record.attributes)?,
      generated_at:     encode_dt(record.generated_at),
      expires_at:       record.expires_at.map(encode_dt),
    })
  }

  pub fn into_record(self) -> Result<CachedResult> {
    Ok(CachedResult {
      result_id:        decode_uuid(&self.result_id)?,
      subject_key:      self.subject_key,
      category:         decode_category(&self.result_category)?,
      source_endpoint:  self.source_endpoint,
      request_payload:  decode_json(&self.request_payload)?,
      raw_response:     self.raw_response.as_deref().map(decode_json).transpose()?,
      processed_result: self
        .processed_result
        .as_deref()
        .map(decode_json)
        .transpose()?,
      state:            decode_state(&self.state)?,
      failure_reason:   self.failure_reason,
      attributes:       decode_attributes(&self.attributes)?,
      generated_at:     decode_dt(&self.generated_at)?,
      expires_at:       self.expires_at.as_deref().map(decode_dt).transpose()?,
    })
  }
}

/// Raw strings read directly from a `subject_patches` row.
pub struct RawSubjectPatch {
  pub subject_kind:     String,
  pub subject_key:      String,
  pub result_category:  String,
  pub payload:          String,
  pub cached_result_id: String,
  pub generated_at:     String,
}

impl RawSubjectPatch {
  pub fn into_patch(self) -> Result<SubjectPatch> {
    Ok(SubjectPatch {
      kind:             decode_subject_kind(&self.subject_kind)?,
      subject_key:      self.subject_key,
      category:         decode_category(&self.result_category)?,
      payload:          decode_json(&self.payload)?,
      cached_result_id: decode_uuid(&self.cached_result_id)?,
      generated_at:     decode_dt(&self.generated_at)?,
    })
  }
}
