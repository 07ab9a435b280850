//! [`ResultCache`] — cache-aside memoisation of generated content.
//!
//! On a hit the newest fresh `completed` record is returned and the generator
//! is never called. On a miss the generator runs once and its outcome, success
//! or failure, is appended as a new record. Generator errors are always
//! surfaced to the caller after being recorded.
//!
//! Concurrent misses for the same key are not coalesced: each runs its own
//! generator and appends its own record, and later reads pick whichever landed
//! most recently.

use std::future::Future;

use chrono::{DateTime, Duration, Utc};
use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::{
  Error, Result,
  category::{ResultCategory, ResultState},
  payload::CategoryPayload,
  record::{Attributes, CachedResult},
  store::{CacheStats, ResultStore, SubjectKind, SubjectPatch},
};

/// Default freshness window, in hours.
pub const DEFAULT_EXPIRY_HOURS: u32 = 24;

// ─── Inputs and outputs ──────────────────────────────────────────────────────

/// Per-call knobs for [`ResultCache::fetch_or_generate`].
#[derive(Debug, Clone, PartialEq)]
pub struct CacheOptions {
  /// Skip the lookup and always run the generator.
  pub force_regenerate:   bool,
  /// Freshness window; also used to stamp `expires_at` on new records.
  /// A window too large to represent leaves `expires_at` unset.
  pub cache_expiry_hours: u32,
  /// Tags copied onto the record written on a miss.
  pub attributes:         Attributes,
}

impl Default for CacheOptions {
  fn default() -> Self {
    Self {
      force_regenerate:   false,
      cache_expiry_hours: DEFAULT_EXPIRY_HOURS,
      attributes:         Attributes::default(),
    }
  }
}

impl CacheOptions {
  pub fn forced() -> Self {
    Self { force_regenerate: true, ..Self::default() }
  }

  pub fn with_expiry_hours(mut self, hours: u32) -> Self {
    self.cache_expiry_hours = hours;
    self
  }

  pub fn with_attributes(mut self, attributes: Attributes) -> Self {
    self.attributes = attributes;
    self
  }

  fn window(&self) -> Duration { expiry_window(self.cache_expiry_hours) }
}

fn expiry_window(hours: u32) -> Duration { Duration::hours(i64::from(hours)) }

/// What to generate and how to file it.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
  pub subject_key:     String,
  pub category:        ResultCategory,
  /// Stored for auditing only.
  pub source_endpoint: String,
  /// Opaque input the generator was given.
  pub request_payload: serde_json::Value,
}

impl GenerationRequest {
  pub fn new(
    subject_key: impl Into<String>,
    category: ResultCategory,
    source_endpoint: impl Into<String>,
  ) -> Self {
    Self {
      subject_key: subject_key.into(),
      category,
      source_endpoint: source_endpoint.into(),
      request_payload: serde_json::Value::Null,
    }
  }

  pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
    self.request_payload = payload;
    self
  }
}

/// A value returned by the cache, with the record that backs it.
#[derive(Debug, Clone, PartialEq)]
pub struct Fetched<T> {
  pub value:      T,
  pub record_id:  Uuid,
  /// `true` if no generator ran.
  pub from_cache: bool,
}

// ─── Cache ───────────────────────────────────────────────────────────────────

/// Cache-aside result store over any [`ResultStore`] backend.
#[derive(Debug, Clone)]
pub struct ResultCache<S> {
  store: S,
}

impl<S: ResultStore> ResultCache<S> {
  pub fn new(store: S) -> Self { Self { store } }

  /// The backing store.
  pub fn store(&self) -> &S { &self.store }

  /// Return a fresh cached value for the request's key, or run `generator`
  /// and record its outcome.
  ///
  /// A stored value that no longer decodes as `T` is treated as a miss.
  pub async fn fetch_or_generate<T, F, Fut, E>(
    &self,
    request: GenerationRequest,
    options: CacheOptions,
    generator: F,
  ) -> Result<Fetched<T>>
  where
    T: Serialize + DeserializeOwned,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::error::Error + Send + Sync + 'static,
  {
    let subject_key = request.subject_key.as_str();
    let category = request.category;

    if options.force_regenerate {
      debug!(subject_key, %category, "forced regeneration, skipping lookup");
    } else if let Some(record) = self
      .get_cached(subject_key, category, options.cache_expiry_hours)
      .await?
    {
      match decode_hit::<T>(&record) {
        Ok(value) => {
          debug!(subject_key, %category, result_id = %record.result_id, "cache hit");
          return Ok(Fetched { value, record_id: record.result_id, from_cache: true });
        }
        Err(e) => {
          warn!(
            subject_key, %category, result_id = %record.result_id,
            "cached result does not decode, regenerating: {e}"
          );
        }
      }
    } else {
      debug!(subject_key, %category, "cache miss");
    }

    let outcome = generator().await;
    let generated_at = Utc::now();

    match outcome {
      Ok(value) => {
        let json = serde_json::to_value(&value)?;
        let record = CachedResult {
          result_id: Uuid::new_v4(),
          subject_key: request.subject_key,
          category,
          source_endpoint: request.source_endpoint,
          request_payload: request.request_payload,
          raw_response: Some(json.clone()),
          processed_result: Some(json),
          state: ResultState::Completed,
          failure_reason: None,
          attributes: options.attributes.clone(),
          generated_at,
          expires_at: generated_at.checked_add_signed(options.window()),
        };
        let record_id = record.result_id;
        self.store.insert_result(record).await.map_err(Error::store)?;
        info!(%category, %record_id, "stored generated result");
        Ok(Fetched { value, record_id, from_cache: false })
      }
      Err(err) => {
        let reason = err.to_string();
        let record = CachedResult {
          result_id: Uuid::new_v4(),
          subject_key: request.subject_key,
          category,
          source_endpoint: request.source_endpoint,
          request_payload: request.request_payload,
          raw_response: None,
          processed_result: None,
          state: ResultState::Failed,
          failure_reason: Some(reason.clone()),
          attributes: options.attributes,
          generated_at,
          expires_at: None,
        };
        let record_id = record.result_id;
        warn!(%category, %record_id, "generator failed: {reason}");
        if let Err(e) = self.store.insert_result(record).await {
          // The generator error is the one the caller needs to see.
          error!(%category, %record_id, "failed to record generation failure: {e}");
        }
        Err(Error::Generation { category, source: Box::new(err) })
      }
    }
  }

  /// [`Self::fetch_or_generate`] with the category taken from `P`.
  pub async fn fetch_typed<P, F, Fut, E>(
    &self,
    subject_key: impl Into<String>,
    source_endpoint: impl Into<String>,
    request_payload: serde_json::Value,
    options: CacheOptions,
    generator: F,
  ) -> Result<Fetched<P>>
  where
    P: CategoryPayload,
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<P, E>>,
    E: std::error::Error + Send + Sync + 'static,
  {
    let request = GenerationRequest::new(subject_key, P::CATEGORY, source_endpoint)
      .with_payload(request_payload);
    self.fetch_or_generate(request, options, generator).await
  }

  /// The newest `completed` record generated within the last
  /// `cache_expiry_hours`, without any generation fallback.
  pub async fn get_cached(
    &self,
    subject_key: &str,
    category: ResultCategory,
    cache_expiry_hours: u32,
  ) -> Result<Option<CachedResult>> {
    let since = freshness_cutoff(Utc::now(), cache_expiry_hours);
    self
      .store
      .latest_completed(subject_key, category, since)
      .await
      .map_err(Error::store)
  }

  /// Copy `payload` onto the subject's own record under `category`.
  ///
  /// Best-effort: failures are logged and reported as `false`, never
  /// propagated. The cached result stays authoritative either way.
  pub async fn patch_subject<P: Serialize>(
    &self,
    kind: SubjectKind,
    subject_key: &str,
    category: ResultCategory,
    payload: &P,
    cached_result_id: Uuid,
  ) -> bool {
    let payload = match serde_json::to_value(payload) {
      Ok(v) => v,
      Err(e) => {
        warn!(%kind, subject_key, %category, "could not normalise patch payload: {e}");
        return false;
      }
    };

    let patch = SubjectPatch {
      kind,
      subject_key: subject_key.to_owned(),
      category,
      payload,
      cached_result_id,
      generated_at: Utc::now(),
    };

    match self.store.patch_subject(patch).await {
      Ok(()) => {
        debug!(%kind, subject_key, %category, %cached_result_id, "patched subject");
        true
      }
      Err(e) => {
        warn!(%kind, subject_key, %category, "subject patch failed: {e}");
        false
      }
    }
  }

  /// Delete every record for `subject_key`, optionally only those in
  /// `category`. Returns the number removed.
  pub async fn clear(
    &self,
    subject_key: &str,
    category: Option<ResultCategory>,
  ) -> Result<u64> {
    let deleted = self
      .store
      .delete_results(subject_key, category)
      .await
      .map_err(Error::store)?;
    info!(subject_key, category = ?category, deleted, "cleared cached results");
    Ok(deleted)
  }

  pub async fn stats(&self) -> Result<CacheStats> {
    self.store.stats().await.map_err(Error::store)
  }

  pub async fn get_result(&self, id: Uuid) -> Result<Option<CachedResult>> {
    self.store.get_result(id).await.map_err(Error::store)
  }

  /// Every record for a subject, newest first, including failures.
  pub async fn history(
    &self,
    subject_key: &str,
    category: Option<ResultCategory>,
  ) -> Result<Vec<CachedResult>> {
    self
      .store
      .list_results(subject_key, category)
      .await
      .map_err(Error::store)
  }

  pub async fn get_subject_patch(
    &self,
    kind: SubjectKind,
    subject_key: &str,
    category: ResultCategory,
  ) -> Result<Option<SubjectPatch>> {
    self
      .store
      .get_subject_patch(kind, subject_key, category)
      .await
      .map_err(Error::store)
  }
}

fn decode_hit<T: DeserializeOwned>(record: &CachedResult) -> Result<T> {
  let value = record
    .processed_result
    .clone()
    .unwrap_or(serde_json::Value::Null);
  Ok(serde_json::from_value(value)?)
}

/// Oldest `generated_at` that still counts as fresh at `now`.
///
/// A window reaching past the representable range admits every record.
pub fn freshness_cutoff(now: DateTime<Utc>, hours: u32) -> DateTime<Utc> {
  now
    .checked_sub_signed(expiry_window(hours))
    .unwrap_or(DateTime::<Utc>::MIN_UTC)
}
