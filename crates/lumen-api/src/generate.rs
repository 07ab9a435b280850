//! Handler for `POST /generate/{category}`.
//!
//! Looks up a fresh cached result for the subject, falling back to the
//! category's webhook on a miss. When `patch_subject` is given, the returned
//! value is also copied onto that subject record; a failed copy is logged and
//! does not affect the response.

use axum::{Json, extract::State};
use lumen_core::{
  CacheOptions, GenerationRequest,
  category::ResultCategory,
  record::Attributes,
  store::{ResultStore, SubjectKind},
};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::{
  AppState,
  error::ApiError,
  extract::{JsonBody, Path},
};

/// Where to write the denormalized copy.
#[derive(Debug, Deserialize)]
pub struct PatchTarget {
  pub kind: SubjectKind,
  pub key:  String,
}

/// JSON body accepted by `POST /generate/{category}`.
#[derive(Debug, Deserialize)]
pub struct GenerateBody {
  pub subject_key:        String,
  /// Forwarded to the webhook unchanged.
  #[serde(default)]
  pub payload:            serde_json::Value,
  #[serde(default)]
  pub force_regenerate:   bool,
  pub cache_expiry_hours: Option<u32>,
  #[serde(default)]
  pub attributes:         Attributes,
  pub patch_subject:      Option<PatchTarget>,
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
  pub record_id:  Uuid,
  pub from_cache: bool,
  pub result:     serde_json::Value,
}

/// `POST /generate/{category}`
pub async fn handler<S>(
  State(state): State<AppState<S>>,
  Path(category): Path<ResultCategory>,
  JsonBody(body): JsonBody<GenerateBody>,
) -> Result<Json<GenerateResponse>, ApiError>
where
  S: ResultStore + Clone + 'static,
{
  let endpoint = state
    .webhook
    .endpoint(category)
    .ok_or_else(|| ApiError::BadRequest(format!("no webhook configured for {category}")))?
    .to_owned();

  let request = GenerationRequest::new(body.subject_key.clone(), category, endpoint.clone())
    .with_payload(body.payload.clone());
  let options = CacheOptions {
    force_regenerate:   body.force_regenerate,
    cache_expiry_hours: body
      .cache_expiry_hours
      .unwrap_or(state.default_expiry_hours),
    attributes:         body.attributes,
  };

  let webhook = state.webhook.clone();
  let payload = body.payload;
  let fetched = state
    .cache
    .fetch_or_generate(request, options, move || async move {
      webhook.call(&endpoint, &payload).await
    })
    .await?;

  if let Some(target) = body.patch_subject {
    let patched = state
      .cache
      .patch_subject(
        target.kind,
        &target.key,
        category,
        &fetched.value,
        fetched.record_id,
      )
      .await;
    if !patched {
      warn!(kind = %target.kind, key = %target.key, %category, "response served without subject patch");
    }
  }

  Ok(Json(GenerateResponse {
    record_id:  fetched.record_id,
    from_cache: fetched.from_cache,
    result:     fetched.value,
  }))
}
