//! Handler for `GET /subjects/{kind}/{key}/{category}` — the denormalized copy
//! a legacy reader sees on the subject's own record.

use axum::{Json, extract::State};
use lumen_core::{
  category::ResultCategory,
  store::{ResultStore, SubjectKind, SubjectPatch},
};

use crate::{AppState, error::ApiError, extract::Path};

/// `GET /subjects/{kind}/{key}/{category}` — 404 if never patched.
pub async fn get_patch<S>(
  State(state): State<AppState<S>>,
  Path((kind, key, category)): Path<(SubjectKind, String, ResultCategory)>,
) -> Result<Json<SubjectPatch>, ApiError>
where
  S: ResultStore + Clone + 'static,
{
  let patch = state
    .cache
    .get_subject_patch(kind, &key, category)
    .await?
    .ok_or_else(|| ApiError::NotFound(format!("{kind} {key} has no {category} patch")))?;
  Ok(Json(patch))
}
