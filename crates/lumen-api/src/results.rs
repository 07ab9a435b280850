//! Handlers for reading and clearing cached results.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/results/{subject_key}/{category}` | Fresh hit or 404; optional `?cache_expiry_hours` |
//! | `GET`    | `/results/{subject_key}` | History, newest first; optional `?category` |
//! | `DELETE` | `/results/{subject_key}` | Clear; optional `?category` |
//! | `GET`    | `/records/{id}` | Single record by id |
//! | `GET`    | `/stats` | Counts by state and category |

use axum::{Json, extract::State};
use lumen_core::{
  category::ResultCategory,
  record::CachedResult,
  store::{CacheStats, ResultStore},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  AppState,
  error::ApiError,
  extract::{Path, Query},
};

// ─── Get cached ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CachedParams {
  /// Freshness window; defaults to the server's configured value.
  pub cache_expiry_hours: Option<u32>,
}

/// `GET /results/{subject_key}/{category}[?cache_expiry_hours=N]`
pub async fn get_cached<S>(
  State(state): State<AppState<S>>,
  Path((subject_key, category)): Path<(String, ResultCategory)>,
  Query(params): Query<CachedParams>,
) -> Result<Json<CachedResult>, ApiError>
where
  S: ResultStore + Clone + 'static,
{
  let hours = params
    .cache_expiry_hours
    .unwrap_or(state.default_expiry_hours);
  let record = state
    .cache
    .get_cached(&subject_key, category, hours)
    .await?
    .ok_or_else(|| {
      ApiError::NotFound(format!("no fresh {category} cached for {subject_key}"))
    })?;
  Ok(Json(record))
}

// ─── History ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CategoryParams {
  pub category: Option<ResultCategory>,
}

/// `GET /results/{subject_key}[?category=...]`
pub async fn history<S>(
  State(state): State<AppState<S>>,
  Path(subject_key): Path<String>,
  Query(params): Query<CategoryParams>,
) -> Result<Json<Vec<CachedResult>>, ApiError>
where
  S: ResultStore + Clone + 'static,
{
  let records = state.cache.history(&subject_key, params.category).await?;
  Ok(Json(records))
}

// ─── Clear ────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct ClearResponse {
  pub deleted: u64,
}

/// `DELETE /results/{subject_key}[?category=...]`
pub async fn clear<S>(
  State(state): State<AppState<S>>,
  Path(subject_key): Path<String>,
  Query(params): Query<CategoryParams>,
) -> Result<Json<ClearResponse>, ApiError>
where
  S: ResultStore + Clone + 'static,
{
  let deleted = state.cache.clear(&subject_key, params.category).await?;
  Ok(Json(ClearResponse { deleted }))
}

// ─── Single record ────────────────────────────────────────────────────────────

/// `GET /records/{id}`
pub async fn get_record<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<CachedResult>, ApiError>
where
  S: ResultStore + Clone + 'static,
{
  let record = state
    .cache
    .get_result(id)
    .await?
    .ok_or_else(|| ApiError::NotFound(format!("record {id} not found")))?;
  Ok(Json(record))
}

// ─── Stats ────────────────────────────────────────────────────────────────────

/// `GET /stats`
pub async fn stats<S>(
  State(state): State<AppState<S>>,
) -> Result<Json<CacheStats>, ApiError>
where
  S: ResultStore + Clone + 'static,
{
  Ok(Json(state.cache.stats().await?))
}
