//! [`SqliteStore`] — the SQLite implementation of [`ResultStore`].

use std::path::Path;

use chrono::{DateTime, Utc};
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use lumen_core::{
  category::{ResultCategory, ResultState},
  record::CachedResult,
  store::{CacheStats, ResultStore, SubjectKind, SubjectPatch},
};

use crate::{
  Result,
  encode::{
    RESULT_COLUMNS, RawCachedResult, RawSubjectPatch, decode_category, decode_state,
    encode_dt, encode_json, encode_uuid,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Lumen result store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run a `cached_results` query that yields full rows.
  async fn query_results(
    &self,
    sql: String,
    params: Vec<Option<String>>,
  ) -> Result<Vec<CachedResult>> {
    let raws: Vec<RawCachedResult> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(
            rusqlite::params_from_iter(params.iter()),
            RawCachedResult::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawCachedResult::into_record).collect()
  }

  /// `(value, count)` pairs for a `GROUP BY` over one column.
  async fn group_counts(&self, column: &'static str) -> Result<Vec<(String, u64)>> {
    let rows: Vec<(String, i64)> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {column}, COUNT(*) FROM cached_results GROUP BY {column}"
        ))?;
        let rows = stmt
          .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    Ok(
      rows
        .into_iter()
        .map(|(value, count)| (value, count.max(0) as u64))
        .collect(),
    )
  }
}

// ─── ResultStore impl ────────────────────────────────────────────────────────

impl ResultStore for SqliteStore {
  type Error = crate::Error;

  // ── Cached results ────────────────────────────────────────────────────────

  async fn insert_result(&self, record: CachedResult) -> Result<()> {
    let raw = RawCachedResult::from_record(&record)?;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO cached_results (
             result_id, subject_key, result_category, source_endpoint,
             request_payload, raw_response, processed_result, state,
             failure_reason, attributes, generated_at, expires_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
          rusqlite::params![
            raw.result_id,
            raw.subject_key,
            raw.result_category,
            raw.source_endpoint,
            raw.request_payload,
            raw.raw_response,
            raw.processed_result,
            raw.state,
            raw.failure_reason,
            raw.attributes,
            raw.generated_at,
            raw.expires_at,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn get_result(&self, id: Uuid) -> Result<Option<CachedResult>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawCachedResult> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {RESULT_COLUMNS} FROM cached_results WHERE result_id = ?1"),
              rusqlite::params![id_str],
              RawCachedResult::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawCachedResult::into_record).transpose()
  }

  async fn latest_completed(
    &self,
    subject_key: &str,
    category: ResultCategory,
    since: DateTime<Utc>,
  ) -> Result<Option<CachedResult>> {
    // Ties on `generated_at` go to the later insertion.
    let sql = format!(
      "SELECT {RESULT_COLUMNS} FROM cached_results
       WHERE subject_key = ?1
         AND result_category = ?2
         AND state = ?3
         AND generated_at >= ?4
       ORDER BY generated_at DESC, rowid DESC
       LIMIT 1"
    );
    let params = vec![
      Some(subject_key.to_owned()),
      Some(category.as_str().to_owned()),
      Some(ResultState::Completed.as_str().to_owned()),
      Some(encode_dt(since)),
    ];

    Ok(self.query_results(sql, params).await?.into_iter().next())
  }

  async fn list_results(
    &self,
    subject_key: &str,
    category: Option<ResultCategory>,
  ) -> Result<Vec<CachedResult>> {
    let sql = format!(
      "SELECT {RESULT_COLUMNS} FROM cached_results
       WHERE subject_key = ?1
         AND (?2 IS NULL OR result_category = ?2)
       ORDER BY generated_at DESC, rowid DESC"
    );
    let params = vec![
      Some(subject_key.to_owned()),
      category.map(|c| c.as_str().to_owned()),
    ];

    self.query_results(sql, params).await
  }

  async fn delete_results(
    &self,
    subject_key: &str,
    category: Option<ResultCategory>,
  ) -> Result<u64> {
    let key = subject_key.to_owned();
    let category_str = category.map(|c| c.as_str().to_owned());

    let deleted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM cached_results
           WHERE subject_key = ?1
             AND (?2 IS NULL OR result_category = ?2)",
          rusqlite::params![key, category_str],
        )?)
      })
      .await?;

    Ok(deleted as u64)
  }

  async fn stats(&self) -> Result<CacheStats> {
    let mut stats = CacheStats::default();

    for (state, count) in self.group_counts("state").await? {
      stats.by_state.insert(decode_state(&state)?, count);
      stats.total += count;
    }
    for (category, count) in self.group_counts("result_category").await? {
      stats.by_category.insert(decode_category(&category)?, count);
    }

    Ok(stats)
  }

  // ── Subject patches ───────────────────────────────────────────────────────

  async fn patch_subject(&self, patch: SubjectPatch) -> Result<()> {
    let kind_str     = patch.kind.as_str().to_owned();
    let category_str = patch.category.as_str().to_owned();
    let payload_str  = encode_json(&patch.payload);
    let result_id    = encode_uuid(patch.cached_result_id);
    let at_str       = encode_dt(patch.generated_at);
    let key          = patch.subject_key;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO subject_patches (
             subject_kind, subject_key, result_category,
             payload, cached_result_id, generated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
           ON CONFLICT (subject_kind, subject_key, result_category) DO UPDATE SET
             payload          = excluded.payload,
             cached_result_id = excluded.cached_result_id,
             generated_at     = excluded.generated_at",
          rusqlite::params![kind_str, key, category_str, payload_str, result_id, at_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn get_subject_patch(
    &self,
    kind: SubjectKind,
    subject_key: &str,
    category: ResultCategory,
  ) -> Result<Option<SubjectPatch>> {
    let kind_str     = kind.as_str().to_owned();
    let key          = subject_key.to_owned();
    let category_str = category.as_str().to_owned();

    let raw: Option<RawSubjectPatch> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT subject_kind, subject_key, result_category,
                      payload, cached_result_id, generated_at
               FROM subject_patches
               WHERE subject_kind = ?1 AND subject_key = ?2 AND result_category = ?3",
              rusqlite::params![kind_str, key, category_str],
              |row| {
                Ok(RawSubjectPatch {
                  subject_kind:     row.get(0)?,
                  subject_key:      row.get(1)?,
                  result_category:  row.get(2)?,
                  payload:          row.get(3)?,
                  cached_result_id: row.get(4)?,
                  generated_at:     row.get(5)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawSubjectPatch::into_patch).transpose()
  }
}
