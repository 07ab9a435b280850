//! Error types for `lumen-core`.

use thiserror::Error;

use crate::category::ResultCategory;

#[derive(Debug, Error)]
pub enum Error {
  /// The caller-supplied generator failed. The failure has already been
  /// recorded as a `failed` result when this is returned.
  #[error("generation of {category} failed: {source}")]
  Generation {
    category: ResultCategory,
    #[source]
    source:   Box<dyn std::error::Error + Send + Sync>,
  },

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("unknown result category: {0:?}")]
  UnknownCategory(String),

  #[error("unknown result state: {0:?}")]
  UnknownState(String),

  #[error("unknown subject kind: {0:?}")]
  UnknownSubjectKind(String),

  #[error("in-memory store lock poisoned")]
  LockPoisoned,

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

impl Error {
  /// Wrap a backend error.
  pub fn store<E>(err: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(err))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
