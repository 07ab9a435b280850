//! Core types, the storage trait, and the cache service for Lumen.
//!
//! Lumen memoises content produced by slow external generators (assessment
//! questions, module MCQs, learning paths) as append-only result records.
//! This crate is free of HTTP and database dependencies; storage backends
//! implement [`store::ResultStore`].

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod cache;
pub mod category;
pub mod error;
pub mod memory;
pub mod payload;
pub mod record;
pub mod store;

pub use cache::{CacheOptions, Fetched, GenerationRequest, ResultCache};
pub use error::{Error, Result};
