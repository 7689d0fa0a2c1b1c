//! Order book snapshot replay library.
//!
//! This crate provides the core types and logic used by the `book_replay`
//! viewer and the `dump` tool:
//!
//! - `record`: on-disk record shapes, decided once per record at load time
//! - `book`: canonical snapshot and the normalizer producing it
//! - `loader`: snapshot sources (NDJSON or JSON array files) and timestamp
//!   lookup
//! - `replay`: replay scheduler driving the current index from the real gaps
//!   between snapshots, compressed to a target duration
//! - `session`: load lifecycle plus viewer commands on top of the scheduler
//! - `render`: plain-text two-column ladder
//!
//! `config`, `error` and `logging` hold the replay settings, the load error
//! type and the tracing subscriber setup shared by both binaries.
pub mod book;
pub mod config;
pub mod error;
pub mod loader;
pub mod logging;
pub mod record;
pub mod render;
pub mod replay;
pub mod session;
