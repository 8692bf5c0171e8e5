//! # vigil-store
//!
//! Local persistence for the Vigil submission pipeline.
//!
//! - [`Database`] wraps a `rusqlite::Connection` and runs migrations on open.
//! - [`KeyValueStore`] is the read-whole-value / write-whole-value primitive
//!   the pending queue is built on, with SQLite and in-memory backends.
//! - [`MediaCache`] is the private, gallery-invisible directory captured and
//!   adopted media live in until the remote endpoint accepts them.
//! - [`PendingQueue`] is the durable, insertion-ordered list of reports that
//!   still have to be submitted.

pub mod database;
pub mod kv;
pub mod media_cache;
pub mod migrations;
pub mod queue;

mod error;

pub use database::Database;
pub use error::{CacheError, QueueError, Result, StoreError};
pub use kv::{KeyValueStore, MemoryKvStore, SqliteKvStore};
pub use media_cache::{AdoptRequest, MediaCache};
pub use queue::PendingQueue;
