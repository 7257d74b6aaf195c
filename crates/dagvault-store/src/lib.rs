//! Transactional storage for dagvault.
//!
//! The persisted shape is three tables:
//!
//! - `object` (id, kind, dhash unique, upload_time, payload)
//! - `relation` (parent, child, creation_time, unique(parent, child))
//! - `permission` (object, group, access_time, reason, unique(object, group))
//!
//! # Storage Backends
//!
//! All backends implement the [`GraphStore`] trait, which hands out
//! [`StoreTx`] units of work:
//!
//! - [`InMemoryGraphStore`] -- `Mutex`-guarded tables for tests and embedding
//!
//! # Design Rules
//!
//! 1. The unique indices are the only concurrency-control primitive exposed.
//!    A collision surfaces as [`StoreError::UniqueViolation`].
//! 2. Savepoints scope a single insert; rolling back to one undoes exactly the
//!    writes made after it.
//! 3. A transaction dropped without `commit` is rolled back.
//! 4. Rows are never updated or deleted through this interface.

pub mod error;
pub mod memory;
pub mod traits;

pub use error::{Constraint, StoreError, StoreResult};
pub use memory::InMemoryGraphStore;
pub use traits::{GraphStore, Savepoint, StoreTx};
