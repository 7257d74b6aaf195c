//! Content-addressed artifact graph with cascading group access control.
//!
//! Objects are deduplicated by content hash and linked into a derivation
//! graph. Groups are granted access per object; grants propagate down the
//! graph when shared, are copied onto children when linked, and may be
//! created implicitly when a member of a query-sharing group looks an
//! object up.
//!
//! The components take an explicit [`StoreTx`](dagvault_store::StoreTx):
//!
//! - [`ContentStore`] -- race-safe get-or-create by content hash
//! - [`RelationGraph`] -- parent/child links with grant inheritance
//! - [`PermissionGraph`] -- single grants and downward propagation
//! - [`AccessResolver`] -- lookup and share decisions
//!
//! [`Vault`] wires them to a store and runs each operation in its own
//! transaction.
//!
//! # Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use dagvault_core::{
//!     AccessOutcome, Capability, InMemoryAttributeStore, InMemoryDirectory,
//!     InMemoryGraphStore, ObjectCandidate, UploadOptions, Vault, VaultConfig,
//! };
//!
//! let directory = InMemoryDirectory::new();
//! let uploaders = directory.add_group("uploaders", std::iter::empty()).unwrap();
//! let bob = directory.add_member(&uploaders, "bob").unwrap();
//! let feed = directory.add_group("feed", [Capability::ShareQueriedObjects]).unwrap();
//! let alice = directory.add_member(&feed, "alice").unwrap();
//!
//! let vault = Vault::new(
//!     Arc::new(InMemoryGraphStore::new()),
//!     Arc::new(directory),
//!     Arc::new(InMemoryAttributeStore::new()),
//!     VaultConfig::default(),
//! );
//!
//! let sample = ObjectCandidate::file("sample.exe", b"MZ\x90\x00", None);
//! let options = UploadOptions::new().share_with(uploaders);
//! let (object, is_new) = vault.upload(sample, &options, &bob).unwrap();
//! assert!(is_new);
//!
//! // alice had no grant; her lookup extends one to `feed`.
//! let outcome = vault.access(&object.dhash.to_hex(), &alice).unwrap();
//! assert!(matches!(outcome, AccessOutcome::Queried(_)));
//! ```

pub mod access;
pub mod attributes;
pub mod config;
mod conflict;
pub mod content;
pub mod directory;
pub mod error;
pub mod permission;
pub mod relation;
pub mod vault;

#[cfg(test)]
mod testing;

// Re-exports for convenience.
pub use access::{AccessOutcome, AccessResolver, ObjectView, ShareDecision};
pub use attributes::{AttributeStore, InMemoryAttributeStore, Metakey};
pub use config::{PropagationPolicy, VaultConfig};
pub use content::{ContentStore, UploadOptions};
pub use directory::{GroupDirectory, InMemoryDirectory};
pub use error::{CoreError, CoreResult};
pub use permission::{PermissionGraph, PropagationReport};
pub use relation::RelationGraph;
pub use vault::Vault;

// Re-export key types
pub use dagvault_store::{GraphStore, InMemoryGraphStore, StoreError};
pub use dagvault_types::{
    Capability, ContentHash, GrantReason, GroupId, ObjectCandidate, ObjectId, ObjectKind,
    ObjectRecord, PermissionRecord, ReasonType, UserId,
};
