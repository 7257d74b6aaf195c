//! Foundation types for dagvault.
//!
//! This crate provides the identity, digest, and record types shared by the
//! storage backend and the access-control core. Every other dagvault crate
//! depends on `dagvault-types`.
//!
//! # Key Types
//!
//! - [`ObjectId`] -- Surrogate key of a stored artifact (UUID v7)
//! - [`ContentHash`] -- Content digest (dhash), the deduplication key
//! - [`ObjectPayload`] -- Tagged union of artifact kinds (file, config, text blob)
//! - [`RelationRecord`] -- A parent → child derivation edge
//! - [`PermissionRecord`] -- A grant authorizing a group to see an object
//! - [`Capability`] -- Directory capability flags consulted by the core

pub mod capability;
pub mod digest;
pub mod error;
pub mod id;
pub mod object;
pub mod permission;
pub mod relation;

pub use capability::Capability;
pub use digest::ContentHash;
pub use error::TypeError;
pub use id::{GroupId, ObjectId, UserId};
pub use object::{ObjectCandidate, ObjectKind, ObjectPayload, ObjectRecord};
pub use permission::{GrantReason, PermissionRecord, ReasonType};
pub use relation::RelationRecord;
