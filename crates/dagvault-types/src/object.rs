//! Artifact records and the kinds of content they carry.
//!
//! Every artifact lives in a single object table. The concrete kind is a
//! tag ([`ObjectKind`]) plus a kind-specific payload ([`ObjectPayload`]);
//! behavior that differs per kind dispatches on the tag.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::digest::ContentHash;
use crate::error::TypeError;
use crate::id::ObjectId;

/// Discriminator of the artifact kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    /// Uploaded file (sample).
    File,
    /// Static configuration extracted from a sample.
    Config,
    /// Text artifact (dumps, scripts, logs).
    TextBlob,
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::File => write!(f, "file"),
            Self::Config => write!(f, "config"),
            Self::TextBlob => write!(f, "text_blob"),
        }
    }
}

/// Kind-specific content of an artifact.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ObjectPayload {
    File {
        name: String,
        size: u64,
        mime: Option<String>,
    },
    Config {
        family: String,
        config_type: String,
        cfg: serde_json::Value,
    },
    TextBlob {
        name: String,
        blob_type: String,
        content: String,
    },
}

impl ObjectPayload {
    /// The kind tag for this payload.
    pub fn kind(&self) -> ObjectKind {
        match self {
            Self::File { .. } => ObjectKind::File,
            Self::Config { .. } => ObjectKind::Config,
            Self::TextBlob { .. } => ObjectKind::TextBlob,
        }
    }
}

/// A fully-constructed object that has not been stored yet.
///
/// The content hash is computed by the constructors from the canonical
/// content of each kind, so equal content always yields an equal candidate
/// hash.
#[derive(Clone, Debug, PartialEq)]
pub struct ObjectCandidate {
    pub dhash: ContentHash,
    pub payload: ObjectPayload,
}

impl ObjectCandidate {
    /// A file candidate, hashed over its raw bytes.
    pub fn file(name: impl Into<String>, data: &[u8], mime: Option<String>) -> Self {
        Self {
            dhash: ContentHash::digest(data),
            payload: ObjectPayload::File {
                name: name.into(),
                size: data.len() as u64,
                mime,
            },
        }
    }

    /// A config candidate, hashed over the canonical JSON of `cfg`.
    pub fn config(
        family: impl Into<String>,
        config_type: impl Into<String>,
        cfg: serde_json::Value,
    ) -> Result<Self, TypeError> {
        Ok(Self {
            dhash: ContentHash::digest_json(&cfg)?,
            payload: ObjectPayload::Config {
                family: family.into(),
                config_type: config_type.into(),
                cfg,
            },
        })
    }

    /// A text blob candidate, hashed over its UTF-8 content.
    pub fn text_blob(
        name: impl Into<String>,
        blob_type: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        let content = content.into();
        Self {
            dhash: ContentHash::digest(content.as_bytes()),
            payload: ObjectPayload::TextBlob {
                name: name.into(),
                blob_type: blob_type.into(),
                content,
            },
        }
    }

    pub fn kind(&self) -> ObjectKind {
        self.payload.kind()
    }

    /// Materialize the candidate as a record with a fresh id and upload time.
    pub fn into_record(self) -> ObjectRecord {
        ObjectRecord {
            id: ObjectId::new(),
            dhash: self.dhash,
            upload_time: Utc::now(),
            payload: self.payload,
        }
    }
}

/// A stored artifact. Immutable once created.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ObjectRecord {
    pub id: ObjectId,
    pub dhash: ContentHash,
    pub upload_time: DateTime<Utc>,
    pub payload: ObjectPayload,
}

impl ObjectRecord {
    pub fn kind(&self) -> ObjectKind {
        self.payload.kind()
    }

    /// Returns a human-readable summary of this object.
    pub fn summary(&self) -> String {
        format!("{} {} ({})", self.kind(), self.dhash.short_hex(), self.id.short_id())
    }
}
