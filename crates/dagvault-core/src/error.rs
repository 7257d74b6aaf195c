use dagvault_store::StoreError;
use dagvault_types::{ContentHash, ObjectId, ObjectKind, TypeError};

/// Errors from graph and access-control operations.
///
/// A lookup that finds nothing, or finds an object the caller may not see,
/// is not an error: those paths return a normal `Denied`/`None` result.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    /// The content hash already belongs to an object of another kind.
    #[error("object {dhash} already exists as {existing}, cannot store it as {requested}")]
    ObjectTypeConflict {
        dhash: ContentHash,
        existing: ObjectKind,
        requested: ObjectKind,
    },

    /// The attribute key is not registered in the attribute schema.
    #[error("attribute key is not defined: {0}")]
    UndefinedAttribute(String),

    /// An object referenced by id does not exist.
    #[error("object not found: {0}")]
    ObjectNotFound(ObjectId),

    /// The group directory failed to answer.
    #[error("directory error: {0}")]
    Directory(String),

    /// The attribute store failed for a reason other than an undefined key.
    #[error("attribute store error: {0}")]
    Attributes(String),

    /// Configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(String),

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("type error: {0}")]
    Types(#[from] TypeError),
}

/// Result alias for core operations.
pub type CoreResult<T> = Result<T, CoreError>;
