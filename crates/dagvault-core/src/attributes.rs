//! Attribute (metakey) storage consumed at upload time.
//!
//! Attributes are key/value pairs attached to objects. Keys must be declared
//! in a schema first; attaching an undeclared key fails with
//! [`CoreError::UndefinedAttribute`], which uploads treat as "not applied".

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use dagvault_types::ObjectId;

use crate::error::{CoreError, CoreResult};

/// A key/value pair to attach to an object.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metakey {
    pub key: String,
    pub value: serde_json::Value,
}

impl Metakey {
    pub fn new(key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Per-object attribute storage.
pub trait AttributeStore: Send + Sync {
    /// Attach a value under `key`. Returns `true` if the value was new for
    /// this object, `false` if it was already attached.
    fn attach(&self, object: &ObjectId, key: &str, value: &serde_json::Value) -> CoreResult<bool>;

    /// Values attached to `object` under `key`, in attach order.
    fn values(&self, object: &ObjectId, key: &str) -> CoreResult<Vec<serde_json::Value>>;
}

/// An in-memory implementation of [`AttributeStore`] with a key schema.
#[derive(Debug, Default)]
pub struct InMemoryAttributeStore {
    schema: RwLock<HashSet<String>>,
    values: RwLock<HashMap<(ObjectId, String), Vec<serde_json::Value>>>,
}

fn poisoned(e: impl std::fmt::Display) -> CoreError {
    CoreError::Attributes(format!("lock poisoned: {e}"))
}

impl InMemoryAttributeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare an attribute key so values can be attached under it.
    pub fn define(&self, key: impl Into<String>) -> CoreResult<()> {
        self.schema.write().map_err(poisoned)?.insert(key.into());
        Ok(())
    }
}

impl AttributeStore for InMemoryAttributeStore {
    fn attach(&self, object: &ObjectId, key: &str, value: &serde_json::Value) -> CoreResult<bool> {
        if !self.schema.read().map_err(poisoned)?.contains(key) {
            return Err(CoreError::UndefinedAttribute(key.to_string()));
        }
        let mut values = self.values.write().map_err(poisoned)?;
        let entry = values.entry((*object, key.to_string())).or_default();
        if entry.contains(value) {
            return Ok(false);
        }
        entry.push(value.clone());
        Ok(true)
    }

    fn values(&self, object: &ObjectId, key: &str) -> CoreResult<Vec<serde_json::Value>> {
        Ok(self
            .values
            .read()
            .map_err(poisoned)?
            .get(&(*object, key.to_string()))
            .cloned()
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn attach_is_idempotent() {
        let store = InMemoryAttributeStore::new();
        store.define("family").unwrap();
        let object = ObjectId::new();
        assert!(store.attach(&object, "family", &json!("emotet")).unwrap());
        assert!(!store.attach(&object, "family", &json!("emotet")).unwrap());
        assert!(store.attach(&object, "family", &json!("trickbot")).unwrap());
        assert_eq!(
            store.values(&object, "family").unwrap(),
            vec![json!("emotet"), json!("trickbot")]
        );
    }

    #[test]
    fn undefined_key_is_rejected() {
        let store = InMemoryAttributeStore::new();
        let err = store
            .attach(&ObjectId::new(), "undeclared", &json!(1))
            .unwrap_err();
        assert!(matches!(err, CoreError::UndefinedAttribute(key) if key == "undeclared"));
    }

    #[test]
    fn values_are_per_object() {
        let store = InMemoryAttributeStore::new();
        store.define("source").unwrap();
        let a = ObjectId::new();
        let b = ObjectId::new();
        store.attach(&a, "source", &json!("honeypot")).unwrap();
        assert!(store.values(&b, "source").unwrap().is_empty());
    }

    #[test]
    fn metakey_from_plain_values() {
        let mk = Metakey::new("score", 7);
        assert_eq!(mk.value, json!(7));
    }
}
