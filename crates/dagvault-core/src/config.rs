use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// How far a propagating grant descends below nodes that already hold it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropagationPolicy {
    /// Visit every node reachable from the root. Repairs subgraphs left
    /// partially granted by an interrupted propagation.
    #[default]
    Exhaustive,
    /// Descend only below nodes whose grant was created by this call. Cost is
    /// proportional to the newly granted nodes, but relies on every earlier
    /// propagation for the same group having completed.
    NoveltyBounded,
}

/// Configuration for the vault core.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultConfig {
    /// Descent policy of propagating grants.
    pub propagation: PropagationPolicy,
    /// When `true`, a lookup by a member of a query-sharing group grants the
    /// object to that group instead of denying it.
    pub implicit_query_grants: bool,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            propagation: PropagationPolicy::Exhaustive,
            implicit_query_grants: true,
        }
    }
}

impl VaultConfig {
    /// Parse a TOML document. Missing keys take their default value.
    pub fn from_toml_str(source: &str) -> CoreResult<Self> {
        toml::from_str(source).map_err(|e| CoreError::Config(e.to_string()))
    }

    /// Read and parse a TOML file.
    pub fn load(path: impl AsRef<Path>) -> CoreResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .map_err(|e| CoreError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&source)
    }

    /// Render as a TOML document.
    pub fn to_toml_string(&self) -> CoreResult<String> {
        toml::to_string(self).map_err(|e| CoreError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = VaultConfig::default();
        assert_eq!(c.propagation, PropagationPolicy::Exhaustive);
        assert!(c.implicit_query_grants);
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let c = VaultConfig::from_toml_str("propagation = \"novelty_bounded\"\n").unwrap();
        assert_eq!(c.propagation, PropagationPolicy::NoveltyBounded);
        assert!(c.implicit_query_grants);
    }

    #[test]
    fn empty_toml_is_default() {
        assert_eq!(VaultConfig::from_toml_str("").unwrap(), VaultConfig::default());
    }

    #[test]
    fn invalid_toml_is_a_config_error() {
        let err = VaultConfig::from_toml_str("propagation = \"sometimes\"").unwrap_err();
        assert!(matches!(err, CoreError::Config(_)));
    }

    #[test]
    fn toml_roundtrip() {
        let c = VaultConfig {
            propagation: PropagationPolicy::NoveltyBounded,
            implicit_query_grants: false,
        };
        let text = c.to_toml_string().unwrap();
        assert_eq!(VaultConfig::from_toml_str(&text).unwrap(), c);
    }

    #[test]
    fn load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vault.toml");
        std::fs::write(&path, "implicit_query_grants = false\n").unwrap();
        let c = VaultConfig::load(&path).unwrap();
        assert!(!c.implicit_query_grants);
        assert_eq!(c.propagation, PropagationPolicy::Exhaustive);
    }

    #[test]
    fn load_missing_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = VaultConfig::load(dir.path().join("absent.toml")).unwrap_err();
        assert!(err.to_string().contains("absent.toml"));
    }
}
