use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strata_types::DEFAULT_DELETE_MARKER;

use crate::context::{PathContext, DEFAULT_ROOT_NAME};
use crate::error::{DiffError, DiffResult};

/// Settings for a diff run, loadable from TOML.
///
/// ```toml
/// root_name = "order"
/// delete_marker = "__DELETED__"
/// assoc_paths = ["tags", "groups.$.members"]
/// suppress_warnings = false
///
/// [key_fields]
/// lines = "sku"
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiffConfig {
    /// Name of the root path segment.
    pub root_name: String,
    /// Sentinel written into a diff for removed keys.
    pub delete_marker: String,
    /// Paths (relative to the root, `$` as wildcard) diffed with map
    /// semantics even when they hold sequences.
    pub assoc_paths: Vec<String>,
    /// Identity field per collection path, used to match items that moved.
    pub key_fields: BTreeMap<String, String>,
    /// Silence reindexing fallback warnings.
    pub suppress_warnings: bool,
    /// Reject comparisons between records of different types.
    pub enforce_same_type: bool,
}

impl Default for DiffConfig {
    fn default() -> Self {
        Self {
            root_name: DEFAULT_ROOT_NAME.to_owned(),
            delete_marker: DEFAULT_DELETE_MARKER.to_owned(),
            assoc_paths: Vec::new(),
            key_fields: BTreeMap::new(),
            suppress_warnings: false,
            enforce_same_type: false,
        }
    }
}

impl DiffConfig {
    pub fn from_toml_str(s: &str) -> DiffResult<Self> {
        toml::from_str(s).map_err(|e| DiffError::Config(e.to_string()))
    }

    /// Build the root context described by this configuration.
    pub fn context(&self) -> PathContext {
        let builder = PathContext::builder()
            .root_name(self.root_name.as_str())
            .delete_marker(self.delete_marker.as_str())
            .assoc_paths(self.assoc_paths.iter().map(String::as_str))
            .suppress_warnings(self.suppress_warnings)
            .enforce_same_type(self.enforce_same_type);

        self.key_fields
            .iter()
            .fold(builder, |b, (path, field)| b.key_field(path.as_str(), field.as_str()))
            .build()
    }
}

#[cfg(test)]
mod tests {
    use strata_types::Value;

    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config = DiffConfig::from_toml_str("").unwrap();
        assert_eq!(config, DiffConfig::default());
        assert_eq!(config.context().path(), "root");
    }

    #[test]
    fn parses_full_document() {
        let config = DiffConfig::from_toml_str(
            r#"
            root_name = "order"
            delete_marker = "__GONE__"
            assoc_paths = ["tags", "groups.$.members"]
            suppress_warnings = true

            [key_fields]
            lines = "sku"
            "#,
        )
        .unwrap();

        assert_eq!(config.root_name, "order");
        assert_eq!(config.key_fields.get("lines").map(String::as_str), Some("sku"));

        let ctx = config.context();
        assert_eq!(ctx.path(), "order");
        assert_eq!(ctx.delete_marker(), &Value::from("__GONE__"));
        assert!(ctx.suppress_warnings());
        assert!(!ctx.enforce_same_type());
        assert!(ctx.for_path("tags").is_current_path_assoc());
        assert!(ctx.for_path("groups.7.members").is_current_path_assoc());
        assert_eq!(ctx.for_path("lines").key_field_for_current_path(), Some("sku"));
    }

    #[test]
    fn invalid_toml_is_a_config_error() {
        let err = DiffConfig::from_toml_str("assoc_paths = 3").unwrap_err();
        assert!(matches!(err, DiffError::Config(_)));
    }
}
