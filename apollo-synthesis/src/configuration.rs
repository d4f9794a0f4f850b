//! Synthesis configuration, loaded from YAML.

use std::path::Path;

use schemars::JsonSchema;
use schemars::schema::RootSchema;
use serde::Deserialize;
use serde::Serialize;

use crate::error::ConfigurationError;

/// How a singular lookup field presents a filter matching more than one record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum AmbiguousMatchPolicy {
    /// Report a field error with code `AMBIGUOUS_MATCH` and resolve the field to `null`.
    #[default]
    Error,
    /// Resolve the field to the first matching record.
    First,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct Configuration {
    /// What a singular lookup returns when several records match.
    #[serde(default)]
    pub ambiguous_match: AmbiguousMatchPolicy,

    /// Synthesize a `create<Type>` mutation for every type.
    #[serde(default = "default_true")]
    pub mutations: bool,

    /// Answer the `__schema` and `__type` meta-fields.
    #[serde(default = "default_true")]
    pub introspection: bool,
}

fn default_true() -> bool {
    true
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            ambiguous_match: AmbiguousMatchPolicy::default(),
            mutations: default_true(),
            introspection: default_true(),
        }
    }
}

impl Configuration {
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigurationError> {
        // An empty document means every default.
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(yaml)?)
    }

    pub fn read(path: impl AsRef<Path>) -> Result<Self, ConfigurationError> {
        Self::from_yaml(&std::fs::read_to_string(path)?)
    }

    /// The JSON schema of the configuration file, for editor support.
    pub fn json_schema() -> RootSchema {
        schemars::schema_for!(Configuration)
    }
}
