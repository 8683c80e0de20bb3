//! Container configuration.
//!
//! Settings can be built in code, read from prefixed environment variables,
//! or (with the `config` feature) deserialized from JSON.

use std::collections::HashMap;
use std::env;

#[cfg(feature = "config")]
use serde::{Deserialize, Serialize};

use crate::error::{DiError, DiResult};

/// Default recursion limit for nested resolution.
pub const DEFAULT_MAX_RESOLUTION_DEPTH: usize = 1024;

/// Policy switches and placeholder properties for a container.
///
/// # Examples
///
/// ```rust
/// use autowire::ContainerConfig;
///
/// let config = ContainerConfig::default()
///     .allow_definition_overriding(false)
///     .with_property("db.url", "postgres://localhost");
///
/// assert!(!config.allow_definition_overriding);
/// assert_eq!(config.property("db.url"), Some("postgres://localhost"));
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "config", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "config", serde(default))]
pub struct ContainerConfig {
    /// Whether registering an existing name replaces the old definition
    pub allow_definition_overriding: bool,
    /// Whether type scans may instantiate factory components to learn their product type
    pub allow_eager_init_for_type_scan: bool,
    /// Whether arrays and collections are sorted by order value
    pub order_multi_values: bool,
    /// Nested resolution limit before `DepthExceeded`
    pub max_resolution_depth: usize,
    /// Values for `${key}` placeholders in literal injection points
    pub properties: HashMap<String, String>,
}

impl Default for ContainerConfig {
    fn default() -> Self {
        ContainerConfig {
            allow_definition_overriding: true,
            allow_eager_init_for_type_scan: true,
            order_multi_values: true,
            max_resolution_depth: DEFAULT_MAX_RESOLUTION_DEPTH,
            properties: HashMap::new(),
        }
    }
}

impl ContainerConfig {
    pub fn allow_definition_overriding(mut self, allow: bool) -> Self {
        self.allow_definition_overriding = allow;
        self
    }

    pub fn allow_eager_init_for_type_scan(mut self, allow: bool) -> Self {
        self.allow_eager_init_for_type_scan = allow;
        self
    }

    pub fn order_multi_values(mut self, order: bool) -> Self {
        self.order_multi_values = order;
        self
    }

    pub fn max_resolution_depth(mut self, depth: usize) -> Self {
        self.max_resolution_depth = depth;
        self
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    /// Reads settings from environment variables named `{PREFIX}_{SETTING}`.
    ///
    /// Recognised settings are `ALLOW_DEFINITION_OVERRIDING`,
    /// `ALLOW_EAGER_INIT_FOR_TYPE_SCAN`, `ORDER_MULTI_VALUES` and
    /// `MAX_RESOLUTION_DEPTH`. Every other prefixed variable becomes a
    /// property: `APP_DB_URL` is exposed as `db.url`.
    pub fn from_env(prefix: &str) -> DiResult<Self> {
        let prefix = format!("{}_", prefix.to_uppercase());
        Self::from_vars(&prefix, env::vars())
    }

    fn from_vars(prefix: &str, vars: impl IntoIterator<Item = (String, String)>) -> DiResult<Self> {
        let mut config = ContainerConfig::default();
        for (key, value) in vars {
            let Some(setting) = key.strip_prefix(prefix) else {
                continue;
            };
            match setting {
                "ALLOW_DEFINITION_OVERRIDING" => {
                    config.allow_definition_overriding = parse_flag(&key, &value)?
                }
                "ALLOW_EAGER_INIT_FOR_TYPE_SCAN" => {
                    config.allow_eager_init_for_type_scan = parse_flag(&key, &value)?
                }
                "ORDER_MULTI_VALUES" => config.order_multi_values = parse_flag(&key, &value)?,
                "MAX_RESOLUTION_DEPTH" => {
                    config.max_resolution_depth = value.trim().parse().map_err(|_| DiError::Conversion {
                        value: value.clone(),
                        target: "usize".to_string(),
                        reason: format!("invalid value for {key}"),
                    })?
                }
                _ => {
                    let property = setting.to_lowercase().replace('_', ".");
                    config.properties.insert(property, value);
                }
            }
        }
        Ok(config)
    }

    /// Parses a JSON document; missing fields keep their defaults.
    #[cfg(feature = "config")]
    pub fn from_json(json: &str) -> DiResult<Self> {
        serde_json::from_str(json).map_err(|e| DiError::Conversion {
            value: json.chars().take(64).collect(),
            target: "ContainerConfig".to_string(),
            reason: e.to_string(),
        })
    }
}

fn parse_flag(key: &str, value: &str) -> DiResult<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(DiError::Conversion {
            value: value.to_string(),
            target: "bool".to_string(),
            reason: format!("invalid value for {key}"),
        }),
    }
}
