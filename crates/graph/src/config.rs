use crate::error::{GraphError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Which one-hop relations the incremental scope builder expands across
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScopeRelations {
    /// Callers and callees
    pub calls: bool,
    /// Lexical parent (`parent_id`)
    pub lexical_parent: bool,
    /// Enclosing namespace, resolved through the member's scope string
    pub namespace_parent: bool,
    /// Base and derived classes
    pub inheritance: bool,
    /// Overridden and overriding methods
    pub overrides: bool,
    /// Lexical children
    pub children: bool,
}

impl Default for ScopeRelations {
    fn default() -> Self {
        Self::all()
    }
}

impl ScopeRelations {
    #[must_use]
    pub const fn all() -> Self {
        Self {
            calls: true,
            lexical_parent: true,
            namespace_parent: true,
            inheritance: true,
            overrides: true,
            children: true,
        }
    }

    #[must_use]
    pub const fn any_enabled(&self) -> bool {
        self.calls
            || self.lexical_parent
            || self.namespace_parent
            || self.inheritance
            || self.overrides
            || self.children
    }
}

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Absolute project root; symbols located outside it are dropped
    /// before reconciliation (namespaces are always kept)
    pub project_root: Option<String>,

    /// Drop symbols with neither a definition nor a declaration
    pub drop_unlocated_symbols: bool,

    /// Create symbols for spans that no index entry matched
    pub synthesize_unmatched_spans: bool,

    /// Also build the callee → caller index
    pub emit_reverse_call_index: bool,

    /// Fail when none of the requested seeds is present in the index
    pub require_seeds_present: bool,

    pub relations: ScopeRelations,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            project_root: None,
            drop_unlocated_symbols: true,
            synthesize_unmatched_spans: true,
            emit_reverse_call_index: false,
            require_seeds_present: false,
            relations: ScopeRelations::all(),
        }
    }
}

impl EngineConfig {
    /// Whole-project build: no root filtering, reverse call index on
    pub fn full_build() -> Self {
        Self {
            emit_reverse_call_index: true,
            ..Self::default()
        }
    }

    /// Incremental update scoped to one project root
    pub fn incremental(project_root: impl Into<String>) -> Self {
        Self {
            project_root: Some(project_root.into()),
            require_seeds_present: true,
            ..Self::default()
        }
    }

    /// Parse a configuration from JSON or TOML text
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let value: serde_json::Value = match serde_json::from_slice(bytes) {
            Ok(value) => value,
            Err(json_err) => {
                let utf8 = std::str::from_utf8(bytes)
                    .map_err(|err| GraphError::invalid_config(format!("{json_err}; {err}")))?;
                let toml_value: toml::Value = toml::from_str(utf8).map_err(|toml_err| {
                    GraphError::invalid_config(format!(
                        "not valid JSON or TOML ({json_err}); TOML parse error: {toml_err}"
                    ))
                })?;
                serde_json::to_value(toml_value).map_err(|err| {
                    GraphError::invalid_config(format!("failed to convert TOML config: {err}"))
                })?
            }
        };

        let config: Self = serde_json::from_value(value)
            .map_err(|err| GraphError::invalid_config(format!("config parse error: {err}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(root) = &self.project_root {
            if root.trim().is_empty() {
                return Err(GraphError::invalid_config("project_root must not be empty"));
            }
            if !Path::new(root).is_absolute() {
                return Err(GraphError::invalid_config(format!(
                    "project_root must be absolute, got {root}"
                )));
            }
        }
        if !self.relations.any_enabled() {
            return Err(GraphError::invalid_config(
                "at least one scope relation must be enabled",
            ));
        }
        Ok(())
    }
}
