//! Composer configuration.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::types::Dialect;

/// What to do when a signature is registered again with a different body.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollisionPolicy {
    /// Last write wins; the entry keeps its original position.
    #[default]
    Overwrite,
    /// Fail with [`ComposeError::SignatureConflict`](crate::ComposeError::SignatureConflict).
    Reject,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ComposeOptions {
    pub dialect: Dialect,
    pub collision_policy: CollisionPolicy,
    /// Spaces per indentation level in generated function bodies.
    pub indent_width: usize,
    /// Name of the function wrapping the root statements in an assembled unit.
    pub entry_name: String,
}

impl Default for ComposeOptions {
    fn default() -> Self {
        Self {
            dialect: Dialect::default(),
            collision_policy: CollisionPolicy::default(),
            indent_width: 4,
            entry_name: "compose_main".to_string(),
        }
    }
}

impl ComposeOptions {
    pub fn wgsl() -> Self {
        Self {
            dialect: Dialect::Wgsl,
            ..Self::default()
        }
    }

    pub fn hlsl() -> Self {
        Self::default()
    }

    /// Parse options from JSON. Missing fields take their defaults.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).context("invalid compose options JSON")
    }

    pub fn with_collision_policy(mut self, policy: CollisionPolicy) -> Self {
        self.collision_policy = policy;
        self
    }

    pub(crate) fn indent(&self) -> String {
        " ".repeat(self.indent_width)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_fills_missing_fields_with_defaults() {
        let opts = ComposeOptions::from_json(r#"{ "dialect": "wgsl", "collisionPolicy": "reject" }"#)
            .unwrap();
        assert_eq!(opts.dialect, Dialect::Wgsl);
        assert_eq!(opts.collision_policy, CollisionPolicy::Reject);
        assert_eq!(opts.indent_width, 4);
        assert_eq!(opts.entry_name, "compose_main");
    }

    #[test]
    fn json_rejects_unknown_dialect() {
        let err = ComposeOptions::from_json(r#"{ "dialect": "metal" }"#).unwrap_err();
        assert!(format!("{err:#}").contains("invalid compose options JSON"));
    }
}
