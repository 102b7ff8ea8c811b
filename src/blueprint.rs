//! Blueprint-related types for the factory
//!
//! Includes Blueprint and BlueprintRegistry.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::error::{FactoryError, Result};

/// Template for building row instances of one table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Blueprint {
    /// Table that instances of this blueprint are written to
    #[serde(rename = "tableName")]
    pub table_name: String,
    /// Optional registry key, so several blueprints can target one table
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    /// JSON object text, possibly containing `{{name}}` markers
    pub outline: String,
    /// Instances built from this blueprint are never persisted
    #[serde(default, rename = "transientOnly")]
    pub transient_only: bool,
}

impl Blueprint {
    /// Create a new Blueprint from outline text
    pub fn new(table_name: impl Into<String>, outline: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            alias: None,
            outline: outline.into(),
            transient_only: false,
        }
    }

    /// Create a Blueprint from a JSON value; markers go inside string values
    pub fn from_value(table_name: impl Into<String>, outline: &serde_json::Value) -> Self {
        Self::new(table_name, outline.to_string())
    }

    /// Set alias
    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    /// Mark instances as never persisted
    pub fn transient(mut self) -> Self {
        self.transient_only = true;
        self
    }

    /// Registry key: the alias if set, else the table name
    pub fn key(&self) -> &str {
        self.alias.as_deref().unwrap_or(&self.table_name)
    }
}

/// Blueprints by key
#[derive(Debug, Clone, Default)]
pub struct BlueprintRegistry {
    blueprints: HashMap<String, Blueprint>,
}

impl BlueprintRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store a blueprint under its key, returning the one it replaced
    pub fn register(&mut self, blueprint: Blueprint) -> Option<Blueprint> {
        let key = blueprint.key().to_string();
        trace!(key = %key, table = %blueprint.table_name, "registering blueprint");
        self.blueprints.insert(key, blueprint)
    }

    pub fn lookup(&self, key: &str) -> Result<&Blueprint> {
        self.blueprints
            .get(key)
            .ok_or_else(|| FactoryError::blueprint_not_found(key))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.blueprints.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.blueprints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blueprints.is_empty()
    }
}
