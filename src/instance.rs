//! Instance - in-memory representation of one table row
//!
//! An instance carries its current contents plus the snapshot last known to
//! match the store. The snapshot is what identifies the row when it is
//! updated, so it only changes when the instance is persisted.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{FactoryError, Result};

/// Untyped row contents: column name → JSON value
pub type Row = Map<String, Value>;

/// A named row instance tracked by the factory
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instance {
    /// Name used for lookups (defaults to the blueprint key or table name)
    name: String,
    /// Target table for statements
    #[serde(rename = "tableName")]
    table_name: String,
    /// Current column values
    contents: Row,
    /// Snapshot as of the last persistence or load; empty if never persisted
    #[serde(rename = "persistedContents")]
    persisted_contents: Row,
    /// Whether the row has been written to or read from the store
    persisted: bool,
    /// Whether the row is skipped when saving
    transient: bool,
}

impl Instance {
    /// Create a fresh, never-persisted instance
    pub fn new(name: impl Into<String>, table_name: impl Into<String>, contents: Row) -> Self {
        Self {
            name: name.into(),
            table_name: table_name.into(),
            contents,
            persisted_contents: Row::new(),
            persisted: false,
            transient: false,
        }
    }

    /// Create an instance for a row read back from the store
    ///
    /// Loaded rows start persisted and transient, with both snapshots equal.
    pub fn loaded(name: impl Into<String>, table_name: impl Into<String>, contents: Row) -> Self {
        Self {
            name: name.into(),
            table_name: table_name.into(),
            persisted_contents: contents.clone(),
            contents,
            persisted: true,
            transient: true,
        }
    }

    /// Mark whether the instance is skipped when saving
    pub fn with_transient(mut self, transient: bool) -> Self {
        self.transient = transient;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    /// Get a single column value
    pub fn get(&self, attr: &str) -> Result<&Value> {
        self.contents
            .get(attr)
            .ok_or_else(|| FactoryError::attribute_not_found(&self.name, attr))
    }

    /// Set or overwrite a column value, returning the instance for chaining
    ///
    /// Never touches the persisted snapshot, so the next save still matches the
    /// row as it was last written.
    pub fn with(&mut self, attr: impl Into<String>, value: impl Into<Value>) -> &mut Self {
        self.contents.insert(attr.into(), value.into());
        self
    }

    pub fn contents(&self) -> &Row {
        &self.contents
    }

    pub fn persisted_contents(&self) -> &Row {
        &self.persisted_contents
    }

    /// Current contents as JSON object text
    pub fn contents_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.contents)?)
    }

    pub fn is_persisted(&self) -> bool {
        self.persisted
    }

    pub fn is_transient(&self) -> bool {
        self.transient
    }

    /// Record a successful write: the snapshot becomes a copy of the contents
    pub(crate) fn mark_persisted(&mut self) {
        self.persisted = true;
        self.persisted_contents = self.contents.clone();
    }
}
