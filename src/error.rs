//! Error types for factory operations

use thiserror::Error;

use crate::channel::ChannelError;

/// Errors that can occur while building, persisting or querying instances
#[derive(Debug, Error)]
pub enum FactoryError {
    #[error("Blueprint not found: {0}")]
    BlueprintNotFound(String),

    #[error("Instance not found: {name} (index {index})")]
    InstanceNotFound { name: String, index: usize },

    #[error("Attribute '{attribute}' not found on instance '{instance}'")]
    AttributeNotFound { instance: String, attribute: String },

    #[error("Unknown generator: {0}")]
    UnknownGenerator(String),

    #[error("Invalid template for blueprint '{blueprint}': {reason}")]
    InvalidTemplate { blueprint: String, reason: String },

    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    #[error("Could not build sql: {0}")]
    Build(String),

    #[error("Could not persist instance '{name}' into '{table}': {source}")]
    Execution {
        name: String,
        table: String,
        #[source]
        source: ChannelError,
    },

    #[error("Could not query '{table}': {source}")]
    Query {
        table: String,
        #[source]
        source: ChannelError,
    },

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl FactoryError {
    pub fn blueprint_not_found(key: impl Into<String>) -> Self {
        Self::BlueprintNotFound(key.into())
    }

    pub fn instance_not_found(name: impl Into<String>, index: usize) -> Self {
        Self::InstanceNotFound {
            name: name.into(),
            index,
        }
    }

    pub fn attribute_not_found(instance: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self::AttributeNotFound {
            instance: instance.into(),
            attribute: attribute.into(),
        }
    }

    pub fn invalid_template(blueprint: impl Into<String>, reason: impl ToString) -> Self {
        Self::InvalidTemplate {
            blueprint: blueprint.into(),
            reason: reason.to_string(),
        }
    }

    pub fn invalid_filter(msg: impl Into<String>) -> Self {
        Self::InvalidFilter(msg.into())
    }

    pub fn build(msg: impl Into<String>) -> Self {
        Self::Build(msg.into())
    }

    pub fn query(table: impl Into<String>, source: impl Into<ChannelError>) -> Self {
        Self::Query {
            table: table.into(),
            source: source.into(),
        }
    }

    /// True for every lookup miss: blueprint, instance name/index, or attribute
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::BlueprintNotFound(_)
                | Self::InstanceNotFound { .. }
                | Self::AttributeNotFound { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, FactoryError>;
