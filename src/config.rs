//! Configuration for Factory
//!
//! Provides a builder pattern for configuring the factory.

use crate::sql::placeholder::PlaceholderFormat;

/// Name the UUID v4 generator is registered under unless configured otherwise
pub const DEFAULT_UUID_GENERATOR: &str = "uuid";

/// Configuration for the factory
#[derive(Debug, Clone)]
pub struct FactoryConfig {
    /// Placeholder style applied to every built statement (default: `?`)
    pub placeholder_format: PlaceholderFormat,
    /// Name of the pre-registered UUID v4 generator (default: "uuid")
    pub uuid_generator: String,
    /// Whether to include the SQL text in debug logs (default: false)
    pub log_statements: bool,
}

impl FactoryConfig {
    /// Create a new configuration builder
    pub fn builder() -> FactoryConfigBuilder {
        FactoryConfigBuilder::new()
    }
}

impl Default for FactoryConfig {
    fn default() -> Self {
        FactoryConfigBuilder::new().build()
    }
}

/// Builder for FactoryConfig
#[derive(Debug)]
pub struct FactoryConfigBuilder {
    placeholder_format: PlaceholderFormat,
    uuid_generator: String,
    log_statements: bool,
}

impl FactoryConfigBuilder {
    pub fn new() -> Self {
        Self {
            placeholder_format: PlaceholderFormat::default(),
            uuid_generator: DEFAULT_UUID_GENERATOR.to_string(),
            log_statements: false,
        }
    }

    /// Set the placeholder format (default: `PlaceholderFormat::Question`)
    pub fn placeholder_format(mut self, format: PlaceholderFormat) -> Self {
        self.placeholder_format = format;
        self
    }

    /// Shorthand for `placeholder_format(PlaceholderFormat::Dollar)`, as PostgreSQL expects
    pub fn postgres(self) -> Self {
        self.placeholder_format(PlaceholderFormat::Dollar)
    }

    /// Set the name the UUID generator is registered under (default: "uuid")
    pub fn uuid_generator(mut self, name: impl Into<String>) -> Self {
        self.uuid_generator = name.into();
        self
    }

    /// Enable or disable SQL text in debug logs (default: false)
    pub fn log_statements(mut self, enabled: bool) -> Self {
        self.log_statements = enabled;
        self
    }

    /// Build the configuration
    pub fn build(self) -> FactoryConfig {
        FactoryConfig {
            placeholder_format: self.placeholder_format,
            uuid_generator: self.uuid_generator,
            log_statements: self.log_statements,
        }
    }
}

impl Default for FactoryConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
