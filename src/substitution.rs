//! Marker substitution for blueprint outlines
//!
//! Outlines may contain `{{name}}` markers. Each occurrence is replaced with
//! a fresh value from the generator registered under `name`; two `{{uuid}}`
//! markers in one outline get two different values. Replacement is textual,
//! so a marker can sit inside a JSON string or stand in for a bare number.

use std::collections::HashMap;
use std::fmt;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use tracing::trace;

use crate::error::{FactoryError, Result};
use crate::instance::Row;

/// Zero-argument value generator
pub type Generator = Box<dyn FnMut() -> String + Send>;

static MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{([a-zA-Z0-9]+)\}\}").expect("marker pattern is a valid regex")
});

/// Generator registry owned by one factory
#[derive(Default)]
pub struct Substitutions {
    generators: HashMap<String, Generator>,
}

impl Substitutions {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with a UUID v4 generator under `name`
    pub fn with_uuid(name: impl Into<String>) -> Self {
        let mut substitutions = Self::new();
        substitutions.register(name, || uuid::Uuid::new_v4().to_string());
        substitutions
    }

    /// Register a generator, replacing any existing one under the same name
    pub fn register<F>(&mut self, name: impl Into<String>, generator: F)
    where
        F: FnMut() -> String + Send + 'static,
    {
        let name = name.into();
        trace!(generator = %name, "registering generator");
        self.generators.insert(name, Box::new(generator));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.generators.contains_key(name)
    }

    /// Names of all `{{name}}` markers in `outline`, in order of appearance
    pub fn markers(outline: &str) -> Vec<&str> {
        MARKER
            .captures_iter(outline)
            .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
            .collect()
    }

    /// Replace every marker occurrence with a freshly generated value
    ///
    /// Fails before generating anything if any marker has no generator.
    pub fn render(&mut self, outline: &str) -> Result<String> {
        if let Some(unknown) = Self::markers(outline)
            .into_iter()
            .find(|name| !self.contains(name))
        {
            return Err(FactoryError::UnknownGenerator(unknown.to_string()));
        }

        let generators = &mut self.generators;
        let rendered = MARKER.replace_all(outline, |caps: &Captures| {
            generators
                .get_mut(&caps[1])
                .map(|generate| generate())
                .unwrap_or_default()
        });

        Ok(rendered.into_owned())
    }

    /// Render `outline` and parse the result as row contents
    pub fn expand(&mut self, blueprint: &str, outline: &str) -> Result<Row> {
        let rendered = self.render(outline)?;
        serde_json::from_str::<Row>(&rendered)
            .map_err(|e| FactoryError::invalid_template(blueprint, e))
    }
}

impl fmt::Debug for Substitutions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.generators.keys().collect();
        names.sort();
        f.debug_struct("Substitutions")
            .field("generators", &names)
            .finish()
    }
}
