//! Factory - main entry point for building and persisting test rows
//!
//! This module provides the `Factory` struct that owns blueprints, generators
//! and the ordered instance registry, and drives the execute and query
//! channels supplied by the caller.

use std::fmt;

use sqlx::PgPool;
use tracing::{debug, info, warn};

use crate::blueprint::{Blueprint, BlueprintRegistry};
use crate::channel::{Executor, PgChannel, Querier};
use crate::config::FactoryConfig;
use crate::context::Context;
use crate::error::{FactoryError, Result};
use crate::instance::{Instance, Row};
use crate::sql::statement::{Statement, StatementBuilder};
use crate::substitution::Substitutions;

/// Blueprint-driven row factory
///
/// Instances are kept in build/query order, which is also the order they are
/// saved in. Several instances may share a name; they are told apart by their
/// position among same-named entries.
///
/// A factory is plain mutable state with no internal locking. Share it across
/// threads only behind a lock of your own.
pub struct Factory {
    config: FactoryConfig,
    statements: StatementBuilder,
    blueprints: BlueprintRegistry,
    substitutions: Substitutions,
    instances: Vec<Instance>,
    executor: Box<dyn Executor>,
    querier: Option<Box<dyn Querier>>,
}

impl Factory {
    /// Create a new Factory writing through `executor`
    ///
    /// The UUID generator is registered under `config.uuid_generator`.
    pub fn new(config: FactoryConfig, executor: impl Executor + 'static) -> Self {
        let statements = StatementBuilder::new(config.placeholder_format);
        let substitutions = Substitutions::with_uuid(config.uuid_generator.clone());

        Self {
            config,
            statements,
            blueprints: BlueprintRegistry::new(),
            substitutions,
            instances: Vec::new(),
            executor: Box::new(executor),
            querier: None,
        }
    }

    /// Attach the read channel used by [`Factory::find`]
    pub fn with_querier(mut self, querier: impl Querier + 'static) -> Self {
        self.querier = Some(Box::new(querier));
        self
    }

    /// Create a new Factory reading and writing through a PostgreSQL pool
    pub fn from_pool(pool: PgPool, config: FactoryConfig) -> Self {
        let channel = PgChannel::new(pool);
        Self::new(config, channel.clone()).with_querier(channel)
    }

    /// Get a reference to the configuration
    pub fn config(&self) -> &FactoryConfig {
        &self.config
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Register a blueprint under its alias, or its table name if unaliased
    ///
    /// Replaces any blueprint already registered under that key.
    pub fn register_blueprint(&mut self, blueprint: Blueprint) -> &mut Self {
        self.blueprints.register(blueprint);
        self
    }

    /// Register a generator for `{{name}}` markers, replacing any existing one
    pub fn register_generator<F>(&mut self, name: impl Into<String>, generator: F) -> &mut Self
    where
        F: FnMut() -> String + Send + 'static,
    {
        self.substitutions.register(name, generator);
        self
    }

    pub fn blueprints(&self) -> &BlueprintRegistry {
        &self.blueprints
    }

    // =========================================================================
    // Building and Lookup
    // =========================================================================

    /// Build an instance named after the blueprint key
    pub fn build(&mut self, key: &str) -> Result<&mut Instance> {
        self.build_named(key, key)
    }

    /// Build an instance from the blueprint registered under `key`
    ///
    /// Every marker in the outline is regenerated on each call. The instance
    /// is appended to the registry even if an instance with the same name
    /// already exists.
    pub fn build_named(&mut self, key: &str, name: &str) -> Result<&mut Instance> {
        let blueprint = self.blueprints.lookup(key)?;
        let contents = self.substitutions.expand(key, &blueprint.outline)?;

        let instance = Instance::new(name, blueprint.table_name.clone(), contents)
            .with_transient(blueprint.transient_only);
        debug!(blueprint = key, name, table = %instance.table_name(), "built instance");

        self.instances.push(instance);
        let last = self.instances.len() - 1;
        Ok(&mut self.instances[last])
    }

    /// First instance registered under `name`
    pub fn instance(&self, name: &str) -> Result<&Instance> {
        self.instance_at(name, 0)
    }

    /// The `index`-th (0-based) instance registered under `name`
    pub fn instance_at(&self, name: &str, index: usize) -> Result<&Instance> {
        self.instances
            .iter()
            .filter(|instance| instance.name() == name)
            .nth(index)
            .ok_or_else(|| FactoryError::instance_not_found(name, index))
    }

    pub fn instance_mut(&mut self, name: &str) -> Result<&mut Instance> {
        self.instance_at_mut(name, 0)
    }

    pub fn instance_at_mut(&mut self, name: &str, index: usize) -> Result<&mut Instance> {
        self.instances
            .iter_mut()
            .filter(|instance| instance.name() == name)
            .nth(index)
            .ok_or_else(|| FactoryError::instance_not_found(name, index))
    }

    /// All instances in registration order
    pub fn instances(&self) -> &[Instance] {
        &self.instances
    }

    /// Instances registered under `name`, in registration order
    pub fn instances_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Instance> + 'a {
        self.instances
            .iter()
            .filter(move |instance| instance.name() == name)
    }

    // =========================================================================
    // Persistence
    // =========================================================================

    /// Persist every non-transient instance in registration order
    ///
    /// Never-persisted instances are inserted; persisted ones are updated,
    /// matched on their previous snapshot. Stops at the first failure; the
    /// failing instance and everything after it keep their previous state,
    /// and nothing already written is rolled back.
    pub async fn save(&mut self, ctx: &Context) -> Result<()> {
        let mut written = 0usize;
        let mut skipped = 0usize;

        for instance in self.instances.iter_mut() {
            if instance.is_transient() {
                skipped += 1;
                continue;
            }

            let statement = self.statements.persist(instance).map_err(|e| match e {
                FactoryError::Build(reason) => FactoryError::build(format!(
                    "instance '{}' of '{}': {}",
                    instance.name(),
                    instance.table_name(),
                    reason
                )),
                other => other,
            })?;
            log_statement(self.config.log_statements, &statement, instance);

            if let Err(source) = self
                .executor
                .execute(ctx, &statement.sql, &statement.args)
                .await
            {
                warn!(
                    name = %instance.name(),
                    table = %instance.table_name(),
                    kind = %statement.kind,
                    error = %source,
                    "persisting instance failed"
                );
                return Err(FactoryError::Execution {
                    name: instance.name().to_string(),
                    table: instance.table_name().to_string(),
                    source,
                });
            }

            instance.mark_persisted();
            written += 1;
        }

        info!(persisted = written, skipped, "saved instances");
        Ok(())
    }

    // =========================================================================
    // Query
    // =========================================================================

    /// Load rows of `table` matching `filter`, named after the table
    pub async fn find(
        &mut self,
        ctx: &Context,
        table: &str,
        filter: &str,
    ) -> Result<&mut [Instance]> {
        self.find_named(ctx, table, table, filter).await
    }

    /// Load rows of `table` matching `filter` into instances named `name`
    ///
    /// `filter` is a flat JSON object of column → exact value. The loaded
    /// instances are persisted and transient, appended in the order the
    /// query channel returned them, and returned as a slice.
    pub async fn find_named(
        &mut self,
        ctx: &Context,
        table: &str,
        name: &str,
        filter: &str,
    ) -> Result<&mut [Instance]> {
        let filters: Row = serde_json::from_str(filter)
            .map_err(|e| FactoryError::invalid_filter(format!("{}: {}", filter, e)))?;

        let statement = self.statements.select(table, &filters)?;

        let querier = self
            .querier
            .as_ref()
            .ok_or_else(|| FactoryError::query(table, "no query channel configured"))?;

        if self.config.log_statements {
            debug!(table, name, args = statement.args.len(), sql = %statement.sql, "querying");
        } else {
            debug!(table, name, args = statement.args.len(), "querying");
        }

        let text = match querier.query(ctx, &statement.sql, &statement.args).await {
            Ok(text) => text,
            Err(source) => {
                warn!(table, error = %source, "query failed");
                return Err(FactoryError::Query {
                    table: table.to_string(),
                    source,
                });
            }
        };

        // Some channels encode an empty result set as `null`
        let rows: Option<Vec<Row>> =
            serde_json::from_str(&text).map_err(|e| FactoryError::query(table, e))?;
        let rows = rows.unwrap_or_default();

        info!(table, name, rows = rows.len(), "loaded instances");

        let start = self.instances.len();
        self.instances
            .extend(rows.into_iter().map(|row| Instance::loaded(name, table, row)));

        Ok(&mut self.instances[start..])
    }
}

impl fmt::Debug for Factory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Factory")
            .field("config", &self.config)
            .field("blueprints", &self.blueprints)
            .field("substitutions", &self.substitutions)
            .field("instances", &self.instances)
            .field("querier", &self.querier.is_some())
            .finish()
    }
}

fn log_statement(with_sql: bool, statement: &Statement, instance: &Instance) {
    if with_sql {
        debug!(
            kind = %statement.kind,
            name = %instance.name(),
            table = %instance.table_name(),
            args = statement.args.len(),
            sql = %statement.sql,
            "persisting instance"
        );
    } else {
        debug!(
            kind = %statement.kind,
            name = %instance.name(),
            table = %instance.table_name(),
            args = statement.args.len(),
            "persisting instance"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::ChannelError;
    use async_trait::async_trait;
    use serde_json::{Value, json};
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<(String, Vec<Value>)>>,
    }

    #[async_trait]
    impl Executor for Recorder {
        async fn execute(
            &self,
            _ctx: &Context,
            statement: &str,
            args: &[Value],
        ) -> std::result::Result<(), ChannelError> {
            self.calls
                .lock()
                .unwrap()
                .push((statement.to_string(), args.to_vec()));
            Ok(())
        }
    }

    struct Canned(&'static str);

    #[async_trait]
    impl Querier for Canned {
        async fn query(
            &self,
            _ctx: &Context,
            _statement: &str,
            _args: &[Value],
        ) -> std::result::Result<String, ChannelError> {
            Ok(self.0.to_string())
        }
    }

    fn factory() -> (Factory, Arc<Recorder>) {
        let recorder = Arc::new(Recorder::default());
        let config = FactoryConfig::builder().postgres().build();
        let mut factory = Factory::new(config, recorder.clone());
        factory.register_blueprint(Blueprint::new(
            "users",
            r#"{"id":"{{uuid}}","username":"jenny"}"#,
        ));
        (factory, recorder)
    }

    #[test]
    fn test_build_defaults_name_to_key() {
        let (mut factory, _) = factory();
        factory.build("users").unwrap();

        assert_eq!(factory.instance("users").unwrap().name(), "users");
    }

    #[test]
    fn test_build_unknown_blueprint() {
        let (mut factory, _) = factory();
        let err = factory.build("orders").unwrap_err();
        assert!(matches!(err, FactoryError::BlueprintNotFound(_)));
        assert!(factory.instances().is_empty());
    }

    #[test]
    fn test_build_aliased_blueprint_targets_table() {
        let (mut factory, _) = factory();
        factory.register_blueprint(
            Blueprint::new("users", r#"{"username":"root"}"#).with_alias("admin"),
        );

        let admin = factory.build("admin").unwrap();
        assert_eq!(admin.table_name(), "users");
        assert_eq!(admin.name(), "admin");
    }

    #[test]
    fn test_instance_index_out_of_range() {
        let (mut factory, _) = factory();
        factory.build_named("users", "a").unwrap();

        assert!(factory.instance_at("a", 0).is_ok());
        let err = factory.instance_at("a", 1).unwrap_err();
        assert!(matches!(err, FactoryError::InstanceNotFound { index: 1, .. }));
    }

    #[test]
    fn test_instance_at_outlives_name_argument() {
        let (mut factory, _) = factory();
        factory.build_named("users", "jenny1").unwrap();
        factory.build_named("users", "jenny1").unwrap().with("username", "johnny");

        let second = {
            let name = String::from("jenny1");
            factory.instance_at(&name, 1).unwrap()
        };
        assert_eq!(second.get("username").unwrap(), &json!("johnny"));
    }

    #[tokio::test]
    async fn test_save_build_error_names_instance() {
        let (mut factory, recorder) = factory();
        factory.register_blueprint(Blueprint::new("users", "{}").with_alias("empty"));
        factory.build_named("empty", "hollow").unwrap();

        let err = factory.save(&Context::background()).await.unwrap_err();
        match err {
            FactoryError::Build(reason) => {
                assert!(reason.contains("'hollow'"));
                assert!(reason.contains("'users'"));
            }
            other => panic!("Expected Build error, got {:?}", other),
        }
        assert!(recorder.calls.lock().unwrap().is_empty());
        assert!(!factory.instance("hollow").unwrap().is_persisted());
    }

    #[tokio::test]
    async fn test_save_without_instances_is_noop() {
        let (mut factory, recorder) = factory();
        factory.save(&Context::background()).await.unwrap();
        assert!(recorder.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_find_null_result_is_empty() {
        let (factory, _) = factory();
        let mut factory = factory.with_querier(Canned("null"));

        let found = factory
            .find(&Context::background(), "users", r#"{"username":"nobody"}"#)
            .await
            .unwrap();
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn test_find_without_querier() {
        let (mut factory, _) = factory();
        let err = factory
            .find(&Context::background(), "users", "{}")
            .await
            .unwrap_err();
        assert!(matches!(err, FactoryError::Query { .. }));
    }

    #[tokio::test]
    async fn test_find_unparseable_result() {
        let (factory, _) = factory();
        let mut factory = factory.with_querier(Canned("not json"));

        let err = factory
            .find(&Context::background(), "users", "{}")
            .await
            .unwrap_err();
        assert!(matches!(err, FactoryError::Query { .. }));
    }

    #[test]
    fn test_debug_output() {
        let (factory, _) = factory();
        let debug_str = format!("{:?}", factory);
        assert!(debug_str.contains("Factory"));
        assert!(debug_str.contains("placeholder_format"));
    }

    #[test]
    fn test_instances_named_order() {
        let (mut factory, _) = factory();
        factory.build_named("users", "a").unwrap().with("username", "first");
        factory.build_named("users", "b").unwrap();
        factory.build_named("users", "a").unwrap().with("username", "second");

        let names: Vec<Value> = factory
            .instances_named("a")
            .map(|i| i.get("username").unwrap().clone())
            .collect();
        assert_eq!(names, vec![json!("first"), json!("second")]);
    }
}
