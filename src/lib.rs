//! # blueprint-factory
//!
//! A blueprint-driven test data factory for relational stores.
//!
//! Register named blueprints (JSON templates per table), build named row
//! instances from them with generated values, tweak them in memory, then save
//! them through a caller-supplied execute channel. Rows that already exist can
//! be loaded through a query channel, edited, and saved back.
//!
//! ## Features
//!
//! - **Blueprints**: JSON object outlines with `{{name}}` markers, keyed by table or alias
//! - **Generators**: `{{uuid}}` out of the box, plus any `FnMut() -> String` you register
//! - **Named Instances**: repeated names are addressed by position, in build order
//! - **Snapshot Updates**: rows are updated by matching their previously persisted values,
//!   so no primary key is required
//! - **Pluggable Transport**: writes and reads go through [`Executor`] / [`Querier`];
//!   [`PgChannel`] wraps an sqlx `PgPool`
//! - **Placeholder Dialects**: `?`, `$1`, `:1` and `@p1`
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use blueprint_factory::{Blueprint, Context, Factory, FactoryConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let pool = sqlx::PgPool::connect("postgres://localhost/mydb").await?;
//!     let mut factory = Factory::from_pool(pool, FactoryConfig::builder().postgres().build());
//!
//!     factory.register_blueprint(Blueprint::new(
//!         "users",
//!         r#"{"id":"{{uuid}}","username":"jenny"}"#,
//!     ));
//!
//!     factory.build_named("users", "jenny1")?;
//!     factory.build_named("users", "jenny2")?.with("username", "johnny");
//!
//!     let ctx = Context::background();
//!     factory.save(&ctx).await?; // two INSERTs
//!
//!     factory.instance_mut("jenny2")?.with("username", "carl");
//!     factory.save(&ctx).await?; // two UPDATEs, matched on the rows as inserted
//!
//!     let existing = factory
//!         .find_named(&ctx, "users", "carls", r#"{"username":"carl"}"#)
//!         .await?;
//!     assert_eq!(existing.len(), 1);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration
//!
//! ```rust
//! use blueprint_factory::{FactoryConfig, PlaceholderFormat};
//!
//! let config = FactoryConfig::builder()
//!     .placeholder_format(PlaceholderFormat::Dollar) // default: `?`
//!     .uuid_generator("uuid")                        // default generator name
//!     .log_statements(true)                          // SQL text in debug logs
//!     .build();
//! ```
//!
//! ## Threading
//!
//! A `Factory` is ordinary mutable state. Every operation runs to completion
//! when awaited and nothing runs in the background. Sharing a factory between
//! threads needs an external lock.

pub mod blueprint;
pub mod channel;
pub mod config;
pub mod context;
pub mod error;
pub mod factory;
pub mod instance;
pub mod sql;
pub mod substitution;

// Re-export main types for convenience
pub use blueprint::{Blueprint, BlueprintRegistry};
pub use channel::{ChannelError, Executor, PgChannel, Querier};
pub use config::{DEFAULT_UUID_GENERATOR, FactoryConfig, FactoryConfigBuilder};
pub use context::{Context, ContextError};
pub use error::{FactoryError, Result};
pub use factory::Factory;
pub use instance::{Instance, Row};
pub use sql::placeholder::PlaceholderFormat;
pub use sql::statement::{Statement, StatementBuilder, StatementKind};
pub use substitution::{Generator, Substitutions};
