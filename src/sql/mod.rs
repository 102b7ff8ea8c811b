//! SQL utilities for the factory
//!
//! Provides statement generation, placeholder dialects, and identifier
//! sanitization.

pub mod condition;
pub mod placeholder;
pub mod sanitize;
pub mod statement;

pub use condition::{
    build_equality_clause, build_snapshot_clause, build_snapshot_where_clause, build_where_clause,
};
pub use placeholder::{PlaceholderFormat, Placeholders};
pub use sanitize::{quote_identifier, quote_table_name, validate_identifier, validate_table_name};
pub use statement::{Statement, StatementBuilder, StatementKind};
