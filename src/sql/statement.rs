//! Statement generation for instance persistence and lookup
//!
//! Builds INSERT, UPDATE and SELECT statements from untyped row data. The
//! placeholder dialect is fixed when the builder is created and shared by all
//! three statement kinds.

use std::fmt;

use serde_json::Value;

use crate::error::{FactoryError, Result};
use crate::instance::{Instance, Row};
use crate::sql::condition::{build_snapshot_where_clause, build_where_clause, sorted_entries};
use crate::sql::placeholder::PlaceholderFormat;
use crate::sql::sanitize::{
    quote_identifier, quote_table_name, validate_identifier, validate_table_name,
};

/// Which kind of statement was built
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Insert,
    Update,
    Select,
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            StatementKind::Insert => "insert",
            StatementKind::Update => "update",
            StatementKind::Select => "select",
        };
        f.write_str(kind)
    }
}

/// SQL text with its positional arguments
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub kind: StatementKind,
    pub sql: String,
    pub args: Vec<Value>,
}

/// Statement builder for a single placeholder dialect
#[derive(Debug, Clone, Copy)]
pub struct StatementBuilder {
    format: PlaceholderFormat,
}

impl StatementBuilder {
    pub fn new(format: PlaceholderFormat) -> Self {
        Self { format }
    }

    pub fn placeholder_format(&self) -> PlaceholderFormat {
        self.format
    }

    /// Build the statement that persists `instance`: an INSERT the first time,
    /// an UPDATE keyed on the previous snapshot afterwards
    pub fn persist(&self, instance: &Instance) -> Result<Statement> {
        if instance.is_persisted() {
            self.update(instance)
        } else {
            self.insert(instance)
        }
    }

    /// Generate an INSERT listing every column of the current contents
    pub fn insert(&self, instance: &Instance) -> Result<Statement> {
        validate_table_name(instance.table_name()).map_err(FactoryError::build)?;

        if instance.contents().is_empty() {
            return Err(FactoryError::build(format!(
                "insert into '{}' must have at least one column",
                instance.table_name()
            )));
        }

        let mut placeholders = self.format.sequence();
        let mut columns = Vec::with_capacity(instance.contents().len());
        let mut values = Vec::with_capacity(instance.contents().len());
        let mut args = Vec::with_capacity(instance.contents().len());

        for (column, value) in sorted_entries(instance.contents()) {
            validate_identifier(column, "Column").map_err(FactoryError::build)?;
            columns.push(quote_identifier(column));
            values.push(placeholders.next());
            args.push(value.clone());
        }

        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote_table_name(instance.table_name()),
            columns.join(", "),
            values.join(", ")
        );

        Ok(Statement {
            kind: StatementKind::Insert,
            sql,
            args,
        })
    }

    /// Generate an UPDATE setting every current column, matched on the
    /// previously persisted snapshot
    ///
    /// An empty snapshot yields no WHERE clause and would touch every row of
    /// the table; [`StatementBuilder::persist`] only calls this for persisted
    /// instances.
    pub fn update(&self, instance: &Instance) -> Result<Statement> {
        validate_table_name(instance.table_name()).map_err(FactoryError::build)?;

        if instance.contents().is_empty() {
            return Err(FactoryError::build(format!(
                "update of '{}' must have at least one set clause",
                instance.table_name()
            )));
        }

        let mut placeholders = self.format.sequence();
        let mut set_clauses = Vec::with_capacity(instance.contents().len());
        let mut args =
            Vec::with_capacity(instance.contents().len() + instance.persisted_contents().len());

        for (column, value) in sorted_entries(instance.contents()) {
            validate_identifier(column, "Column").map_err(FactoryError::build)?;
            set_clauses.push(format!("{} = {}", quote_identifier(column), placeholders.next()));
            args.push(value.clone());
        }

        let (where_clause, where_args) =
            build_snapshot_where_clause(instance.persisted_contents(), &mut placeholders)
                .map_err(FactoryError::build)?;
        args.extend(where_args);

        let sql = format!(
            "UPDATE {} SET {}{}",
            quote_table_name(instance.table_name()),
            set_clauses.join(", "),
            where_clause
        );

        Ok(Statement {
            kind: StatementKind::Update,
            sql,
            args,
        })
    }

    /// Generate `SELECT *` filtered by a conjunction of equalities; no filters
    /// means an unfiltered scan
    pub fn select(&self, table_name: &str, filters: &Row) -> Result<Statement> {
        validate_table_name(table_name).map_err(FactoryError::build)?;

        let mut placeholders = self.format.sequence();
        let (where_clause, args) =
            build_where_clause(filters, &mut placeholders).map_err(FactoryError::build)?;

        let sql = format!("SELECT * FROM {}{}", quote_table_name(table_name), where_clause);

        Ok(Statement {
            kind: StatementKind::Select,
            sql,
            args,
        })
    }
}

impl Default for StatementBuilder {
    fn default() -> Self {
        Self::new(PlaceholderFormat::default())
    }
}
