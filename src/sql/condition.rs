//! Condition building for SQL WHERE clauses
//!
//! Turns a flat column → value mapping into a conjunction of equality
//! predicates. Filters (SELECT) treat arrays as a set of accepted values;
//! snapshots (UPDATE) compare every value whole, the way it was written.

use serde_json::{Map, Value};

use crate::sql::placeholder::Placeholders;
use crate::sql::sanitize::{quote_identifier, validate_identifier};

/// How array values are matched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArrayMatch {
    /// `"col" IN (...)`, one placeholder per element
    AnyElement,
    /// `"col" = <placeholder>` bound to the whole array
    Whole,
}

/// Build a conjunction of equality predicates for a filter
///
/// Returns (clause, params) tuple where:
/// - `clause` is the condition text without the `WHERE` keyword, empty when
///   `filters` is empty
/// - `params` are the values to bind, in placeholder order
///
/// Predicates are emitted in column-name order.
///
/// Value handling:
/// - `null` becomes `"col" IS NULL` and binds nothing
/// - arrays become `"col" IN (...)` with one placeholder per element; an
///   empty array can never match and becomes `(1=0)`
/// - everything else becomes `"col" = <placeholder>`
pub fn build_equality_clause(
    filters: &Map<String, Value>,
    placeholders: &mut Placeholders,
) -> Result<(String, Vec<Value>), String> {
    build_predicates(filters, placeholders, ArrayMatch::AnyElement)
}

/// Build the predicate identifying a previously written row
///
/// Like [`build_equality_clause`], except arrays and objects are bound whole,
/// matching the value an INSERT or SET stored for them.
pub fn build_snapshot_clause(
    snapshot: &Map<String, Value>,
    placeholders: &mut Placeholders,
) -> Result<(String, Vec<Value>), String> {
    build_predicates(snapshot, placeholders, ArrayMatch::Whole)
}

fn build_predicates(
    values: &Map<String, Value>,
    placeholders: &mut Placeholders,
    arrays: ArrayMatch,
) -> Result<(String, Vec<Value>), String> {
    let mut predicates = Vec::with_capacity(values.len());
    let mut params = Vec::new();

    for (column, value) in sorted_entries(values) {
        validate_identifier(column, "Column")?;
        let quoted = quote_identifier(column);

        match (value, arrays) {
            (Value::Null, _) => predicates.push(format!("{} IS NULL", quoted)),
            (Value::Array(items), ArrayMatch::AnyElement) if items.is_empty() => {
                predicates.push("(1=0)".to_string())
            }
            (Value::Array(items), ArrayMatch::AnyElement) => {
                let slots: Vec<String> = items.iter().map(|_| placeholders.next()).collect();
                predicates.push(format!("{} IN ({})", quoted, slots.join(",")));
                params.extend(items.iter().cloned());
            }
            (other, _) => {
                predicates.push(format!("{} = {}", quoted, placeholders.next()));
                params.push(other.clone());
            }
        }
    }

    Ok((predicates.join(" AND "), params))
}

/// Entries ordered by column name, independent of the map's own ordering
pub fn sorted_entries(map: &Map<String, Value>) -> Vec<(&String, &Value)> {
    let mut entries: Vec<_> = map.iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));
    entries
}

/// Same as [`build_equality_clause`] but prefixed with ` WHERE `, or empty
pub fn build_where_clause(
    filters: &Map<String, Value>,
    placeholders: &mut Placeholders,
) -> Result<(String, Vec<Value>), String> {
    let (clause, params) = build_equality_clause(filters, placeholders)?;
    Ok((where_prefixed(clause), params))
}

/// Same as [`build_snapshot_clause`] but prefixed with ` WHERE `, or empty
pub fn build_snapshot_where_clause(
    snapshot: &Map<String, Value>,
    placeholders: &mut Placeholders,
) -> Result<(String, Vec<Value>), String> {
    let (clause, params) = build_snapshot_clause(snapshot, placeholders)?;
    Ok((where_prefixed(clause), params))
}

fn where_prefixed(clause: String) -> String {
    if clause.is_empty() {
        clause
    } else {
        format!(" WHERE {}", clause)
    }
}
