//! SQL Identifier Sanitization Utilities
//!
//! Table and column names come from untyped blueprint data, so every identifier
//! that reaches a statement is validated and quoted here.

/// Quote a SQL identifier to make it safe for use in queries
///
/// # Example
/// ```
/// use blueprint_factory::sql::quote_identifier;
///
/// let quoted = quote_identifier("my_table");
/// assert_eq!(quoted, "\"my_table\"");
/// ```
pub fn quote_identifier(identifier: &str) -> String {
    // Escape any double quotes in the identifier by doubling them
    let escaped = identifier.replace('"', "\"\"");
    format!("\"{}\"", escaped)
}

/// Quote a possibly schema-qualified table name, one part at a time
///
/// # Example
/// ```
/// use blueprint_factory::sql::quote_table_name;
///
/// assert_eq!(quote_table_name("public.users"), "\"public\".\"users\"");
/// ```
pub fn quote_table_name(table_name: &str) -> String {
    table_name
        .split('.')
        .map(quote_identifier)
        .collect::<Vec<_>>()
        .join(".")
}

/// Validate a table or column name taken from row data
///
/// Rules:
/// - Cannot be empty or only whitespace
/// - Cannot contain NUL characters
/// - Table names cannot have empty parts around a `.` separator
pub fn validate_identifier(name: &str, kind: &str) -> Result<(), String> {
    if name.trim().is_empty() {
        return Err(format!("{} name cannot be empty", kind));
    }

    if name.contains('\0') {
        return Err(format!("{} name '{}' contains a NUL character", kind, name.escape_debug()));
    }

    Ok(())
}

/// Validate a possibly schema-qualified table name
pub fn validate_table_name(table_name: &str) -> Result<(), String> {
    validate_identifier(table_name, "Table")?;

    if table_name.split('.').any(|part| part.trim().is_empty()) {
        return Err(format!("Table name '{}' has an empty part", table_name));
    }

    Ok(())
}
