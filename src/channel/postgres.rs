//! PostgreSQL channel backed by an sqlx connection pool
//!
//! Serves as both [`Executor`] and [`Querier`].
//!
//! Arguments arrive as untyped JSON. Each statement is first prepared without
//! declared parameter types so the server infers them from the columns they
//! are compared with or assigned to; every argument is then converted to the
//! inferred type before binding. Prepared statements are cached per
//! connection by sqlx, so repeated statements cost no extra round trip.
//!
//! Query results are converted row by row into JSON objects: text columns
//! become strings, `bytea` becomes UTF-8 text, booleans and numbers pass
//! through, `json`/`jsonb` are embedded as-is, and every other type is
//! stringified.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde_json::{Map, Value};
use sqlx::postgres::{PgArguments, PgRow, PgTypeInfo};
use sqlx::query::Query;
use sqlx::{Column, Either, PgPool, Postgres, Row, TypeInfo, ValueRef};
use sqlx::{Executor as _, Statement as _};
use uuid::Uuid;

use crate::channel::{ChannelError, Executor, Querier};
use crate::context::Context;

type PgQuery<'q> = Query<'q, Postgres, PgArguments>;

/// Execute/query channel over a PostgreSQL pool
#[derive(Debug, Clone)]
pub struct PgChannel {
    pool: PgPool,
}

impl PgChannel {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Parameter types the server inferred for `statement`
    async fn parameter_types(
        &self,
        ctx: &Context,
        statement: &str,
    ) -> Result<Vec<PgTypeInfo>, ChannelError> {
        let prepared = ctx.run((&self.pool).prepare(statement)).await??;
        Ok(match prepared.parameters() {
            Some(Either::Left(types)) => types.to_vec(),
            _ => Vec::new(),
        })
    }

    /// Prepare `statement` and bind `args` converted to the inferred types
    async fn typed_query<'q>(
        &self,
        ctx: &Context,
        statement: &'q str,
        args: &'q [Value],
    ) -> Result<PgQuery<'q>, ChannelError> {
        let types = if args.is_empty() {
            Vec::new()
        } else {
            self.parameter_types(ctx, statement).await?
        };

        let mut query = sqlx::query(statement);
        for (idx, arg) in args.iter().enumerate() {
            query = match types.get(idx) {
                Some(type_info) => Self::bind_typed(query, arg, type_info.name())?,
                None => Self::bind_value(query, arg),
            };
        }
        Ok(query)
    }

    /// Bind `value` as the PostgreSQL type `type_name`
    ///
    /// JSON null binds a typed SQL NULL. Strings are parsed into the target
    /// type; numbers and booleans bound to text columns are stringified.
    fn bind_typed<'q>(
        query: PgQuery<'q>,
        value: &'q Value,
        type_name: &str,
    ) -> Result<PgQuery<'q>, ChannelError> {
        let query = match type_name {
            "TEXT" | "VARCHAR" | "BPCHAR" | "CHAR" | "NAME" | "CITEXT" => {
                query.bind(convert(value, type_name, as_text)?)
            }
            "BYTEA" => query.bind(convert(value, type_name, |v| {
                as_text(v).map(String::into_bytes)
            })?),
            "BOOL" => query.bind(convert(value, type_name, as_bool)?),
            "INT2" => query.bind(convert(value, type_name, |v| {
                as_i64(v).and_then(|n| i16::try_from(n).ok())
            })?),
            "INT4" => query.bind(convert(value, type_name, |v| {
                as_i64(v).and_then(|n| i32::try_from(n).ok())
            })?),
            "INT8" => query.bind(convert(value, type_name, as_i64)?),
            "FLOAT4" => query.bind(convert(value, type_name, |v| as_f64(v).map(|n| n as f32))?),
            "FLOAT8" => query.bind(convert(value, type_name, as_f64)?),
            "NUMERIC" => query.bind(convert(value, type_name, as_decimal)?),
            "UUID" => query.bind(convert(value, type_name, as_uuid)?),
            "JSON" | "JSONB" => query.bind(convert(value, type_name, |v| Some(v.clone()))?),
            "TIMESTAMPTZ" => query.bind(convert(value, type_name, as_timestamptz)?),
            "TIMESTAMP" => query.bind(convert(value, type_name, as_timestamp)?),
            "DATE" => query.bind(convert(value, type_name, |v| {
                v.as_str()?.parse::<NaiveDate>().ok()
            })?),
            "TIME" => query.bind(convert(value, type_name, |v| {
                v.as_str()?.parse::<NaiveTime>().ok()
            })?),
            "TEXT[]" | "VARCHAR[]" => {
                query.bind(convert(value, type_name, |v| array_of(v, as_text))?)
            }
            "INT4[]" => query.bind(convert(value, type_name, |v| {
                array_of(v, |e| as_i64(e).and_then(|n| i32::try_from(n).ok()))
            })?),
            "INT8[]" => query.bind(convert(value, type_name, |v| array_of(v, as_i64))?),
            "UUID[]" => query.bind(convert(value, type_name, |v| array_of(v, as_uuid))?),
            _ => Self::bind_value(query, value),
        };
        Ok(query)
    }

    /// Bind by JSON shape alone, for parameters of a type not handled above
    fn bind_value<'q>(query: PgQuery<'q>, value: &'q Value) -> PgQuery<'q> {
        match value {
            Value::Null => query.bind(None::<String>),
            Value::Bool(b) => query.bind(*b),
            Value::Number(n) => {
                if let Some(int_val) = n.as_i64() {
                    query.bind(int_val)
                } else if let Some(float_val) = n.as_f64() {
                    query.bind(float_val)
                } else {
                    query.bind(n.to_string())
                }
            }
            Value::String(s) => query.bind(s.as_str()),
            Value::Array(_) | Value::Object(_) => query.bind(value),
        }
    }

    fn row_to_json(row: &PgRow) -> Result<Map<String, Value>, sqlx::Error> {
        let mut object = Map::new();

        for column in row.columns() {
            let idx = column.ordinal();
            let raw = row.try_get_raw(idx)?;
            if raw.is_null() {
                object.insert(column.name().to_string(), Value::Null);
                continue;
            }

            let value = match column.type_info().name() {
                "TEXT" | "VARCHAR" | "BPCHAR" | "CHAR" | "NAME" | "CITEXT" => {
                    Value::String(row.try_get::<String, _>(idx)?)
                }
                "BYTEA" => {
                    let bytes: Vec<u8> = row.try_get(idx)?;
                    Value::String(String::from_utf8_lossy(&bytes).into_owned())
                }
                "BOOL" => Value::Bool(row.try_get(idx)?),
                "INT2" => Value::from(row.try_get::<i16, _>(idx)?),
                "INT4" => Value::from(row.try_get::<i32, _>(idx)?),
                "INT8" => Value::from(row.try_get::<i64, _>(idx)?),
                "FLOAT4" => Value::from(f64::from(row.try_get::<f32, _>(idx)?)),
                "FLOAT8" => Value::from(row.try_get::<f64, _>(idx)?),
                "JSON" | "JSONB" => row.try_get::<Value, _>(idx)?,
                "UUID" => Value::String(row.try_get::<uuid::Uuid, _>(idx)?.to_string()),
                "NUMERIC" => {
                    Value::String(row.try_get::<rust_decimal::Decimal, _>(idx)?.to_string())
                }
                "TIMESTAMPTZ" => Value::String(
                    row.try_get::<chrono::DateTime<chrono::Utc>, _>(idx)?
                        .to_rfc3339(),
                ),
                "TIMESTAMP" => {
                    Value::String(row.try_get::<chrono::NaiveDateTime, _>(idx)?.to_string())
                }
                "DATE" => Value::String(row.try_get::<chrono::NaiveDate, _>(idx)?.to_string()),
                "TIME" => Value::String(row.try_get::<chrono::NaiveTime, _>(idx)?.to_string()),
                _ => match row.try_get_unchecked::<String, _>(idx) {
                    Ok(text) => Value::String(text),
                    Err(_) => {
                        let bytes: Vec<u8> = row.try_get_unchecked(idx)?;
                        Value::String(String::from_utf8_lossy(&bytes).into_owned())
                    }
                },
            };

            object.insert(column.name().to_string(), value);
        }

        Ok(object)
    }
}

#[async_trait]
impl Executor for PgChannel {
    async fn execute(
        &self,
        ctx: &Context,
        statement: &str,
        args: &[Value],
    ) -> Result<(), ChannelError> {
        let query = self.typed_query(ctx, statement, args).await?;
        ctx.run(query.execute(&self.pool)).await??;
        Ok(())
    }
}

#[async_trait]
impl Querier for PgChannel {
    async fn query(
        &self,
        ctx: &Context,
        statement: &str,
        args: &[Value],
    ) -> Result<String, ChannelError> {
        let query = self.typed_query(ctx, statement, args).await?;
        let rows = ctx.run(query.fetch_all(&self.pool)).await??;
        let objects = rows
            .iter()
            .map(Self::row_to_json)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(serde_json::to_string(&objects)?)
    }
}

/// Convert a JSON argument for a parameter of type `type_name`
///
/// `Ok(None)` is a SQL NULL; a value that cannot be converted is an error
/// naming both.
fn convert<T>(
    value: &Value,
    type_name: &str,
    parse: impl FnOnce(&Value) -> Option<T>,
) -> Result<Option<T>, ChannelError> {
    if value.is_null() {
        return Ok(None);
    }
    parse(value)
        .map(Some)
        .ok_or_else(|| format!("cannot bind {} as {}", value, type_name).into())
}

fn as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

fn as_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.to_ascii_lowercase().as_str() {
            "true" | "t" | "yes" | "1" => Some(true),
            "false" | "f" | "no" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

fn as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => n.to_string().parse().ok(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_uuid(value: &Value) -> Option<Uuid> {
    Uuid::parse_str(value.as_str()?).ok()
}

fn as_timestamptz(value: &Value) -> Option<DateTime<Utc>> {
    let text = value.as_str()?;
    DateTime::parse_from_rfc3339(text)
        .map(|ts| ts.with_timezone(&Utc))
        .ok()
        .or_else(|| as_timestamp(value).map(|naive| naive.and_utc()))
}

fn as_timestamp(value: &Value) -> Option<NaiveDateTime> {
    let text = value.as_str()?;
    text.parse::<NaiveDateTime>()
        .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f"))
        .ok()
}

fn array_of<T>(value: &Value, element: impl Fn(&Value) -> Option<T>) -> Option<Vec<T>> {
    value.as_array()?.iter().map(element).collect()
}
