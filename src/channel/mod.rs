//! Execute and query channels
//!
//! The factory never talks to a database directly. Writes go through an
//! [`Executor`] and reads through a [`Querier`], both supplied by the caller,
//! so the caller decides on pooling, transactions and dialect. Every call
//! receives the caller's [`Context`].

pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::context::Context;

pub use postgres::PgChannel;

/// Opaque failure reported by a channel
pub type ChannelError = Box<dyn std::error::Error + Send + Sync>;

/// Write channel used for INSERT and UPDATE statements
#[async_trait]
pub trait Executor: Send + Sync {
    async fn execute(
        &self,
        ctx: &Context,
        statement: &str,
        args: &[Value],
    ) -> Result<(), ChannelError>;
}

/// Read channel used for SELECT statements
///
/// Implementations return the matching rows as JSON array text, one object
/// per row keyed by column name.
#[async_trait]
pub trait Querier: Send + Sync {
    async fn query(
        &self,
        ctx: &Context,
        statement: &str,
        args: &[Value],
    ) -> Result<String, ChannelError>;
}

#[async_trait]
impl<T: Executor + ?Sized> Executor for Arc<T> {
    async fn execute(
        &self,
        ctx: &Context,
        statement: &str,
        args: &[Value],
    ) -> Result<(), ChannelError> {
        (**self).execute(ctx, statement, args).await
    }
}

#[async_trait]
impl<T: Querier + ?Sized> Querier for Arc<T> {
    async fn query(
        &self,
        ctx: &Context,
        statement: &str,
        args: &[Value],
    ) -> Result<String, ChannelError> {
        (**self).query(ctx, statement, args).await
    }
}
