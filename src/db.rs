use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};
use thiserror::Error;

use crate::config::AppConfig;

#[cfg(test)]
pub mod memory;

/// Failures reported by the repository traits.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A unique index rejected the write; carries the offending field.
    #[error("duplicate {0}")]
    Duplicate(String),

    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),

    /// A stored value could not be mapped back onto its domain type.
    #[error("undecodable row: {0}")]
    Decode(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                let field = duplicate_field(db_err.constraint().unwrap_or_default());
                return StoreError::Duplicate(field.to_string());
            }
        }
        StoreError::Database(err)
    }
}

/// Maps a unique constraint name onto the field it guards.
fn duplicate_field(constraint: &str) -> &'static str {
    if constraint.contains("email") {
        "email"
    } else if constraint.contains("token") {
        "token"
    } else {
        "record"
    }
}

pub async fn connect(config: &AppConfig) -> anyhow::Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .context("connect to database")
}
