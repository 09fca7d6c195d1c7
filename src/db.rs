// src/db.rs
use async_trait::async_trait;
use log::info;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::fmt;

use crate::config::Config;
use crate::models::{Stock, StockInput};

#[derive(Debug)]
pub enum DbError {
    /// No row matched the requested id. Kept separate from query failures so
    /// handlers can answer 404 instead of 500.
    NotFound,
    Query(sqlx::Error),
}

impl fmt::Display for DbError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DbError::NotFound => write!(f, "stock not found"),
            DbError::Query(e) => write!(f, "query failed: {}", e),
        }
    }
}

impl std::error::Error for DbError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DbError::NotFound => None,
            DbError::Query(e) => Some(e),
        }
    }
}

impl From<sqlx::Error> for DbError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => DbError::NotFound,
            other => DbError::Query(other),
        }
    }
}

/// Builds the process-lifetime connection pool. Operations borrow a
/// connection per statement instead of opening one per request.
pub async fn connect(config: &Config) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.connect_timeout)
        .connect(&config.database_url())
        .await?;
    info!(
        "Connected to PostgreSQL at {}:{}",
        config.db_host, config.db_port
    );
    Ok(pool)
}

/// Creates the one table this service owns, if it is missing.
pub async fn ensure_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS stocks (
            stockid BIGSERIAL PRIMARY KEY,
            name TEXT NOT NULL,
            price DOUBLE PRECISION NOT NULL,
            company TEXT NOT NULL
        )",
    )
    .execute(pool)
    .await?;
    Ok(())
}

/// The five fixed statements of the service, behind a trait so handlers can
/// be exercised against an in-memory store in tests.
#[async_trait]
pub trait StockStore: Send + Sync {
    async fn insert(&self, input: &StockInput) -> Result<i64, DbError>;
    async fn get(&self, id: i64) -> Result<Stock, DbError>;
    async fn get_all(&self) -> Result<Vec<Stock>, DbError>;
    /// Overwrites name, price and company; returns rows affected (0 or 1).
    async fn update(&self, id: i64, input: &StockInput) -> Result<u64, DbError>;
    async fn delete(&self, id: i64) -> Result<u64, DbError>;
}

pub struct PgStockStore {
    pool: PgPool,
}

impl PgStockStore {
    pub fn new(pool: PgPool) -> Self {
        PgStockStore { pool }
    }
}

#[async_trait]
impl StockStore for PgStockStore {
    async fn insert(&self, input: &StockInput) -> Result<i64, DbError> {
        let (id,): (i64,) = sqlx::query_as(
            "INSERT INTO stocks (name, price, company) VALUES ($1, $2, $3) RETURNING stockid",
        )
        .bind(&input.name)
        .bind(input.price)
        .bind(&input.company)
        .fetch_one(&self.pool)
        .await?;
        info!("Inserted stock {}", id);
        Ok(id)
    }

    async fn get(&self, id: i64) -> Result<Stock, DbError> {
        sqlx::query_as::<_, Stock>(
            "SELECT stockid, name, price, company FROM stocks WHERE stockid = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(DbError::NotFound)
    }

    async fn get_all(&self) -> Result<Vec<Stock>, DbError> {
        // No ORDER BY: row order is storage-defined.
        let stocks =
            sqlx::query_as::<_, Stock>("SELECT stockid, name, price, company FROM stocks")
                .fetch_all(&self.pool)
                .await?;
        Ok(stocks)
    }

    async fn update(&self, id: i64, input: &StockInput) -> Result<u64, DbError> {
        let result =
            sqlx::query("UPDATE stocks SET name = $1, price = $2, company = $3 WHERE stockid = $4")
                .bind(&input.name)
                .bind(input.price)
                .bind(&input.company)
                .bind(id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected())
    }

    async fn delete(&self, id: i64) -> Result<u64, DbError> {
        let result = sqlx::query("DELETE FROM stocks WHERE stockid = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
