// src/models.rs
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One row of the `stocks` table. The `id` is generated by the database on
/// insert and never supplied by clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Stock {
    #[sqlx(rename = "stockid")]
    pub id: i64,
    pub name: String,
    pub price: f64,
    pub company: String,
}

/// Request body for create and update. Any `id` field in the body is ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockInput {
    pub name: String,
    pub price: f64,
    pub company: String,
}
