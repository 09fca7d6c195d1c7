// src/api.rs
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use log::{error, info};
use serde::Serialize;
use serde_json::json;
use tokio::time::timeout;
use warp::http::StatusCode;
use warp::{Filter, Rejection, Reply};

use crate::db::{DbError, StockStore};
use crate::error::{handle_rejection, ApiError};
use crate::models::StockInput;

/// The one response shape every endpoint uses:
/// `{ok: true, data}` on success, `{ok: false, error, code}` on failure.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<&'static str>,
}

impl<T> Envelope<T> {
    pub fn success(data: T) -> Self {
        Envelope {
            ok: true,
            data: Some(data),
            error: None,
            code: None,
        }
    }
}

impl Envelope<()> {
    pub fn failure(code: &'static str, error: impl Into<String>) -> Self {
        Envelope {
            ok: false,
            data: None,
            error: Some(error.into()),
            code: Some(code),
        }
    }
}

pub fn routes(
    store: Arc<dyn StockStore>,
    query_timeout: Duration,
) -> impl Filter<Extract = impl Reply, Error = std::convert::Infallible> + Clone {
    let create = warp::path!("stock")
        .and(warp::post())
        .and(with_store(store.clone()))
        .and(with_timeout(query_timeout))
        .and(warp::body::json())
        .and_then(create_stock_handler);

    let get_one = warp::path!("stock" / String)
        .and(warp::get())
        .and(with_store(store.clone()))
        .and(with_timeout(query_timeout))
        .and_then(get_stock_handler);

    let get_all = warp::path!("stock")
        .and(warp::get())
        .and(with_store(store.clone()))
        .and(with_timeout(query_timeout))
        .and_then(get_all_stocks_handler);

    let update = warp::path!("stock" / String)
        .and(warp::put())
        .and(with_store(store.clone()))
        .and(with_timeout(query_timeout))
        .and(warp::body::json())
        .and_then(update_stock_handler);

    let delete = warp::path!("stock" / String)
        .and(warp::delete())
        .and(with_store(store.clone()))
        .and(with_timeout(query_timeout))
        .and_then(delete_stock_handler);

    create
        .or(get_one)
        .or(get_all)
        .or(update)
        .or(delete)
        .recover(handle_rejection)
}

fn with_store(
    store: Arc<dyn StockStore>,
) -> impl Filter<Extract = (Arc<dyn StockStore>,), Error = std::convert::Infallible> + Clone {
    warp::any().map(move || store.clone())
}

fn with_timeout(
    query_timeout: Duration,
) -> impl Filter<Extract = (Duration,), Error = std::convert::Infallible> + Clone {
    warp::any().map(move || query_timeout)
}

/// Ids arrive as raw path segments so a malformed one becomes a 400 instead
/// of an unmatched route.
fn parse_stock_id(raw: &str) -> Result<i64, Rejection> {
    raw.parse::<i64>()
        .map_err(|_| warp::reject::custom(ApiError::InvalidId(raw.to_string())))
}

/// Runs one storage call under the configured deadline and lifts its errors
/// into rejections.
async fn run_query<T>(
    deadline: Duration,
    fut: impl Future<Output = Result<T, DbError>>,
) -> Result<T, Rejection> {
    match timeout(deadline, fut).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(DbError::NotFound)) => Err(warp::reject::custom(ApiError::NotFound)),
        Ok(Err(DbError::Query(e))) => {
            error!("Query failed: {}", e);
            Err(warp::reject::custom(ApiError::Storage(e)))
        }
        Err(_) => {
            error!("Query exceeded the {:?} deadline", deadline);
            Err(warp::reject::custom(ApiError::Timeout))
        }
    }
}

async fn create_stock_handler(
    store: Arc<dyn StockStore>,
    deadline: Duration,
    input: StockInput,
) -> Result<impl Reply, Rejection> {
    let id = run_query(deadline, store.insert(&input)).await?;
    info!("Stock {} created", id);
    Ok(warp::reply::with_status(
        warp::reply::json(&Envelope::success(json!({ "id": id }))),
        StatusCode::CREATED,
    ))
}

async fn get_stock_handler(
    raw_id: String,
    store: Arc<dyn StockStore>,
    deadline: Duration,
) -> Result<impl Reply, Rejection> {
    let id = parse_stock_id(&raw_id)?;
    let stock = run_query(deadline, store.get(id)).await?;
    Ok(warp::reply::json(&Envelope::success(stock)))
}

async fn get_all_stocks_handler(
    store: Arc<dyn StockStore>,
    deadline: Duration,
) -> Result<impl Reply, Rejection> {
    // An empty table is an empty array, not an error.
    let stocks = run_query(deadline, store.get_all()).await?;
    Ok(warp::reply::json(&Envelope::success(stocks)))
}

async fn update_stock_handler(
    raw_id: String,
    store: Arc<dyn StockStore>,
    deadline: Duration,
    input: StockInput,
) -> Result<impl Reply, Rejection> {
    let id = parse_stock_id(&raw_id)?;
    let rows_affected = run_query(deadline, store.update(id, &input)).await?;
    info!("Stock {} updated, {} row(s) affected", id, rows_affected);
    Ok(warp::reply::json(&Envelope::success(json!({
        "id": id,
        "rows_affected": rows_affected,
    }))))
}

async fn delete_stock_handler(
    raw_id: String,
    store: Arc<dyn StockStore>,
    deadline: Duration,
) -> Result<impl Reply, Rejection> {
    let id = parse_stock_id(&raw_id)?;
    let rows_affected = run_query(deadline, store.delete(id)).await?;
    info!("Stock {} deleted, {} row(s) affected", id, rows_affected);
    Ok(warp::reply::json(&Envelope::success(json!({
        "id": id,
        "rows_affected": rows_affected,
    }))))
}
