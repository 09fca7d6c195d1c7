// src/main.rs
use std::sync::Arc;

use env_logger::Builder;
use log::{error, info, LevelFilter};

use stock_api::api;
use stock_api::config::Config;
use stock_api::db::{self, PgStockStore, StockStore};

#[tokio::main]
async fn main() {
    Builder::new()
        .filter_level(LevelFilter::Info)
        .parse_default_env()
        .format_timestamp_secs()
        .init();

    let config = Config::from_env();

    let pool = match db::connect(&config).await {
        Ok(pool) => pool,
        Err(e) => {
            error!("Failed to connect to the database: {}", e);
            return;
        }
    };

    if let Err(e) = db::ensure_schema(&pool).await {
        error!("Failed to prepare the stocks table: {}", e);
        return;
    }
    info!("Connected to database...");

    let store: Arc<dyn StockStore> = Arc::new(PgStockStore::new(pool));
    let routes = api::routes(store, config.query_timeout);

    info!("Server running on http://0.0.0.0:{}", config.server_port);
    warp::serve(routes)
        .run(([0, 0, 0, 0], config.server_port))
        .await;
}
