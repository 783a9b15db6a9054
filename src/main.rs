mod config;
mod db;
mod dtos;
mod error;
mod handler;
mod middleware;
mod models;
mod routes;
mod storage;
mod tracing_config;
mod utils;

use axum::http::{
    HeaderValue, Method,
    header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
};
use config::Config;
use db::DBClient;
use dotenv::dotenv;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use storage::StorageClient;
use tower_http::cors::CorsLayer;

#[derive(Clone)]
pub struct AppState {
    pub env: Arc<Config>,
    pub db_client: DBClient,
    pub storage_client: StorageClient,
}

#[tokio::main]
async fn main() {
    let _guard = tracing_config::init_tracing();

    dotenv().ok();

    let config = Config::init();

    let pool = match PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
    {
        Ok(pool) => {
            println!("✅Connection to the database is successful!");
            pool
        }
        Err(err) => {
            println!("🔥 Failed to connect to the database: {:?}", err);
            std::process::exit(1);
        }
    };

    let cors = CorsLayer::new()
        .allow_origin(config.frontend_url.parse::<HeaderValue>().unwrap())
        .allow_headers([AUTHORIZATION, ACCEPT, CONTENT_TYPE])
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ]);

    let db_client = DBClient::new(pool);

    let storage_client = StorageClient::new(
        reqwest::Client::new(),
        config.storage_url.clone(),
        config.storage_service_key.clone(),
    );

    let app_state = AppState {
        env: Arc::new(config.clone()),
        db_client,
        storage_client,
    };

    let app = routes::create_router(app_state).layer(cors.clone());

    println!("🚀 Server is running on http://localhost:{}", config.port);

    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", &config.port))
        .await
        .unwrap();

    axum::serve(listener, app).await.unwrap();
}
