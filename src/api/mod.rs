//! HTTP surface of the cocoa sales service

pub mod error;
pub mod handlers;

pub use error::ApiError;

use crate::contract::SalesContract;
use actix_web::{http::Method, middleware, web, App, HttpServer};
use std::sync::Arc;
use tracing::info;

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    pub contract: Arc<dyn SalesContract>,
}

impl AppState {
    pub fn new(contract: Arc<dyn SalesContract>) -> Self {
        AppState { contract }
    }
}

/// Malformed JSON bodies get the same `{ "error": ... }` shape as every other failure.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .error_handler(|err, _req| ApiError::BadRequest(format!("Invalid JSON body: {}", err)).into())
}

pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(|err, _req| {
        ApiError::BadRequest(format!("Invalid query string: {}", err)).into()
    })
}

pub fn path_config() -> web::PathConfig {
    web::PathConfig::default()
        .error_handler(|err, _req| ApiError::BadRequest(format!("Invalid path: {}", err)).into())
}

pub fn cors_headers() -> middleware::DefaultHeaders {
    middleware::DefaultHeaders::new()
        .add(("Access-Control-Allow-Origin", "*"))
        .add(("Access-Control-Allow-Methods", "GET, POST, OPTIONS"))
        .add(("Access-Control-Allow-Headers", "Content-Type"))
}

/// Registers every route; shared by the server and the tests.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .app_data(query_config())
        .app_data(path_config())
        .route("/", web::get().to(handlers::index))
        .route("/register", web::post().to(handlers::register))
        .route("/sale", web::post().to(handlers::record_sale))
        .route("/sale", web::get().to(handlers::sale_usage))
        .route("/sales", web::get().to(handlers::list_sales))
        .route("/seller/{seller_id}", web::get().to(handlers::seller))
        .route("/sales-summary", web::get().to(handlers::sales_summary))
        .route("/blockchain", web::get().to(handlers::blockchain))
        .route("/mine", web::get().to(handlers::mine))
        .route("/blocks", web::get().to(handlers::blocks))
        .route("/verify", web::get().to(handlers::verify))
        .route("/health", web::get().to(handlers::health))
        .route(
            "/{tail:.*}",
            web::method(Method::OPTIONS).to(handlers::preflight),
        );
}

pub async fn start_server(
    bind_addr: &str,
    port: u16,
    contract: Arc<dyn SalesContract>,
) -> std::io::Result<()> {
    let state = web::Data::new(AppState::new(contract));

    info!(bind_addr, port, "Starting HTTP server");

    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(cors_headers())
            .configure(configure)
    })
    .bind((bind_addr, port))?
    .run()
    .await
}
