//! # kasir-api: HTTP Surface for Kasir POS
//!
//! JSON over HTTP for catalog management, checkout, and daily reports.
//!
//! ## Routes
//! ```text
//! GET    /health
//! GET    /categories            POST /categories
//! GET    /categories/{id}       PUT  /categories/{id}    DELETE /categories/{id}
//! GET    /products?name=        POST /products
//! GET    /products/{id}         PUT  /products/{id}      DELETE /products/{id}
//! POST   /transactions          GET  /transactions/{id}
//! GET    /report/today          GET  /report?date=YYYY-MM-DD
//! ```

pub mod config;
pub mod error;
pub mod routes;

use axum::routing::get;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use config::{AppConfig, ConfigError};
pub use error::{ApiError, ErrorCode};
pub use routes::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(routes::health::check))
        .route(
            "/categories",
            get(routes::categories::list).post(routes::categories::create),
        )
        .route(
            "/categories/{id}",
            get(routes::categories::get)
                .put(routes::categories::update)
                .delete(routes::categories::delete),
        )
        .route(
            "/products",
            get(routes::products::list).post(routes::products::create),
        )
        .route(
            "/products/{id}",
            get(routes::products::get)
                .put(routes::products::update)
                .delete(routes::products::delete),
        )
        .route(
            "/transactions",
            axum::routing::post(routes::transactions::checkout),
        )
        .route("/transactions/{id}", get(routes::transactions::get))
        .route("/report/today", get(routes::report::today))
        .route("/report", get(routes::report::by_date))
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
