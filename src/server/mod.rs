//! HTTP surface
//!
//! Routes are grouped by concern: session handling in `auth`, widget and
//! settings endpoints in `dashboard`. `create_router` assembles them with the
//! shared middleware stack.

pub mod auth;
pub mod dashboard;
mod error;
pub mod middleware;

pub use error::{ApiError, ApiJson};

use axum::{
    middleware::from_fn,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{catch_panic::CatchPanicLayer, cors::CorsLayer, trace::TraceLayer};

use crate::cache::{SystemStatsCache, WeatherCache};
use crate::cli::Config;
use crate::store::Store;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub weather: Arc<WeatherCache>,
    pub stats: Arc<SystemStatsCache>,
    pub store: Store,
    pub config: Arc<Config>,
}

/// Builds the application router with all routes and layers
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(dashboard::health))
        .route("/", get(dashboard::dashboard))
        .route("/dashboard", get(dashboard::dashboard))
        .route("/api/login", post(auth::login))
        .route("/api/logout", post(auth::logout))
        .route("/api/widgets/weather", get(dashboard::weather_widget))
        .route("/api/widgets/system", get(dashboard::system_widget))
        .route("/api/widgets/uptime", get(dashboard::uptime_widget))
        .route("/api/widgets/save", post(dashboard::save_widget_data))
        .route("/api/widgets/data", get(dashboard::get_widget_data))
        .route(
            "/api/settings",
            get(dashboard::get_setting).post(dashboard::save_setting),
        )
        .layer(from_fn(middleware::check_auth))
        .layer(CatchPanicLayer::new())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
