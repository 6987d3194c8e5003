pub mod config;
pub mod error;
pub mod forwarding;
pub mod logging;
pub mod models;

use axum::{extract::DefaultBodyLimit, routing::get, Router};
use config::Config;
use forwarding::relay_handler;
use std::sync::Arc;
use std::time::Duration;

/// Settings shared by every invocation. Holds no client: each relay builds
/// its own and drops it when the request is done.
#[derive(Debug, Default, Clone)]
pub struct AppState {
    pub upstream_timeout: Option<Duration>,
}

impl AppState {
    pub fn from_config(config: &Config) -> Self {
        Self {
            upstream_timeout: config.upstream_timeout,
        }
    }

    pub fn http_client(&self) -> reqwest::Result<reqwest::Client> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = self.upstream_timeout {
            builder = builder.timeout(timeout);
        }
        builder.build()
    }
}

pub fn app(config: &Config) -> Router {
    let app_state = Arc::new(AppState::from_config(config));

    Router::new()
        .route("/", get(relay_handler).post(relay_handler))
        .route("/*path", get(relay_handler).post(relay_handler))
        // Bodies are relayed whole, whatever their size.
        .layer(DefaultBodyLimit::disable())
        .with_state(app_state)
}
