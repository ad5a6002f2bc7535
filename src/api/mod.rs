//! REST surface of the admin service.
//!
//! # Responsibilities
//! - Map every `/api/...` path to its handler
//! - Guard everything except `/api/health` with the API key middleware

pub mod auth;
pub mod handlers;

use axum::{
    middleware,
    routing::{delete, get, post},
    Router,
};

use self::auth::api_auth_middleware;
use self::handlers::{backups, config, nginx, servers};
use crate::http::server::AppState;

pub fn setup_api_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/api/config", get(config::get_config).put(config::put_config))
        .route("/api/config/test", post(config::test_config))
        .route("/api/config/reload", post(config::reload_config))
        .route("/api/nginx/status", get(nginx::status))
        .route("/api/nginx/start", post(nginx::start))
        .route("/api/nginx/stop", post(nginx::stop))
        .route("/api/nginx/restart", post(nginx::restart))
        .route(
            "/api/servers",
            get(servers::list_servers).post(servers::create_server),
        )
        .route(
            "/api/servers/{name}",
            get(servers::get_server)
                .put(servers::put_server)
                .patch(servers::rename_server)
                .delete(servers::delete_server),
        )
        .route(
            "/api/backups",
            get(backups::list_backups).post(backups::create_backup),
        )
        .route("/api/backups/{name}/restore", post(backups::restore_backup))
        .route("/api/backups/{name}", delete(backups::delete_backup))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            api_auth_middleware,
        ))
        .with_state(state);

    Router::new()
        .route("/api/health", get(handlers::health))
        .merge(protected)
}
