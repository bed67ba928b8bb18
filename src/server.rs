//! The REST API.
//!
//! Reads are open; writes require a bearer token belonging to an admin.
//! Journey bodies are decoded leniently and validated before anything is
//! stored, so a 400 always carries the full list of field errors.

mod error;
mod handlers;

use std::{io, sync::Arc};

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use tokio::net::TcpListener;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

use crate::storage::Storage;

pub use error::{ApiError, ErrorBody};

/// Shared handler state.
#[derive(Clone)]
pub struct AppState {
    storage: Arc<Storage>,
}

impl AppState {
    /// Runs a storage call on the blocking pool.
    async fn run<T, E, F>(&self, f: F) -> Result<T, ApiError>
    where
        F: FnOnce(&Storage) -> Result<T, E> + Send + 'static,
        T: Send + 'static,
        E: Into<ApiError> + Send + 'static,
    {
        let storage = Arc::clone(&self.storage);
        tokio::task::spawn_blocking(move || f(&storage))
            .await
            .map_err(|e| ApiError::Internal(format!("storage task failed: {e}")))?
            .map_err(Into::into)
    }
}

/// Builds the API router over `storage`.
pub fn router(storage: Storage, max_upload_bytes: usize) -> Router {
    let state = AppState {
        storage: Arc::new(storage),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/health", get(handlers::health))
        .route("/api/auth/login", post(handlers::login))
        .route("/api/auth/logout", post(handlers::logout))
        .route("/api/auth/me", get(handlers::me))
        .route(
            "/api/reports",
            get(handlers::list_reports).post(handlers::create_report),
        )
        .route(
            "/api/reports/:id",
            get(handlers::get_report)
                .put(handlers::update_report)
                .delete(handlers::delete_report),
        )
        .route(
            "/api/uploads",
            post(handlers::upload).layer(DefaultBodyLimit::max(max_upload_bytes)),
        )
        .route("/api/assets/:digest", get(handlers::get_asset))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Binds `addr` and serves until the process is stopped.
pub async fn serve(storage: Storage, addr: &str, max_upload_bytes: usize) -> io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, root = %storage.root().display(), "server listening");
    axum::serve(listener, router(storage, max_upload_bytes)).await
}
