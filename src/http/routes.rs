//! REST endpoints: liveness probe and read-only socket fetch.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router, middleware};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, error};

use super::auth::require_bearer;
use crate::socket::{SocketStore, sanitize_id};

/// Shared state for socket routes.
#[derive(Clone)]
pub struct SocketRouteState {
    pub store: SocketStore,
}

/// Build the socket routes under the configured prefix.
///
/// `GET /{prefix}/get/{id}` sits behind the bearer guard when an auth token
/// is configured; `GET /{prefix}/alive` never does.
pub fn socket_routes(store: SocketStore) -> Router {
    let config = store.config();
    let prefix = config.route_prefix.trim_matches('/').to_string();

    let mut read = Router::new().route("/get/{id}", get(get_socket));
    if let Some(token) = config.auth_token.clone() {
        read = read.route_layer(middleware::from_fn_with_state(
            Arc::<str>::from(token),
            require_bearer,
        ));
    }

    let api = Router::new()
        .route("/alive", get(alive))
        .merge(read)
        .with_state(SocketRouteState { store });

    let app = if prefix.is_empty() {
        api
    } else {
        Router::new().nest(&format!("/{prefix}"), api)
    };

    app.layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// GET /{prefix}/alive
async fn alive(State(state): State<SocketRouteState>) -> impl IntoResponse {
    let config = state.store.config();
    Json(serde_json::json!({
        "package": {
            "name": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
        },
        "env": config.environment,
        "serverDateTime": config.time_zone.now().to_rfc3339(),
    }))
}

/// GET /{prefix}/get/{id}
///
/// The persisted document, or 404 with an empty body.
async fn get_socket(State(state): State<SocketRouteState>, Path(id): Path<String>) -> Response {
    let id = sanitize_id(&id);
    let store = state.store.clone();
    let lookup_id = id.clone();
    let loaded = tokio::task::spawn_blocking(move || store.create_from_id(&lookup_id)).await;

    match loaded {
        Ok(Ok(Some(socket))) => Json(socket.document()).into_response(),
        Ok(Ok(None)) => {
            debug!(id = %id, "Socket not found");
            StatusCode::NOT_FOUND.into_response()
        }
        Ok(Err(e)) => {
            error!(id = %id, error = %e, "Failed to load socket");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
        Err(e) => {
            error!(id = %id, error = %e, "Socket load task failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
