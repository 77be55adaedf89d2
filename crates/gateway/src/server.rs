use std::{future::Future, net::SocketAddr};

use {
    axum::{
        Router,
        http::{Method, StatusCode},
        response::IntoResponse,
        routing::{MethodRouter, get},
    },
    tokio::net::TcpListener,
    tower_http::trace::TraceLayer,
    tracing::info,
};

use crate::{state::AppState, webhook::webhook_handler};

pub const LIVENESS_TEXT: &str = "hourbell is running";

// ── Router ───────────────────────────────────────────────────────────────────

/// Build the HTTP router (shared between production startup and tests).
///
/// `GET` on any path is a liveness probe. `POST /` and `POST /webhook` are
/// webhook intake. Everything else is 404.
pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/", intake())
        .route("/webhook", intake())
        .fallback(fallback_handler)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn intake() -> MethodRouter<AppState> {
    get(liveness_handler)
        .post(webhook_handler)
        .fallback(not_found)
}

/// Bind `addr` and serve `app` until `shutdown` resolves.
pub async fn serve(
    addr: SocketAddr,
    app: Router,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

// ── Handlers ─────────────────────────────────────────────────────────────────

async fn liveness_handler() -> &'static str {
    LIVENESS_TEXT
}

async fn fallback_handler(method: Method) -> impl IntoResponse {
    if method == Method::GET || method == Method::HEAD {
        (StatusCode::OK, LIVENESS_TEXT)
    } else {
        (StatusCode::NOT_FOUND, "not found")
    }
}

async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "not found")
}
