//! API server setup and configuration.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::Router;
use axum::extract::Request;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::Span;

use crate::api::routes;
use crate::database::KvStore;
use crate::error::{Error, Result};

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiServerConfig {
    /// Server bind address (`host:port`)
    pub listen_addr: String,
}

impl Default for ApiServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:36655".to_string(),
        }
    }
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Server start time for uptime calculation
    pub start_time: Instant,
    /// Store holding the latest cycle summary
    pub store: Arc<dyn KvStore>,
}

impl AppState {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self {
            start_time: Instant::now(),
            store,
        }
    }
}

/// Status API server.
pub struct ApiServer {
    config: ApiServerConfig,
    state: AppState,
    cancel_token: CancellationToken,
}

impl ApiServer {
    /// Create a server that stops when `cancel_token` fires.
    pub fn new(config: ApiServerConfig, state: AppState, cancel_token: CancellationToken) -> Self {
        Self {
            config,
            state,
            cancel_token,
        }
    }

    /// Get the cancellation token for graceful shutdown.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    /// Build the router with all middleware and routes.
    pub fn build_router(&self) -> Router {
        routes::create_router(self.state.clone()).layer(
            TraceLayer::new_for_http()
                .make_span_with(|req: &Request| {
                    if req.uri().path().starts_with("/health") {
                        Span::none()
                    } else {
                        let mut make_span =
                            tower_http::trace::DefaultMakeSpan::new().level(tracing::Level::INFO);
                        use tower_http::trace::MakeSpan;
                        make_span.make_span(req)
                    }
                })
                .on_response(
                    |res: &axum::http::Response<_>, latency: Duration, span: &Span| {
                        if span.is_disabled() {
                            return;
                        }
                        let on_response =
                            tower_http::trace::DefaultOnResponse::new().level(tracing::Level::INFO);
                        use tower_http::trace::OnResponse;
                        on_response.on_response(res, latency, span);
                    },
                ),
        )
    }

    /// Bind the configured address.
    pub async fn bind(&self) -> Result<TcpListener> {
        let addr: SocketAddr = self
            .config
            .listen_addr
            .parse()
            .map_err(|e| Error::config(format!("invalid listen address: {}", e)))?;
        Ok(TcpListener::bind(addr).await?)
    }

    /// Serve on an already bound listener until cancelled.
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        let router = self.build_router();
        if let Ok(addr) = listener.local_addr() {
            tracing::info!("Status server listening on http://{}", addr);
        }

        let cancel_token = self.cancel_token.clone();
        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                cancel_token.cancelled().await;
                tracing::info!("Status server shutting down...");
            })
            .await?;

        Ok(())
    }
}
