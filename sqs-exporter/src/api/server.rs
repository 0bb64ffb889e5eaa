//! API server setup and configuration.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::extract::Request;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::Span;

use crate::api::routes::{self, HEALTH_PATH};
use crate::error::{Error, Result};
use crate::metrics::{MetricStore, PrometheusExporter};

/// API server configuration.
#[derive(Debug, Clone)]
pub struct ApiServerConfig {
    /// Server bind address
    pub bind_address: String,
    /// Server port
    pub port: u16,
}

impl Default for ApiServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: crate::config::DEFAULT_PORT,
        }
    }
}

impl From<&crate::config::ExporterConfig> for ApiServerConfig {
    fn from(config: &crate::config::ExporterConfig) -> Self {
        Self {
            bind_address: config.bind_address.clone(),
            port: config.port,
        }
    }
}

/// Shared state for request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Renders the metric store for scrapes.
    pub exporter: Arc<PrometheusExporter>,
}

impl AppState {
    /// Create state serving `store`.
    pub fn new(store: Arc<MetricStore>) -> Self {
        Self {
            exporter: Arc::new(PrometheusExporter::new(store)),
        }
    }
}

/// API server.
pub struct ApiServer {
    config: ApiServerConfig,
    state: AppState,
    cancel_token: CancellationToken,
}

impl ApiServer {
    /// Create a new API server.
    pub fn new(config: ApiServerConfig, state: AppState) -> Self {
        Self::with_cancel_token(config, state, CancellationToken::new())
    }

    /// Create a server that shuts down when `cancel_token` is cancelled.
    pub fn with_cancel_token(
        config: ApiServerConfig,
        state: AppState,
        cancel_token: CancellationToken,
    ) -> Self {
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
                    if req.uri().path() == HEALTH_PATH {
                        Span::none()
                    } else {
                        let mut make_span =
                            tower_http::trace::DefaultMakeSpan::new().level(tracing::Level::DEBUG);
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
                            tower_http::trace::DefaultOnResponse::new().level(tracing::Level::DEBUG);
                        use tower_http::trace::OnResponse;
                        on_response.on_response(res, latency, span);
                    },
                ),
        )
    }

    /// Socket address to listen on. Accepts IPv4 and IPv6 bind addresses.
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        let ip: IpAddr = self.config.bind_address.trim().parse().map_err(|e| {
            Error::ApiError(format!(
                "Invalid bind address {:?}: {}",
                self.config.bind_address, e
            ))
        })?;

        Ok(SocketAddr::new(ip, self.config.port))
    }

    /// Bind the listener.
    ///
    /// Fails on an invalid address or if the port cannot be bound.
    pub async fn bind(&self) -> Result<TcpListener> {
        let addr = self.socket_addr()?;

        TcpListener::bind(addr)
            .await
            .map_err(|e| Error::ApiError(format!("Could not start http listener on {}: {}", addr, e)))
    }

    /// Serve on an already bound listener until cancelled.
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        let router = self.build_router();

        if let Ok(addr) = listener.local_addr() {
            tracing::info!("API server listening on http://{}", addr);
        }

        let cancel_token = self.cancel_token.clone();

        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                cancel_token.cancelled().await;
                tracing::info!("API server shutting down...");
            })
            .await
            .map_err(|e| Error::ApiError(format!("Server error: {}", e)))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use tower::ServiceExt;

    use super::*;
    use crate::queue::MetricKind;

    fn server(store: Arc<MetricStore>) -> ApiServer {
        ApiServer::new(ApiServerConfig::default(), AppState::new(store))
    }

    #[test]
    fn test_config_defaults() {
        let config = ApiServerConfig::default();
        assert_eq!(config.bind_address, "0.0.0.0");
        assert_eq!(config.port, 8080);
    }

    #[test]
    fn test_socket_addr() {
        let with_address = |bind_address: &str| {
            ApiServer::new(
                ApiServerConfig {
                    bind_address: bind_address.to_string(),
                    port: 9100,
                },
                AppState::new(Arc::new(MetricStore::new())),
            )
            .socket_addr()
        };

        assert_eq!(with_address("0.0.0.0").unwrap().to_string(), "0.0.0.0:9100");
        assert_eq!(with_address("127.0.0.1").unwrap().to_string(), "127.0.0.1:9100");
        assert_eq!(with_address("::").unwrap().to_string(), "[::]:9100");
        assert_eq!(with_address("::1").unwrap().to_string(), "[::1]:9100");
        assert!(matches!(with_address("localhost:80"), Err(Error::ApiError(_))));
    }

    #[tokio::test]
    async fn test_serve_stops_on_cancel() {
        let store = Arc::new(MetricStore::new());
        let config = ApiServerConfig {
            bind_address: "127.0.0.1".to_string(),
            port: 0,
        };
        let server = ApiServer::new(config, AppState::new(store));
        let token = server.cancel_token();
        assert!(!token.is_cancelled());

        let listener = server.bind().await.unwrap();
        let serving = tokio::spawn(async move { server.serve(listener).await });

        token.cancel();
        let served = tokio::time::timeout(Duration::from_secs(5), serving)
            .await
            .unwrap()
            .unwrap();
        assert!(served.is_ok());
    }

    #[tokio::test]
    async fn test_healthcheck_returns_empty_ok() {
        let router = server(Arc::new(MetricStore::new())).build_router();

        let response = router
            .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert!(body.is_empty());
    }

    #[tokio::test]
    async fn test_metrics_endpoint() {
        let store = Arc::new(MetricStore::new());
        store.set(MetricKind::Available, "TestQueue", 10.0);
        let router = server(store).build_router();

        let response = router
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/plain; version=0.0.4; charset=utf-8"
        );
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = String::from_utf8(body.to_vec()).unwrap();
        assert!(body.contains("sqs_approximatenumberofmessages{queue=\"TestQueue\"} 10"));
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let router = server(Arc::new(MetricStore::new())).build_router();

        let response = router
            .oneshot(Request::builder().uri("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_invalid_bind_address() {
        let config = ApiServerConfig {
            bind_address: "not an address".to_string(),
            port: 0,
        };
        let server = ApiServer::new(config, AppState::new(Arc::new(MetricStore::new())));

        assert!(matches!(server.bind().await, Err(Error::ApiError(_))));
    }
}
