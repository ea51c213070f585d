//! Dashboard web server
//!
//! Serves the embedded UI, the REST API under `/api` and the alert relay on
//! `/ws`, and owns the background tasks feeding the relay.

use axum::{
    Router,
    extract::Path,
    http::{Method, StatusCode, header},
    response::IntoResponse,
    routing::get,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use super::api::create_api_router;
use super::assets::{APP_JS, INDEX_HTML, STYLES_CSS, serve_asset};
use super::websocket::{WebSocketHandler, create_websocket_route};
use crate::alerts::{AlertStream, NotificationSink};
use crate::client::ClientResult;
use crate::config::DashboardConfig;
use crate::state::AppState;

pub type ServerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// Client-side routes of the single-page UI
const PAGE_ROUTES: [&str; 6] = [
    "/",
    "/index.html",
    "/machines",
    "/dcp-configs",
    "/sensor-data",
    "/anomalies",
];

/// Dashboard server
pub struct DashboardServer {
    config: DashboardConfig,
    state: Arc<AppState>,
    ws_handler: Arc<WebSocketHandler>,
    alert_stream: Option<AlertStream>,
    shutdown: CancellationToken,
}

impl DashboardServer {
    /// Create a new dashboard server
    pub fn new(config: DashboardConfig) -> ClientResult<Self> {
        let state = Arc::new(AppState::from_config(&config)?);
        let ws_handler = Arc::new(WebSocketHandler::new());

        let alert_stream = if config.alerts.enabled {
            let sink: Arc<dyn NotificationSink> = ws_handler.clone();
            let stream = AlertStream::new(config.alert_stream_config(), sink)?
                .with_status(state.alert_status.clone());
            Some(stream)
        } else {
            info!("Live alerts disabled");
            None
        };

        Ok(Self {
            config,
            state,
            ws_handler,
            alert_stream,
            shutdown: CancellationToken::new(),
        })
    }

    pub fn state(&self) -> Arc<AppState> {
        self.state.clone()
    }

    pub fn ws_handler(&self) -> Arc<WebSocketHandler> {
        self.ws_handler.clone()
    }

    /// Cancelling this token stops the server and its background tasks.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Build the router
    pub fn build_router(&self) -> Router {
        let api_router = create_api_router(self.state.clone());
        let ws_route = create_websocket_route(self.ws_handler.clone());

        let mut router = PAGE_ROUTES
            .iter()
            .fold(Router::new(), |router, path| router.route(path, get(serve_index)))
            .route("/styles.css", get(serve_styles))
            .route("/app.js", get(serve_app_js))
            .route("/assets/{*path}", get(serve_static))
            .nest("/api", api_router)
            .route("/ws", ws_route);

        if self.config.enable_tracing {
            router = router.layer(TraceLayer::new_for_http());
        }

        if self.config.enable_cors {
            let cors = CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([
                    Method::GET,
                    Method::POST,
                    Method::PUT,
                    Method::DELETE,
                    Method::OPTIONS,
                ])
                .allow_headers(Any);
            router = router.layer(cors);
        }

        router
    }

    /// Start the alert stream and the heartbeat
    fn spawn_background_tasks(&mut self) -> Vec<JoinHandle<()>> {
        let mut tasks = vec![
            self.ws_handler
                .clone()
                .start_heartbeat(self.config.heartbeat_interval(), self.shutdown.child_token()),
        ];
        if let Some(stream) = self.alert_stream.take() {
            tasks.push(stream.spawn(self.shutdown.child_token()));
        }
        tasks
    }

    /// Start the server on the configured address
    pub async fn start(self) -> ServerResult {
        let addr = self.config.socket_addr();
        let listener = TcpListener::bind(addr).await?;
        self.serve(listener).await
    }

    /// Serve on an already bound listener until Ctrl-C or the shutdown token fires
    pub async fn serve(mut self, listener: TcpListener) -> ServerResult {
        info!("Building dashboard server...");
        let router = self.build_router();
        let tasks = self.spawn_background_tasks();

        let addr = listener.local_addr()?;
        info!("Starting dashboard server on {}", addr);
        info!("Dashboard URL: http://{}", addr);
        info!(
            "Upstream portal: {}, AI service: {}",
            self.state.portal.base_url(),
            self.state.ai.base_url()
        );

        let shutdown = self.shutdown.clone();
        axum::serve(listener, router)
            .with_graceful_shutdown(async move {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => info!("Shutdown signal received"),
                    _ = shutdown.cancelled() => {}
                }
                shutdown.cancel();
            })
            .await?;

        self.shutdown.cancel();
        for task in tasks {
            let _ = task.await;
        }
        info!("Dashboard server stopped");
        Ok(())
    }

    /// Start the server in background
    pub fn start_background(self) -> JoinHandle<ServerResult> {
        tokio::spawn(async move { self.start().await })
    }
}

/// Serve index.html for every page route
async fn serve_index() -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
        INDEX_HTML,
    )
}

async fn serve_styles() -> impl IntoResponse {
    (StatusCode::OK, [(header::CONTENT_TYPE, "text/css")], STYLES_CSS)
}

async fn serve_app_js() -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "application/javascript")],
        APP_JS,
    )
}

async fn serve_static(Path(path): Path<String>) -> impl IntoResponse {
    serve_asset(path).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    fn server() -> DashboardServer {
        DashboardServer::new(DashboardConfig::new().with_alerts(false)).unwrap()
    }

    #[tokio::test]
    async fn test_dashboard_server_new() {
        let server = server();
        assert!(server.alert_stream.is_none());
        assert_eq!(server.ws_handler().client_count().await, 0);

        let server = DashboardServer::new(DashboardConfig::new()).unwrap();
        assert!(server.alert_stream.is_some());
    }

    #[tokio::test]
    async fn test_page_routes_serve_index() {
        let router = server().build_router();
        for path in ["/", "/machines", "/anomalies"] {
            let response = router
                .clone()
                .oneshot(Request::builder().uri(path).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK, "{path}");
        }
    }

    #[tokio::test]
    async fn test_shutdown_token_stops_server() {
        let server = server();
        let token = server.shutdown_token();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let handle = tokio::spawn(server.serve(listener));

        token.cancel();
        let result = tokio::time::timeout(std::time::Duration::from_secs(5), handle)
            .await
            .expect("server did not stop")
            .unwrap();
        assert!(result.is_ok());
    }
}
