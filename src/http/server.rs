//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router with the chat and health handlers
//! - Wire up middleware (request ID, access log, CORS, limits, rate limit)
//! - Apply hot-reloaded settings
//! - Serve plain HTTP or TLS until the shutdown signal

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use axum_server::tls_rustls::RustlsConfig;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};

use crate::config::RelayConfig;
use crate::http::chat::chat_handler;
use crate::http::health::{health_handler, not_found};
use crate::http::request::{propagate_request_id_layer, set_request_id_layer};
use crate::observability::logging::access_log_layer;
use crate::security::cors::{cors_layer, origin_guard, OriginPolicy};
use crate::security::headers::security_headers;
use crate::security::limits::{body_limit_layer, declared_length_guard, disable_default_limit, request_deadline};
use crate::security::rate_limit::{rate_limit_middleware, RateLimiterState};
use crate::upstream::{UpstreamClient, UpstreamError};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Live configuration; swapped on reload.
    pub config: Arc<ArcSwap<RelayConfig>>,
    pub upstream: UpstreamClient,
}

/// HTTP server for the relay.
pub struct HttpServer {
    router: Router,
    config: Arc<ArcSwap<RelayConfig>>,
    rate_limiter: Option<Arc<RateLimiterState>>,
    tls: Option<RustlsConfig>,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    ///
    /// The config is expected to be validated already.
    pub fn new(config: RelayConfig) -> Result<Self, UpstreamError> {
        let upstream = UpstreamClient::new(&config.upstream)?;
        let rate_limiter = config
            .rate_limit
            .enabled
            .then(|| Arc::new(RateLimiterState::new(&config.rate_limit)));

        let live = Arc::new(ArcSwap::from_pointee(config.clone()));
        let state = AppState {
            config: live.clone(),
            upstream,
        };

        let router = Self::build_router(&config, state, rate_limiter.clone());
        Ok(Self {
            router,
            config: live,
            rate_limiter,
            tls: None,
        })
    }

    /// Serve over TLS instead of plain HTTP.
    pub fn with_tls(mut self, tls: RustlsConfig) -> Self {
        self.tls = Some(tls);
        self
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(
        config: &RelayConfig,
        state: AppState,
        rate_limiter: Option<Arc<RateLimiterState>>,
    ) -> Router {
        let mut router: Router<AppState> = Router::new().route("/api/chat", post(chat_handler));
        // route_layer only covers routes added so far: /health stays unlimited.
        if let Some(limiter) = rate_limiter {
            router = router.route_layer(middleware::from_fn_with_state(limiter, rate_limit_middleware));
        }

        let origin_policy = Arc::new(OriginPolicy::from_config(&config.cors));

        router
            .route("/health", get(health_handler))
            .fallback(not_found)
            .with_state(state)
            .layer(disable_default_limit())
            .layer(body_limit_layer(&config.limits))
            .layer(middleware::from_fn_with_state(
                config.limits.max_body_bytes,
                declared_length_guard,
            ))
            .layer(middleware::from_fn_with_state(origin_policy, origin_guard))
            .layer(cors_layer(&config.cors))
            .layer(security_headers())
            .layer(middleware::from_fn_with_state(
                Duration::from_secs(config.timeouts.request_secs),
                request_deadline,
            ))
            .layer(propagate_request_id_layer())
            .layer(access_log_layer())
            .layer(set_request_id_layer())
    }

    /// The fully layered router, for driving the relay without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Current live configuration.
    pub fn config(&self) -> Arc<RelayConfig> {
        self.config.load_full()
    }

    /// Run the server, accepting connections on the given listener.
    ///
    /// `config_updates` carries reloaded configs; `shutdown` stops the
    /// server gracefully along with its background tasks.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<RelayConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            tls = self.tls.is_some(),
            "HTTP server starting"
        );

        let live = self.config.clone();
        let mut reload_shutdown = shutdown.resubscribe();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    update = config_updates.recv() => match update {
                        Some(new_config) => apply_config_update(&live, new_config),
                        None => break,
                    },
                    _ = reload_shutdown.recv() => break,
                }
            }
        });

        if let Some(limiter) = self.rate_limiter.clone() {
            spawn_purge_task(limiter, shutdown.resubscribe());
        }

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        match self.tls {
            Some(tls) => {
                let handle = axum_server::Handle::new();
                let shutdown_handle = handle.clone();
                tokio::spawn(async move {
                    let _ = shutdown.recv().await;
                    tracing::info!("Shutdown signal received");
                    shutdown_handle.graceful_shutdown(Some(Duration::from_secs(10)));
                });
                axum_server::from_tcp_rustls(listener.into_std()?, tls)
                    .handle(handle)
                    .serve(app)
                    .await?;
            }
            None => {
                axum::serve(listener, app)
                    .with_graceful_shutdown(async move {
                        let _ = shutdown.recv().await;
                        tracing::info!("Shutdown signal received");
                    })
                    .await?;
            }
        }

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Swap in the per-request settings of a reloaded config.
///
/// Listener, CORS, rate limit, timeout and body size settings are baked
/// into the router and only change on restart.
pub fn apply_config_update(live: &ArcSwap<RelayConfig>, new_config: RelayConfig) {
    let current = live.load_full();

    if current.listener != new_config.listener
        || current.cors != new_config.cors
        || current.rate_limit != new_config.rate_limit
        || current.timeouts != new_config.timeouts
        || current.observability != new_config.observability
        || current.limits.max_body_bytes != new_config.limits.max_body_bytes
    {
        tracing::warn!("Listener, CORS, rate limit, timeout, logging and body size changes require a restart");
    }

    let mut merged = (*current).clone();
    merged.upstream = new_config.upstream;
    merged.prompt = new_config.prompt;
    merged.limits = new_config.limits;
    merged.limits.max_body_bytes = current.limits.max_body_bytes;

    // The request deadline is fixed at startup; the upstream call must end first.
    let ceiling = current.timeouts.request_secs.saturating_sub(1).max(1);
    if merged.upstream.timeout_secs > ceiling {
        tracing::warn!(
            upstream_timeout_secs = merged.upstream.timeout_secs,
            request_secs = current.timeouts.request_secs,
            "Upstream timeout exceeds the request deadline, clamping"
        );
        merged.upstream.timeout_secs = ceiling;
    }

    tracing::info!(
        default_model = %merged.upstream.default_model,
        allowed_models = merged.upstream.allowed_models.len(),
        "Configuration reloaded"
    );
    live.store(Arc::new(merged));
}

/// Periodically drop expired rate limit windows.
fn spawn_purge_task(limiter: Arc<RateLimiterState>, mut shutdown: broadcast::Receiver<()>) {
    let period = limiter.limiter().window();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let removed = limiter.limiter().purge_expired(Instant::now());
                    if removed > 0 {
                        tracing::debug!(
                            removed,
                            tracked = limiter.limiter().tracked_clients(),
                            "Purged expired rate limit windows"
                        );
                    }
                }
                _ = shutdown.recv() => break,
            }
        }
    });
}
