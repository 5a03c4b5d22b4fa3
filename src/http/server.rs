//! HTTP server setup and the request dispatcher.
//!
//! # Responsibilities
//! - Build the Axum router with the catch-all proxy handler
//! - Extract the (name, version) identity and strip it from the path
//! - Classify requests: protocol upgrade → tunnel, otherwise HTTP forward
//! - Forward ordinary HTTP through a pooled hyper client whose connector
//!   resolves the sentinel authority via the balancer
//! - Map balancer and extraction failures to client-visible statuses

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::{Request, Response, StatusCode, Uri},
    response::IntoResponse,
    routing::any,
    Router,
};
use hyper_util::{client::legacy::Client, rt::TokioExecutor};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::balancer::{Balancer, RandomBalancer};
use crate::config::ProxyConfig;
use crate::http::connector::BalancedConnector;
use crate::http::extract::{IdentityExtractor, PathExtractor};
use crate::http::sentinel;
use crate::registry::{Registry, ServiceIdentity};
use crate::tunnel;

/// A boxed response future, the unit the decorator wraps.
pub type ResponseFuture = Pin<Box<dyn Future<Output = Response<Body>> + Send>>;

/// Optional per-request hook receiving the resolved identity and the
/// forwarding future; used for cross-cutting concerns (metrics, audit
/// logging) without coupling the dispatcher to them.
pub type Decorator = Arc<dyn Fn(&ServiceIdentity, ResponseFuture) -> ResponseFuture + Send + Sync>;

/// Application state injected into the proxy handler.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<dyn Registry>,
    pub balancer: Arc<dyn Balancer>,
    pub extractor: Arc<dyn IdentityExtractor>,
    pub client: Client<BalancedConnector, Body>,
    pub response_header_timeout: Duration,
    pub decorator: Option<Decorator>,
}

/// The proxy server: dispatcher plus its forwarding client.
pub struct ProxyServer {
    router: Router,
    config: ProxyConfig,
}

/// Builder injecting the dispatcher's strategies; every strategy has a
/// default matching the stock behavior.
pub struct ProxyServerBuilder {
    config: ProxyConfig,
    registry: Arc<dyn Registry>,
    balancer: Option<Arc<dyn Balancer>>,
    extractor: Option<Arc<dyn IdentityExtractor>>,
    decorator: Option<Decorator>,
}

impl ProxyServerBuilder {
    /// Replace the load-balancing strategy.
    pub fn balancer(mut self, balancer: Arc<dyn Balancer>) -> Self {
        self.balancer = Some(balancer);
        self
    }

    /// Replace the identity extraction strategy.
    pub fn extractor(mut self, extractor: Arc<dyn IdentityExtractor>) -> Self {
        self.extractor = Some(extractor);
        self
    }

    /// Install a per-request decorator.
    pub fn decorator(mut self, decorator: Decorator) -> Self {
        self.decorator = Some(decorator);
        self
    }

    pub fn build(self) -> ProxyServer {
        let balancer = self
            .balancer
            .unwrap_or_else(|| Arc::new(RandomBalancer::from_config(&self.config.upstream)));
        let extractor = self
            .extractor
            .unwrap_or_else(|| Arc::new(PathExtractor));

        let client = Client::builder(TokioExecutor::new())
            .pool_max_idle_per_host(self.config.upstream.max_idle_per_host)
            .build(BalancedConnector::new(
                Arc::clone(&self.registry),
                Arc::clone(&balancer),
            ));

        let state = AppState {
            registry: self.registry,
            balancer,
            extractor,
            client,
            response_header_timeout: self.config.upstream.response_header_timeout(),
            decorator: self.decorator,
        };

        let router = Router::new()
            .route("/{*path}", any(proxy_handler))
            .route("/", any(proxy_handler))
            .with_state(state)
            .layer(TraceLayer::new_for_http());

        ProxyServer {
            router,
            config: self.config,
        }
    }
}

impl ProxyServer {
    /// Create a server with the default strategies.
    pub fn new(config: ProxyConfig, registry: Arc<dyn Registry>) -> Self {
        Self::builder(config, registry).build()
    }

    /// Start building a server with custom strategies.
    pub fn builder(config: ProxyConfig, registry: Arc<dyn Registry>) -> ProxyServerBuilder {
        ProxyServerBuilder {
            config,
            registry,
            balancer: None,
            extractor: None,
            decorator: None,
        }
    }

    /// Run the server, accepting connections on the given listener.
    pub async fn run(self, listener: TcpListener) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "proxy server starting");

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("proxy server stopped");
        Ok(())
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }
}

/// Main dispatcher: resolve identity, then tunnel or forward.
async fn proxy_handler(State(state): State<AppState>, req: Request<Body>) -> Response<Body> {
    let request_id = Uuid::new_v4();

    let (identity, rewritten) = match state.extractor.extract(req.uri()) {
        Ok(pair) => pair,
        Err(err) => {
            tracing::debug!(request_id = %request_id, path = %req.uri().path(), "identity extraction failed");
            // A malformed path answers 500, not 400; existing clients key
            // off this status.
            return (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()).into_response();
        }
    };

    tracing::debug!(
        request_id = %request_id,
        service = %identity,
        method = %req.method(),
        path = %rewritten,
        "dispatching request"
    );

    let forward: ResponseFuture = if tunnel::is_upgrade_request(&req) {
        let state = state.clone();
        let identity = identity.clone();
        Box::pin(async move {
            tunnel::proxy_upgrade(
                state.balancer.as_ref(),
                state.registry.as_ref(),
                &identity,
                rewritten,
                req,
            )
            .await
        })
    } else {
        Box::pin(forward_http(state.clone(), identity.clone(), rewritten, req))
    };

    match &state.decorator {
        Some(decorate) => decorate(&identity, forward).await,
        None => forward.await,
    }
}

/// Forward an ordinary HTTP request through the pooled client.
async fn forward_http(
    state: AppState,
    identity: ServiceIdentity,
    rewritten: String,
    req: Request<Body>,
) -> Response<Body> {
    let (mut parts, body) = req.into_parts();

    // Scheme forced to http, authority replaced by the sentinel; the
    // connector turns it back into a balanced dial.
    let target = format!("http://{}{}", sentinel::encode(&identity), rewritten);
    parts.uri = match Uri::try_from(target) {
        Ok(uri) => uri,
        Err(err) => {
            tracing::warn!(service = %identity, error = %err, "identity does not form a valid authority");
            return (StatusCode::BAD_GATEWAY, "invalid service authority").into_response();
        }
    };

    let outbound = Request::from_parts(parts, body);
    let pending = state.client.request(outbound);

    match tokio::time::timeout(state.response_header_timeout, pending).await {
        Ok(Ok(response)) => {
            let (parts, body) = response.into_parts();
            Response::from_parts(parts, Body::new(body))
        }
        Ok(Err(err)) => {
            tracing::warn!(service = %identity, error = %err, "upstream request failed");
            (StatusCode::BAD_GATEWAY, "upstream request failed").into_response()
        }
        Err(_) => {
            tracing::warn!(service = %identity, "upstream response head timed out");
            (StatusCode::GATEWAY_TIMEOUT, "upstream timed out").into_response()
        }
    }
}

/// Wait for shutdown signal (Ctrl+C).
async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install Ctrl+C handler");
    tracing::info!("Shutdown signal received");
}
