//! Connector plugging the balancer into the pooled forwarding client.

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::http::Uri;
use hyper_util::rt::TokioIo;
use tokio::net::TcpStream;
use tower::Service;

use crate::balancer::Balancer;
use crate::http::sentinel;
use crate::registry::Registry;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Outbound-dial strategy for the hyper client: decodes the sentinel
/// authority set by the dispatcher and resolves it through the balancer.
#[derive(Clone)]
pub struct BalancedConnector {
    registry: Arc<dyn Registry>,
    balancer: Arc<dyn Balancer>,
}

impl BalancedConnector {
    pub fn new(registry: Arc<dyn Registry>, balancer: Arc<dyn Balancer>) -> Self {
        Self { registry, balancer }
    }
}

impl Service<Uri> for BalancedConnector {
    type Response = TokioIo<TcpStream>;
    type Error = BoxError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, dst: Uri) -> Self::Future {
        let registry = Arc::clone(&self.registry);
        let balancer = Arc::clone(&self.balancer);

        Box::pin(async move {
            let authority = dst.authority().map(|a| a.as_str()).unwrap_or_default();
            let identity = sentinel::decode(authority).ok_or_else(|| {
                BoxError::from(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("invalid service authority: {authority}"),
                ))
            })?;

            let stream = balancer.select(&identity, registry.as_ref()).await?;
            Ok(TokioIo::new(stream))
        })
    }
}
