//! Random-choice balancer with in-request failover.

use std::io;
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use socket2::{SockRef, TcpKeepalive};
use tokio::net::TcpStream;
use tokio::time::timeout;

use super::{BalanceError, Balancer};
use crate::config::UpstreamConfig;
use crate::registry::{Registry, ServiceIdentity};

/// Default balancer: tries endpoints in uniformly random order until one
/// connects or the candidate list is exhausted.
#[derive(Debug, Clone)]
pub struct RandomBalancer {
    dial_timeout: Duration,
    keepalive: Duration,
}

impl RandomBalancer {
    pub fn new(dial_timeout: Duration, keepalive: Duration) -> Self {
        Self {
            dial_timeout,
            keepalive,
        }
    }

    pub fn from_config(config: &UpstreamConfig) -> Self {
        Self::new(config.dial_timeout(), config.keepalive())
    }

    async fn dial(&self, endpoint: &str) -> io::Result<TcpStream> {
        let stream = timeout(self.dial_timeout, TcpStream::connect(endpoint))
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "connect timed out"))??;

        let keepalive = TcpKeepalive::new().with_time(self.keepalive);
        SockRef::from(&stream).set_tcp_keepalive(&keepalive)?;
        Ok(stream)
    }
}

impl Default for RandomBalancer {
    fn default() -> Self {
        Self::new(Duration::from_secs(2), Duration::from_secs(10))
    }
}

#[async_trait]
impl Balancer for RandomBalancer {
    async fn select(
        &self,
        identity: &ServiceIdentity,
        registry: &dyn Registry,
    ) -> Result<TcpStream, BalanceError> {
        let mut candidates = registry
            .lookup(&identity.name, &identity.version)
            .map_err(|_| BalanceError::ServiceNotFound(identity.clone()))?;

        while !candidates.is_empty() {
            let index = rand::thread_rng().gen_range(0..candidates.len());
            let endpoint = candidates.swap_remove(index);

            match self.dial(&endpoint).await {
                Ok(stream) => {
                    tracing::debug!(service = %identity, endpoint = %endpoint, "backend connected");
                    return Ok(stream);
                }
                Err(err) => {
                    // Advisory only; the candidate is dropped from this
                    // request's list, never from the registry.
                    registry.failure(&identity.name, &identity.version, &endpoint, &err);
                }
            }
        }

        Err(BalanceError::NoEndpointAvailable(identity.clone()))
    }
}
