//! Raw bidirectional tunnel for Upgrade traffic.
//!
//! # Data Flow
//! ```text
//! Upgrade request
//!     → balancer (raw TcpStream to one backend)
//!     → handshake replayed to the backend (method, path, headers)
//!     → backend 101 → client answered 101 → both transports detached
//!     → splice(): client→backend and backend→client copies until EOF
//! ```
//!
//! # Design Decisions
//! - A non-101 backend answer is proxied back verbatim; no tunnel is built
//! - Each copy direction closes its *destination* on EOF or error, so a
//!   half-close cascades and the other copy terminates naturally
//! - Copy errors are logged, never escalated; both sides are always released
//! - No idle timeout: a tunnel lives until a peer disconnects

use axum::body::Body;
use axum::http::{header, Request, Response, StatusCode, Uri};
use hyper::upgrade::OnUpgrade;
use hyper_util::rt::TokioIo;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};

use crate::balancer::Balancer;
use crate::registry::{Registry, ServiceIdentity};

/// True when the request asks for a protocol upgrade: the `Connection`
/// header lists the `upgrade` token and the `Upgrade` header names a
/// protocol. Both checks are case-insensitive.
pub fn is_upgrade_request<B>(req: &Request<B>) -> bool {
    let connection_upgrades = req
        .headers()
        .get(header::CONNECTION)
        .and_then(|value| value.to_str().ok())
        .map(|value| {
            value
                .split(',')
                .any(|token| token.trim().eq_ignore_ascii_case("upgrade"))
        })
        .unwrap_or(false);

    let protocol_named = req
        .headers()
        .get(header::UPGRADE)
        .and_then(|value| value.to_str().ok())
        .map(|value| !value.trim().is_empty())
        .unwrap_or(false);

    connection_upgrades && protocol_named
}

/// Handle an upgrade request end to end: dial a backend for `identity`,
/// replay the handshake, and on a 101 splice the two raw transports until
/// either side closes.
pub async fn proxy_upgrade(
    balancer: &dyn Balancer,
    registry: &dyn Registry,
    identity: &ServiceIdentity,
    rewritten: String,
    mut req: Request<Body>,
) -> Response<Body> {
    let backend = match balancer.select(identity, registry).await {
        Ok(stream) => stream,
        Err(err) => {
            tracing::warn!(service = %identity, error = %err, "tunnel backend unavailable");
            return text_response(StatusCode::BAD_GATEWAY, "destination not reachable");
        }
    };

    // The raw client transport; without it the tunnel cannot be built.
    let Some(client_upgrade) = req.extensions_mut().remove::<OnUpgrade>() else {
        tracing::warn!(service = %identity, "transport does not support upgrades");
        return text_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "connection does not support upgrades",
        );
    };

    let rewritten_uri: Uri = match rewritten.parse() {
        Ok(uri) => uri,
        Err(err) => {
            tracing::warn!(service = %identity, error = %err, "rewritten path is not a valid uri");
            return text_response(StatusCode::INTERNAL_SERVER_ERROR, "invalid rewritten path");
        }
    };

    // Replay the handshake to the backend over the raw stream; it needs to
    // see the Upgrade headers too.
    let (mut sender, connection) =
        match hyper::client::conn::http1::handshake(TokioIo::new(backend)).await {
            Ok(pair) => pair,
            Err(err) => {
                tracing::warn!(service = %identity, error = %err, "backend handshake failed");
                return text_response(StatusCode::BAD_GATEWAY, "destination not reachable");
            }
        };
    tokio::spawn(async move {
        if let Err(err) = connection.with_upgrades().await {
            tracing::debug!(error = %err, "backend connection task ended");
        }
    });

    let mut backend_req = Request::new(Body::empty());
    *backend_req.method_mut() = req.method().clone();
    *backend_req.uri_mut() = rewritten_uri;
    *backend_req.headers_mut() = req.headers().clone();

    let mut backend_resp = match sender.send_request(backend_req).await {
        Ok(resp) => resp,
        Err(err) => {
            tracing::warn!(service = %identity, error = %err, "backend refused handshake");
            return text_response(StatusCode::BAD_GATEWAY, "destination not reachable");
        }
    };

    if backend_resp.status() != StatusCode::SWITCHING_PROTOCOLS {
        // Backend declined the upgrade; hand its answer back verbatim.
        let (parts, body) = backend_resp.into_parts();
        return Response::from_parts(parts, Body::new(body));
    }

    let mut client_resp = Response::new(Body::empty());
    *client_resp.status_mut() = StatusCode::SWITCHING_PROTOCOLS;
    *client_resp.headers_mut() = backend_resp.headers().clone();

    let backend_upgrade = hyper::upgrade::on(&mut backend_resp);
    let identity = identity.clone();
    tokio::spawn(async move {
        let backend_io = match backend_upgrade.await {
            Ok(upgraded) => TokioIo::new(upgraded),
            Err(err) => {
                tracing::debug!(service = %identity, error = %err, "backend upgrade failed");
                return;
            }
        };
        let client_io = match client_upgrade.await {
            Ok(upgraded) => TokioIo::new(upgraded),
            Err(err) => {
                tracing::debug!(service = %identity, error = %err, "client upgrade failed");
                return;
            }
        };
        tracing::debug!(service = %identity, "tunnel established");
        splice(client_io, backend_io).await;
        tracing::debug!(service = %identity, "tunnel closed");
    });

    client_resp
}

/// Splice two transports: copy bytes both ways until both directions finish.
///
/// Each copy shuts down the write side it was feeding once its source
/// reaches EOF or errors; the join barrier releases both streams only after
/// both directions have completed.
pub async fn splice<C, B>(client: C, backend: B)
where
    C: AsyncRead + AsyncWrite + Unpin,
    B: AsyncRead + AsyncWrite + Unpin,
{
    let (mut client_read, mut client_write) = tokio::io::split(client);
    let (mut backend_read, mut backend_write) = tokio::io::split(backend);

    let client_to_backend = async {
        let result = tokio::io::copy(&mut client_read, &mut backend_write).await;
        let _ = backend_write.shutdown().await;
        result
    };
    let backend_to_client = async {
        let result = tokio::io::copy(&mut backend_read, &mut client_write).await;
        let _ = client_write.shutdown().await;
        result
    };

    let (upstream, downstream) = tokio::join!(client_to_backend, backend_to_client);
    if let Err(err) = upstream {
        tracing::debug!(error = %err, "client to backend copy ended");
    }
    if let Err(err) = downstream {
        tracing::debug!(error = %err, "backend to client copy ended");
    }
}

fn text_response(status: StatusCode, body: &'static str) -> Response<Body> {
    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::io::{duplex, AsyncReadExt};

    fn request_with_headers(pairs: &[(&str, &str)]) -> Request<()> {
        let mut builder = Request::builder().uri("/svc/v1/ws");
        for (name, value) in pairs {
            builder = builder.header(*name, *value);
        }
        builder.body(()).unwrap()
    }

    #[test]
    fn detects_plain_upgrade() {
        let req = request_with_headers(&[("Connection", "Upgrade"), ("Upgrade", "websocket")]);
        assert!(is_upgrade_request(&req));
    }

    #[test]
    fn detects_upgrade_in_connection_list() {
        let req = request_with_headers(&[
            ("Connection", "keep-alive, Upgrade"),
            ("Upgrade", "websocket"),
        ]);
        assert!(is_upgrade_request(&req));
    }

    #[test]
    fn detection_is_case_insensitive() {
        let req = request_with_headers(&[("connection", "upgrade"), ("upgrade", "WebSocket")]);
        assert!(is_upgrade_request(&req));
    }

    #[test]
    fn plain_request_is_not_upgrade() {
        let req = request_with_headers(&[("Connection", "keep-alive")]);
        assert!(!is_upgrade_request(&req));
    }

    #[test]
    fn upgrade_header_alone_is_not_enough() {
        let req = request_with_headers(&[("Upgrade", "websocket")]);
        assert!(!is_upgrade_request(&req));
    }

    #[test]
    fn empty_upgrade_value_is_not_enough() {
        let req = request_with_headers(&[("Connection", "Upgrade"), ("Upgrade", "")]);
        assert!(!is_upgrade_request(&req));
    }

    #[tokio::test]
    async fn splice_moves_bytes_both_ways() {
        let (client_near, client_far) = duplex(64);
        let (backend_near, backend_far) = duplex(64);

        let task = tokio::spawn(splice(client_far, backend_far));

        let (mut client_read, mut client_write) = tokio::io::split(client_near);
        let (mut backend_read, mut backend_write) = tokio::io::split(backend_near);

        client_write.write_all(b"ping").await.unwrap();
        let mut buf = [0u8; 4];
        backend_read.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"ping");

        backend_write.write_all(b"pong").await.unwrap();
        client_read.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"pong");

        // Closing the client write side cascades: the backend observes EOF,
        // closes in turn, and the tunnel terminates.
        client_write.shutdown().await.unwrap();
        let n = backend_read.read(&mut buf).await.unwrap();
        assert_eq!(n, 0);
        drop(backend_write);
        let n = client_read.read(&mut buf).await.unwrap();
        assert_eq!(n, 0);

        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("tunnel did not terminate")
            .unwrap();
    }

    #[tokio::test]
    async fn splice_terminates_when_backend_closes() {
        let (client_near, client_far) = duplex(64);
        let (backend_near, backend_far) = duplex(64);

        let task = tokio::spawn(splice(client_far, backend_far));

        drop(backend_near);

        let (mut client_read, client_write) = tokio::io::split(client_near);
        let mut buf = [0u8; 1];
        let n = client_read.read(&mut buf).await.unwrap();
        assert_eq!(n, 0);
        // Client closes in response, releasing the other copy direction.
        drop(client_write);

        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("tunnel did not terminate")
            .unwrap();
    }
}
