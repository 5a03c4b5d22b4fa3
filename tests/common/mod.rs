//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use service_proxy::config::ProxyConfig;
use service_proxy::http::ProxyServer;
use service_proxy::registry::Registry;

/// Read from the stream until the end of an HTTP head (CRLFCRLF).
pub async fn read_head<S: AsyncReadExt + Unpin>(stream: &mut S) -> String {
    let mut head = Vec::new();
    let mut byte = [0u8; 1];
    while !head.ends_with(b"\r\n\r\n") {
        match stream.read(&mut byte).await {
            Ok(0) | Err(_) => break,
            Ok(_) => head.push(byte[0]),
        }
    }
    String::from_utf8_lossy(&head).to_string()
}

fn request_target(head: &str) -> String {
    head.lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .unwrap_or("")
        .to_string()
}

/// Mock backend answering every request with the given status and the
/// request target as body; lets tests observe the rewritten path.
pub async fn start_path_echo_backend(status_line: &'static str) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    tokio::spawn(async move {
                        let head = read_head(&mut socket).await;
                        let body = request_target(&head);
                        let response = format!(
                            "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_line,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// Mock backend accepting any upgrade handshake with a 101 and then
/// echoing every byte it receives until the peer closes.
pub async fn start_upgrade_echo_backend() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    tokio::spawn(async move {
                        let _head = read_head(&mut socket).await;
                        let handshake = "HTTP/1.1 101 Switching Protocols\r\n\
                                         Connection: Upgrade\r\n\
                                         Upgrade: echo\r\n\r\n";
                        if socket.write_all(handshake.as_bytes()).await.is_err() {
                            return;
                        }
                        let mut buf = [0u8; 1024];
                        loop {
                            match socket.read(&mut buf).await {
                                Ok(0) | Err(_) => break,
                                Ok(n) => {
                                    if socket.write_all(&buf[..n]).await.is_err() {
                                        break;
                                    }
                                }
                            }
                        }
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// An address that refuses connections: bind a listener, then drop it.
pub async fn dead_endpoint() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// Start a proxy server over the given registry on an ephemeral port.
pub async fn start_proxy(registry: Arc<dyn Registry>) -> SocketAddr {
    let mut config = ProxyConfig::default();
    // Dead-endpoint tests should fail fast.
    config.upstream.dial_timeout_ms = 500;

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = ProxyServer::new(config, registry);
    tokio::spawn(async move {
        let _ = server.run(listener).await;
    });

    // The listener is pre-bound; give the accept loop a beat to spin up.
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    addr
}

/// Open a raw client connection to the proxy.
pub async fn raw_client(addr: SocketAddr) -> TcpStream {
    TcpStream::connect(addr).await.unwrap()
}
