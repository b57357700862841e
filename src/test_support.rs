//! Minimal HTTP/1.1 server on an ephemeral loopback port for transport and
//! oracle tests.
//!
//! Routes (by path prefix):
//! - `/big`: 200 with a 300000-byte body
//! - `/ok`: 200 with a short body
//! - `/slow`: 200 after 300ms
//! - `/hang`: never answers
//! - anything else: 404

use reqwest::Client;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

pub const BIG_BODY: usize = 300_000;

/// Start the server and return its address. It lives until the test's
/// runtime shuts down.
pub async fn serve() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            tokio::spawn(answer(socket));
        }
    });
    addr
}

/// An address nothing listens on.
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

/// A client that ignores proxy settings from the environment.
pub fn local_client(timeout: Duration) -> Client {
    Client::builder().no_proxy().timeout(timeout).build().unwrap()
}

async fn answer(mut socket: TcpStream) {
    let mut head = Vec::new();
    let mut buf = [0u8; 1024];
    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
        match socket.read(&mut buf).await {
            Ok(0) | Err(_) => return,
            Ok(n) => head.extend_from_slice(&buf[..n]),
        }
    }

    let head = String::from_utf8_lossy(&head);
    let mut request_line = head.split_whitespace();
    let method = request_line.next().unwrap_or("GET").to_string();
    let path = request_line.next().unwrap_or("/").to_string();

    let (status, body) = if path.starts_with("/big") {
        ("200 OK", vec![b'x'; BIG_BODY])
    } else if path.starts_with("/ok") {
        ("200 OK", b"pong".to_vec())
    } else if path.starts_with("/slow") {
        tokio::time::sleep(Duration::from_millis(300)).await;
        ("200 OK", b"pong".to_vec())
    } else if path.starts_with("/hang") {
        tokio::time::sleep(Duration::from_secs(60)).await;
        return;
    } else {
        ("404 Not Found", Vec::new())
    };

    let header = format!(
        "HTTP/1.1 {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        status,
        body.len()
    );
    // the client may hang up once it has read enough
    if socket.write_all(header.as_bytes()).await.is_err() {
        return;
    }
    if method != "HEAD" {
        let _ = socket.write_all(&body).await;
    }
    let _ = socket.shutdown().await;
}
