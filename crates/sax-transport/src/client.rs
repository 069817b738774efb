use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use bytes::Bytes;
use hyper::client::conn::http2;
use hyper_util::rt::{TokioExecutor, TokioIo};
use tokio::net::TcpStream;
use tracing::debug;

use crate::error::{TransportError, TransportResult};

/// Upper bound on a buffered response body.
const MAX_RESPONSE_BYTES: usize = 64 * 1024 * 1024;

/// A plaintext HTTP/2 channel to a single target.
///
/// Requests are multiplexed over one TCP connection. The connection driver
/// runs on its own task and stops when every `Connection` clone is dropped.
#[derive(Clone)]
pub struct Connection {
    target: String,
    sender: http2::SendRequest<Body>,
}

/// Open a channel to `target` (`host:port`) without transport security.
pub async fn connect(target: &str) -> TransportResult<Connection> {
    if target.is_empty() || target.contains("://") {
        return Err(TransportError::InvalidTarget {
            target: target.to_string(),
            reason: "expected host:port".into(),
        });
    }

    let stream = TcpStream::connect(target)
        .await
        .map_err(|source| TransportError::Connect {
            target: target.to_string(),
            source,
        })?;
    stream.set_nodelay(true)?;

    let (sender, conn) = http2::handshake(TokioExecutor::new(), TokioIo::new(stream))
        .await
        .map_err(|source| TransportError::Handshake {
            target: target.to_string(),
            source,
        })?;

    let driver_target = target.to_string();
    tokio::spawn(async move {
        if let Err(e) = conn.await {
            debug!(target = %driver_target, error = %e, "connection closed with error");
        }
    });

    debug!(target, "connected");
    Ok(Connection {
        target: target.to_string(),
        sender,
    })
}

impl Connection {
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Send a request. Relative URIs are resolved against the target.
    pub async fn send(&mut self, mut request: Request<Body>) -> TransportResult<Response<Body>> {
        if request.uri().authority().is_none() {
            let path = request
                .uri()
                .path_and_query()
                .map(|pq| pq.as_str())
                .unwrap_or("/");
            let uri = format!("http://{}{}", self.target, path)
                .parse()
                .map_err(|e: axum::http::uri::InvalidUri| TransportError::InvalidTarget {
                    target: self.target.clone(),
                    reason: e.to_string(),
                })?;
            *request.uri_mut() = uri;
        }

        self.sender.ready().await?;
        let response = self.sender.send_request(request).await?;
        Ok(response.map(Body::new))
    }

    /// Issue a GET and buffer the whole response body.
    pub async fn get(&mut self, path: &str) -> TransportResult<(StatusCode, Bytes)> {
        let request = Request::get(path)
            .body(Body::empty())
            .map_err(|e| TransportError::InvalidTarget {
                target: self.target.clone(),
                reason: e.to_string(),
            })?;
        let response = self.send(request).await?;
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), MAX_RESPONSE_BYTES)
            .await
            .map_err(|e| TransportError::Body(e.to_string()))?;
        Ok((status, body))
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection").field("target", &self.target).finish()
    }
}
