use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::response::Json;
use axum::routing::{get, MethodRouter};
use axum::Router;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use hyper_util::service::TowerToHyperService;
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

use crate::config::ServerConfig;
use crate::error::{TransportError, TransportResult};

pub const HEALTH_PATH: &str = "/v1/health";
pub const REFLECTION_PATH: &str = "/v1/reflection";

/// ACL names carry no required prefix in this environment.
pub const REQUIRED_ACL_NAME_PREFIX: &str = "";

/// Pause after a failed accept before trying again.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Health check response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".into(),
            version: env!("CARGO_PKG_VERSION").into(),
        }
    }
}

/// Introspection response: every route registered on the server.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReflectionResponse {
    pub services: Vec<String>,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::default())
}

async fn reflection_handler(State(services): State<Arc<Vec<String>>>) -> Json<ReflectionResponse> {
    Json(ReflectionResponse {
        services: services.as_ref().clone(),
    })
}

/// RPC server with introspection enabled.
pub struct CellServer {
    router: Router,
    services: Vec<String>,
}

impl CellServer {
    pub fn new() -> Self {
        Self {
            router: Router::new().route(HEALTH_PATH, get(health_handler)),
            services: vec![HEALTH_PATH.to_string(), REFLECTION_PATH.to_string()],
        }
    }

    /// Register a service route.
    pub fn route(mut self, path: &str, method_router: MethodRouter) -> Self {
        self.router = self.router.route(path, method_router);
        self.services.push(path.to_string());
        self
    }

    /// Names of all registered routes, including the built-in ones.
    pub fn services(&self) -> &[String] {
        &self.services
    }

    /// Returns `Ok(())` iff the caller passes the ACL check.
    ///
    /// ACLs are not enforced here: only the empty list is understood.
    pub fn check_acls(&self, acls: &[String]) -> TransportResult<()> {
        if acls.is_empty() {
            return Ok(());
        }
        Err(TransportError::Unimplemented(format!(
            "ACL check is not supported (got {} ACLs)",
            acls.len()
        )))
    }

    /// Build the full router (useful for testing).
    pub fn router(&self) -> Router {
        let services = Arc::new(self.services.clone());
        self.router
            .clone()
            .route(REFLECTION_PATH, get(reflection_handler).with_state(services))
    }

    /// Bind to the configured address and serve.
    pub async fn bind(self, config: &ServerConfig) -> TransportResult<()> {
        let listener = TcpListener::bind(config.bind_addr).await?;
        self.serve(listener).await
    }

    /// Serve HTTP/1 and HTTP/2 (prior knowledge) on an existing listener.
    pub async fn serve(self, listener: TcpListener) -> TransportResult<()> {
        let app = self.router();
        let addr: SocketAddr = listener.local_addr()?;
        info!("Sax server listening on {}", addr);

        loop {
            let (stream, peer) = next_connection(|| listener.accept()).await;
            let app = app.clone();
            tokio::spawn(async move {
                let io = TokioIo::new(stream);
                let service = TowerToHyperService::new(app.into_service());
                if let Err(e) = ConnBuilder::new(TokioExecutor::new())
                    .serve_connection(io, service)
                    .await
                {
                    debug!(%peer, error = %e, "connection ended with error");
                }
            });
        }
    }
}

/// Accept the next connection. Accept errors (fd exhaustion, aborted
/// handshakes) are logged and retried; they never stop the server.
async fn next_connection<F, Fut, T>(mut accept: F) -> T
where
    F: FnMut() -> Fut,
    Fut: Future<Output = io::Result<T>>,
{
    loop {
        match accept().await {
            Ok(conn) => return conn,
            Err(e) => {
                warn!(error = %e, "failed to accept connection");
                tokio::time::sleep(ACCEPT_BACKOFF).await;
            }
        }
    }
}

impl Default for CellServer {
    fn default() -> Self {
        Self::new()
    }
}

/// Pick a TCP port that is currently free.
pub fn pick_unused_port() -> TransportResult<u16> {
    let listener = std::net::TcpListener::bind("0.0.0.0:0")?;
    Ok(listener.local_addr()?.port())
}
