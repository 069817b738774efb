//! RPC transport factory for the Sax platform environment.
//!
//! Outbound channels are plaintext HTTP/2; inbound servers come with
//! introspection and a pass-through ACL gate that only understands the
//! empty ACL list.

pub mod client;
pub mod config;
pub mod error;
pub mod server;

pub use client::{connect, Connection};
pub use config::ServerConfig;
pub use error::{TransportError, TransportResult};
pub use server::{
    pick_unused_port, CellServer, HealthResponse, ReflectionResponse, HEALTH_PATH,
    REFLECTION_PATH, REQUIRED_ACL_NAME_PREFIX,
};
