//! Server information and liveness.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::client::RpcClient;
use crate::error::Result;

// ============================================================================
// Types
// ============================================================================

/// Static description of the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerInfo {
    /// Server product name.
    pub name: String,
    /// Server version.
    pub version: String,
    /// Build date of the server binary.
    #[serde(default)]
    pub build_date: Option<String>,
    /// Feature names the server advertises.
    #[serde(default)]
    pub capabilities: Vec<String>,
    /// Recording formats the server accepts.
    #[serde(default)]
    pub supported_formats: Vec<String>,
    /// Largest number of cameras the server manages.
    #[serde(default)]
    pub max_cameras: Option<u32>,
}

/// Health snapshot of the server and its components.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerStatus {
    /// Overall health, e.g. `healthy` or `degraded`.
    pub status: String,
    /// Seconds since start.
    #[serde(default)]
    pub uptime: Option<f64>,
    /// Server version.
    #[serde(default)]
    pub version: Option<String>,
    /// Per-component status, keyed by component name.
    #[serde(default)]
    pub components: Map<String, Value>,
}

// ============================================================================
// ServerService
// ============================================================================

/// Server information methods.
#[derive(Debug, Clone)]
pub struct ServerService {
    client: RpcClient,
}

impl ServerService {
    /// Wraps a client handle.
    #[inline]
    #[must_use]
    pub fn new(client: RpcClient) -> Self {
        Self { client }
    }

    /// Round-trips a `ping`. Returns the server's reply, normally `pong`.
    pub async fn ping(&self) -> Result<String> {
        self.client.request("ping", None).await
    }

    /// Fetches the server's name, version and capabilities.
    ///
    /// # Errors
    ///
    /// As [`RpcClient::request`].
    pub async fn get_server_info(&self) -> Result<ServerInfo> {
        self.client.request("get_server_info", None).await
    }

    /// Fetches the current health snapshot.
    ///
    /// # Errors
    ///
    /// As [`RpcClient::request`].
    pub async fn get_status(&self) -> Result<ServerStatus> {
        self.client.request("get_status", None).await
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    use crate::transport::testing::connected_client;

    #[tokio::test(start_paused = true)]
    async fn test_ping() {
        let (client, _server, mut side) = connected_client().await;
        let service = ServerService::new(client);

        let (reply, ()) = tokio::join!(service.ping(), async {
            let (id, method, _) = side.recv_request().await;
            assert_eq!(method, "ping");
            side.respond(id, json!("pong"));
        });

        assert_eq!(reply.unwrap(), "pong");
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_server_info_tolerates_missing_fields() {
        let (client, _server, mut side) = connected_client().await;
        let service = ServerService::new(client);

        let (info, ()) = tokio::join!(service.get_server_info(), async {
            let (id, _, _) = side.recv_request().await;
            side.respond(
                id,
                json!({
                    "name": "MediaMTX Camera Service",
                    "version": "1.0.0",
                    "capabilities": ["snapshots", "recordings"]
                }),
            );
        });

        let info = info.unwrap();
        assert_eq!(info.version, "1.0.0");
        assert_eq!(info.capabilities, ["snapshots", "recordings"]);
        assert!(info.supported_formats.is_empty());
        assert_eq!(info.max_cameras, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_status() {
        let (client, _server, mut side) = connected_client().await;
        let service = ServerService::new(client);

        let (status, ()) = tokio::join!(service.get_status(), async {
            let (id, method, _) = side.recv_request().await;
            assert_eq!(method, "get_status");
            side.respond(
                id,
                json!({
                    "status": "healthy",
                    "uptime": 3600.5,
                    "components": { "mediamtx": "running" }
                }),
            );
        });

        let status = status.unwrap();
        assert_eq!(status.status, "healthy");
        assert_eq!(status.components["mediamtx"], "running");
    }
}
