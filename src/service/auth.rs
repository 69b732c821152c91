//! Session authentication.
//!
//! The transport only carries the token; role and permission semantics are
//! the server's business.

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::client::RpcClient;
use crate::error::Result;

// ============================================================================
// AuthResult
// ============================================================================

/// Outcome of `authenticate`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthResult {
    /// Whether the server accepted the token.
    pub authenticated: bool,
    /// Role granted to the session, e.g. `admin` or `viewer`.
    #[serde(default)]
    pub role: Option<String>,
    /// Permissions granted to the session.
    #[serde(default)]
    pub permissions: Vec<String>,
    /// When the session expires, as reported by the server.
    #[serde(default)]
    pub expires_at: Option<String>,
    /// Server-assigned session identifier.
    #[serde(default)]
    pub session_id: Option<String>,
}

// ============================================================================
// AuthService
// ============================================================================

/// Authentication methods.
#[derive(Debug, Clone)]
pub struct AuthService {
    client: RpcClient,
}

impl AuthService {
    /// Wraps a client handle.
    #[inline]
    #[must_use]
    pub fn new(client: RpcClient) -> Self {
        Self { client }
    }

    /// Authenticates the connection with a bearer token or API key.
    ///
    /// A rejected token is reported by the server either as an RPC error or
    /// as `authenticated: false`; both are returned unchanged.
    ///
    /// # Errors
    ///
    /// Any [`RpcClient::call`] error.
    pub async fn authenticate(&self, auth_token: &str) -> Result<AuthResult> {
        let result: AuthResult = self
            .client
            .request("authenticate", Some(json!({ "auth_token": auth_token })))
            .await?;

        debug!(
            authenticated = result.authenticated,
            role = result.role.as_deref().unwrap_or("-"),
            "Authentication completed"
        );
        Ok(result)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::error::Error;
    use crate::protocol::codes;
    use crate::transport::testing::connected_client;

    #[tokio::test(start_paused = true)]
    async fn test_authenticate_sends_token() {
        let (client, _server, mut side) = connected_client().await;
        let service = AuthService::new(client);

        let (result, ()) = tokio::join!(service.authenticate("secret-token"), async {
            let (id, method, params) = side.recv_request().await;
            assert_eq!(method, "authenticate");
            assert_eq!(params, json!({ "auth_token": "secret-token" }));
            side.respond(
                id,
                json!({
                    "authenticated": true,
                    "role": "operator",
                    "permissions": ["view", "control"]
                }),
            );
        });

        let result = result.unwrap();
        assert!(result.authenticated);
        assert_eq!(result.role.as_deref(), Some("operator"));
        assert_eq!(result.permissions.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_authenticate_rejection_is_rpc_error() {
        let (client, _server, mut side) = connected_client().await;
        let service = AuthService::new(client);

        let (result, ()) = tokio::join!(service.authenticate("bad"), async {
            let (id, _, _) = side.recv_request().await;
            side.respond_error(id, codes::AUTH_FAILED, "Authentication failed");
        });

        let err = result.unwrap_err();
        assert!(matches!(err, Error::Rpc { code, .. } if code == codes::AUTH_FAILED));
    }
}
