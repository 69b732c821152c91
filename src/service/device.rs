//! Camera discovery and status.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::warn;

use crate::client::RpcClient;
use crate::error::Result;
use crate::identifiers::SubscriptionId;

// ============================================================================
// Constants
// ============================================================================

/// Notification pushed when a camera connects, disconnects or changes mode.
pub const CAMERA_STATUS_UPDATE: &str = "camera_status_update";

// ============================================================================
// Types
// ============================================================================

/// Streaming endpoints published for a camera.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamUrls {
    /// RTSP endpoint.
    #[serde(default)]
    pub rtsp: Option<String>,
    /// WebRTC signaling endpoint.
    #[serde(default)]
    pub webrtc: Option<String>,
    /// HLS playlist.
    #[serde(default)]
    pub hls: Option<String>,
}

/// One camera as reported by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    /// Device path or identifier, e.g. `/dev/video0` or `camera0`.
    pub device: String,
    /// `CONNECTED`, `DISCONNECTED` or `ERROR`.
    pub status: String,
    /// Human-readable name.
    #[serde(default)]
    pub name: Option<String>,
    /// Capture resolution, e.g. `1920x1080`.
    #[serde(default)]
    pub resolution: Option<String>,
    /// Capture frame rate.
    #[serde(default)]
    pub fps: Option<u32>,
    /// Streaming endpoints, when the camera is publishing.
    #[serde(default)]
    pub streams: Option<StreamUrls>,
}

impl Camera {
    /// Returns `true` if the camera is reported as connected.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.status.eq_ignore_ascii_case("connected")
    }
}

/// Result of `get_camera_list`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CameraList {
    /// Every known camera.
    pub cameras: Vec<Camera>,
    /// Number of cameras known to the server.
    #[serde(default)]
    pub total: u32,
    /// Number of cameras currently connected.
    #[serde(default)]
    pub connected: u32,
}

// ============================================================================
// DeviceService
// ============================================================================

/// Camera discovery and status methods.
#[derive(Debug, Clone)]
pub struct DeviceService {
    client: RpcClient,
}

impl DeviceService {
    /// Wraps a client handle.
    #[inline]
    #[must_use]
    pub fn new(client: RpcClient) -> Self {
        Self { client }
    }

    /// Lists every camera the server knows about.
    ///
    /// # Errors
    ///
    /// As [`RpcClient::request`].
    pub async fn get_camera_list(&self) -> Result<CameraList> {
        self.client.request("get_camera_list", None).await
    }

    /// Fetches the status of one camera.
    ///
    /// # Errors
    ///
    /// As [`RpcClient::request`]; the server answers unknown devices with
    /// an [`Error::Rpc`](crate::Error::Rpc).
    pub async fn get_camera_status(&self, device: &str) -> Result<Camera> {
        self.client
            .request("get_camera_status", Some(json!({ "device": device })))
            .await
    }

    /// Runs `callback` for every `camera_status_update` notification.
    ///
    /// Payloads that do not describe a camera are logged and skipped.
    /// Remove the callback with [`RpcClient::unsubscribe`].
    pub fn on_camera_status_update<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(Camera) + Send + Sync + 'static,
    {
        self.client
            .subscribe(CAMERA_STATUS_UPDATE, move |params: &Value| {
                match serde_json::from_value::<Camera>(params.clone()) {
                    Ok(camera) => callback(camera),
                    Err(e) => warn!(error = %e, "Ignoring malformed camera status update"),
                }
            })
    }
}

// ============================================================================
// Tests
// ============================================================================
