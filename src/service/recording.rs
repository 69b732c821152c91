//! Recording and snapshot control.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::to_value;

use crate::client::RpcClient;
use crate::error::Result;

// ============================================================================
// Parameters
// ============================================================================

/// Optional settings for `start_recording`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecordingOptions {
    /// Stop automatically after this long. Unlimited when unset.
    pub duration: Option<Duration>,
    /// Container format, e.g. `fmp4` or `mp4`.
    pub format: Option<String>,
}

impl RecordingOptions {
    /// Sets the recording length.
    #[inline]
    #[must_use]
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    /// Sets the container format.
    #[inline]
    #[must_use]
    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }
}

#[derive(Serialize)]
struct StartParams<'a> {
    device: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'a str>,
}

#[derive(Serialize)]
struct DeviceParams<'a> {
    device: &'a str,
}

#[derive(Serialize)]
struct SnapshotParams<'a> {
    device: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    filename: Option<&'a str>,
}

// ============================================================================
// Results
// ============================================================================

/// State of a recording after start or stop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingSession {
    /// Device being recorded.
    pub device: String,
    /// `RECORDING` or `STOPPED`.
    pub status: String,
    /// Server-assigned recording identifier.
    #[serde(default)]
    pub session_id: Option<String>,
    /// Output file name.
    #[serde(default)]
    pub filename: Option<String>,
    /// When recording started.
    #[serde(default)]
    pub start_time: Option<String>,
    /// When recording stopped.
    #[serde(default)]
    pub end_time: Option<String>,
    /// Seconds recorded so far, or requested duration.
    #[serde(default)]
    pub duration: Option<f64>,
    /// Container format.
    #[serde(default)]
    pub format: Option<String>,
    /// Output size in bytes.
    #[serde(default)]
    pub file_size: Option<u64>,
}

/// Result of `take_snapshot`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Device the image was taken from.
    pub device: String,
    /// Stored file name.
    pub filename: String,
    /// `SUCCESS` or `FAILED`.
    pub status: String,
    /// When the image was taken.
    #[serde(default)]
    pub timestamp: Option<String>,
    /// Image size in bytes.
    #[serde(default)]
    pub file_size: Option<u64>,
    /// Path of the image on the server.
    #[serde(default)]
    pub file_path: Option<String>,
}

// ============================================================================
// RecordingService
// ============================================================================

/// Recording and snapshot methods.
#[derive(Debug, Clone)]
pub struct RecordingService {
    client: RpcClient,
}

impl RecordingService {
    /// Wraps a client handle.
    #[inline]
    #[must_use]
    pub fn new(client: RpcClient) -> Self {
        Self { client }
    }

    /// Starts recording `device`.
    ///
    /// Durations are sent in whole seconds.
    ///
    /// # Errors
    ///
    /// As [`RpcClient::request`].
    pub async fn start_recording(
        &self,
        device: &str,
        options: &RecordingOptions,
    ) -> Result<RecordingSession> {
        let params = to_value(StartParams {
            device,
            duration: options.duration.map(|d| d.as_secs()),
            format: options.format.as_deref(),
        })?;
        self.client.request("start_recording", Some(params)).await
    }

    /// Stops the active recording on `device`.
    ///
    /// # Errors
    ///
    /// As [`RpcClient::request`].
    pub async fn stop_recording(&self, device: &str) -> Result<RecordingSession> {
        let params = to_value(DeviceParams { device })?;
        self.client.request("stop_recording", Some(params)).await
    }

    /// Captures a still image. The server names the file when `filename` is
    /// `None`.
    ///
    /// # Errors
    ///
    /// As [`RpcClient::request`].
    pub async fn take_snapshot(&self, device: &str, filename: Option<&str>) -> Result<Snapshot> {
        let params = to_value(SnapshotParams { device, filename })?;
        self.client.request("take_snapshot", Some(params)).await
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
    async fn test_start_recording_params() {
        let (client, _server, mut side) = connected_client().await;
        let service = RecordingService::new(client);
        let options = RecordingOptions::default()
            .with_duration(Duration::from_secs(60))
            .with_format("mp4");

        let (session, ()) = tokio::join!(service.start_recording("camera0", &options), async {
            let (id, method, params) = side.recv_request().await;
            assert_eq!(method, "start_recording");
            assert_eq!(
                params,
                json!({ "device": "camera0", "duration": 60, "format": "mp4" })
            );
            side.respond(
                id,
                json!({
                    "device": "camera0",
                    "status": "RECORDING",
                    "session_id": "550e8400",
                    "filename": "camera0_2025-01-15_14-30-00.mp4"
                }),
            );
        });

        let session = session.unwrap();
        assert_eq!(session.status, "RECORDING");
        assert_eq!(session.session_id.as_deref(), Some("550e8400"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unlimited_recording_omits_optional_params() {
        let (client, _server, mut side) = connected_client().await;
        let service = RecordingService::new(client);
        let options = RecordingOptions::default();

        let (session, ()) = tokio::join!(
            service.start_recording("camera0", &options),
            async {
                let (id, _, params) = side.recv_request().await;
                assert_eq!(params, json!({ "device": "camera0" }));
                side.respond(id, json!({ "device": "camera0", "status": "RECORDING" }));
            }
        );

        assert!(session.is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_recording() {
        let (client, _server, mut side) = connected_client().await;
        let service = RecordingService::new(client);

        let (session, ()) = tokio::join!(service.stop_recording("camera0"), async {
            let (id, method, params) = side.recv_request().await;
            assert_eq!(method, "stop_recording");
            assert_eq!(params, json!({ "device": "camera0" }));
            side.respond(
                id,
                json!({ "device": "camera0", "status": "STOPPED", "duration": 42.5, "file_size": 1048576 }),
            );
        });

        let session = session.unwrap();
        assert_eq!(session.duration, Some(42.5));
        assert_eq!(session.file_size, Some(1_048_576));
    }

    #[tokio::test(start_paused = true)]
    async fn test_take_snapshot() {
        let (client, _server, mut side) = connected_client().await;
        let service = RecordingService::new(client);

        let (snapshot, ()) = tokio::join!(service.take_snapshot("camera0", Some("door.jpg")), async {
            let (id, method, params) = side.recv_request().await;
            assert_eq!(method, "take_snapshot");
            assert_eq!(params, json!({ "device": "camera0", "filename": "door.jpg" }));
            side.respond(
                id,
                json!({ "device": "camera0", "filename": "door.jpg", "status": "completed" }),
            );
        });

        assert_eq!(snapshot.unwrap().filename, "door.jpg");
    }
}
