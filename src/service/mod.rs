//! Typed facades over [`RpcClient`](crate::RpcClient).
//!
//! Each service formats method names and parameters and deserializes
//! results. None of them holds transport state; they are cheap to clone and
//! share the client's connection.
//!
//! | Service | Methods |
//! |---------|---------|
//! | [`ServerService`] | `ping`, `get_server_info`, `get_status` |
//! | [`AuthService`] | `authenticate` |
//! | [`DeviceService`] | `get_camera_list`, `get_camera_status`, `camera_status_update` |
//! | [`RecordingService`] | `start_recording`, `stop_recording`, `take_snapshot` |
//! | [`FileService`] | `list_recordings`, `list_snapshots`, `delete_recording`, `delete_snapshot` |
//!
//! # Example
//!
//! ```no_run
//! use camera_rpc::RpcClient;
//! use camera_rpc::service::DeviceService;
//!
//! # async fn example() -> camera_rpc::Result<()> {
//! let client = RpcClient::new("ws://localhost:8002/ws")?;
//! client.connect().await?;
//!
//! let devices = DeviceService::new(client.clone());
//! for camera in devices.get_camera_list().await?.cameras {
//!     println!("{} {}", camera.device, camera.status);
//! }
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Submodules
// ============================================================================

/// Session authentication.
pub mod auth;

/// Camera discovery and status.
pub mod device;

/// Recording and snapshot file management.
pub mod file;

/// Recording and snapshot control.
pub mod recording;

/// Server information and liveness.
pub mod server;

// ============================================================================
// Re-exports
// ============================================================================

pub use auth::{AuthResult, AuthService};
pub use device::{Camera, CameraList, DeviceService, StreamUrls};
pub use file::{DeleteResult, FileEntry, FileList, FileService};
pub use recording::{RecordingOptions, RecordingService, RecordingSession, Snapshot};
pub use server::{ServerInfo, ServerService, ServerStatus};
