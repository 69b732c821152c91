//! JSON-RPC 2.0 protocol message types.
//!
//! This module defines the wire format exchanged with the camera service.
//!
//! # Protocol Overview
//!
//! | Message Type | Direction | Purpose |
//! |--------------|-----------|---------|
//! | `Request` | Client → Server | Method call with `id` |
//! | `Notification` | Both | One-way message without `id` |
//! | `Response` | Server → Client | `result` or `error` for an `id` |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `codes` | Well-known error codes |
//! | `message` | Inbound frame classification |
//! | `request` | Request, Notification and Response types |

// ============================================================================
// Submodules
// ============================================================================

/// Well-known JSON-RPC error codes.
pub mod codes;

/// Inbound frame classification.
pub mod message;

/// Request, Notification and Response message types.
pub mod request;

// ============================================================================
// Re-exports
// ============================================================================

pub use message::Inbound;
pub use request::{JSONRPC_VERSION, Notification, Request, Response, RpcErrorObject, Version};
