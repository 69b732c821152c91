//! Camera discovery against a running camera service.
//!
//! Demonstrates:
//! - Building and connecting a client
//! - Authenticating with a token
//! - Listing cameras and server status
//! - Watching `camera_status_update` notifications and lifecycle events
//!
//! Usage:
//!   cargo run --example camera_list
//!   cargo run --example camera_list -- --url ws://camera.local:8002/ws
//!   cargo run --example camera_list -- --debug --no-wait
//!
//! Set `CAMERA_RPC_TOKEN` to authenticate before listing.

// ============================================================================
// Imports
// ============================================================================

use anyhow::Context;
use camera_rpc::service::{AuthService, DeviceService, ServerService};
use camera_rpc::{EventKind, RpcClient, TransportEvent};
use tracing_subscriber::EnvFilter;

// ============================================================================
// Constants
// ============================================================================

const DEFAULT_URL: &str = "ws://localhost:8002/ws";

// ============================================================================
// Args
// ============================================================================

#[derive(Debug, Clone)]
struct Args {
    url: String,
    debug: bool,
    no_wait: bool,
}

impl Args {
    fn parse() -> Self {
        let args: Vec<String> = std::env::args().collect();
        let url = args
            .iter()
            .position(|a| a == "--url")
            .and_then(|i| args.get(i + 1))
            .cloned()
            .unwrap_or_else(|| DEFAULT_URL.to_string());

        Self {
            url,
            debug: args.iter().any(|a| a == "--debug"),
            no_wait: args.iter().any(|a| a == "--no-wait"),
        }
    }
}

fn init_logging(debug: bool) {
    let filter = if debug {
        "camera_rpc=debug"
    } else {
        "camera_rpc=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_logging(args.debug);

    if let Err(e) = run(args).await {
        eprintln!("\n[ERROR] {e:#}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> anyhow::Result<()> {
    println!("=== Camera List ===\n");

    // ========================================================================
    // Connect
    // ========================================================================

    let client = RpcClient::builder()
        .url(&args.url)
        .outbound_queue_size(16)
        .build()
        .context("invalid client configuration")?;

    client.on_event(EventKind::Reconnecting, |event| {
        if let TransportEvent::Reconnecting { attempt, delay } = event {
            println!("[Event] Reconnecting (attempt {attempt}, in {delay:?})");
        }
    });
    client.on_disconnect(|reason, clean| {
        println!("[Event] Disconnected (clean: {clean}): {reason}");
    });

    println!("[Connect] {}", args.url);
    client
        .connect()
        .await
        .with_context(|| format!("could not connect to {}", args.url))?;
    println!("          ✓ Connected\n");

    // ========================================================================
    // Authenticate
    // ========================================================================

    if let Ok(token) = std::env::var("CAMERA_RPC_TOKEN") {
        let auth = AuthService::new(client.clone()).authenticate(&token).await?;
        println!(
            "[Auth] authenticated={} role={}\n",
            auth.authenticated,
            auth.role.as_deref().unwrap_or("-")
        );
    }

    // ========================================================================
    // Query
    // ========================================================================

    let server = ServerService::new(client.clone());
    let info = server.get_server_info().await?;
    println!("[Server] {} {}", info.name, info.version);

    let devices = DeviceService::new(client.clone());
    let list = devices.get_camera_list().await?;
    println!("[Cameras] {} total, {} connected", list.total, list.connected);
    for camera in &list.cameras {
        println!(
            "          {} {} {}",
            camera.device,
            camera.status,
            camera.resolution.as_deref().unwrap_or("")
        );
    }

    // ========================================================================
    // Watch
    // ========================================================================

    let subscription = devices.on_camera_status_update(|camera| {
        println!("[Update] {} → {}", camera.device, camera.status);
    });

    if args.no_wait {
        println!("\n[--no-wait] Skipping wait");
    } else {
        println!("\nWatching status updates. Press Ctrl+C to exit...");
        tokio::signal::ctrl_c().await.ok();
    }

    client.unsubscribe(subscription);
    client.disconnect("demo finished");
    Ok(())
}
