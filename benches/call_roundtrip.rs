//! Call round-trip benchmark suite.
//!
//! Measures request/response latency against a loopback JSON-RPC server:
//! - Sequential calls
//! - Concurrent bursts: 10, 50 calls
//!
//! Run with: cargo bench --bench call_roundtrip
//! Results saved to: target/criterion/

use std::net::SocketAddr;
use std::time::Duration;

use camera_rpc::RpcClient;
use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use futures_util::future::join_all;
use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::runtime::Runtime;
use tokio_tungstenite::tungstenite::Message;
use tracing_subscriber::EnvFilter;

// ============================================================================
// Benchmark Parameters
// ============================================================================

const BURST_SIZES: &[usize] = &[10, 50];

// ============================================================================
// Loopback Server
// ============================================================================

/// Spawns a server that answers every request with its params.
async fn spawn_echo_server() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind loopback listener");
    let addr = listener.local_addr().expect("listener address");

    tokio::spawn(async move {
        while let Ok((tcp, _)) = listener.accept().await {
            tokio::spawn(async move {
                let Ok(mut ws) = tokio_tungstenite::accept_async(tcp).await else {
                    return;
                };
                while let Some(Ok(Message::Text(text))) = ws.next().await {
                    let Ok(request) = serde_json::from_str::<Value>(text.as_str()) else {
                        continue;
                    };
                    let response = json!({
                        "jsonrpc": "2.0",
                        "id": request["id"],
                        "result": request["params"],
                    });
                    if ws
                        .send(Message::Text(response.to_string().into()))
                        .await
                        .is_err()
                    {
                        break;
                    }
                }
            });
        }
    });

    addr
}

async fn connected_client(addr: SocketAddr) -> RpcClient {
    let client = RpcClient::builder()
        .url(format!("ws://{addr}"))
        .heartbeat_interval(Duration::ZERO)
        .build()
        .expect("build client");
    client.connect().await.expect("connect");
    client
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();
}

// ============================================================================
// Benchmark: Sequential Calls
// ============================================================================

fn bench_sequential(c: &mut Criterion) {
    init_tracing();
    let rt = Runtime::new().expect("runtime");
    let client = rt.block_on(async { connected_client(spawn_echo_server().await).await });

    c.bench_function("call_sequential", |b| {
        b.to_async(&rt).iter(|| async {
            client
                .call("get_camera_status", Some(json!({ "device": "camera0" })))
                .await
                .expect("call")
        });
    });

    client.disconnect("benchmark complete");
}

// ============================================================================
// Benchmark: Concurrent Bursts
// ============================================================================

fn bench_burst(c: &mut Criterion) {
    init_tracing();
    let rt = Runtime::new().expect("runtime");
    let client = rt.block_on(async { connected_client(spawn_echo_server().await).await });

    let mut group = c.benchmark_group("call_burst");

    for &size in BURST_SIZES {
        group.bench_with_input(BenchmarkId::new("concurrent", size), &size, |b, &size| {
            b.to_async(&rt).iter(|| async {
                let calls = (0..size).map(|i| client.call("ping", Some(json!({ "n": i }))));
                for result in join_all(calls).await {
                    result.expect("call");
                }
            });
        });
    }

    group.finish();
    client.disconnect("benchmark complete");
}

criterion_group!(benches, bench_sequential, bench_burst);
criterion_main!(benches);
