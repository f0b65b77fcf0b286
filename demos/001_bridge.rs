//! Host bridge demonstration.
//!
//! Demonstrates:
//! - Binding the bridge and waiting for the host shim
//! - Polling a tab's manifests over the in-process channel
//! - Resolving each manifest to a player link
//!
//! Usage:
//!   cargo run --example 001_bridge
//!   cargo run --example 001_bridge -- --tab 12
//!   cargo run --example 001_bridge -- --debug

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use tracing_subscriber::EnvFilter;

use hls_sniffer::{PendingBridge, PlayerPreferences, Result, SnifferConfig, TabId};

// ============================================================================
// Constants
// ============================================================================

const POLL_INTERVAL: Duration = Duration::from_secs(5);

// ============================================================================
// Args
// ============================================================================

#[derive(Debug, Clone)]
struct Args {
    debug: bool,
    tab: u32,
}

impl Args {
    fn parse() -> Self {
        let args: Vec<String> = std::env::args().collect();
        let tab = args
            .iter()
            .position(|a| a == "--tab")
            .and_then(|i| args.get(i + 1))
            .and_then(|v| v.parse().ok())
            .unwrap_or(1);

        Self {
            debug: args.iter().any(|a| a == "--debug"),
            tab,
        }
    }
}

fn init_logging(debug: bool) {
    let filter = if debug {
        "hls_sniffer=debug"
    } else {
        "hls_sniffer=info"
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
        eprintln!("\n[ERROR] {e}");
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    println!("=== 001: Host Bridge ===\n");

    let pending = PendingBridge::bind(SnifferConfig::new()).await?;
    println!("[Setup] Start the host shim with {}", pending.ws_url());

    let bridge = pending.accept().await?;
    println!("[Setup] Connected, session {}\n", bridge.session_id());

    let ui = bridge.channel();
    let preferences = PlayerPreferences::default();
    let tab = TabId::from(args.tab);

    let mut interval = tokio::time::interval(POLL_INTERVAL);
    loop {
        tokio::select! {
            _ = bridge.closed() => break,
            _ = tokio::signal::ctrl_c() => break,
            _ = interval.tick() => {
                let records = ui.get_manifests(tab).await?;
                println!("[Tab {tab}] {} manifest(s)", records.len());
                for record in &records {
                    println!("        {} ({})", record.url, record.origin_label);
                    println!("        -> {}", preferences.resolve(&record.url)?);
                }
            }
        }
    }

    println!("\n=== Done ===");
    Ok(())
}
