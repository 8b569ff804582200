//! Terminal Bridge Binary
//!
//! Starts the bridge over a paper trading platform.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin terminal-bridge [config.yaml]
//! ```
//!
//! # Environment Variables
//!
//! - `BRIDGE_CONFIG`: Config file path (default: bridge.yaml; falls
//!   back to built-in defaults when the default file is absent)
//! - `RUST_LOG`: Log level (default: info)

use std::sync::Arc;

use tokio::signal;
use tokio::sync::{mpsc, watch};

use terminal_bridge::platform::paper::PaperPlatform;
use terminal_bridge::{load_config, Bridge};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config_path = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("BRIDGE_CONFIG").ok());
    let config = load_config(config_path.as_deref())?;

    tracing::info!("Starting terminal bridge");

    let platform = Arc::new(seed_platform());
    let mut bridge = Bridge::new(config, platform)?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(shutdown_signal(shutdown_tx));

    // The paper platform has no terminal tick source; the interval
    // timer alone drives cycles. An embedding with real tick events
    // sends them through this channel.
    let (_tick_tx, tick_rx) = mpsc::channel::<()>(64);

    bridge.run(tick_rx, shutdown_rx).await;
    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(
                "terminal_bridge=info"
                    .parse()
                    .expect("static directive 'terminal_bridge=info' is valid"),
            ),
        )
        .init();
}

/// Paper platform seeded with a few forex majors so the bridge has
/// something to quote out of the box.
fn seed_platform() -> PaperPlatform {
    use rust_decimal::Decimal;

    let platform = PaperPlatform::new();
    platform.add_default_symbol(
        "EURUSD",
        Decimal::new(108_500, 5),
        Decimal::new(108_510, 5),
    );
    platform.add_default_symbol(
        "GBPUSD",
        Decimal::new(126_700, 5),
        Decimal::new(126_715, 5),
    );
    platform.add_default_symbol(
        "USDJPY",
        Decimal::new(147_250, 3),
        Decimal::new(147_265, 3),
    );
    platform
}

/// Wait for shutdown signal (SIGTERM or SIGINT).
async fn shutdown_signal(shutdown_tx: watch::Sender<bool>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("signal handler installation is critical for graceful shutdown");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("SIGTERM handler installation is critical for graceful shutdown")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
    }

    let _ = shutdown_tx.send(true);
}
