//! Bridge core: owned state and cycle orchestration.
//!
//! One `Bridge` owns every piece of mutable state (dedup registry,
//! subscription lists, snapshot caches, message ring) and is driven by
//! a single task, so a cycle always runs to completion before the next
//! begins and no locking is needed.

mod dispatch;
mod ingest;
mod publish;
pub mod snapshot;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;

use crate::config::Config;
use crate::domain::{CommandIdRegistry, Instrument, MessageBus};
use crate::platform::TradingPlatform;
use crate::transport::{BridgePaths, FileTransport};

/// Orders snapshot is rewritten at least this often even without change.
const ORDER_HEARTBEAT: Duration = Duration::from_millis(1000);

/// The file bridge between the terminal and an external controller.
pub struct Bridge<P> {
    platform: Arc<P>,
    config: Config,
    transport: FileTransport,
    registry: CommandIdRegistry,
    bus: MessageBus,
    /// Symbols subscribed for tick snapshots.
    market_symbols: Vec<String>,
    /// Instruments subscribed for bar publishing.
    instruments: Vec<Instrument>,
    last_market_data: String,
    last_orders: String,
    last_orders_write: Option<tokio::time::Instant>,
    last_messages: String,
}

impl<P: TradingPlatform> Bridge<P> {
    /// Create a bridge over the configured data directory.
    ///
    /// # Errors
    ///
    /// Returns the IO error if the data directory cannot be created.
    pub fn new(config: Config, platform: Arc<P>) -> std::io::Result<Self> {
        let transport = FileTransport::new(BridgePaths::new(config.bridge.data_dir.clone()))?;
        let registry = CommandIdRegistry::new(config.ingest.registry_capacity);
        let bus = MessageBus::new(config.publish.message_buffer);
        Ok(Self {
            platform,
            config,
            transport,
            registry,
            bus,
            market_symbols: Vec::new(),
            instruments: Vec::new(),
            last_market_data: String::new(),
            last_orders: String::new(),
            last_orders_write: None,
            last_messages: String::new(),
        })
    }

    /// Transport path layout, for consumers that need the file locations.
    #[must_use]
    pub fn paths(&self) -> &BridgePaths {
        self.transport.paths()
    }

    /// Run one full cycle: drain commands, then publish state.
    ///
    /// Publishers run regardless of command outcomes; an aborted
    /// ingestion scan never skips a publish.
    pub async fn cycle(&mut self) {
        self.check_commands().await;
        self.publish_market_data().await;
        self.publish_bar_data().await;
        self.publish_orders().await;
        self.flush_messages().await;
    }

    /// Delete all output and command files so the controller observes
    /// a fresh state. Called at startup and again at shutdown.
    pub fn reset_files(&self) {
        self.transport.reset(self.config.bridge.max_command_files);
    }

    /// Drive cycles until `shutdown` fires.
    ///
    /// A fixed-interval timer and the host's tick events both trigger
    /// cycles; both run on this task, so cycles never overlap.
    pub async fn run(
        &mut self,
        mut ticks: mpsc::Receiver<()>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        self.reset_files();
        tracing::info!(
            data_dir = %self.paths().root().display(),
            interval_ms = self.config.bridge.interval_ms,
            "bridge started"
        );

        let mut timer =
            tokio::time::interval(Duration::from_millis(self.config.bridge.interval_ms));
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = timer.tick() => self.cycle().await,
                Some(()) = ticks.recv() => self.cycle().await,
                _ = shutdown.changed() => break,
            }
        }

        self.reset_files();
        tracing::info!("bridge stopped");
    }
}
