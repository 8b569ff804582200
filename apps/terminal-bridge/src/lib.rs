// Allow unwrap/expect in tests - tests should panic on unexpected errors
#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::too_many_lines,
        clippy::items_after_statements
    )
)]

//! Terminal Bridge - Rust Core Library
//!
//! File-based bridge between a trading terminal and an external
//! controller process. The controller drops numbered command files
//! into a shared directory; the bridge ingests them exactly once,
//! executes the trading operations they describe, and publishes the
//! terminal's state back as snapshot files.
//!
//! # Layers (inside → outside)
//!
//! - **Domain**: Pure types and invariants, no IO
//!   - `command`: Wire frame parsing and the command vocabulary
//!   - `registry`: Circular command-id dedup registry
//!   - `message`: Ring-buffered message log with forced-unique keys
//!   - `order` / `market`: Orders, trades, quotes, bars, timeframes
//!
//! - **Platform**: Port to the terminal's trading capability
//!   - [`platform::TradingPlatform`]: The port trait
//!   - [`platform::paper::PaperPlatform`]: Deterministic in-process adapter
//!
//! - **Transport**: Shared-directory file IO with bounded retries
//!
//! - **Bridge**: Cycle orchestration (ingest → dispatch → publish)

/// Domain layer - Commands, orders, market data, messages.
pub mod domain;

/// Trading platform port and adapters.
pub mod platform;

/// File transport - Paths, retrying writes, command file cleanup.
pub mod transport;

/// Bridge core - Ingestion, dispatch, and publishing cycle.
pub mod bridge;

/// Runtime configuration loaded from YAML.
pub mod config;

/// Bridge error codes and reporting.
pub mod error;

pub use bridge::Bridge;
pub use config::{load_config, Config};
pub use error::{BridgeError, BridgeErrorCode};
pub use platform::TradingPlatform;
