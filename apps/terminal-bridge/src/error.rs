//! Typed error reasons surfaced through the message bus.
//!
//! Every failure the bridge reports to the controller carries one of
//! these codes plus a human-readable description. The codes travel in
//! the messages file as the `error_type` field, so their reason strings
//! are part of the wire contract and must stay stable.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error codes reported through the message bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BridgeErrorCode {
    // Command framing/format errors
    /// Command frame does not begin with the start marker.
    WrongFormatStartIdentifier,
    /// Command frame does not end with the end marker.
    WrongFormatEndIdentifier,
    /// Command frame does not split into exactly three fields.
    WrongFormatCommand,
    /// Command payload has the wrong field count or an unparsable field.
    WrongFormatPayload,

    // Business-rule violations
    /// Order type string is not recognized.
    UnknownOrderType,
    /// Lot size outside the symbol's or the configured limits.
    InvalidLots,
    /// Open-order count has reached the configured maximum.
    TooManyOrders,
    /// Resolved order price is zero or otherwise unusable.
    InvalidPrice,
    /// Ticket does not match any open order.
    OrderNotFound,

    // Platform-call failures
    /// Platform rejected the order submission.
    OpenOrderFailed,
    /// Platform rejected the order modification.
    ModifyOrderFailed,
    /// Platform rejected the close/delete request.
    CloseOrderFailed,
    /// Symbol subscription failed.
    SubscribeFailed,
    /// Historic data could not be retrieved.
    HistoricDataUnavailable,
    /// Trade history could not be retrieved.
    HistoricTradesFailed,
    /// A subscribed symbol's quote could not be read.
    MarketDataUnavailable,

    // Transport failures
    /// An output file could not be written after bounded retries.
    FileWriteFailed,
}

impl BridgeErrorCode {
    /// Stable reason string written to the messages file.
    #[must_use]
    pub const fn reason(&self) -> &'static str {
        match self {
            Self::WrongFormatStartIdentifier => "WRONG_FORMAT_START_IDENTIFIER",
            Self::WrongFormatEndIdentifier => "WRONG_FORMAT_END_IDENTIFIER",
            Self::WrongFormatCommand => "WRONG_FORMAT_COMMAND",
            Self::WrongFormatPayload => "WRONG_FORMAT_PAYLOAD",
            Self::UnknownOrderType => "UNKNOWN_ORDER_TYPE",
            Self::InvalidLots => "INVALID_LOTS",
            Self::TooManyOrders => "TOO_MANY_ORDERS",
            Self::InvalidPrice => "INVALID_PRICE",
            Self::OrderNotFound => "ORDER_NOT_FOUND",
            Self::OpenOrderFailed => "OPEN_ORDER_FAILED",
            Self::ModifyOrderFailed => "MODIFY_ORDER_FAILED",
            Self::CloseOrderFailed => "CLOSE_ORDER_FAILED",
            Self::SubscribeFailed => "SUBSCRIBE_FAILED",
            Self::HistoricDataUnavailable => "HISTORIC_DATA_UNAVAILABLE",
            Self::HistoricTradesFailed => "HISTORIC_TRADES_FAILED",
            Self::MarketDataUnavailable => "MARKET_DATA_UNAVAILABLE",
            Self::FileWriteFailed => "FILE_WRITE_FAILED",
        }
    }
}

impl std::fmt::Display for BridgeErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.reason())
    }
}

/// An error destined for the message bus: code plus description.
#[derive(Debug, Clone, Error)]
#[error("[{code}] {description}")]
pub struct BridgeError {
    /// Typed reason.
    pub code: BridgeErrorCode,
    /// Human-readable description.
    pub description: String,
}

impl BridgeError {
    /// Create a new bridge error.
    #[must_use]
    pub fn new(code: BridgeErrorCode, description: impl Into<String>) -> Self {
        Self {
            code,
            description: description.into(),
        }
    }
}
