//! Trading platform port.
//!
//! The terminal's trading, account, and market-data capability is
//! consumed through this port. The bridge never talks to the terminal
//! directly; handlers validate first and call the port only when the
//! request already passed every local check.

mod error;
pub mod paper;

pub use error::{
    describe_code, PlatformError, CODE_HISTORY_WILL_UPDATE, CODE_NO_HISTORY_DATA,
};

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::domain::{
    AccountSnapshot, Bar, OrderKind, OrderRecord, Quote, SymbolInfo, Ticket, Timeframe,
    TradeRecord,
};

/// Request to open a market or pending order.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenOrderRequest {
    /// Instrument symbol.
    pub symbol: String,
    /// Order kind.
    pub kind: OrderKind,
    /// Volume in lots, already rounded to the configured precision.
    pub lots: Decimal,
    /// Order price, already resolved (never zero).
    pub price: Decimal,
    /// Stop-loss price, zero when unset.
    pub stop_loss: Decimal,
    /// Take-profit price, zero when unset.
    pub take_profit: Decimal,
    /// Caller-assigned strategy tag.
    pub magic: i64,
    /// Operator comment.
    pub comment: String,
    /// Expiration, seconds since the epoch; zero for none.
    pub expiration: i64,
}

/// Request to modify an existing order.
#[derive(Debug, Clone, PartialEq)]
pub struct ModifyOrderRequest {
    /// Ticket of the order to modify.
    pub ticket: Ticket,
    /// New price; the handler substitutes the original open price
    /// before this request is built, so it is never zero.
    pub price: Decimal,
    /// New stop-loss price, zero to clear.
    pub stop_loss: Decimal,
    /// New take-profit price, zero to clear.
    pub take_profit: Decimal,
    /// New expiration, seconds since the epoch; zero for none.
    pub expiration: i64,
}

/// Port for the terminal's trading and market-data capability.
#[async_trait]
pub trait TradingPlatform: Send + Sync {
    /// Current account state.
    async fn account(&self) -> Result<AccountSnapshot, PlatformError>;

    /// Current quote for a symbol.
    async fn quote(&self, symbol: &str) -> Result<Quote, PlatformError>;

    /// Static trading properties of a symbol.
    async fn symbol_info(&self, symbol: &str) -> Result<SymbolInfo, PlatformError>;

    /// All currently open and pending orders.
    async fn open_orders(&self) -> Result<Vec<OrderRecord>, PlatformError>;

    /// Submit a new order; returns the assigned ticket.
    async fn submit_order(&self, request: OpenOrderRequest) -> Result<Ticket, PlatformError>;

    /// Modify an existing order.
    async fn modify_order(&self, request: ModifyOrderRequest) -> Result<(), PlatformError>;

    /// Close a market order (fully, or partially when `lots` is less
    /// than the order volume) at the current close price.
    async fn close_order(
        &self,
        ticket: Ticket,
        lots: Decimal,
        slippage_points: u32,
    ) -> Result<(), PlatformError>;

    /// Delete a pending order outright.
    async fn delete_order(&self, ticket: Ticket) -> Result<(), PlatformError>;

    /// Latest closed bar for an instrument.
    async fn latest_bar(&self, symbol: &str, timeframe: Timeframe) -> Result<Bar, PlatformError>;

    /// Bar series for a time range, oldest first.
    async fn bar_range(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        start: i64,
        end: i64,
    ) -> Result<Vec<Bar>, PlatformError>;

    /// Closed trades, most recent first.
    async fn trade_history(&self) -> Result<Vec<TradeRecord>, PlatformError>;

    /// Pre-open a chart so the first bar fetch does not miss history.
    async fn ensure_chart(&self, symbol: &str, timeframe: Timeframe)
        -> Result<(), PlatformError>;
}
