//! In-process paper trading platform.
//!
//! Deterministic [`TradingPlatform`] implementation used by the binary
//! when no real terminal is attached, and by the integration tests.
//! State lives behind a single lock; tickets are assigned from a
//! monotonic counter.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use rust_decimal::Decimal;

use crate::domain::{
    AccountSnapshot, Bar, OrderRecord, Quote, SymbolInfo, Ticket, Timeframe, TradeRecord,
};
use crate::platform::{
    ModifyOrderRequest, OpenOrderRequest, PlatformError, TradingPlatform,
    CODE_HISTORY_WILL_UPDATE,
};

#[derive(Debug, Clone)]
struct SymbolState {
    info: SymbolInfo,
    quote: Quote,
}

#[derive(Debug, Default)]
struct Inner {
    symbols: HashMap<String, SymbolState>,
    orders: Vec<OrderRecord>,
    history: Vec<TradeRecord>,
    latest_bars: HashMap<(String, Timeframe), Bar>,
    bar_series: HashMap<(String, Timeframe), Vec<Bar>>,
    charts: HashSet<(String, Timeframe)>,
    next_ticket: u64,
    history_pending_remaining: u32,
    fail_submit_code: Option<i32>,
}

/// Paper trading platform with deterministic, test-controllable state.
pub struct PaperPlatform {
    account: RwLock<AccountSnapshot>,
    inner: RwLock<Inner>,
}

impl PaperPlatform {
    /// Create an empty paper platform with a default demo account.
    #[must_use]
    pub fn new() -> Self {
        Self {
            account: RwLock::new(AccountSnapshot {
                name: "Paper Trader".to_string(),
                number: 1_000_001,
                currency: "USD".to_string(),
                leverage: 100,
                free_margin: Decimal::new(10_000, 0),
                balance: Decimal::new(10_000, 0),
                equity: Decimal::new(10_000, 0),
                margin: Decimal::ZERO,
            }),
            inner: RwLock::new(Inner {
                next_ticket: 1,
                ..Inner::default()
            }),
        }
    }

    /// Register a symbol with its trading properties and initial quote.
    pub fn add_symbol(&self, symbol: &str, info: SymbolInfo, quote: Quote) {
        let mut inner = self.inner.write();
        inner
            .symbols
            .insert(symbol.to_string(), SymbolState { info, quote });
    }

    /// Register a forex-style symbol with five digits and 0.01..100 lots.
    pub fn add_default_symbol(&self, symbol: &str, bid: Decimal, ask: Decimal) {
        self.add_symbol(
            symbol,
            SymbolInfo {
                digits: 5,
                lot_min: Decimal::new(1, 2),
                lot_max: Decimal::new(100, 0),
                tick_value: Decimal::ONE,
            },
            Quote { bid, ask },
        );
    }

    /// Update a symbol's quote.
    pub fn set_quote(&self, symbol: &str, bid: Decimal, ask: Decimal) {
        let mut inner = self.inner.write();
        if let Some(state) = inner.symbols.get_mut(symbol) {
            state.quote = Quote { bid, ask };
        }
    }

    /// Pin the latest closed bar for an instrument.
    pub fn set_latest_bar(&self, symbol: &str, timeframe: Timeframe, bar: Bar) {
        let mut inner = self.inner.write();
        inner
            .latest_bars
            .insert((symbol.to_string(), timeframe), bar);
    }

    /// Provide a bar series served by `bar_range` for an instrument.
    pub fn set_bar_series(&self, symbol: &str, timeframe: Timeframe, bars: Vec<Bar>) {
        let mut inner = self.inner.write();
        inner.bar_series.insert((symbol.to_string(), timeframe), bars);
    }

    /// Seed the closed-trade history, most recent first.
    pub fn set_history(&self, trades: Vec<TradeRecord>) {
        self.inner.write().history = trades;
    }

    /// Fail the next `attempts` range queries with a history-updating code.
    pub fn set_history_pending(&self, attempts: u32) {
        self.inner.write().history_pending_remaining = attempts;
    }

    /// Fail every subsequent submission with the given trade-server code.
    pub fn fail_submissions_with(&self, code: i32) {
        self.inner.write().fail_submit_code = Some(code);
    }

    /// Number of open and pending orders.
    #[must_use]
    pub fn open_order_count(&self) -> usize {
        self.inner.read().orders.len()
    }

    /// Charts opened through `ensure_chart`, for assertions.
    #[must_use]
    pub fn opened_charts(&self) -> Vec<(String, Timeframe)> {
        let mut charts: Vec<_> = self.inner.read().charts.iter().cloned().collect();
        charts.sort();
        charts
    }

    fn symbol_state(inner: &Inner, symbol: &str) -> Result<SymbolState, PlatformError> {
        inner
            .symbols
            .get(symbol)
            .cloned()
            .ok_or_else(|| PlatformError::UnknownSymbol {
                symbol: symbol.to_string(),
            })
    }

    // Synthetic bar derived from the current quote when no bar was
    // pinned, aligned to the previous full timeframe period.
    fn synthetic_bar(quote: Quote, timeframe: Timeframe) -> Bar {
        let period = timeframe.seconds();
        let now = Utc::now().timestamp();
        let time = (now / period) * period - period;
        let spread = quote.ask - quote.bid;
        Bar {
            time,
            open: quote.bid,
            high: quote.ask,
            low: quote.bid - spread,
            close: quote.bid,
            tick_volume: 100,
        }
    }
}

impl Default for PaperPlatform {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TradingPlatform for PaperPlatform {
    async fn account(&self) -> Result<AccountSnapshot, PlatformError> {
        Ok(self.account.read().clone())
    }

    async fn quote(&self, symbol: &str) -> Result<Quote, PlatformError> {
        let inner = self.inner.read();
        Ok(Self::symbol_state(&inner, symbol)?.quote)
    }

    async fn symbol_info(&self, symbol: &str) -> Result<SymbolInfo, PlatformError> {
        let inner = self.inner.read();
        Ok(Self::symbol_state(&inner, symbol)?.info)
    }

    async fn open_orders(&self) -> Result<Vec<OrderRecord>, PlatformError> {
        Ok(self.inner.read().orders.clone())
    }

    async fn submit_order(&self, request: OpenOrderRequest) -> Result<Ticket, PlatformError> {
        let mut inner = self.inner.write();
        if let Some(code) = inner.fail_submit_code {
            return Err(PlatformError::code(code));
        }
        Self::symbol_state(&inner, &request.symbol)?;

        let ticket = Ticket(inner.next_ticket);
        inner.next_ticket += 1;
        inner.orders.push(OrderRecord {
            ticket,
            symbol: request.symbol,
            kind: request.kind,
            lots: request.lots,
            open_price: request.price,
            open_time: Utc::now(),
            stop_loss: request.stop_loss,
            take_profit: request.take_profit,
            magic: request.magic,
            comment: request.comment,
            profit: Decimal::ZERO,
            swap: Decimal::ZERO,
            commission: Decimal::ZERO,
        });
        Ok(ticket)
    }

    async fn modify_order(&self, request: ModifyOrderRequest) -> Result<(), PlatformError> {
        let mut inner = self.inner.write();
        let order = inner
            .orders
            .iter_mut()
            .find(|o| o.ticket == request.ticket)
            .ok_or(PlatformError::OrderNotFound {
                ticket: request.ticket,
            })?;
        order.open_price = request.price;
        order.stop_loss = request.stop_loss;
        order.take_profit = request.take_profit;
        Ok(())
    }

    async fn close_order(
        &self,
        ticket: Ticket,
        lots: Decimal,
        _slippage_points: u32,
    ) -> Result<(), PlatformError> {
        let mut inner = self.inner.write();
        let index = inner
            .orders
            .iter()
            .position(|o| o.ticket == ticket)
            .ok_or(PlatformError::OrderNotFound { ticket })?;

        let order = inner.orders[index].clone();
        let state = Self::symbol_state(&inner, &order.symbol)?;
        let close_price = if order.kind.is_buy() {
            state.quote.bid
        } else {
            state.quote.ask
        };
        let direction = if order.kind.is_buy() {
            Decimal::ONE
        } else {
            -Decimal::ONE
        };
        let closed_lots = if lots.is_zero() || lots >= order.lots {
            order.lots
        } else {
            lots
        };
        // Flat one-point value per lot; good enough for paper fills.
        let profit = (close_price - order.open_price) * direction * closed_lots;

        if closed_lots == order.lots {
            inner.orders.remove(index);
        } else {
            inner.orders[index].lots -= closed_lots;
        }
        inner.history.insert(
            0,
            TradeRecord {
                ticket: order.ticket,
                symbol: order.symbol,
                kind: order.kind,
                lots: closed_lots,
                open_price: order.open_price,
                close_price,
                open_time: order.open_time,
                close_time: Utc::now(),
                stop_loss: order.stop_loss,
                take_profit: order.take_profit,
                magic: order.magic,
                comment: order.comment,
                profit,
                swap: Decimal::ZERO,
                commission: Decimal::ZERO,
            },
        );

        let mut account = self.account.write();
        account.balance += profit;
        account.equity += profit;
        Ok(())
    }

    async fn delete_order(&self, ticket: Ticket) -> Result<(), PlatformError> {
        let mut inner = self.inner.write();
        let index = inner
            .orders
            .iter()
            .position(|o| o.ticket == ticket)
            .ok_or(PlatformError::OrderNotFound { ticket })?;
        inner.orders.remove(index);
        Ok(())
    }

    async fn latest_bar(&self, symbol: &str, timeframe: Timeframe) -> Result<Bar, PlatformError> {
        let inner = self.inner.read();
        if let Some(bar) = inner.latest_bars.get(&(symbol.to_string(), timeframe)) {
            return Ok(*bar);
        }
        let state = Self::symbol_state(&inner, symbol)?;
        Ok(Self::synthetic_bar(state.quote, timeframe))
    }

    async fn bar_range(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        start: i64,
        end: i64,
    ) -> Result<Vec<Bar>, PlatformError> {
        {
            let mut inner = self.inner.write();
            if inner.history_pending_remaining > 0 {
                inner.history_pending_remaining -= 1;
                return Err(PlatformError::code(CODE_HISTORY_WILL_UPDATE));
            }
        }

        let inner = self.inner.read();
        Self::symbol_state(&inner, symbol)?;
        let bars = inner
            .bar_series
            .get(&(symbol.to_string(), timeframe))
            .map(|series| {
                series
                    .iter()
                    .filter(|bar| bar.time >= start && bar.time <= end)
                    .copied()
                    .collect()
            })
            .unwrap_or_default();
        Ok(bars)
    }

    async fn trade_history(&self) -> Result<Vec<TradeRecord>, PlatformError> {
        Ok(self.inner.read().history.clone())
    }

    async fn ensure_chart(
        &self,
        symbol: &str,
        timeframe: Timeframe,
    ) -> Result<(), PlatformError> {
        let mut inner = self.inner.write();
        inner.charts.insert((symbol.to_string(), timeframe));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn eurusd() -> PaperPlatform {
        let platform = PaperPlatform::new();
        platform.add_default_symbol("EURUSD", Decimal::new(110_000, 5), Decimal::new(110_010, 5));
        platform
    }

    #[tokio::test]
    async fn submit_assigns_increasing_tickets() {
        let platform = eurusd();
        let request = OpenOrderRequest {
            symbol: "EURUSD".to_string(),
            kind: crate::domain::OrderKind::Buy,
            lots: Decimal::new(1, 2),
            price: Decimal::new(110_010, 5),
            stop_loss: Decimal::ZERO,
            take_profit: Decimal::ZERO,
            magic: 1,
            comment: String::new(),
            expiration: 0,
        };
        let first = platform.submit_order(request.clone()).await.unwrap();
        let second = platform.submit_order(request).await.unwrap();
        assert!(second.0 > first.0);
        assert_eq!(platform.open_order_count(), 2);
    }

    #[tokio::test]
    async fn close_moves_order_into_history() {
        let platform = eurusd();
        let ticket = platform
            .submit_order(OpenOrderRequest {
                symbol: "EURUSD".to_string(),
                kind: crate::domain::OrderKind::Buy,
                lots: Decimal::new(1, 2),
                price: Decimal::new(110_010, 5),
                stop_loss: Decimal::ZERO,
                take_profit: Decimal::ZERO,
                magic: 1,
                comment: String::new(),
                expiration: 0,
            })
            .await
            .unwrap();

        platform.close_order(ticket, Decimal::ZERO, 3).await.unwrap();
        assert_eq!(platform.open_order_count(), 0);
        let history = platform.trade_history().await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].ticket, ticket);
    }

    #[tokio::test]
    async fn unknown_symbol_is_an_error() {
        let platform = PaperPlatform::new();
        let err = platform.quote("GBPUSD").await.unwrap_err();
        assert!(matches!(err, PlatformError::UnknownSymbol { .. }));
    }

    #[tokio::test]
    async fn history_pending_counts_down() {
        let platform = eurusd();
        platform.set_history_pending(2);
        assert!(platform
            .bar_range("EURUSD", Timeframe::M1, 0, i64::MAX)
            .await
            .unwrap_err()
            .is_history_pending());
        assert!(platform
            .bar_range("EURUSD", Timeframe::M1, 0, i64::MAX)
            .await
            .unwrap_err()
            .is_history_pending());
        assert!(platform
            .bar_range("EURUSD", Timeframe::M1, 0, i64::MAX)
            .await
            .is_ok());
    }
}
