//! Command handlers.
//!
//! Every handler validates its payload completely before touching the
//! platform, so a rejected command leaves no partial effect. Handler
//! outcomes (success or failure) surface through the message ring, not
//! through the scan loop: one bad trade never stops the batch.

use std::str::FromStr;
use std::time::Duration;

use chrono::Utc;
use rust_decimal::Decimal;

use crate::domain::{Instrument, OrderKind, OrderRecord, Ticket, Timeframe};
use crate::error::{BridgeError, BridgeErrorCode};
use crate::platform::{ModifyOrderRequest, OpenOrderRequest, TradingPlatform};

use super::Bridge;

/// Attempts before a history-pending fetch is given up.
const HISTORY_ATTEMPTS: u32 = 10;
/// Pause between history-pending retries.
const HISTORY_RETRY_PAUSE: Duration = Duration::from_millis(200);

impl<P: TradingPlatform> Bridge<P> {
    pub(super) async fn dispatch(&mut self, kind: crate::domain::CommandKind, payload: &str) {
        use crate::domain::CommandKind as K;
        let outcome = match kind {
            K::OpenOrder => self.open_order(payload).await,
            K::ModifyOrder => self.modify_order(payload).await,
            K::CloseOrder => self.close_order(payload).await,
            K::CloseAllOrders => self.close_all_orders().await,
            K::CloseOrdersBySymbol => self.close_orders_by_symbol(payload).await,
            K::CloseOrdersByMagic => self.close_orders_by_magic(payload).await,
            K::SubscribeSymbols => self.subscribe_symbols(payload).await,
            K::SubscribeSymbolsBarData => self.subscribe_symbols_bar_data(payload).await,
            K::GetHistoricData => self.get_historic_data(payload).await,
            K::GetHistoricTrades => self.get_historic_trades(payload).await,
            K::ResetCommandIds => {
                self.registry.reset();
                self.bus.info("Command ids reset");
                Ok(())
            }
        };
        if let Err(err) = outcome {
            self.bus.error(err.code, err.description);
        }
    }

    /// `symbol,kind,lots,price,stop_loss,take_profit,magic,comment,expiration`
    async fn open_order(&mut self, payload: &str) -> Result<(), BridgeError> {
        let fields = split_fields(payload, 9)?;
        let symbol = fields[0];
        let kind = OrderKind::from_str(fields[1]).map_err(|_| {
            BridgeError::new(
                BridgeErrorCode::UnknownOrderType,
                format!("unknown order type: {}", fields[1]),
            )
        })?;
        let lots = parse_decimal(fields[2])?.round_dp(self.config.trading.lot_digits);
        let mut price = parse_decimal(fields[3])?;
        let stop_loss = parse_decimal(fields[4])?;
        let take_profit = parse_decimal(fields[5])?;
        let magic = parse_int(fields[6])?;
        let comment = fields[7].to_string();
        let expiration = parse_int(fields[8])?;

        let info = self.platform.symbol_info(symbol).await.map_err(|err| {
            BridgeError::new(BridgeErrorCode::OpenOrderFailed, err.to_string())
        })?;

        if lots < info.lot_min || lots > info.lot_max || lots > self.config.trading.max_lots {
            return Err(BridgeError::new(
                BridgeErrorCode::InvalidLots,
                format!(
                    "invalid lot size {lots}; allowed range: {} .. {}",
                    info.lot_min,
                    info.lot_max.min(self.config.trading.max_lots)
                ),
            ));
        }

        let open = self.platform.open_orders().await.map_err(|err| {
            BridgeError::new(BridgeErrorCode::OpenOrderFailed, err.to_string())
        })?;
        if open.len() >= self.config.trading.max_orders {
            return Err(BridgeError::new(
                BridgeErrorCode::TooManyOrders,
                format!(
                    "open order limit of {} reached",
                    self.config.trading.max_orders
                ),
            ));
        }

        if price.is_zero() {
            if kind.is_pending() {
                return Err(BridgeError::new(
                    BridgeErrorCode::InvalidPrice,
                    format!("pending order requires a price: {symbol}, {kind}"),
                ));
            }
            let quote = self.platform.quote(symbol).await.map_err(|err| {
                BridgeError::new(BridgeErrorCode::OpenOrderFailed, err.to_string())
            })?;
            price = if kind.is_buy() { quote.ask } else { quote.bid };
        }
        if price <= Decimal::ZERO {
            return Err(BridgeError::new(
                BridgeErrorCode::InvalidPrice,
                format!("invalid price {price} for {symbol}"),
            ));
        }

        let request = OpenOrderRequest {
            symbol: symbol.to_string(),
            kind,
            lots,
            price: price.round_dp(info.digits),
            stop_loss: stop_loss.round_dp(info.digits),
            take_profit: take_profit.round_dp(info.digits),
            magic,
            comment,
            expiration,
        };
        match self.platform.submit_order(request).await {
            Ok(ticket) => {
                self.bus.info(format!(
                    "Successfully sent order {ticket}: {symbol}, {kind}, {lots}, {price}"
                ));
                Ok(())
            }
            Err(err) => Err(BridgeError::new(
                BridgeErrorCode::OpenOrderFailed,
                err.to_string(),
            )),
        }
    }

    /// `ticket,price,stop_loss,take_profit,expiration`
    async fn modify_order(&mut self, payload: &str) -> Result<(), BridgeError> {
        let fields = split_fields(payload, 5)?;
        let ticket = Ticket(parse_int(fields[0])?);
        let mut price = parse_decimal(fields[1])?;
        let stop_loss = parse_decimal(fields[2])?;
        let take_profit = parse_decimal(fields[3])?;
        let expiration = parse_int(fields[4])?;

        let order = self.find_order(ticket).await?;
        if price.is_zero() {
            price = order.open_price;
        }

        let request = ModifyOrderRequest {
            ticket,
            price,
            stop_loss,
            take_profit,
            expiration,
        };
        match self.platform.modify_order(request).await {
            Ok(()) => {
                self.bus.info(format!(
                    "Successfully modified order {ticket}: {}, {}",
                    order.symbol, order.kind
                ));
                Ok(())
            }
            Err(err) => Err(BridgeError::new(
                BridgeErrorCode::ModifyOrderFailed,
                err.to_string(),
            )),
        }
    }

    /// `ticket,lots` where zero lots means the full volume.
    async fn close_order(&mut self, payload: &str) -> Result<(), BridgeError> {
        let fields = split_fields(payload, 2)?;
        let ticket = Ticket(parse_int(fields[0])?);
        let lots = parse_decimal(fields[1])?;

        let order = self.find_order(ticket).await?;
        let result = if order.kind.is_pending() {
            self.platform.delete_order(ticket).await
        } else {
            let lots = if lots.is_zero() { order.lots } else { lots };
            self.platform
                .close_order(ticket, lots, self.config.trading.slippage_points)
                .await
        };
        match result {
            Ok(()) => {
                self.bus.info(format!(
                    "Successfully closed order {ticket}: {}, {}",
                    order.symbol, order.lots
                ));
                Ok(())
            }
            Err(err) => Err(BridgeError::new(
                BridgeErrorCode::CloseOrderFailed,
                err.to_string(),
            )),
        }
    }

    async fn close_all_orders(&mut self) -> Result<(), BridgeError> {
        let orders = self.list_orders().await?;
        self.close_batch(orders).await
    }

    /// Payload is the symbol whose orders are closed.
    async fn close_orders_by_symbol(&mut self, payload: &str) -> Result<(), BridgeError> {
        let symbol = payload.trim();
        if symbol.is_empty() {
            return Err(payload_error("missing symbol"));
        }
        let orders = self
            .list_orders()
            .await?
            .into_iter()
            .filter(|order| order.symbol == symbol)
            .collect();
        self.close_batch(orders).await
    }

    /// Payload is the magic number whose orders are closed.
    async fn close_orders_by_magic(&mut self, payload: &str) -> Result<(), BridgeError> {
        let magic: i64 = parse_int(payload)?;
        let orders = self
            .list_orders()
            .await?
            .into_iter()
            .filter(|order| order.magic == magic)
            .collect();
        self.close_batch(orders).await
    }

    /// Close every order in the batch, newest ticket first so earlier
    /// closes cannot shift the indexes of later ones.
    async fn close_batch(&mut self, mut orders: Vec<OrderRecord>) -> Result<(), BridgeError> {
        if orders.is_empty() {
            self.bus.info("No orders to close");
            return Ok(());
        }
        orders.reverse();
        let mut closed = 0_usize;
        let mut failed = 0_usize;
        for order in &orders {
            let result = if order.kind.is_pending() {
                self.platform.delete_order(order.ticket).await
            } else {
                self.platform
                    .close_order(order.ticket, order.lots, self.config.trading.slippage_points)
                    .await
            };
            match result {
                Ok(()) => closed += 1,
                Err(err) => {
                    failed += 1;
                    tracing::warn!(ticket = %order.ticket, error = %err, "close failed");
                }
            }
        }
        if failed > 0 {
            return Err(BridgeError::new(
                BridgeErrorCode::CloseOrderFailed,
                format!("closed {closed} orders, {failed} failed"),
            ));
        }
        self.bus.info(format!("Successfully closed {closed} orders"));
        Ok(())
    }

    /// Comma-separated symbol list; an empty payload clears the
    /// subscription.
    async fn subscribe_symbols(&mut self, payload: &str) -> Result<(), BridgeError> {
        if payload.trim().is_empty() {
            self.market_symbols.clear();
            self.bus.info("Unsubscribed from all market data");
            return Ok(());
        }

        let mut accepted = Vec::new();
        let mut rejected = Vec::new();
        for symbol in payload.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            match self.platform.symbol_info(symbol).await {
                Ok(_) => accepted.push(symbol.to_string()),
                Err(_) => rejected.push(symbol.to_string()),
            }
        }

        if !accepted.is_empty() {
            self.bus
                .info(format!("Subscribed to market data: {}", accepted.join(", ")));
        }
        self.market_symbols = accepted;
        if rejected.is_empty() {
            Ok(())
        } else {
            Err(BridgeError::new(
                BridgeErrorCode::SubscribeFailed,
                format!("unknown symbols: {}", rejected.join(", ")),
            ))
        }
    }

    /// Flat comma-separated `symbol,timeframe` pairs; an empty payload
    /// clears the subscription. The new list replaces the old one
    /// wholesale and a snapshot is published immediately.
    async fn subscribe_symbols_bar_data(&mut self, payload: &str) -> Result<(), BridgeError> {
        if payload.trim().is_empty() {
            self.instruments.clear();
            self.bus.info("Unsubscribed from all bar data");
            return Ok(());
        }

        let fields: Vec<&str> = payload.split(',').map(str::trim).collect();
        if fields.len() % 2 != 0 {
            return Err(payload_error(format!(
                "bar data subscription needs symbol,timeframe pairs, got {} fields",
                fields.len()
            )));
        }

        let mut accepted = Vec::new();
        let mut rejected = Vec::new();
        for pair in fields.chunks_exact(2) {
            let symbol = pair[0];
            let timeframe = Timeframe::from_str(pair[1])
                .map_err(|_| payload_error(format!("unknown timeframe: {}", pair[1])))?;
            match self.platform.symbol_info(symbol).await {
                Ok(_) => accepted.push(Instrument::new(symbol, timeframe)),
                Err(_) => rejected.push(format!("{symbol},{timeframe}")),
            }
        }

        if self.config.publish.open_charts_bar_data {
            for instrument in &accepted {
                if let Err(err) = self
                    .platform
                    .ensure_chart(&instrument.symbol, instrument.timeframe)
                    .await
                {
                    tracing::warn!(key = %instrument.key(), error = %err, "chart open failed");
                }
            }
        }

        if !accepted.is_empty() {
            let keys: Vec<String> = accepted.iter().map(Instrument::key).collect();
            self.bus
                .info(format!("Subscribed to bar data: {}", keys.join(", ")));
        }
        self.instruments = accepted;
        self.publish_bar_data().await;
        if rejected.is_empty() {
            Ok(())
        } else {
            Err(BridgeError::new(
                BridgeErrorCode::SubscribeFailed,
                format!("unknown instruments: {}", rejected.join(", ")),
            ))
        }
    }

    /// `symbol,timeframe,start,end` with epoch-second bounds.
    async fn get_historic_data(&mut self, payload: &str) -> Result<(), BridgeError> {
        let fields = split_fields(payload, 4)?;
        let symbol = fields[0];
        let timeframe = Timeframe::from_str(fields[1])
            .map_err(|_| payload_error(format!("unknown timeframe: {}", fields[1])))?;
        let start: i64 = parse_int(fields[2])?;
        let end: i64 = parse_int(fields[3])?;
        if end <= start {
            return Err(payload_error(format!("empty time range: {start} .. {end}")));
        }

        if self.config.publish.open_charts_historic_data {
            if let Err(err) = self.platform.ensure_chart(symbol, timeframe).await {
                tracing::warn!(symbol, %timeframe, error = %err, "chart open failed");
            }
        }

        let key = format!("{symbol}_{timeframe}");
        let mut attempt = 0;
        let bars = loop {
            attempt += 1;
            match self.platform.bar_range(symbol, timeframe, start, end).await {
                Ok(bars) if !bars.is_empty() => break bars,
                // An empty answer is definitive; only the history-pending
                // codes mean the terminal is still fetching.
                Ok(_) => {
                    return Err(BridgeError::new(
                        BridgeErrorCode::HistoricDataUnavailable,
                        format!("no historic data for {key} in {start} .. {end}"),
                    ));
                }
                Err(err) if err.is_history_pending() && attempt < HISTORY_ATTEMPTS => {
                    tokio::time::sleep(HISTORY_RETRY_PAUSE).await;
                }
                Err(err) => {
                    return Err(BridgeError::new(
                        BridgeErrorCode::HistoricDataUnavailable,
                        err.to_string(),
                    ));
                }
            }
        };

        // The terminal may simply not keep history that far back; tell
        // the controller when the series starts noticeably later than
        // requested.
        let tolerance = timeframe.start_tolerance_days() * 86_400;
        if let Some(first) = bars.first() {
            if first.time - start > tolerance {
                self.bus.info(format!(
                    "Historic data for {key} starts at {} instead of {start}",
                    first.time
                ));
            }
        }

        let text = super::snapshot::historic_data(&key, &bars);
        let path = self.transport.paths().historic_data();
        if !self.transport.write_retry(&path, &text).await {
            return Err(BridgeError::new(
                BridgeErrorCode::FileWriteFailed,
                format!("could not write {}", path.display()),
            ));
        }
        self.bus
            .info(format!("Fetched {} bars for {key}", bars.len()));
        Ok(())
    }

    /// Payload is the lookback window in days.
    async fn get_historic_trades(&mut self, payload: &str) -> Result<(), BridgeError> {
        let days: i64 = parse_int(payload)?;
        if days <= 0 {
            return Err(payload_error(format!("invalid lookback: {days} days")));
        }

        let cutoff = Utc::now().timestamp() - days * 86_400;
        let trades: Vec<_> = self
            .platform
            .trade_history()
            .await
            .map_err(|err| {
                BridgeError::new(BridgeErrorCode::HistoricTradesFailed, err.to_string())
            })?
            .into_iter()
            .filter(|trade| trade.open_time.timestamp() >= cutoff)
            .collect();

        let text = super::snapshot::historic_trades(&trades);
        let path = self.transport.paths().historic_trades();
        if !self.transport.write_retry(&path, &text).await {
            return Err(BridgeError::new(
                BridgeErrorCode::FileWriteFailed,
                format!("could not write {}", path.display()),
            ));
        }
        self.bus.info(format!(
            "Fetched {} trades from the last {days} days",
            trades.len()
        ));
        Ok(())
    }

    async fn list_orders(&self) -> Result<Vec<OrderRecord>, BridgeError> {
        self.platform.open_orders().await.map_err(|err| {
            BridgeError::new(BridgeErrorCode::CloseOrderFailed, err.to_string())
        })
    }

    async fn find_order(&self, ticket: Ticket) -> Result<OrderRecord, BridgeError> {
        self.list_orders()
            .await?
            .into_iter()
            .find(|order| order.ticket == ticket)
            .ok_or_else(|| {
                BridgeError::new(
                    BridgeErrorCode::OrderNotFound,
                    format!("no open order with ticket {ticket}"),
                )
            })
    }
}

fn split_fields(payload: &str, expected: usize) -> Result<Vec<&str>, BridgeError> {
    let fields: Vec<&str> = payload.split(',').map(str::trim).collect();
    if fields.len() == expected {
        Ok(fields)
    } else {
        Err(payload_error(format!(
            "expected {expected} fields, got {}",
            fields.len()
        )))
    }
}

fn payload_error(description: impl Into<String>) -> BridgeError {
    BridgeError::new(BridgeErrorCode::WrongFormatPayload, description)
}

fn parse_decimal(field: &str) -> Result<Decimal, BridgeError> {
    field
        .parse()
        .map_err(|_| payload_error(format!("not a number: {field}")))
}

fn parse_int<T: FromStr>(field: &str) -> Result<T, BridgeError> {
    field
        .trim()
        .parse()
        .map_err(|_| payload_error(format!("not an integer: {field}")))
}
