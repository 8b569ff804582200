//! Snapshot serialization for every output file.
//!
//! All payloads are built through `serde_json` values rather than
//! string concatenation, so operator comments and symbols containing
//! quotes or backslashes are escaped correctly. Decimals become plain
//! JSON numbers at this boundary; the consumer treats them as floats.

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde_json::{json, Map, Value};

use crate::domain::{AccountSnapshot, Bar, OrderRecord, Quote, TradeRecord};

/// Time format shared by the orders, bar, and trade snapshots.
const TIME_FORMAT: &str = "%Y.%m.%d %H:%M:%S";
/// Bar times omit seconds; bars never start mid-minute.
const BAR_TIME_FORMAT: &str = "%Y.%m.%d %H:%M";

fn num(value: Decimal) -> Value {
    Value::from(value.to_f64().unwrap_or(0.0))
}

fn time(value: DateTime<Utc>) -> Value {
    Value::from(value.format(TIME_FORMAT).to_string())
}

fn bar_time(epoch_seconds: i64) -> String {
    DateTime::from_timestamp(epoch_seconds, 0)
        .unwrap_or_default()
        .format(BAR_TIME_FORMAT)
        .to_string()
}

/// Orders file: account info plus open orders keyed by ticket.
#[must_use]
pub fn orders(account: &AccountSnapshot, orders: &[OrderRecord]) -> String {
    let mut order_map = Map::new();
    for order in orders {
        order_map.insert(
            order.ticket.to_string(),
            json!({
                "magic": order.magic,
                "symbol": order.symbol,
                "lots": num(order.lots),
                "type": order.kind.as_str(),
                "open_price": num(order.open_price),
                "open_time": time(order.open_time),
                "SL": num(order.stop_loss),
                "TP": num(order.take_profit),
                "pnl": num(order.profit),
                "swap": num(order.swap),
                "comment": order.comment,
            }),
        );
    }

    json!({
        "account_info": {
            "name": account.name,
            "number": account.number,
            "currency": account.currency,
            "leverage": account.leverage,
            "free_margin": num(account.free_margin),
            "balance": num(account.balance),
            "equity": num(account.equity),
            "margin": num(account.margin),
        },
        "orders": order_map,
    })
    .to_string()
}

/// Market data file: per-symbol bid/ask/tick value.
#[must_use]
pub fn market_data(entries: &[(String, Quote, Decimal)]) -> String {
    let mut map = Map::new();
    for (symbol, quote, tick_value) in entries {
        map.insert(
            symbol.clone(),
            json!({
                "bid": num(quote.bid),
                "ask": num(quote.ask),
                "tick_value": num(*tick_value),
            }),
        );
    }
    Value::Object(map).to_string()
}

fn bar_value(bar: &Bar) -> Value {
    json!({
        "time": bar_time(bar.time),
        "open": num(bar.open),
        "high": num(bar.high),
        "low": num(bar.low),
        "close": num(bar.close),
        "tick_volume": bar.tick_volume,
    })
}

/// Bar data file: latest closed bar per `SYMBOL_TIMEFRAME` key.
#[must_use]
pub fn bar_data(entries: &[(String, Bar)]) -> String {
    let mut map = Map::new();
    for (key, bar) in entries {
        map.insert(key.clone(), bar_value(bar));
    }
    Value::Object(map).to_string()
}

/// Historic data file: one instrument's bar series keyed by bar time.
#[must_use]
pub fn historic_data(key: &str, bars: &[Bar]) -> String {
    let mut series = Map::new();
    for bar in bars {
        series.insert(
            bar_time(bar.time),
            json!({
                "open": num(bar.open),
                "high": num(bar.high),
                "low": num(bar.low),
                "close": num(bar.close),
                "tick_volume": bar.tick_volume,
            }),
        );
    }
    json!({ key: series }).to_string()
}

/// Historic trades file: closed trades keyed by ticket.
#[must_use]
pub fn historic_trades(trades: &[TradeRecord]) -> String {
    let mut map = Map::new();
    for trade in trades {
        map.insert(
            trade.ticket.to_string(),
            json!({
                "magic": trade.magic,
                "symbol": trade.symbol,
                "lots": num(trade.lots),
                "type": trade.kind.as_str(),
                "open_time": time(trade.open_time),
                "close_time": time(trade.close_time),
                "open_price": num(trade.open_price),
                "close_price": num(trade.close_price),
                "SL": num(trade.stop_loss),
                "TP": num(trade.take_profit),
                "pnl": num(trade.profit),
                "swap": num(trade.swap),
                "commission": num(trade.commission),
                "comment": trade.comment,
            }),
        );
    }
    Value::Object(map).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{OrderKind, Ticket};
    use rust_decimal_macros::dec;

    #[test]
    fn orders_snapshot_shape() {
        let account = AccountSnapshot {
            name: "Paper Trader".to_string(),
            number: 1,
            currency: "USD".to_string(),
            leverage: 100,
            free_margin: dec!(10000),
            balance: dec!(10000),
            equity: dec!(10000),
            margin: dec!(0),
        };
        let order = OrderRecord {
            ticket: Ticket(42),
            symbol: "EURUSD".to_string(),
            kind: OrderKind::Buy,
            lots: dec!(0.01),
            open_price: dec!(1.1000),
            open_time: Utc::now(),
            stop_loss: dec!(0),
            take_profit: dec!(0),
            magic: 12345,
            comment: "test".to_string(),
            profit: dec!(0),
            swap: dec!(0),
            commission: dec!(0),
        };

        let text = orders(&account, &[order]);
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["account_info"]["currency"], "USD");
        assert_eq!(value["orders"]["42"]["symbol"], "EURUSD");
        assert_eq!(value["orders"]["42"]["type"], "buy");
        assert_eq!(value["orders"]["42"]["magic"], 12345);
    }

    #[test]
    fn market_data_entries_are_numbers() {
        let text = market_data(&[(
            "EURUSD".to_string(),
            Quote {
                bid: dec!(1.10000),
                ask: dec!(1.10010),
            },
            dec!(1),
        )]);
        let value: Value = serde_json::from_str(&text).unwrap();
        assert!(value["EURUSD"]["bid"].is_f64());
        assert!((value["EURUSD"]["ask"].as_f64().unwrap() - 1.1001).abs() < 1e-9);
    }

    #[test]
    fn comment_with_quotes_is_escaped() {
        let account = AccountSnapshot {
            name: "a \"quoted\" name".to_string(),
            number: 1,
            currency: "USD".to_string(),
            leverage: 1,
            free_margin: dec!(0),
            balance: dec!(0),
            equity: dec!(0),
            margin: dec!(0),
        };
        let text = orders(&account, &[]);
        // Must stay parseable despite the embedded quotes.
        let value: Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["account_info"]["name"], "a \"quoted\" name");
    }

    #[test]
    fn historic_data_keyed_by_bar_time() {
        let bars = vec![Bar {
            time: 1_640_995_200, // 2022.01.01 00:00
            open: dec!(1.1),
            high: dec!(1.2),
            low: dec!(1.0),
            close: dec!(1.15),
            tick_volume: 500,
        }];
        let text = historic_data("EURUSD_D1", &bars);
        let value: Value = serde_json::from_str(&text).unwrap();
        assert!(value["EURUSD_D1"]["2022.01.01 00:00"]["open"].is_f64());
    }
}
