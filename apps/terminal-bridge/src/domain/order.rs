//! Orders and trade history records.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Platform-assigned order identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ticket(pub u64);

impl std::fmt::Display for Ticket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Order kind: two market sides plus four pending variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderKind {
    /// Market buy.
    Buy,
    /// Market sell.
    Sell,
    /// Pending buy limit.
    BuyLimit,
    /// Pending sell limit.
    SellLimit,
    /// Pending buy stop.
    BuyStop,
    /// Pending sell stop.
    SellStop,
}

impl OrderKind {
    /// Wire name, matching the controller's order-type vocabulary.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Buy => "buy",
            Self::Sell => "sell",
            Self::BuyLimit => "buylimit",
            Self::SellLimit => "selllimit",
            Self::BuyStop => "buystop",
            Self::SellStop => "sellstop",
        }
    }

    /// Pending orders are deleted rather than closed.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        !matches!(self, Self::Buy | Self::Sell)
    }

    /// Buy-side orders fill against the ask.
    #[must_use]
    pub const fn is_buy(&self) -> bool {
        matches!(self, Self::Buy | Self::BuyLimit | Self::BuyStop)
    }
}

impl FromStr for OrderKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "buy" => Ok(Self::Buy),
            "sell" => Ok(Self::Sell),
            "buylimit" => Ok(Self::BuyLimit),
            "selllimit" => Ok(Self::SellLimit),
            "buystop" => Ok(Self::BuyStop),
            "sellstop" => Ok(Self::SellStop),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for OrderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An open or pending order as reported by the platform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRecord {
    /// Platform-assigned ticket.
    pub ticket: Ticket,
    /// Instrument symbol.
    pub symbol: String,
    /// Order kind.
    pub kind: OrderKind,
    /// Volume in lots.
    pub lots: Decimal,
    /// Open (or pending) price.
    pub open_price: Decimal,
    /// Open time.
    pub open_time: DateTime<Utc>,
    /// Stop-loss price, zero when unset.
    pub stop_loss: Decimal,
    /// Take-profit price, zero when unset.
    pub take_profit: Decimal,
    /// Caller-assigned strategy tag.
    pub magic: i64,
    /// Operator comment.
    pub comment: String,
    /// Floating profit/loss.
    pub profit: Decimal,
    /// Accumulated swap.
    pub swap: Decimal,
    /// Accumulated commission.
    pub commission: Decimal,
}

/// A closed trade from the platform's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    /// Platform-assigned ticket.
    pub ticket: Ticket,
    /// Instrument symbol.
    pub symbol: String,
    /// Order kind.
    pub kind: OrderKind,
    /// Volume in lots.
    pub lots: Decimal,
    /// Open price.
    pub open_price: Decimal,
    /// Close price.
    pub close_price: Decimal,
    /// Open time.
    pub open_time: DateTime<Utc>,
    /// Close time.
    pub close_time: DateTime<Utc>,
    /// Stop-loss price, zero when unset.
    pub stop_loss: Decimal,
    /// Take-profit price, zero when unset.
    pub take_profit: Decimal,
    /// Caller-assigned strategy tag.
    pub magic: i64,
    /// Operator comment.
    pub comment: String,
    /// Realized profit/loss.
    pub profit: Decimal,
    /// Accumulated swap.
    pub swap: Decimal,
    /// Accumulated commission.
    pub commission: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_kind_round_trips() {
        for kind in [
            OrderKind::Buy,
            OrderKind::Sell,
            OrderKind::BuyLimit,
            OrderKind::SellLimit,
            OrderKind::BuyStop,
            OrderKind::SellStop,
        ] {
            assert_eq!(kind.as_str().parse::<OrderKind>(), Ok(kind));
        }
        assert!("market".parse::<OrderKind>().is_err());
    }

    #[test]
    fn pending_classification() {
        assert!(!OrderKind::Buy.is_pending());
        assert!(!OrderKind::Sell.is_pending());
        assert!(OrderKind::BuyLimit.is_pending());
        assert!(OrderKind::SellStop.is_pending());
    }

    #[test]
    fn buy_side_classification() {
        assert!(OrderKind::Buy.is_buy());
        assert!(OrderKind::BuyStop.is_buy());
        assert!(!OrderKind::Sell.is_buy());
        assert!(!OrderKind::SellLimit.is_buy());
    }
}
