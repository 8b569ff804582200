//! Market data value objects: quotes, bars, timeframes, subscriptions.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A bid/ask quote for one symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    /// Best bid.
    pub bid: Decimal,
    /// Best ask.
    pub ask: Decimal,
}

/// Static per-symbol trading properties.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolInfo {
    /// Price decimal precision.
    pub digits: u32,
    /// Minimum lot size.
    pub lot_min: Decimal,
    /// Maximum lot size.
    pub lot_max: Decimal,
    /// Value of one tick per lot, in account currency.
    pub tick_value: Decimal,
}

/// One OHLC(+volume) record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bar {
    /// Bar open time, seconds since the epoch.
    pub time: i64,
    /// Open price.
    pub open: Decimal,
    /// High price.
    pub high: Decimal,
    /// Low price.
    pub low: Decimal,
    /// Close price.
    pub close: Decimal,
    /// Tick count within the bar.
    pub tick_volume: u64,
}

/// Chart timeframe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    /// One minute.
    M1,
    /// Five minutes.
    M5,
    /// Fifteen minutes.
    M15,
    /// Thirty minutes.
    M30,
    /// One hour.
    H1,
    /// Four hours.
    H4,
    /// One day.
    D1,
    /// One week.
    W1,
    /// One month.
    MN1,
}

impl Timeframe {
    /// Wire name of the timeframe.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::M1 => "M1",
            Self::M5 => "M5",
            Self::M15 => "M15",
            Self::M30 => "M30",
            Self::H1 => "H1",
            Self::H4 => "H4",
            Self::D1 => "D1",
            Self::W1 => "W1",
            Self::MN1 => "MN1",
        }
    }

    /// Timeframe length in seconds (months approximated at 30 days).
    #[must_use]
    pub const fn seconds(&self) -> i64 {
        match self {
            Self::M1 => 60,
            Self::M5 => 300,
            Self::M15 => 900,
            Self::M30 => 1800,
            Self::H1 => 3600,
            Self::H4 => 14_400,
            Self::D1 => 86_400,
            Self::W1 => 604_800,
            Self::MN1 => 2_592_000,
        }
    }

    /// Tolerated deviation, in days, between a requested history start
    /// and the first returned bar before the deviation is reported.
    /// Weekly and monthly bars align to period boundaries far from the
    /// requested start, so their tolerance is wider.
    #[must_use]
    pub const fn start_tolerance_days(&self) -> i64 {
        match self {
            Self::W1 => 10,
            Self::MN1 => 33,
            _ => 3,
        }
    }
}

impl FromStr for Timeframe {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "M1" => Ok(Self::M1),
            "M5" => Ok(Self::M5),
            "M15" => Ok(Self::M15),
            "M30" => Ok(Self::M30),
            "H1" => Ok(Self::H1),
            "H4" => Ok(Self::H4),
            "D1" => Ok(Self::D1),
            "W1" => Ok(Self::W1),
            "MN1" => Ok(Self::MN1),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for Timeframe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A (symbol, timeframe) pair tracked for bar publishing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instrument {
    /// Instrument symbol.
    pub symbol: String,
    /// Chart timeframe.
    pub timeframe: Timeframe,
    /// Open time of the last bar published for this instrument,
    /// seconds since the epoch. Zero until the first publish.
    pub last_published_bar_time: i64,
}

impl Instrument {
    /// Create a new instrument with no published bar yet.
    #[must_use]
    pub fn new(symbol: impl Into<String>, timeframe: Timeframe) -> Self {
        Self {
            symbol: symbol.into(),
            timeframe,
            last_published_bar_time: 0,
        }
    }

    /// Output-file key: `SYMBOL_TIMEFRAME`.
    #[must_use]
    pub fn key(&self) -> String {
        format!("{}_{}", self.symbol, self.timeframe)
    }
}

/// Account state included in the orders snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountSnapshot {
    /// Account holder name.
    pub name: String,
    /// Account number.
    pub number: i64,
    /// Deposit currency.
    pub currency: String,
    /// Account leverage.
    pub leverage: i64,
    /// Free margin.
    pub free_margin: Decimal,
    /// Balance.
    pub balance: Decimal,
    /// Equity.
    pub equity: Decimal,
    /// Used margin.
    pub margin: Decimal,
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test]
    fn timeframe_round_trips() {
        for tf in [
            Timeframe::M1,
            Timeframe::M5,
            Timeframe::M15,
            Timeframe::M30,
            Timeframe::H1,
            Timeframe::H4,
            Timeframe::D1,
            Timeframe::W1,
            Timeframe::MN1,
        ] {
            assert_eq!(tf.as_str().parse::<Timeframe>(), Ok(tf));
        }
        assert!("M2".parse::<Timeframe>().is_err());
    }

    #[test_case(Timeframe::M1, 3; "minute bars")]
    #[test_case(Timeframe::H4, 3; "intraday bars")]
    #[test_case(Timeframe::D1, 3; "daily bars")]
    #[test_case(Timeframe::W1, 10; "weekly bars")]
    #[test_case(Timeframe::MN1, 33; "monthly bars")]
    fn start_tolerance_scales_with_timeframe(timeframe: Timeframe, days: i64) {
        assert_eq!(timeframe.start_tolerance_days(), days);
    }

    #[test]
    fn timeframes_order_from_shortest_to_longest() {
        let mut timeframes = vec![Timeframe::MN1, Timeframe::M5, Timeframe::H1, Timeframe::M1];
        timeframes.sort();
        assert_eq!(
            timeframes,
            [Timeframe::M1, Timeframe::M5, Timeframe::H1, Timeframe::MN1]
        );
    }

    #[test]
    fn instrument_key_format() {
        let instrument = Instrument::new("EURUSD", Timeframe::M1);
        assert_eq!(instrument.key(), "EURUSD_M1");
        assert_eq!(instrument.last_published_bar_time, 0);
    }
}
