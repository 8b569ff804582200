//! Platform errors and the trade-server code table.
//!
//! The terminal reports failures as numeric codes. The static table
//! here maps each code to a human-readable description that handlers
//! include in their message-bus error reports.

use thiserror::Error;

use crate::domain::Ticket;

/// Trade-server code: history is still being assembled.
pub const CODE_HISTORY_WILL_UPDATE: i32 = 4066;
/// Trade-server code: no history data for the requested range yet.
pub const CODE_NO_HISTORY_DATA: i32 = 4073;

/// Errors returned by the trading platform port.
#[derive(Debug, Clone, Error)]
pub enum PlatformError {
    /// The terminal rejected the request with a numeric code.
    #[error("trade server error {code}: {}", describe_code(*code))]
    Trade {
        /// Numeric trade-server code.
        code: i32,
    },

    /// Symbol is not known to the terminal.
    #[error("unknown symbol '{symbol}'")]
    UnknownSymbol {
        /// The unrecognized symbol.
        symbol: String,
    },

    /// Ticket does not match any open order.
    #[error("order {ticket} not found")]
    OrderNotFound {
        /// The missing ticket.
        ticket: Ticket,
    },
}

impl PlatformError {
    /// Construct a trade-server error from its numeric code.
    #[must_use]
    pub const fn code(code: i32) -> Self {
        Self::Trade { code }
    }

    /// Whether this failure means the requested history is still being
    /// built or not yet available, so a bounded retry makes sense.
    #[must_use]
    pub const fn is_history_pending(&self) -> bool {
        matches!(
            self,
            Self::Trade {
                code: CODE_HISTORY_WILL_UPDATE | CODE_NO_HISTORY_DATA
            }
        )
    }
}

/// Trade-server code descriptions.
static TRADE_CODES: &[(i32, &str)] = &[
    (0, "no error"),
    (1, "no error, but the result is unknown"),
    (2, "common error"),
    (3, "invalid trade parameters"),
    (4, "trade server is busy"),
    (5, "old version of the client terminal"),
    (6, "no connection with trade server"),
    (7, "not enough rights"),
    (8, "too frequent requests"),
    (9, "malfunctional trade operation"),
    (64, "account disabled"),
    (65, "invalid account"),
    (128, "trade timeout"),
    (129, "invalid price"),
    (130, "invalid stops"),
    (131, "invalid trade volume"),
    (132, "market is closed"),
    (133, "trade is disabled"),
    (134, "not enough money"),
    (135, "price changed"),
    (136, "off quotes"),
    (137, "broker is busy"),
    (138, "requote"),
    (139, "order is locked"),
    (140, "long positions only allowed"),
    (141, "too many requests"),
    (145, "modification denied because order is too close to market"),
    (146, "trade context is busy"),
    (147, "expirations are denied by broker"),
    (148, "amount of open and pending orders has reached the limit"),
    (149, "hedging is prohibited"),
    (150, "prohibited by FIFO rules"),
    (4051, "invalid function parameter value"),
    (4055, "custom indicator error"),
    (4056, "arrays are incompatible"),
    (4062, "string parameter expected"),
    (4063, "integer parameter expected"),
    (CODE_HISTORY_WILL_UPDATE, "requested history data is updating"),
    (4067, "some error in trade operation execution"),
    (CODE_NO_HISTORY_DATA, "no history data for the requested range"),
    (4099, "end of file"),
    (4106, "unknown symbol"),
    (4107, "invalid price parameter for trade function"),
    (4108, "invalid ticket"),
    (4109, "trade is not allowed in the expert properties"),
    (4110, "longs are not allowed in the expert properties"),
    (4111, "shorts are not allowed in the expert properties"),
];

/// Human-readable description for a trade-server code.
#[must_use]
pub fn describe_code(code: i32) -> &'static str {
    TRADE_CODES
        .iter()
        .find(|(c, _)| *c == code)
        .map_or("unknown error code", |(_, description)| description)
}
