//! Command frames and the command vocabulary.
//!
//! One command file carries one frame:
//!
//! ```text
//! <:<id>|<type>|<payload>:>
//! ```
//!
//! start marker `<:`, end marker `:>`, field delimiter `|`, exactly
//! three fields after removing the markers. The payload grammar is
//! command-specific (comma-delimited) and is validated by the handler,
//! not here.

use std::str::FromStr;

use thiserror::Error;

/// Start marker of a command frame.
pub const START_MARKER: &str = "<:";
/// End marker of a command frame.
pub const END_MARKER: &str = ":>";
/// Field delimiter inside a command frame.
pub const FIELD_DELIMITER: char = '|';

/// Framing violations detected while parsing a command file.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    /// Frame does not begin with the start marker.
    #[error("command does not start with '{START_MARKER}'")]
    MissingStartMarker,

    /// Frame does not end with the end marker.
    #[error("command does not end with '{END_MARKER}'")]
    MissingEndMarker,

    /// Frame does not split into exactly three fields.
    #[error("expected 3 fields, found {0}")]
    FieldCount(usize),

    /// Command id is not a non-negative integer.
    #[error("command id '{0}' is not an integer")]
    BadId(String),
}

/// A parsed command frame.
///
/// Ephemeral: lives only for the duration of one dispatch call. Only
/// the id outlives it, inside the [`crate::domain::CommandIdRegistry`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Command {
    /// Controller-assigned command id, used for deduplication.
    pub id: u64,
    /// Raw command type string as received.
    pub kind: String,
    /// Command-specific payload, comma-delimited.
    pub payload: String,
}

impl Command {
    /// Parse one command file's content into a frame.
    ///
    /// # Errors
    ///
    /// Returns a [`FrameError`] on any framing violation. The caller is
    /// expected to abort the remainder of its scan on error.
    pub fn parse_frame(text: &str) -> Result<Self, FrameError> {
        let text = text.trim_end_matches(['\r', '\n']);
        let Some(rest) = text.strip_prefix(START_MARKER) else {
            return Err(FrameError::MissingStartMarker);
        };
        let Some(body) = rest.strip_suffix(END_MARKER) else {
            return Err(FrameError::MissingEndMarker);
        };

        let fields: Vec<&str> = body.split(FIELD_DELIMITER).collect();
        if fields.len() != 3 {
            return Err(FrameError::FieldCount(fields.len()));
        }

        let id: u64 = fields[0]
            .trim()
            .parse()
            .map_err(|_| FrameError::BadId(fields[0].to_string()))?;

        Ok(Self {
            id,
            kind: fields[1].to_string(),
            payload: fields[2].to_string(),
        })
    }

    /// Whether this command resets the dedup registry.
    #[must_use]
    pub fn is_reset(&self) -> bool {
        self.kind.parse() == Ok(CommandKind::ResetCommandIds)
    }
}

/// Recognized command types.
///
/// Unknown type strings are not an error at this level; the dispatcher
/// ignores them after the id has been recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    /// Open a new market or pending order.
    OpenOrder,
    /// Modify price/stops/expiration of an existing order.
    ModifyOrder,
    /// Close or partially close one order.
    CloseOrder,
    /// Close every open order.
    CloseAllOrders,
    /// Close every order on one symbol.
    CloseOrdersBySymbol,
    /// Close every order with one magic number.
    CloseOrdersByMagic,
    /// Replace the market-data symbol subscription list.
    SubscribeSymbols,
    /// Replace the bar-data instrument subscription list.
    SubscribeSymbolsBarData,
    /// Fetch a bar series for a time range.
    GetHistoricData,
    /// Fetch closed trades within a lookback window.
    GetHistoricTrades,
    /// Clear the command-id registry.
    ResetCommandIds,
}

impl CommandKind {
    /// Wire name of this command type.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::OpenOrder => "OPEN_ORDER",
            Self::ModifyOrder => "MODIFY_ORDER",
            Self::CloseOrder => "CLOSE_ORDER",
            Self::CloseAllOrders => "CLOSE_ALL_ORDERS",
            Self::CloseOrdersBySymbol => "CLOSE_ORDERS_BY_SYMBOL",
            Self::CloseOrdersByMagic => "CLOSE_ORDERS_BY_MAGIC",
            Self::SubscribeSymbols => "SUBSCRIBE_SYMBOLS",
            Self::SubscribeSymbolsBarData => "SUBSCRIBE_SYMBOLS_BAR_DATA",
            Self::GetHistoricData => "GET_HISTORIC_DATA",
            Self::GetHistoricTrades => "GET_HISTORIC_TRADES",
            Self::ResetCommandIds => "RESET_COMMAND_IDS",
        }
    }
}

impl FromStr for CommandKind {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "OPEN_ORDER" => Ok(Self::OpenOrder),
            "MODIFY_ORDER" => Ok(Self::ModifyOrder),
            "CLOSE_ORDER" => Ok(Self::CloseOrder),
            "CLOSE_ALL_ORDERS" => Ok(Self::CloseAllOrders),
            "CLOSE_ORDERS_BY_SYMBOL" => Ok(Self::CloseOrdersBySymbol),
            "CLOSE_ORDERS_BY_MAGIC" => Ok(Self::CloseOrdersByMagic),
            "SUBSCRIBE_SYMBOLS" => Ok(Self::SubscribeSymbols),
            "SUBSCRIBE_SYMBOLS_BAR_DATA" => Ok(Self::SubscribeSymbolsBarData),
            "GET_HISTORIC_DATA" => Ok(Self::GetHistoricData),
            "GET_HISTORIC_TRADES" => Ok(Self::GetHistoricTrades),
            "RESET_COMMAND_IDS" => Ok(Self::ResetCommandIds),
            _ => Err(()),
        }
    }
}

impl std::fmt::Display for CommandKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_well_formed_frame() {
        let cmd = Command::parse_frame("<:7|OPEN_ORDER|EURUSD,buy,0.01,0,0,0,12345,test,0:>")
            .unwrap();
        assert_eq!(cmd.id, 7);
        assert_eq!(cmd.kind, "OPEN_ORDER");
        assert_eq!(cmd.payload, "EURUSD,buy,0.01,0,0,0,12345,test,0");
    }

    #[test]
    fn parse_tolerates_trailing_newline() {
        let cmd = Command::parse_frame("<:1|RESET_COMMAND_IDS|:>\n").unwrap();
        assert_eq!(cmd.id, 1);
        assert!(cmd.is_reset());
        assert!(cmd.payload.is_empty());
    }

    #[test]
    fn missing_start_marker() {
        let err = Command::parse_frame("7|OPEN_ORDER|x:>").unwrap_err();
        assert_eq!(err, FrameError::MissingStartMarker);
    }

    #[test]
    fn missing_end_marker() {
        let err = Command::parse_frame("<:7|OPEN_ORDER|x").unwrap_err();
        assert_eq!(err, FrameError::MissingEndMarker);
    }

    #[test]
    fn wrong_field_count() {
        assert_eq!(
            Command::parse_frame("<:7|OPEN_ORDER:>").unwrap_err(),
            FrameError::FieldCount(2)
        );
        assert_eq!(
            Command::parse_frame("<:7|A|B|C:>").unwrap_err(),
            FrameError::FieldCount(4)
        );
    }

    #[test]
    fn non_numeric_id() {
        let err = Command::parse_frame("<:abc|OPEN_ORDER|x:>").unwrap_err();
        assert!(matches!(err, FrameError::BadId(_)));
    }

    #[test]
    fn kind_round_trips() {
        for kind in [
            CommandKind::OpenOrder,
            CommandKind::ModifyOrder,
            CommandKind::CloseOrder,
            CommandKind::CloseAllOrders,
            CommandKind::CloseOrdersBySymbol,
            CommandKind::CloseOrdersByMagic,
            CommandKind::SubscribeSymbols,
            CommandKind::SubscribeSymbolsBarData,
            CommandKind::GetHistoricData,
            CommandKind::GetHistoricTrades,
            CommandKind::ResetCommandIds,
        ] {
            assert_eq!(kind.as_str().parse::<CommandKind>(), Ok(kind));
        }
        assert!("NOT_A_COMMAND".parse::<CommandKind>().is_err());
    }
}
