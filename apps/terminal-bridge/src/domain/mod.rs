//! Domain layer - bridge state and value objects with no I/O.

pub mod command;
pub mod market;
pub mod message;
pub mod order;
pub mod registry;

pub use command::{Command, CommandKind, FrameError};
pub use market::{AccountSnapshot, Bar, Instrument, Quote, SymbolInfo, Timeframe};
pub use message::{Message, MessageBody, MessageBus};
pub use order::{OrderKind, OrderRecord, Ticket, TradeRecord};
pub use registry::CommandIdRegistry;
