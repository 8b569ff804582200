//! Ring-buffered message log.
//!
//! Handlers report successes and failures here; the bridge flushes the
//! serialized buffer to the messages file whenever its content changes.
//! Entries are keyed by a strictly increasing millisecond timestamp so
//! the consumer can replay them in order even though it re-reads the
//! whole file.

use chrono::Utc;
use serde_json::{json, Map, Value};

use crate::error::BridgeErrorCode;

/// One log entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Strictly increasing across the whole buffer.
    pub timestamp_millis: i64,
    /// Info or error content.
    pub body: MessageBody,
}

/// Message content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageBody {
    /// Informational message (successful command, aggregate report).
    Info {
        /// Free-form text.
        text: String,
    },
    /// Error report with a typed reason.
    Error {
        /// Typed reason, serialized as `error_type`.
        code: BridgeErrorCode,
        /// Human-readable description.
        description: String,
    },
}

/// Fixed-length ring buffer of the most recent messages.
#[derive(Debug)]
pub struct MessageBus {
    entries: std::collections::VecDeque<Message>,
    capacity: usize,
    last_millis: i64,
}

impl MessageBus {
    /// Default number of retained messages.
    pub const DEFAULT_CAPACITY: usize = 50;

    /// Create a bus retaining at most `capacity` messages.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: std::collections::VecDeque::with_capacity(capacity),
            capacity,
            last_millis: 0,
        }
    }

    /// Append an informational message.
    pub fn info(&mut self, text: impl Into<String>) {
        self.push(MessageBody::Info { text: text.into() });
    }

    /// Append an error report.
    pub fn error(&mut self, code: BridgeErrorCode, description: impl Into<String>) {
        self.push(MessageBody::Error {
            code,
            description: description.into(),
        });
    }

    fn push(&mut self, body: MessageBody) {
        let millis = self.next_millis();
        self.entries.push_front(Message {
            timestamp_millis: millis,
            body,
        });
        self.entries.truncate(self.capacity);
    }

    // Wall-clock millis, forced to last + 1 when the clock has not
    // advanced, so two pushes within one millisecond still get
    // distinct, ordered keys.
    fn next_millis(&mut self) -> i64 {
        let now = Utc::now().timestamp_millis();
        self.last_millis = if now > self.last_millis {
            now
        } else {
            self.last_millis + 1
        };
        self.last_millis
    }

    /// Serialize the buffer newest-first, keyed by millisecond timestamp.
    #[must_use]
    pub fn serialize(&self) -> String {
        let mut map = Map::new();
        for message in &self.entries {
            let time = chrono::DateTime::from_timestamp_millis(message.timestamp_millis)
                .unwrap_or_default()
                .format("%Y.%m.%d %H:%M:%S")
                .to_string();
            let value = match &message.body {
                MessageBody::Info { text } => json!({
                    "type": "INFO",
                    "time": time,
                    "message": text,
                }),
                MessageBody::Error { code, description } => json!({
                    "type": "ERROR",
                    "time": time,
                    "error_type": code.reason(),
                    "description": description,
                }),
            };
            map.insert(message.timestamp_millis.to_string(), value);
        }
        Value::Object(map).to_string()
    }

    /// Number of retained messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the buffer holds no messages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate entries newest-first.
    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.entries.iter()
    }
}

impl Default for MessageBus {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamps_strictly_increase_within_one_millisecond() {
        let mut bus = MessageBus::new(10);
        bus.info("first");
        bus.info("second");
        bus.info("third");

        let millis: Vec<i64> = bus.iter().map(|m| m.timestamp_millis).collect();
        // Newest-first: strictly decreasing when iterated.
        assert!(millis.windows(2).all(|w| w[0] > w[1]));
    }

    #[test]
    fn oldest_entry_dropped_once_full() {
        let mut bus = MessageBus::new(3);
        for i in 0..5 {
            bus.info(format!("msg {i}"));
        }
        assert_eq!(bus.len(), 3);
        let texts: Vec<&str> = bus
            .iter()
            .map(|m| match &m.body {
                MessageBody::Info { text } => text.as_str(),
                MessageBody::Error { .. } => unreachable!(),
            })
            .collect();
        assert_eq!(texts, vec!["msg 4", "msg 3", "msg 2"]);
    }

    #[test]
    fn serializes_newest_first_with_typed_errors() {
        let mut bus = MessageBus::new(10);
        bus.info("opened order 1");
        bus.error(BridgeErrorCode::InvalidLots, "lots 500 above maximum 100");

        let text = bus.serialize();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        let object = value.as_object().unwrap();
        assert_eq!(object.len(), 2);

        // Newest entry (the error) serializes first.
        let first = object.values().next().unwrap();
        assert_eq!(first["type"], "ERROR");
        assert_eq!(first["error_type"], "INVALID_LOTS");
        assert_eq!(first["description"], "lots 500 above maximum 100");

        let second = object.values().nth(1).unwrap();
        assert_eq!(second["type"], "INFO");
        assert_eq!(second["message"], "opened order 1");
    }

    #[test]
    fn empty_bus_serializes_to_empty_object() {
        let bus = MessageBus::new(5);
        assert_eq!(bus.serialize(), "{}");
        assert!(bus.is_empty());
    }
}
