//! Command file ingestion: contiguous-prefix scan, dedup, framing checks.

use crate::domain::{Command, CommandKind, FrameError};
use crate::error::BridgeErrorCode;
use crate::platform::TradingPlatform;

use super::Bridge;

impl<P: TradingPlatform> Bridge<P> {
    /// Drain pending command files in index order.
    ///
    /// The scan stops at the first missing index: the writer assigns
    /// indexes contiguously from zero, so a gap means the remaining
    /// slots are empty. Each file is deleted before its content is
    /// parsed, so a malformed frame can never be re-read next cycle.
    pub(super) async fn check_commands(&mut self) {
        for index in 0..self.config.bridge.max_command_files {
            let path = self.transport.paths().command_file(index);
            let Some(content) = self.transport.read(&path) else {
                break;
            };
            self.transport.delete(&path);

            let command = match Command::parse_frame(&content) {
                Ok(command) => command,
                Err(err) => {
                    self.bus.error(
                        framing_code(&err),
                        format!("could not parse {}: {err}", path.display()),
                    );
                    if self.config.ingest.abort_batch_on_error {
                        return;
                    }
                    continue;
                }
            };

            // A reset bypasses dedup; it is the recovery path when the
            // controller restarts with a rewound id counter.
            if self.registry.contains(command.id) && !command.is_reset() {
                tracing::debug!(id = command.id, "skipping duplicate command");
                if self.config.ingest.abort_batch_on_error {
                    return;
                }
                continue;
            }
            self.registry.record(command.id);

            let Ok(kind) = command.kind.parse::<CommandKind>() else {
                tracing::debug!(id = command.id, kind = %command.kind, "ignoring unknown command");
                continue;
            };

            tracing::debug!(id = command.id, kind = %kind, "dispatching command");
            self.dispatch(kind, &command.payload).await;
        }
    }
}

const fn framing_code(err: &FrameError) -> BridgeErrorCode {
    match err {
        FrameError::MissingStartMarker => BridgeErrorCode::WrongFormatStartIdentifier,
        FrameError::MissingEndMarker => BridgeErrorCode::WrongFormatEndIdentifier,
        FrameError::FieldCount(_) | FrameError::BadId(_) => BridgeErrorCode::WrongFormatCommand,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rust_decimal_macros::dec;

    use crate::config::Config;
    use crate::platform::paper::PaperPlatform;

    use super::super::Bridge;

    fn bridge_in(dir: &std::path::Path) -> Bridge<PaperPlatform> {
        let mut config = Config::default();
        config.bridge.data_dir = dir.join("bridge_data");
        let platform = PaperPlatform::new();
        platform.add_default_symbol("EURUSD", dec!(1.10000), dec!(1.10010));
        Bridge::new(config, Arc::new(platform)).unwrap()
    }

    fn write_command(bridge: &Bridge<PaperPlatform>, index: usize, frame: &str) {
        std::fs::write(bridge.paths().command_file(index), frame).unwrap();
    }

    #[tokio::test]
    async fn scan_stops_at_first_gap() {
        let dir = tempfile::tempdir().unwrap();
        let mut bridge = bridge_in(dir.path());

        write_command(&bridge, 0, "<:1|RESET_COMMAND_IDS|:>");
        // Index 1 is missing, so index 2 must not be touched.
        write_command(&bridge, 2, "<:2|RESET_COMMAND_IDS|:>");

        bridge.check_commands().await;

        assert!(!bridge.paths().command_file(0).exists());
        assert!(bridge.paths().command_file(2).exists());
    }

    #[tokio::test]
    async fn malformed_frame_is_deleted_and_reported() {
        let dir = tempfile::tempdir().unwrap();
        let mut bridge = bridge_in(dir.path());

        write_command(&bridge, 0, "1|RESET_COMMAND_IDS|:>");
        bridge.check_commands().await;

        assert!(!bridge.paths().command_file(0).exists());
        assert_eq!(bridge.bus.len(), 1);
        assert!(bridge.bus.serialize().contains("WRONG_FORMAT_START_IDENTIFIER"));
    }

    #[tokio::test]
    async fn malformed_frame_aborts_rest_of_batch() {
        let dir = tempfile::tempdir().unwrap();
        let mut bridge = bridge_in(dir.path());

        write_command(&bridge, 0, "<:garbage:>");
        write_command(&bridge, 1, "<:5|RESET_COMMAND_IDS|:>");
        bridge.check_commands().await;

        // The well-formed follower stays on disk for the next cycle.
        assert!(bridge.paths().command_file(1).exists());
        assert!(!bridge.registry.contains(5));
    }

    #[tokio::test]
    async fn undecodable_file_is_consumed_and_does_not_stall_followers() {
        let dir = tempfile::tempdir().unwrap();
        let mut bridge = bridge_in(dir.path());

        // Framing markers around bytes that are not valid UTF-8.
        std::fs::write(
            bridge.paths().command_file(0),
            [0x3c, 0x3a, 0xff, 0xfe, 0x3a, 0x3e],
        )
        .unwrap();
        write_command(&bridge, 1, "<:7|SUBSCRIBE_SYMBOLS|EURUSD:>");

        bridge.check_commands().await;
        assert!(!bridge.paths().command_file(0).exists());
        assert!(bridge.bus.serialize().contains("WRONG_FORMAT_COMMAND"));

        // The corrupt file is gone; once the writer fills slot 0 again the
        // scan reaches the follower.
        write_command(&bridge, 0, "<:6|RESET_COMMAND_IDS|:>");
        bridge.check_commands().await;
        assert!(!bridge.paths().command_file(1).exists());
        assert_eq!(bridge.market_symbols, vec!["EURUSD".to_string()]);
    }

    #[tokio::test]
    async fn duplicate_id_is_not_dispatched_twice() {
        let dir = tempfile::tempdir().unwrap();
        let mut bridge = bridge_in(dir.path());

        write_command(&bridge, 0, "<:9|SUBSCRIBE_SYMBOLS|EURUSD:>");
        bridge.check_commands().await;
        assert_eq!(bridge.market_symbols, vec!["EURUSD".to_string()]);

        bridge.market_symbols.clear();
        write_command(&bridge, 0, "<:9|SUBSCRIBE_SYMBOLS|EURUSD:>");
        bridge.check_commands().await;
        assert!(bridge.market_symbols.is_empty());
    }

    #[tokio::test]
    async fn duplicate_reset_still_executes() {
        let dir = tempfile::tempdir().unwrap();
        let mut bridge = bridge_in(dir.path());

        write_command(&bridge, 0, "<:1|SUBSCRIBE_SYMBOLS|EURUSD:>");
        bridge.check_commands().await;
        assert!(bridge.registry.contains(1));

        // Same id, but a reset: it must run and clear the registry.
        write_command(&bridge, 0, "<:1|RESET_COMMAND_IDS|:>");
        bridge.check_commands().await;
        assert!(!bridge.registry.contains(1));
    }

    #[tokio::test]
    async fn unknown_command_kind_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let mut bridge = bridge_in(dir.path());

        write_command(&bridge, 0, "<:3|NO_SUCH_COMMAND|x:>");
        write_command(&bridge, 1, "<:4|SUBSCRIBE_SYMBOLS|EURUSD:>");
        bridge.check_commands().await;

        assert!(bridge.registry.contains(3));
        assert_eq!(bridge.market_symbols, vec!["EURUSD".to_string()]);
    }
}
