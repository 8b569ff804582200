//! Change-gated state publishers.
//!
//! Each publisher compares the freshly formatted snapshot against the
//! last text it wrote and skips the write when nothing changed, so a
//! 25 ms cycle does not hammer the disk. Caches update only after a
//! successful write; a failed write is retried naturally next cycle.

use super::{snapshot, Bridge, ORDER_HEARTBEAT};
use crate::error::BridgeErrorCode;
use crate::platform::TradingPlatform;

impl<P: TradingPlatform> Bridge<P> {
    /// Write the current quotes for all subscribed symbols.
    pub(super) async fn publish_market_data(&mut self) {
        if self.market_symbols.is_empty() && self.last_market_data.is_empty() {
            return;
        }

        let mut entries = Vec::with_capacity(self.market_symbols.len());
        for symbol in self.market_symbols.clone() {
            let quote = self.platform.quote(&symbol).await;
            let info = self.platform.symbol_info(&symbol).await;
            match (quote, info) {
                (Ok(quote), Ok(info)) => entries.push((symbol, quote, info.tick_value)),
                (Err(err), _) | (_, Err(err)) => {
                    self.bus.error(
                        BridgeErrorCode::MarketDataUnavailable,
                        format!("could not read market data for {symbol}: {err}"),
                    );
                }
            }
        }

        let text = snapshot::market_data(&entries);
        if text == self.last_market_data {
            return;
        }
        let path = self.transport.paths().market_data();
        if self.transport.write_once(&path, &text) {
            self.last_market_data = text;
        } else {
            tracing::warn!(path = %path.display(), "market data write failed");
        }
    }

    /// Write bars that closed since the last publish.
    ///
    /// Publication state advances as soon as a bar is formatted into
    /// the snapshot; a lost write means a lost bar, never a duplicate.
    pub(super) async fn publish_bar_data(&mut self) {
        if self.instruments.is_empty() {
            return;
        }

        let mut entries = Vec::new();
        let mut instruments = std::mem::take(&mut self.instruments);
        for instrument in &mut instruments {
            match self
                .platform
                .latest_bar(&instrument.symbol, instrument.timeframe)
                .await
            {
                Ok(bar) if bar.time > instrument.last_published_bar_time => {
                    instrument.last_published_bar_time = bar.time;
                    entries.push((instrument.key(), bar));
                }
                Ok(_) => {}
                Err(err) => {
                    tracing::warn!(key = %instrument.key(), error = %err, "bar read failed");
                }
            }
        }
        self.instruments = instruments;

        if entries.is_empty() {
            return;
        }
        let text = snapshot::bar_data(&entries);
        let path = self.transport.paths().bar_data();
        if !self.transport.write_once(&path, &text) {
            tracing::warn!(path = %path.display(), "bar data write failed");
        }
    }

    /// Write the account and open-order snapshot.
    ///
    /// Rewritten on every change and at least once per heartbeat, so a
    /// controller that missed a cycle still sees a fresh file.
    pub(super) async fn publish_orders(&mut self) {
        let account = match self.platform.account().await {
            Ok(account) => account,
            Err(err) => {
                tracing::warn!(error = %err, "account read failed");
                return;
            }
        };
        let orders = match self.platform.open_orders().await {
            Ok(orders) => orders,
            Err(err) => {
                tracing::warn!(error = %err, "order read failed");
                return;
            }
        };

        let text = snapshot::orders(&account, &orders);
        let now = tokio::time::Instant::now();
        let heartbeat_due = self
            .last_orders_write
            .is_none_or(|written| now.duration_since(written) >= ORDER_HEARTBEAT);
        if text == self.last_orders && !heartbeat_due {
            return;
        }

        let path = self.transport.paths().orders();
        if self.transport.write_once(&path, &text) {
            self.last_orders = text;
            self.last_orders_write = Some(now);
        } else {
            tracing::warn!(path = %path.display(), "orders write failed");
        }
    }

    /// Write the message ring when a new message arrived.
    pub(super) async fn flush_messages(&mut self) {
        let text = self.bus.serialize();
        if text == self.last_messages {
            return;
        }
        let path = self.transport.paths().messages();
        if self.transport.write_once(&path, &text) {
            self.last_messages = text;
        } else {
            tracing::warn!(path = %path.display(), "message write failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use rust_decimal_macros::dec;

    use crate::config::Config;
    use crate::domain::{Bar, Instrument, Timeframe};
    use crate::platform::paper::PaperPlatform;

    use super::super::Bridge;

    fn bridge_with(
        dir: &std::path::Path,
        platform: PaperPlatform,
    ) -> (Bridge<PaperPlatform>, Arc<PaperPlatform>) {
        let mut config = Config::default();
        config.bridge.data_dir = dir.join("bridge_data");
        let platform = Arc::new(platform);
        let bridge = Bridge::new(config, Arc::clone(&platform)).unwrap();
        (bridge, platform)
    }

    fn eurusd_platform() -> PaperPlatform {
        let platform = PaperPlatform::new();
        platform.add_default_symbol("EURUSD", dec!(1.10000), dec!(1.10010));
        platform
    }

    fn bar(time: i64) -> Bar {
        Bar {
            time,
            open: dec!(1.1),
            high: dec!(1.2),
            low: dec!(1.0),
            close: dec!(1.15),
            tick_volume: 10,
        }
    }

    #[tokio::test]
    async fn market_data_written_only_on_change() {
        let dir = tempfile::tempdir().unwrap();
        let (mut bridge, platform) = bridge_with(dir.path(), eurusd_platform());
        bridge.market_symbols = vec!["EURUSD".to_string()];

        bridge.publish_market_data().await;
        let path = bridge.paths().market_data();
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("1.1001"));

        // Same quote: the file must not be recreated.
        std::fs::remove_file(&path).unwrap();
        bridge.publish_market_data().await;
        assert!(!path.exists());

        platform.set_quote("EURUSD", dec!(1.10005), dec!(1.10015));
        bridge.publish_market_data().await;
        assert!(path.exists());
    }

    #[tokio::test]
    async fn clearing_subscription_publishes_empty_snapshot_once() {
        let dir = tempfile::tempdir().unwrap();
        let (mut bridge, _platform) = bridge_with(dir.path(), eurusd_platform());
        bridge.market_symbols = vec!["EURUSD".to_string()];
        bridge.publish_market_data().await;

        bridge.market_symbols.clear();
        bridge.publish_market_data().await;
        let path = bridge.paths().market_data();
        assert_eq!(std::fs::read_to_string(&path).unwrap().trim(), "{}");

        std::fs::remove_file(&path).unwrap();
        bridge.publish_market_data().await;
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn unknown_symbol_surfaces_on_the_message_ring() {
        let dir = tempfile::tempdir().unwrap();
        let (mut bridge, _platform) = bridge_with(dir.path(), eurusd_platform());
        bridge.market_symbols = vec!["XXXYYY".to_string()];

        bridge.publish_market_data().await;
        assert!(bridge.bus.serialize().contains("MARKET_DATA_UNAVAILABLE"));
    }

    #[tokio::test]
    async fn bar_data_written_once_per_bar() {
        let dir = tempfile::tempdir().unwrap();
        let (mut bridge, platform) = bridge_with(dir.path(), eurusd_platform());
        platform.set_latest_bar("EURUSD", Timeframe::M1, bar(1_700_000_000));
        bridge.instruments = vec![Instrument::new("EURUSD", Timeframe::M1)];

        bridge.publish_bar_data().await;
        let path = bridge.paths().bar_data();
        assert!(std::fs::read_to_string(&path).unwrap().contains("EURUSD_M1"));
        assert_eq!(
            bridge.instruments[0].last_published_bar_time,
            1_700_000_000
        );

        // Same bar again: nothing new to write.
        std::fs::remove_file(&path).unwrap();
        bridge.publish_bar_data().await;
        assert!(!path.exists());

        platform.set_latest_bar("EURUSD", Timeframe::M1, bar(1_700_000_060));
        bridge.publish_bar_data().await;
        assert!(path.exists());
        assert_eq!(
            bridge.instruments[0].last_published_bar_time,
            1_700_000_060
        );
    }

    #[tokio::test(start_paused = true)]
    async fn orders_rewritten_on_heartbeat_without_change() {
        let dir = tempfile::tempdir().unwrap();
        let (mut bridge, _platform) = bridge_with(dir.path(), eurusd_platform());

        bridge.publish_orders().await;
        let path = bridge.paths().orders();
        assert!(path.exists());

        // No change and no heartbeat: stays absent after removal.
        std::fs::remove_file(&path).unwrap();
        bridge.publish_orders().await;
        assert!(!path.exists());

        tokio::time::advance(std::time::Duration::from_millis(1001)).await;
        bridge.publish_orders().await;
        assert!(path.exists());
    }

    #[tokio::test]
    async fn messages_flushed_only_when_new() {
        let dir = tempfile::tempdir().unwrap();
        let (mut bridge, _platform) = bridge_with(dir.path(), eurusd_platform());

        bridge.flush_messages().await;
        let path = bridge.paths().messages();
        assert_eq!(std::fs::read_to_string(&path).unwrap().trim(), "{}");

        std::fs::remove_file(&path).unwrap();
        bridge.flush_messages().await;
        assert!(!path.exists());

        bridge.bus.info("hello");
        bridge.flush_messages().await;
        assert!(std::fs::read_to_string(&path).unwrap().contains("hello"));
    }
}
