//! File transport: paths plus bounded-retry write and delete.
//!
//! The bridge shares a directory with an external controller process.
//! Either side can hold a file open at any moment, so writes and
//! deletes can transiently fail; both operations retry a fixed number
//! of times and then give up without raising. A lost delete is safe
//! because command ids are deduplicated independently; a lost write is
//! reported to the caller, which may retry on the next cycle.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Write attempts for publish paths that must not silently lose data.
const WRITE_ATTEMPTS: u32 = 5;
/// Pause between write attempts.
const WRITE_RETRY_PAUSE: Duration = Duration::from_millis(100);
/// Delete attempts; no pause, contention clears within one open/close.
const DELETE_ATTEMPTS: u32 = 10;

/// All transport file locations, derived from one data directory.
#[derive(Debug, Clone)]
pub struct BridgePaths {
    root: PathBuf,
}

impl BridgePaths {
    /// Create the path layout under `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Transport root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Orders + account snapshot file.
    #[must_use]
    pub fn orders(&self) -> PathBuf {
        self.root.join("orders.txt")
    }

    /// Message log file.
    #[must_use]
    pub fn messages(&self) -> PathBuf {
        self.root.join("messages.txt")
    }

    /// Tick snapshot file.
    #[must_use]
    pub fn market_data(&self) -> PathBuf {
        self.root.join("market_data.txt")
    }

    /// Bar snapshot file.
    #[must_use]
    pub fn bar_data(&self) -> PathBuf {
        self.root.join("bar_data.txt")
    }

    /// Historic bar series file (consumer deletes after reading).
    #[must_use]
    pub fn historic_data(&self) -> PathBuf {
        self.root.join("historic_data.txt")
    }

    /// Historic trades file (consumer deletes after reading).
    #[must_use]
    pub fn historic_trades(&self) -> PathBuf {
        self.root.join("historic_trades.txt")
    }

    /// Numbered command file.
    #[must_use]
    pub fn command_file(&self, index: usize) -> PathBuf {
        self.root.join(format!("commands_{index}.txt"))
    }

    /// Every output file the bridge owns.
    #[must_use]
    pub fn output_files(&self) -> Vec<PathBuf> {
        vec![
            self.orders(),
            self.messages(),
            self.market_data(),
            self.bar_data(),
            self.historic_data(),
            self.historic_trades(),
        ]
    }
}

/// Bounded-retry file operations over the shared directory.
#[derive(Debug, Clone)]
pub struct FileTransport {
    paths: BridgePaths,
}

impl FileTransport {
    /// Create a transport over the given path layout, ensuring the
    /// data directory exists.
    ///
    /// # Errors
    ///
    /// Returns the IO error if the directory cannot be created.
    pub fn new(paths: BridgePaths) -> std::io::Result<Self> {
        std::fs::create_dir_all(paths.root())?;
        Ok(Self { paths })
    }

    /// Path layout.
    #[must_use]
    pub fn paths(&self) -> &BridgePaths {
        &self.paths
    }

    /// Single write attempt: create/truncate, write once, close.
    ///
    /// Succeeds only if at least one byte landed; an empty payload
    /// still writes a trailing newline so the file is never empty.
    #[must_use]
    pub fn write_once(&self, path: &Path, text: &str) -> bool {
        let result = std::fs::File::create(path).and_then(|mut file| {
            file.write_all(text.as_bytes())?;
            file.write_all(b"\n")?;
            Ok(())
        });
        match result {
            Ok(()) => true,
            Err(error) => {
                tracing::debug!(path = %path.display(), %error, "write attempt failed");
                false
            }
        }
    }

    /// Write with bounded retries, for publish paths.
    ///
    /// Pauses suspend only the calling task; the pause never blocks an
    /// OS thread.
    pub async fn write_retry(&self, path: &Path, text: &str) -> bool {
        for attempt in 1..=WRITE_ATTEMPTS {
            if self.write_once(path, text) {
                return true;
            }
            if attempt < WRITE_ATTEMPTS {
                tokio::time::sleep(WRITE_RETRY_PAUSE).await;
            }
        }
        tracing::warn!(
            path = %path.display(),
            attempts = WRITE_ATTEMPTS,
            "write failed after retries"
        );
        false
    }

    /// Delete with bounded immediate retries; gives up silently.
    ///
    /// The controller may hold the file open while reading it, which
    /// fails the delete transiently on some platforms.
    pub fn delete(&self, path: &Path) {
        for _ in 0..DELETE_ATTEMPTS {
            match std::fs::remove_file(path) {
                Ok(()) => return,
                Err(error) if error.kind() == std::io::ErrorKind::NotFound => return,
                Err(_) => {}
            }
        }
        tracing::debug!(
            path = %path.display(),
            attempts = DELETE_ATTEMPTS,
            "delete gave up; file will be handled next cycle"
        );
    }

    /// Read a file fully; `None` only when it does not exist.
    ///
    /// Bytes that are not valid UTF-8 are decoded lossily so a corrupt
    /// command file still reaches the parser and gets consumed instead of
    /// blocking the scan forever.
    #[must_use]
    pub fn read(&self, path: &Path) -> Option<String> {
        match std::fs::read(path) {
            Ok(bytes) => Some(String::from_utf8_lossy(&bytes).into_owned()),
            Err(_) => None,
        }
    }

    /// Delete every output file and every possible command file.
    ///
    /// Run at startup and shutdown so the controller always observes a
    /// fresh state.
    pub fn reset(&self, max_command_files: usize) {
        for path in self.paths.output_files() {
            self.delete(&path);
        }
        for index in 0..max_command_files {
            self.delete(&self.paths.command_file(index));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transport() -> (tempfile::TempDir, FileTransport) {
        let dir = tempfile::tempdir().unwrap();
        let transport = FileTransport::new(BridgePaths::new(dir.path())).unwrap();
        (dir, transport)
    }

    #[test]
    fn write_once_writes_terminator_for_empty_payload() {
        let (_dir, transport) = transport();
        let path = transport.paths().messages();
        assert!(transport.write_once(&path, ""));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "\n");
    }

    #[test]
    fn read_missing_file_is_none() {
        let (_dir, transport) = transport();
        assert!(transport.read(&transport.paths().command_file(0)).is_none());
    }

    #[test]
    fn read_decodes_invalid_utf8_lossily() {
        let (_dir, transport) = transport();
        let path = transport.paths().command_file(0);
        std::fs::write(&path, [0x3c, 0x3a, 0xff, 0xfe, 0x3a, 0x3e]).unwrap();

        let content = transport.read(&path).unwrap();
        assert!(content.starts_with("<:"));
        assert!(content.ends_with(":>"));
    }

    #[test]
    fn delete_missing_file_is_silent() {
        let (_dir, transport) = transport();
        transport.delete(&transport.paths().orders());
    }

    #[tokio::test]
    async fn write_retry_succeeds_first_attempt() {
        let (_dir, transport) = transport();
        let path = transport.paths().market_data();
        assert!(transport.write_retry(&path, "{\"EURUSD\":{}}").await);
        assert!(path.exists());
    }

    #[test]
    fn reset_removes_outputs_and_commands() {
        let (_dir, transport) = transport();
        let orders = transport.paths().orders();
        let command = transport.paths().command_file(3);
        assert!(transport.write_once(&orders, "{}"));
        assert!(transport.write_once(&command, "<:1|RESET_COMMAND_IDS|:>"));

        transport.reset(10);
        assert!(!orders.exists());
        assert!(!command.exists());
    }

    #[test]
    fn command_file_naming() {
        let paths = BridgePaths::new("/tmp/bridge");
        assert!(paths
            .command_file(7)
            .to_string_lossy()
            .ends_with("commands_7.txt"));
    }
}
