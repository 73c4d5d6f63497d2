//! Event log sinks
//!
//! A sink accepts log lines in the order transitions happen. Lines are
//! recorded while the switchboard lock is held, so a sink never sees two
//! lines at once and never needs its own synchronization.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::error::{Result, SimulationError};

/// Ordered destination for log lines
pub trait EventSink: Send {
    /// Append one line; `line` already carries its trailing newline
    fn record(&mut self, line: &str);

    /// Flush everything still pending. Called once, after every worker exited.
    fn finish(&mut self) -> Result<()>;
}

/// Live stream sink that flushes after every line
#[derive(Debug)]
pub struct ConsoleSink<W> {
    writer: W,
    failed_writes: u64,
}

impl ConsoleSink<io::Stdout> {
    /// Sink writing to standard output
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> ConsoleSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            failed_writes: 0,
        }
    }

    /// Lines that could not be written
    pub fn failed_writes(&self) -> u64 {
        self.failed_writes
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write + Send> EventSink for ConsoleSink<W> {
    fn record(&mut self, line: &str) {
        let written = self
            .writer
            .write_all(line.as_bytes())
            .and_then(|()| self.writer.flush());
        if let Err(e) = written {
            self.failed_writes += 1;
            warn!("⚠️ Failed to write log line to console: {}", e);
        }
    }

    fn finish(&mut self) -> Result<()> {
        if self.failed_writes > 0 {
            warn!("⚠️ {} log lines could not be written to the console", self.failed_writes);
        }
        self.writer
            .flush()
            .map_err(|e| SimulationError::internal(format!("console flush failed: {}", e)))
    }
}

/// Keeps lines in memory and writes them to a file when the run ends
#[derive(Debug)]
pub struct BufferedFileSink {
    path: PathBuf,
    lines: Vec<String>,
    finished: bool,
}

impl BufferedFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lines: Vec::new(),
            finished: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Lines buffered so far
    pub fn pending(&self) -> usize {
        self.lines.len()
    }
}

impl EventSink for BufferedFileSink {
    fn record(&mut self, line: &str) {
        self.lines.push(line.to_owned());
    }

    fn finish(&mut self) -> Result<()> {
        if self.finished {
            return Ok(());
        }

        let file = File::create(&self.path).map_err(|e| SimulationError::file_access(&self.path, e))?;
        let mut writer = BufWriter::new(file);
        for line in &self.lines {
            writer
                .write_all(line.as_bytes())
                .map_err(|e| SimulationError::file_access(&self.path, e))?;
        }
        writer
            .flush()
            .map_err(|e| SimulationError::file_access(&self.path, e))?;

        self.finished = true;
        debug!("📝 Wrote {} log lines to {}", self.lines.len(), self.path.display());
        Ok(())
    }
}

/// In-memory sink whose contents stay readable through cloned handles
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    lines: Arc<Mutex<Vec<String>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every line recorded so far, in order
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }

    /// All lines concatenated
    pub fn contents(&self) -> String {
        self.lines.lock().concat()
    }

    pub fn len(&self) -> usize {
        self.lines.lock().len()
    }
}

impl EventSink for MemorySink {
    fn record(&mut self, line: &str) {
        self.lines.lock().push(line.to_owned());
    }

    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_console_sink_writes_lines_in_order() {
        let mut sink = ConsoleSink::new(Vec::new());
        sink.record("(call started) - (0 and 1) at 0.000000\n");
        sink.record("(call ended) - (0 and 1) at 1.000000\n");
        sink.finish().unwrap();

        let written = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(
            written,
            "(call started) - (0 and 1) at 0.000000\n(call ended) - (0 and 1) at 1.000000\n"
        );
    }

    #[test]
    fn test_console_sink_survives_write_failures() {
        let mut sink = ConsoleSink::new(BrokenPipe);
        sink.record("lost\n");
        sink.record("lost too\n");
        assert_eq!(sink.failed_writes(), 2);
        assert!(sink.finish().is_ok());
    }

    #[test]
    fn test_buffered_file_sink_writes_on_finish() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("calls.log");
        let mut sink = BufferedFileSink::new(&path);

        sink.record("Generated number: 3\n");
        sink.record("(failed call attempt) - (0 to 1) at 0.100000\n");
        assert_eq!(sink.pending(), 2);
        assert!(!path.exists());

        sink.finish().unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, "Generated number: 3\n(failed call attempt) - (0 to 1) at 0.100000\n");

        // a second finish leaves the file alone
        sink.finish().unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), written);
    }

    #[test]
    fn test_buffered_file_sink_reports_unwritable_path() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = BufferedFileSink::new(dir.path().join("missing").join("calls.log"));
        sink.record("line\n");
        assert!(matches!(sink.finish(), Err(SimulationError::FileAccess { .. })));
    }

    #[test]
    fn test_memory_sink_shares_lines_between_handles() {
        let observer = MemorySink::new();
        let mut writer = observer.clone();
        writer.record("a\n");
        writer.record("b\n");
        assert_eq!(observer.len(), 2);
        assert_eq!(observer.contents(), "a\nb\n");
        assert_eq!(observer.lines(), vec!["a\n".to_string(), "b\n".to_string()]);
    }
}
