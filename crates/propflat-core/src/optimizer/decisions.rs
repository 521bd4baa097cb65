//! Human readable audit trail of collapse decisions.
//!
//! The log is off unless a caller asks for one. While off, message closures
//! are never evaluated unless `TRACE` logging is enabled for the
//! `propflat::decisions` target, in which case each line is also emitted
//! through `tracing`.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

const TARGET: &str = "propflat::decisions";

enum Sink {
    Disabled,
    Buffer(Vec<String>),
    File(BufWriter<File>),
}

pub struct DecisionLog {
    sink: Sink,
}

impl DecisionLog {
    pub fn disabled() -> Self {
        Self {
            sink: Sink::Disabled,
        }
    }

    /// Keep lines in memory.
    pub fn buffered() -> Self {
        Self {
            sink: Sink::Buffer(Vec::new()),
        }
    }

    /// Write lines to `path`, truncating it. Nothing is kept in memory.
    pub fn to_file(path: impl AsRef<Path>) -> io::Result<Self> {
        let file = File::create(path)?;
        Ok(Self {
            sink: Sink::File(BufWriter::new(file)),
        })
    }

    pub fn is_enabled(&self) -> bool {
        !matches!(self.sink, Sink::Disabled)
    }

    pub fn log(&mut self, message: impl FnOnce() -> String) {
        let tracing_enabled = tracing::enabled!(target: TARGET, tracing::Level::TRACE);
        if !self.is_enabled() && !tracing_enabled {
            return;
        }
        let line = message();
        if tracing_enabled {
            tracing::trace!(target: TARGET, "{}", line);
        }
        match &mut self.sink {
            Sink::Disabled => {}
            Sink::Buffer(lines) => lines.push(line),
            Sink::File(writer) => {
                // A failed write only loses audit output.
                let _ = writeln!(writer, "{}", line);
            }
        }
    }

    /// Lines kept in memory; only a buffered log keeps any.
    pub fn lines(&self) -> &[String] {
        match &self.sink {
            Sink::Buffer(lines) => lines,
            Sink::Disabled | Sink::File(_) => &[],
        }
    }

    pub fn take_lines(&mut self) -> Vec<String> {
        match &mut self.sink {
            Sink::Buffer(lines) => std::mem::take(lines),
            Sink::Disabled | Sink::File(_) => Vec::new(),
        }
    }

    pub fn flush(&mut self) -> io::Result<()> {
        match &mut self.sink {
            Sink::File(writer) => writer.flush(),
            _ => Ok(()),
        }
    }
}

impl Default for DecisionLog {
    fn default() -> Self {
        Self::disabled()
    }
}

impl std::fmt::Debug for DecisionLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match self.sink {
            Sink::Disabled => "disabled",
            Sink::Buffer(_) => "buffer",
            Sink::File(_) => "file",
        };
        f.debug_struct("DecisionLog")
            .field("sink", &kind)
            .field("lines", &self.lines().len())
            .finish()
    }
}

impl Drop for DecisionLog {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_log_keeps_nothing() {
        let mut log = DecisionLog::disabled();
        log.log(|| "a: collapsing".to_string());
        assert!(!log.is_enabled());
        assert!(log.lines().is_empty());
    }

    #[test]
    fn test_buffered_log_keeps_lines_in_order() {
        let mut log = DecisionLog::buffered();
        log.log(|| "a: collapsing".to_string());
        log.log(|| "a.b: escapes".to_string());
        assert_eq!(log.lines(), &["a: collapsing", "a.b: escapes"]);
        assert_eq!(log.take_lines().len(), 2);
        assert!(log.lines().is_empty());
    }

    #[test]
    fn test_file_log_writes_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("decisions.log");
        {
            let mut log = DecisionLog::to_file(&path).unwrap();
            log.log(|| "a: collapsing".to_string());
            log.log(|| "a.b: will flatten references".to_string());
            log.flush().unwrap();
            assert!(log.lines().is_empty());
        }
        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, "a: collapsing\na.b: will flatten references\n");
    }

    #[derive(Clone, Default)]
    struct Capture(std::sync::Arc<parking_lot::Mutex<Vec<u8>>>);

    impl Write for Capture {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_trace_filter_on_decision_target() {
        let capture = Capture::default();
        let writer = capture.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::new("propflat::decisions=trace"))
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            let mut log = DecisionLog::disabled();
            log.log(|| "a.b: will flatten references".to_string());
        });

        let output = String::from_utf8(capture.0.lock().clone()).unwrap();
        assert!(output.contains("a.b: will flatten references"));
    }
}
