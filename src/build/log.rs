//! Human-readable build log
//!
//! Indentation encodes nesting: titles at column 0, processes at 2,
//! subprocesses at 4, actions at 6. Diagnostics go through `tracing`; this
//! log is the user-facing account of what the build decided and ran.

use std::io::Write;
use std::sync::{Arc, Mutex};

type Sink = Arc<Mutex<Box<dyn Write + Send>>>;

/// Build log writer handed explicitly to each component
#[derive(Clone)]
pub struct BuildLogger {
    sink: Sink,
}

impl BuildLogger {
    /// Log to any writer
    pub fn new(writer: impl Write + Send + 'static) -> Self {
        Self {
            sink: Arc::new(Mutex::new(Box::new(writer))),
        }
    }

    /// Log to standard output
    pub fn stdout() -> Self {
        Self::new(std::io::stdout())
    }

    /// Log into memory; the returned buffer sees every line written
    pub fn buffer() -> (Self, LogBuffer) {
        let buffer = LogBuffer::default();
        (Self::new(buffer.clone()), buffer)
    }

    /// Discard everything
    pub fn discard() -> Self {
        Self::new(std::io::sink())
    }

    pub fn title(&self, message: impl AsRef<str>) {
        self.write_indented(0, message.as_ref());
    }

    pub fn process(&self, message: impl AsRef<str>) {
        self.write_indented(2, message.as_ref());
    }

    pub fn subprocess(&self, message: impl AsRef<str>) {
        self.write_indented(4, message.as_ref());
    }

    pub fn action(&self, message: impl AsRef<str>) {
        self.write_indented(6, message.as_ref());
    }

    /// Write an empty line
    pub fn break_line(&self) {
        self.write_line("");
    }

    /// Aligned `key -> "value"` lines at action level
    pub fn key_values<K: AsRef<str>, V: AsRef<str>>(&self, entries: &[(K, V)]) {
        let width = entries
            .iter()
            .map(|(k, _)| k.as_ref().len())
            .max()
            .unwrap_or(0);
        for (key, value) in entries {
            self.action(format!(
                "{:<width$} -> \"{}\"",
                key.as_ref(),
                value.as_ref(),
                width = width
            ));
        }
    }

    fn write_indented(&self, indent: usize, message: &str) {
        // Multi-line messages (captured output) keep the indent on every line
        let pad = " ".repeat(indent);
        let text: Vec<String> = message
            .lines()
            .map(|line| {
                if line.is_empty() {
                    String::new()
                } else {
                    format!("{}{}", pad, line)
                }
            })
            .collect();
        if text.is_empty() {
            self.write_line("");
        } else {
            self.write_line(&text.join("\n"));
        }
    }

    fn write_line(&self, line: &str) {
        if let Ok(mut sink) = self.sink.lock() {
            writeln!(sink, "{}", line).ok();
        }
    }
}

impl std::fmt::Debug for BuildLogger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuildLogger").finish_non_exhaustive()
    }
}

/// Shared in-memory log target
#[derive(Debug, Clone, Default)]
pub struct LogBuffer(Arc<Mutex<Vec<u8>>>);

impl LogBuffer {
    /// Everything written so far
    pub fn contents(&self) -> String {
        self.0
            .lock()
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
            .unwrap_or_default()
    }
}

impl Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let mut bytes = self
            .0
            .lock()
            .map_err(|_| std::io::Error::other("log buffer poisoned"))?;
        bytes.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indents_by_level() {
        let (logger, buffer) = BuildLogger::buffer();
        logger.title("modlayer 0.3.0");
        logger.process("Resolving installation process");
        logger.subprocess("Process inputs:");
        logger.action("done");

        assert_eq!(
            buffer.contents(),
            "modlayer 0.3.0\n  Resolving installation process\n    Process inputs:\n      done\n"
        );
    }

    #[test]
    fn multi_line_messages_keep_indent() {
        let (logger, buffer) = BuildLogger::buffer();
        logger.subprocess("npm ERR! one\n\nnpm ERR! two");

        assert_eq!(buffer.contents(), "    npm ERR! one\n\n    npm ERR! two\n");
    }

    #[test]
    fn key_values_are_aligned() {
        let (logger, buffer) = BuildLogger::buffer();
        logger.key_values(&[("node_modules", "Found"), ("npm-cache", "Not found")]);

        assert_eq!(
            buffer.contents(),
            "      node_modules -> \"Found\"\n      npm-cache    -> \"Not found\"\n"
        );
    }

    #[test]
    fn clones_share_a_sink() {
        let (logger, buffer) = BuildLogger::buffer();
        logger.clone().process("from clone");
        assert!(buffer.contents().contains("from clone"));
    }
}
