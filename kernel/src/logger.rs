//! Kernel logger
//!
//! `log` backend for the firmware: each record is formatted into a stack
//! buffer as `[LEVEL] target: message` and handed to a byte sink (serial
//! port, shared-memory trace window). Nothing allocates.

use core::fmt::Write;
use log::{Level, LevelFilter, Metadata, Record};

/// Byte sink receiving one formatted line per record
pub type LogSink = fn(&[u8]);

/// Longest line handed to the sink; longer records are truncated
pub const LINE_MAX: usize = 256;

struct KernelLogger {
    sink: spin::Once<LogSink>,
}

impl log::Log for KernelLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let Some(sink) = self.sink.get() else {
            return;
        };

        let mut buf = [0u8; LINE_MAX];
        let len = format_line(&mut buf, record.level(), record.target(), record.args());
        sink(&buf[..len]);
    }

    fn flush(&self) {}
}

/// Simple buffer writer for formatting without alloc
pub struct BufferWriter<'a> {
    pub buffer: &'a mut [u8],
    pub pos: usize,
}

impl<'a> Write for BufferWriter<'a> {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        let bytes = s.as_bytes();
        let remaining = self.buffer.len() - self.pos;
        let to_write = bytes.len().min(remaining);

        if to_write > 0 {
            self.buffer[self.pos..self.pos + to_write].copy_from_slice(&bytes[..to_write]);
            self.pos += to_write;
        }

        Ok(())
    }
}

fn level_str(level: Level) -> &'static str {
    match level {
        Level::Error => "ERROR",
        Level::Warn => "WARN ",
        Level::Info => "INFO ",
        Level::Debug => "DEBUG",
        Level::Trace => "TRACE",
    }
}

/// Format one record into `buf`, newline-terminated even when truncated.
/// Returns the number of bytes used.
pub fn format_line(
    buf: &mut [u8],
    level: Level,
    target: &str,
    args: &core::fmt::Arguments<'_>,
) -> usize {
    if buf.is_empty() {
        return 0;
    }

    let mut writer = BufferWriter {
        buffer: buf,
        pos: 0,
    };
    let _ = write!(writer, "[{}] {}: {}\n", level_str(level), target, args);
    let pos = writer.pos;

    if buf[pos - 1] != b'\n' {
        buf[pos - 1] = b'\n';
    }
    pos
}

static LOGGER: KernelLogger = KernelLogger {
    sink: spin::Once::new(),
};

/// Install the kernel logger
///
/// The first sink registered wins; fails if another `log` backend is
/// already installed.
pub fn init(sink: LogSink, level: LevelFilter) -> Result<(), log::SetLoggerError> {
    LOGGER.sink.call_once(|| sink);
    log::set_logger(&LOGGER)?;
    log::set_max_level(level);
    log::info!("logger: up at {}", level);
    Ok(())
}
