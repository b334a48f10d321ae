// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Logging infrastructure for PatternKey
//!
//! A no_std ring buffer of formatted entries. The token has no console, so
//! the buffer is the only record of dropped frames and rejected commands;
//! it can be inspected with a debugger or by the simulator.
//!
//! # Security
//!
//! - Key, response and block contents must NEVER be logged
//! - Log only slot numbers, block addresses, lengths and error codes

use core::fmt::{self, Write};
use heapless::String;

/// Maximum log message length
pub const MAX_LOG_MESSAGE_LEN: usize = 128;

/// Log buffer size (number of entries)
pub const LOG_BUFFER_SIZE: usize = 32;

/// Log level enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum LogLevel {
    /// Errors that require immediate attention
    Error = 0,
    /// Warnings about potential issues
    Warn = 1,
    /// Informational messages
    Info = 2,
    /// Debug messages (development only)
    Debug = 3,
    /// Trace messages (very verbose, development only)
    Trace = 4,
}

impl LogLevel {
    /// Get the log level name
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Error => "ERROR",
            Self::Warn => "WARN",
            Self::Info => "INFO",
            Self::Debug => "DEBUG",
            Self::Trace => "TRACE",
        }
    }

    /// Get a short prefix for the log level
    #[must_use]
    pub const fn prefix(&self) -> char {
        match self {
            Self::Error => 'E',
            Self::Warn => 'W',
            Self::Info => 'I',
            Self::Debug => 'D',
            Self::Trace => 'T',
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Log entry structure
#[derive(Clone)]
pub struct LogEntry {
    /// Log level
    pub level: LogLevel,
    /// Milliseconds since boot
    pub timestamp: u32,
    /// Module/component name
    pub module: &'static str,
    /// Log message (truncated to `MAX_LOG_MESSAGE_LEN`)
    pub message: String<MAX_LOG_MESSAGE_LEN>,
}

impl fmt::Debug for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{:08}] {} [{}] {}",
            self.timestamp,
            self.level.prefix(),
            self.module,
            self.message
        )
    }
}

/// Writer that silently truncates at capacity instead of failing the format
struct Truncating<'a>(&'a mut String<MAX_LOG_MESSAGE_LEN>);

impl Write for Truncating<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        for ch in s.chars() {
            if self.0.push(ch).is_err() {
                break;
            }
        }
        Ok(())
    }
}

/// Circular log buffer
pub struct LogBuffer {
    entries: [Option<LogEntry>; LOG_BUFFER_SIZE],
    write_index: usize,
    count: usize,
    overwritten: u32,
    min_level: LogLevel,
}

impl LogBuffer {
    /// Create a new empty log buffer recording `Info` and above
    #[must_use]
    pub const fn new() -> Self {
        Self::with_level(LogLevel::Info)
    }

    /// Create a new empty log buffer with a minimum level
    #[must_use]
    pub const fn with_level(min_level: LogLevel) -> Self {
        const NONE: Option<LogEntry> = None;
        Self {
            entries: [NONE; LOG_BUFFER_SIZE],
            write_index: 0,
            count: 0,
            overwritten: 0,
            min_level,
        }
    }

    /// Set the minimum log level
    pub fn set_min_level(&mut self, level: LogLevel) {
        self.min_level = level;
    }

    /// Get the minimum log level
    #[must_use]
    pub const fn min_level(&self) -> LogLevel {
        self.min_level
    }

    /// Check if a log level should be recorded
    #[must_use]
    pub const fn should_log(&self, level: LogLevel) -> bool {
        (level as u8) <= (self.min_level as u8)
    }

    /// Log with format arguments
    pub fn log(
        &mut self,
        level: LogLevel,
        timestamp: u32,
        module: &'static str,
        args: fmt::Arguments<'_>,
    ) {
        if !self.should_log(level) {
            return;
        }

        let mut message = String::new();
        let _ = Truncating(&mut message).write_fmt(args);

        if self.count == LOG_BUFFER_SIZE {
            self.overwritten = self.overwritten.saturating_add(1);
        } else {
            self.count += 1;
        }
        self.entries[self.write_index] = Some(LogEntry {
            level,
            timestamp,
            module,
            message,
        });
        self.write_index = (self.write_index + 1) % LOG_BUFFER_SIZE;
    }

    /// Get the number of entries
    #[must_use]
    pub const fn len(&self) -> usize {
        self.count
    }

    /// Check if buffer is empty
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Number of entries lost to wrap-around since the last clear
    #[must_use]
    pub const fn overwritten(&self) -> u32 {
        self.overwritten
    }

    /// Most recent entry
    #[must_use]
    pub fn latest(&self) -> Option<&LogEntry> {
        if self.count == 0 {
            return None;
        }
        let index = (self.write_index + LOG_BUFFER_SIZE - 1) % LOG_BUFFER_SIZE;
        self.entries[index].as_ref()
    }

    /// Clear all entries
    pub fn clear(&mut self) {
        for entry in &mut self.entries {
            *entry = None;
        }
        self.write_index = 0;
        self.count = 0;
        self.overwritten = 0;
    }

    /// Iterate over entries (oldest first)
    pub fn iter(&self) -> impl Iterator<Item = &LogEntry> + '_ {
        let start = if self.count < LOG_BUFFER_SIZE {
            0
        } else {
            self.write_index
        };
        (0..self.count).filter_map(move |i| self.entries[(start + i) % LOG_BUFFER_SIZE].as_ref())
    }
}

impl Default for LogBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Log an error message
#[macro_export]
macro_rules! log_error {
    ($buffer:expr, $ts:expr, $module:expr, $($arg:tt)*) => {
        $buffer.log($crate::log::LogLevel::Error, $ts, $module, format_args!($($arg)*))
    };
}

/// Log a warning message
#[macro_export]
macro_rules! log_warn {
    ($buffer:expr, $ts:expr, $module:expr, $($arg:tt)*) => {
        $buffer.log($crate::log::LogLevel::Warn, $ts, $module, format_args!($($arg)*))
    };
}

/// Log an informational message
#[macro_export]
macro_rules! log_info {
    ($buffer:expr, $ts:expr, $module:expr, $($arg:tt)*) => {
        $buffer.log($crate::log::LogLevel::Info, $ts, $module, format_args!($($arg)*))
    };
}

/// Log a debug message
#[macro_export]
macro_rules! log_debug {
    ($buffer:expr, $ts:expr, $module:expr, $($arg:tt)*) => {
        $buffer.log($crate::log::LogLevel::Debug, $ts, $module, format_args!($($arg)*))
    };
}

/// Log a trace-level message
#[macro_export]
macro_rules! log_trace {
    ($buffer:expr, $ts:expr, $module:expr, $($arg:tt)*) => {
        $buffer.log($crate::log::LogLevel::Trace, $ts, $module, format_args!($($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_filtering() {
        let mut log = LogBuffer::new();
        log_debug!(log, 1, "test", "hidden {}", 1);
        assert!(log.is_empty());
        log_warn!(log, 2, "test", "shown {}", 2);
        assert_eq!(log.len(), 1);
        assert_eq!(log.latest().map(|e| e.message.as_str()), Some("shown 2"));
    }

    #[test]
    fn test_wraparound_keeps_newest() {
        let mut log = LogBuffer::new();
        for i in 0..(LOG_BUFFER_SIZE as u32 + 3) {
            log_info!(log, i, "test", "entry {}", i);
        }
        assert_eq!(log.len(), LOG_BUFFER_SIZE);
        assert_eq!(log.overwritten(), 3);
        assert_eq!(log.iter().next().map(|e| e.timestamp), Some(3));
        assert_eq!(log.latest().map(|e| e.timestamp), Some(LOG_BUFFER_SIZE as u32 + 2));
    }

    #[test]
    fn test_long_message_truncated() {
        let mut log = LogBuffer::new();
        let long = [b'x'; 300];
        let text = core::str::from_utf8(&long).unwrap_or("");
        log_error!(log, 0, "test", "{}", text);
        assert_eq!(log.latest().map(|e| e.message.len()), Some(MAX_LOG_MESSAGE_LEN));
    }
}
