// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Firmware configuration for PatternKey
//!
//! All configuration is compile-time: the structures below are built from
//! `const` defaults and handed to the token at construction. Nothing on the
//! wire can change them.

use crate::constants::{FRAME_TIMEOUT_MS, SERIAL_BAUD_RATE};
use crate::log::LogLevel;

/// Token-wide configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenConfig {
    /// Serial link configuration
    pub link: LinkConfig,
    /// Minimum level recorded in the log buffer
    pub log_level: LogLevel,
}

impl TokenConfig {
    /// Production configuration
    pub const DEFAULT: Self = Self {
        link: LinkConfig::DEFAULT,
        log_level: LogLevel::Info,
    };

    /// Development configuration (verbose logging)
    pub const DEVELOPMENT: Self = Self {
        link: LinkConfig::DEFAULT,
        log_level: LogLevel::Debug,
    };
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Serial link and framing configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkConfig {
    /// Serial baud rate
    pub baud_rate: u32,
    /// Inactivity timeout once a frame has started (milliseconds)
    pub inactivity_timeout_ms: u32,
    /// How long an operand packet may take to start arriving (milliseconds)
    pub operand_timeout_ms: u32,
}

impl LinkConfig {
    /// Default link configuration
    pub const DEFAULT: Self = Self {
        baud_rate: SERIAL_BAUD_RATE,
        inactivity_timeout_ms: FRAME_TIMEOUT_MS,
        operand_timeout_ms: FRAME_TIMEOUT_MS,
    };
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}
