// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Error types for PatternKey
//!
//! This module defines the unified error type used throughout the firmware.
//! All errors are no_std compatible and carry no heap data. None of them is
//! fatal: the command loop maps every error to a reply byte or a dropped
//! frame and returns to idle.

use core::fmt;

/// Result type alias for PatternKey operations
pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for PatternKey
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Error {
    // =========================================================================
    // Link Errors (0x01xx)
    // =========================================================================
    /// No byte arrived within the inactivity timeout of a partial frame
    FrameTimeout,
    /// Trailing CRC does not match the payload
    CrcMismatch,
    /// Text encoding of the frame is malformed
    DecodeError,
    /// Frame ended at a length that matches no expected packet size
    FrameLengthMismatch,
    /// Frame grew beyond the largest expected packet size
    FrameOverflow,

    // =========================================================================
    // Index Errors (0x02xx)
    // =========================================================================
    /// Permutation vector is not a bijection over the key byte positions
    InvalidPermutation,

    // =========================================================================
    // Storage Errors (0x03xx)
    // =========================================================================
    /// Storage read failed
    StorageReadFailed,
    /// Storage write failed
    StorageWriteFailed,
    /// Record address outside the store
    StorageOutOfBounds,

    // =========================================================================
    // Protocol Errors (0x04xx)
    // =========================================================================
    /// Opcode byte is not a known command
    UnknownOpcode,
    /// Operand packet has the wrong shape for its command
    MalformedOperand,

    // =========================================================================
    // HAL Errors (0x08xx)
    // =========================================================================
    /// Hardware initialization failed
    HardwareInitFailed,
    /// Serial link error
    UartError,
    /// Timer error
    TimerError,
    /// Random number generator failure
    RngFailure,

    // =========================================================================
    // General Errors (0xFFxx)
    // =========================================================================
    /// Buffer is too small for operation
    BufferTooSmall,
    /// Invalid parameter provided
    InvalidParameter,
    /// Internal error (should not occur)
    InternalError,
}

impl Error {
    /// Get the error code for this error
    ///
    /// Error codes are organized by category:
    /// - 0x01xx: Link (framing) errors
    /// - 0x02xx: Key index errors
    /// - 0x03xx: Storage errors
    /// - 0x04xx: Protocol errors
    /// - 0x08xx: HAL errors
    /// - 0xFFxx: General errors
    #[must_use]
    pub const fn code(&self) -> u16 {
        match self {
            Self::FrameTimeout => 0x0101,
            Self::CrcMismatch => 0x0102,
            Self::DecodeError => 0x0103,
            Self::FrameLengthMismatch => 0x0104,
            Self::FrameOverflow => 0x0105,

            Self::InvalidPermutation => 0x0201,

            Self::StorageReadFailed => 0x0301,
            Self::StorageWriteFailed => 0x0302,
            Self::StorageOutOfBounds => 0x0303,

            Self::UnknownOpcode => 0x0401,
            Self::MalformedOperand => 0x0402,

            Self::HardwareInitFailed => 0x0801,
            Self::UartError => 0x0802,
            Self::TimerError => 0x0803,
            Self::RngFailure => 0x0804,

            Self::BufferTooSmall => 0xFF01,
            Self::InvalidParameter => 0xFF02,
            Self::InternalError => 0xFFFF,
        }
    }

    /// Check if this error means a frame was dropped by the link layer
    #[must_use]
    pub const fn is_link_error(&self) -> bool {
        matches!(
            self,
            Self::FrameTimeout
                | Self::CrcMismatch
                | Self::DecodeError
                | Self::FrameLengthMismatch
                | Self::FrameOverflow
        )
    }

    /// Check if this error originates from a storage collaborator
    #[must_use]
    pub const fn is_storage_error(&self) -> bool {
        matches!(
            self,
            Self::StorageReadFailed | Self::StorageWriteFailed | Self::StorageOutOfBounds
        )
    }

    /// Get a short description of the error
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::FrameTimeout => "frame inactivity timeout",
            Self::CrcMismatch => "CRC mismatch",
            Self::DecodeError => "frame decode error",
            Self::FrameLengthMismatch => "unexpected frame length",
            Self::FrameOverflow => "frame overflow",
            Self::InvalidPermutation => "invalid permutation vector",
            Self::StorageReadFailed => "storage read failed",
            Self::StorageWriteFailed => "storage write failed",
            Self::StorageOutOfBounds => "storage address out of bounds",
            Self::UnknownOpcode => "unknown opcode",
            Self::MalformedOperand => "malformed operand",
            Self::HardwareInitFailed => "hardware init failed",
            Self::UartError => "UART error",
            Self::TimerError => "timer error",
            Self::RngFailure => "RNG failure",
            Self::BufferTooSmall => "buffer too small",
            Self::InvalidParameter => "invalid parameter",
            Self::InternalError => "internal error",
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[0x{:04X}] {}", self.code(), self.description())
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}

#[cfg(feature = "defmt")]
impl defmt::Format for Error {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(f, "[0x{:04X}] {}", self.code(), self.description());
    }
}
