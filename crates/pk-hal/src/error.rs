// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! HAL error types

use core::fmt;

/// HAL error type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HalError {
    /// Hardware initialization failed
    InitFailed,
    /// Serial link error
    UartError,
    /// Serial link closed by the peer
    Disconnected,
    /// Transmit queue is full
    TxOverflow,
    /// Receive queue is full
    RxOverflow,
    /// RNG failure
    RngError,
    /// Timer error
    TimerError,
    /// Storage read failed
    StorageReadFailed,
    /// Storage write failed
    StorageWriteFailed,
    /// Storage address out of bounds
    StorageOutOfBounds,
    /// Invalid parameter
    InvalidParameter,
}

impl HalError {
    /// Get error code
    #[must_use]
    pub const fn code(&self) -> u16 {
        match self {
            Self::InitFailed => 0x0802,
            Self::UartError => 0x0870,
            Self::Disconnected => 0x0871,
            Self::TxOverflow => 0x0872,
            Self::RxOverflow => 0x0873,
            Self::RngError => 0x0820,
            Self::TimerError => 0x0830,
            Self::StorageReadFailed => 0x0890,
            Self::StorageWriteFailed => 0x0891,
            Self::StorageOutOfBounds => 0x0892,
            Self::InvalidParameter => 0x08F0,
        }
    }

    /// Get error description
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::InitFailed => "initialization failed",
            Self::UartError => "UART error",
            Self::Disconnected => "link disconnected",
            Self::TxOverflow => "transmit queue full",
            Self::RxOverflow => "receive queue full",
            Self::RngError => "RNG error",
            Self::TimerError => "timer error",
            Self::StorageReadFailed => "storage read failed",
            Self::StorageWriteFailed => "storage write failed",
            Self::StorageOutOfBounds => "storage address out of bounds",
            Self::InvalidParameter => "invalid parameter",
        }
    }
}

impl fmt::Display for HalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[0x{:04X}] {}", self.code(), self.description())
    }
}

impl From<HalError> for pk_common::Error {
    fn from(e: HalError) -> Self {
        match e {
            HalError::InitFailed => Self::HardwareInitFailed,
            HalError::UartError
            | HalError::Disconnected
            | HalError::TxOverflow
            | HalError::RxOverflow => Self::UartError,
            HalError::RngError => Self::RngFailure,
            HalError::TimerError => Self::TimerError,
            HalError::StorageReadFailed => Self::StorageReadFailed,
            HalError::StorageWriteFailed => Self::StorageWriteFailed,
            HalError::StorageOutOfBounds => Self::StorageOutOfBounds,
            HalError::InvalidParameter => Self::InvalidParameter,
        }
    }
}

/// HAL Result type
pub type HalResult<T> = Result<T, HalError>;
