// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! PatternKey Common Library
//!
//! This crate provides the protocol constants, the unified error type,
//! configuration structures, and the logging and time utilities shared by
//! every PatternKey firmware component.
//!
//! # Features
//!
//! - `std`: Enable standard library support (disabled by default for embedded)
//! - `defmt`: Enable defmt formatting of errors for embedded debugging
//!
//! # Security
//!
//! Buffers that carry key or response material implement `Zeroize`.
//! No heap allocations are performed - all buffers use fixed-size arrays or heapless collections.

#![no_std]
#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

#[cfg(feature = "std")]
extern crate std;

pub mod constants;
pub mod types;
pub mod errors;
pub mod config;
pub mod log;
pub mod time;

// Re-export commonly used items
pub use errors::{Error, Result};
pub use types::*;
pub use config::{LinkConfig, TokenConfig};
