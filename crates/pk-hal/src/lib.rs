// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Hardware Abstraction Layer for PatternKey
//!
//! The token core never touches hardware directly. It is generic over the
//! collaborator traits in [`traits`]:
//!
//! - **Serial**: byte-wise, non-blocking link to the host (USB-serial on the
//!   device, TCP in the simulator)
//! - **Timer**: monotonic ticks for frame inactivity timeouts
//! - **RNG**: opaque source of random bytes
//! - **Key store** and **block store**: addressable fixed-size records
//!
//! # Backends
//!
//! - [`mem`]: in-memory emulation of every collaborator (no_std), used by the
//!   test suites and as the emulated storage of the simulator
//! - [`sim`]: host simulator transport, clock and noise source (`std` feature)

#![no_std]
#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

#[cfg(feature = "std")]
extern crate std;

pub mod traits;
pub mod error;
pub mod mem;

#[cfg(feature = "std")]
pub mod sim;

// Re-export main traits
pub use traits::*;
pub use error::{HalError, HalResult};
