// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! PatternKey Token Core
//!
//! The application layer of the token firmware: a key index searched in
//! permutation order, an auxiliary block store, and the dispatcher that
//! answers host requests arriving over the packet link.
//!
//! # Host protocol
//!
//! | Request | Operand packet | Reply |
//! |---|---|---|
//! | 256-byte packet (lookup) | none | 256-byte response or `NOT_FOUND` |
//! | `0x11` prime | 256-byte permutation | ACK/NAK |
//! | `0x22` write | slot + key + response | ACK/NAK |
//! | `0x33` erase | none | ACK/NAK |
//! | `0x44` noise | none | 256 random bytes |
//! | `0x55` get | 2-byte block address | 1024-byte block or NAK |
//! | `0x66` put | 2-byte block address + block | ACK/NAK |
//! | `0x77` status | none | status flags |
//!
//! # Security
//!
//! Key, response and block contents never reach the log. The dispatcher's
//! scratch buffer is zeroized after every transaction.

#![no_std]
#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod block_store;
pub mod dispatcher;
pub mod key_index;

pub use block_store::BlockAddress;
pub use dispatcher::{Opcode, StatusFlags, Token, Transaction};
pub use key_index::{KeyIndex, Permutation};
