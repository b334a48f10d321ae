// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Packet link for PatternKey
//!
//! Turns the host's byte stream into verified, length-bounded packets and
//! back. The layers, bottom up:
//!
//! 1. **Encoding** (`encoding`): each byte travels as Base64 text so the
//!    link can be treated as a printable character channel; a control
//!    character ends a frame.
//! 2. **Integrity** (`crc`): CRC-16-CCITT over the payload, appended
//!    big-endian.
//! 3. **Framing** (`packet`): timeout-bounded reassembly against one or two
//!    expected payload lengths.
//!
//! # Wire format
//!
//! ```text
//! base64([payload:N][crc16_hi][crc16_lo]) '\n'
//! ```

#![no_std]
#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod crc;
pub mod encoding;
pub mod packet;

pub use crc::{crc16_ccitt, Crc16};
pub use encoding::{Decoder, Encoder, Symbol};
pub use packet::{LinkStats, PacketLink};
