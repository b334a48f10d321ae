// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Protocol constants for PatternKey
//!
//! Every buffer in the firmware is sized from these values at compile time.
//! They are part of the wire contract with the host-side key manager and
//! must not change without a protocol revision.

// =============================================================================
// Key Table
// =============================================================================

/// Size of a key pattern in bytes
pub const KEY_SIZE: usize = 256;

/// Size of a response in bytes (paired 1:1 with a key)
pub const RESPONSE_SIZE: usize = KEY_SIZE;

/// Number of key slots (addressed by an 8-bit index)
pub const KEY_COUNT: usize = 256;

/// Size of a key slot address on the wire
pub const KEY_ADDRESS_SIZE: usize = 1;

/// Size of the permutation vector (one entry per key byte position)
pub const PERMUTATION_SIZE: usize = KEY_SIZE;

// =============================================================================
// Block Store
// =============================================================================

/// Size of one auxiliary storage block in bytes
pub const BLOCK_SIZE: usize = 1024;

/// Number of auxiliary storage blocks
pub const BLOCK_COUNT: usize = 32;

/// Size of a block address on the wire (big-endian)
pub const BLOCK_ADDRESS_SIZE: usize = 2;

// =============================================================================
// Framing
// =============================================================================

/// Size of the trailing CRC-16 in every packet
pub const CRC_SIZE: usize = 2;

/// Size of an opcode packet payload
pub const OPCODE_SIZE: usize = 1;

/// Number of random bytes returned by the noise command
pub const NOISE_SIZE: usize = 256;

/// Operand payload of the write command: address, key, response
pub const WRITE_OPERAND_SIZE: usize = KEY_ADDRESS_SIZE + KEY_SIZE + RESPONSE_SIZE;

/// Operand payload of the put command: address, block
pub const PUT_OPERAND_SIZE: usize = BLOCK_ADDRESS_SIZE + BLOCK_SIZE;

/// Largest payload any packet can carry
pub const MAX_PAYLOAD_SIZE: usize = PUT_OPERAND_SIZE;

/// Receive buffer size: largest payload plus CRC
pub const FRAME_BUFFER_SIZE: usize = MAX_PAYLOAD_SIZE + CRC_SIZE;

/// Byte that terminates an encoded frame on the wire
pub const FRAME_TERMINATOR: u8 = b'\n';

// =============================================================================
// Link
// =============================================================================

/// USB-serial baud rate
pub const SERIAL_BAUD_RATE: u32 = 9600;

/// Inactivity timeout while a frame is being received (milliseconds)
pub const FRAME_TIMEOUT_MS: u32 = 500;

/// TCP port used by the simulator transport
pub const SIMULATOR_PORT: u16 = 13579;

/// USB vendor ID ("FOSS") of the serial bridge
///
/// Host-side identifier: the host key manager matches on `USB_VID` and
/// `USB_PID` to find the token. The firmware core never reads them; board
/// bring-up writes them into the USB device descriptor.
pub const USB_VID: u16 = 0xF055;

/// USB product ID of the serial bridge (see [`USB_VID`])
pub const USB_PID: u16 = 0xE4E7;

// =============================================================================
// Replies
// =============================================================================

/// Positive acknowledgement of an administrative command
pub const REPLY_ACK: u8 = 0x06;

/// Negative acknowledgement of an administrative command
pub const REPLY_NAK: u8 = 0x15;

/// Reply to a lookup whose pattern is not enrolled
pub const REPLY_NOT_FOUND: u8 = 0x04;

// Compile-time sanity checks
const _: () = assert!(KEY_COUNT <= u8::MAX as usize + 1);
const _: () = assert!(PERMUTATION_SIZE == KEY_SIZE);
const _: () = assert!(BLOCK_COUNT <= u16::MAX as usize);
const _: () = assert!(FRAME_BUFFER_SIZE >= WRITE_OPERAND_SIZE + CRC_SIZE);
