// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! HAL trait definitions
//!
//! This module defines the platform-agnostic collaborator interfaces the
//! token core is written against.

use crate::error::{HalError, HalResult};
use pk_common::types::{is_all_zero, Block, Key, Response, Slot};

/// Serial link to the host
///
/// Reads never block: an idle link must not stall the command loop.
pub trait SerialInterface {
    /// Initialize the link with the given baud rate
    fn init(&mut self, baud_rate: u32) -> HalResult<()>;

    /// Read one byte if one has arrived
    ///
    /// Returns `Ok(None)` when no data is pending.
    fn try_read_byte(&mut self) -> HalResult<Option<u8>>;

    /// Write a byte (blocking)
    fn write_byte(&mut self, byte: u8) -> HalResult<()>;

    /// Write a buffer of bytes (blocking)
    fn write(&mut self, data: &[u8]) -> HalResult<()> {
        for &byte in data {
            self.write_byte(byte)?;
        }
        Ok(())
    }

    /// Flush the transmit buffer
    fn flush(&mut self) -> HalResult<()>;
}

/// Timer interface
pub trait TimerInterface {
    /// Timer resolution in Hz
    const FREQUENCY_HZ: u32;

    /// Initialize the timer
    fn init(&mut self) -> HalResult<()>;

    /// Get current tick count
    fn get_ticks(&self) -> u64;

    /// Get elapsed milliseconds since boot
    #[allow(clippy::cast_possible_truncation)]
    fn get_millis(&self) -> u32 {
        ((self.get_ticks() * 1_000) / u64::from(Self::FREQUENCY_HZ)) as u32
    }
}

/// Random number generator interface
pub trait RngInterface {
    /// Initialize the RNG
    fn init(&mut self) -> HalResult<()>;

    /// Fill buffer with random bytes
    fn fill_bytes(&mut self, buffer: &mut [u8]) -> HalResult<()>;

    /// Check if RNG is ready
    fn is_ready(&self) -> bool;
}

/// Key/response pair storage
///
/// Slots are addressed by an 8-bit index, so every `Slot` value is in range.
/// Records are borrowed, never copied out wholesale.
pub trait KeyStoreInterface {
    /// Key stored in a slot
    fn key(&self, slot: Slot) -> &Key;

    /// Response stored in a slot
    fn response(&self, slot: Slot) -> &Response;

    /// Overwrite both fields of a slot
    fn store_pair(&mut self, slot: Slot, key: &Key, response: &Response) -> HalResult<()>;

    /// Reset every slot to all-zero
    fn erase_all(&mut self) -> HalResult<()> {
        let zero = [0u8; pk_common::constants::KEY_SIZE];
        for slot in 0..=Slot::MAX {
            self.store_pair(slot, &zero, &zero)?;
        }
        Ok(())
    }

    /// Check whether a slot holds an enrolled pair
    ///
    /// A slot whose key and response are both all-zero is empty.
    fn is_occupied(&self, slot: Slot) -> bool {
        !(is_all_zero(self.key(slot)) && is_all_zero(self.response(slot)))
    }
}

/// Auxiliary block storage
pub trait BlockStoreInterface {
    /// Borrow a block
    fn block(&self, index: u16) -> HalResult<&Block>;

    /// Overwrite a block
    fn store_block(&mut self, index: u16, data: &Block) -> HalResult<()>;
}

/// Map an out-of-range block index to the HAL error
///
/// # Errors
///
/// Returns `HalError::StorageOutOfBounds` if `index` is not below `count`.
pub fn check_block_index(index: u16, count: usize) -> HalResult<usize> {
    let index = usize::from(index);
    if index < count {
        Ok(index)
    } else {
        Err(HalError::StorageOutOfBounds)
    }
}
