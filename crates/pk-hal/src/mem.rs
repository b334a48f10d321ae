// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! In-memory collaborator backends
//!
//! Every HAL trait has a RAM-backed implementation here. They serve as the
//! emulated storage of the simulator and as deterministic fakes in tests:
//! the serial link is a pair of byte queues, the timer advances a fixed
//! step on every read, and the RNG is a seeded xorshift generator.

use core::cell::Cell;

use heapless::Deque;
use zeroize::Zeroize;

use crate::error::{HalError, HalResult};
use crate::traits::{
    check_block_index, BlockStoreInterface, KeyStoreInterface, RngInterface, SerialInterface,
    TimerInterface,
};
use pk_common::constants::{BLOCK_COUNT, BLOCK_SIZE, KEY_COUNT, KEY_SIZE, RESPONSE_SIZE};
use pk_common::types::{Block, Key, Response, Slot};

/// Default queue depth of [`MemSerial`]; holds the largest encoded frame
pub const MEM_SERIAL_DEPTH: usize = 8192;

// ============================================================================
// Serial
// ============================================================================

/// Queue-backed serial link
///
/// Bytes injected with [`MemSerial::inject`] are returned by
/// `try_read_byte`; bytes written by the firmware accumulate in the
/// transmit queue until drained.
pub struct MemSerial<const N: usize = MEM_SERIAL_DEPTH> {
    rx: Deque<u8, N>,
    tx: Deque<u8, N>,
    baud_rate: u32,
}

impl<const N: usize> MemSerial<N> {
    /// Create an empty link
    #[must_use]
    pub const fn new() -> Self {
        Self {
            rx: Deque::new(),
            tx: Deque::new(),
            baud_rate: 0,
        }
    }

    /// Queue bytes for the firmware to read
    ///
    /// # Errors
    ///
    /// Returns `HalError::RxOverflow` if the receive queue fills up; bytes
    /// queued before the overflow are kept.
    pub fn inject(&mut self, data: &[u8]) -> HalResult<()> {
        for &byte in data {
            self.rx.push_back(byte).map_err(|_| HalError::RxOverflow)?;
        }
        Ok(())
    }

    /// Take the oldest byte written by the firmware
    pub fn pop_tx(&mut self) -> Option<u8> {
        self.tx.pop_front()
    }

    /// Move everything written on this link into another link's receive queue
    ///
    /// # Errors
    ///
    /// Returns `HalError::RxOverflow` if the peer's receive queue fills up.
    pub fn transfer_to<const M: usize>(&mut self, peer: &mut MemSerial<M>) -> HalResult<usize> {
        let mut moved = 0;
        while let Some(byte) = self.tx.pop_front() {
            peer.rx.push_back(byte).map_err(|_| HalError::RxOverflow)?;
            moved += 1;
        }
        Ok(moved)
    }

    /// Number of bytes waiting to be read by the firmware
    #[must_use]
    pub fn rx_pending(&self) -> usize {
        self.rx.len()
    }

    /// Number of bytes written by the firmware and not yet drained
    #[must_use]
    pub fn tx_pending(&self) -> usize {
        self.tx.len()
    }

    /// Baud rate passed to the last `init`
    #[must_use]
    pub const fn baud_rate(&self) -> u32 {
        self.baud_rate
    }
}

impl<const N: usize> Default for MemSerial<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> SerialInterface for MemSerial<N> {
    fn init(&mut self, baud_rate: u32) -> HalResult<()> {
        if baud_rate == 0 {
            return Err(HalError::InvalidParameter);
        }
        self.baud_rate = baud_rate;
        Ok(())
    }

    fn try_read_byte(&mut self) -> HalResult<Option<u8>> {
        Ok(self.rx.pop_front())
    }

    fn write_byte(&mut self, byte: u8) -> HalResult<()> {
        self.tx.push_back(byte).map_err(|_| HalError::TxOverflow)
    }

    fn flush(&mut self) -> HalResult<()> {
        Ok(())
    }
}

// ============================================================================
// Timer
// ============================================================================

/// Deterministic millisecond clock
///
/// Every `get_ticks` call returns the current count and then advances it by
/// `step`, so a busy-wait loop makes progress without real time passing.
pub struct StepTimer {
    ticks: Cell<u64>,
    step: u64,
}

impl StepTimer {
    /// Create a clock at zero advancing `step` milliseconds per read
    #[must_use]
    pub const fn new(step: u64) -> Self {
        Self {
            ticks: Cell::new(0),
            step,
        }
    }

    /// Move the clock forward
    pub fn advance(&self, ms: u64) {
        self.ticks.set(self.ticks.get().saturating_add(ms));
    }

    /// Current count without advancing
    #[must_use]
    pub fn peek(&self) -> u64 {
        self.ticks.get()
    }
}

impl Default for StepTimer {
    fn default() -> Self {
        Self::new(1)
    }
}

impl TimerInterface for StepTimer {
    const FREQUENCY_HZ: u32 = 1_000;

    fn init(&mut self) -> HalResult<()> {
        self.ticks.set(0);
        Ok(())
    }

    fn get_ticks(&self) -> u64 {
        let now = self.ticks.get();
        self.ticks.set(now.saturating_add(self.step));
        now
    }
}

// ============================================================================
// RNG
// ============================================================================

/// Seeded xorshift64* generator
///
/// Not cryptographically secure; stands in for the hardware TRNG.
pub struct XorShiftRng {
    state: u64,
    faulty: bool,
}

impl XorShiftRng {
    /// Create a generator from a seed (zero is remapped)
    #[must_use]
    pub const fn new(seed: u64) -> Self {
        Self {
            state: if seed == 0 { 0x9E37_79B9_7F4A_7C15 } else { seed },
            faulty: false,
        }
    }

    /// Make every subsequent request fail, emulating a TRNG health-test failure
    pub fn set_faulty(&mut self, faulty: bool) {
        self.faulty = faulty;
    }

    fn step(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.state = x;
        x.wrapping_mul(0x2545_F491_4F6C_DD1D)
    }
}

impl RngInterface for XorShiftRng {
    fn init(&mut self) -> HalResult<()> {
        Ok(())
    }

    fn fill_bytes(&mut self, buffer: &mut [u8]) -> HalResult<()> {
        if self.faulty {
            return Err(HalError::RngError);
        }
        for chunk in buffer.chunks_mut(8) {
            let word = self.step().to_le_bytes();
            chunk.copy_from_slice(&word[..chunk.len()]);
        }
        Ok(())
    }

    fn is_ready(&self) -> bool {
        !self.faulty
    }
}

// ============================================================================
// Key store
// ============================================================================

/// RAM-backed key/response table
pub struct RamKeyStore {
    keys: [Key; KEY_COUNT],
    responses: [Response; KEY_COUNT],
    write_protected: bool,
}

impl RamKeyStore {
    /// Create an erased table
    #[must_use]
    pub const fn new() -> Self {
        Self {
            keys: [[0u8; KEY_SIZE]; KEY_COUNT],
            responses: [[0u8; RESPONSE_SIZE]; KEY_COUNT],
            write_protected: false,
        }
    }

    /// Reject writes, emulating locked flash
    pub fn set_write_protected(&mut self, protected: bool) {
        self.write_protected = protected;
    }
}

impl Default for RamKeyStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyStoreInterface for RamKeyStore {
    fn key(&self, slot: Slot) -> &Key {
        &self.keys[usize::from(slot)]
    }

    fn response(&self, slot: Slot) -> &Response {
        &self.responses[usize::from(slot)]
    }

    fn store_pair(&mut self, slot: Slot, key: &Key, response: &Response) -> HalResult<()> {
        if self.write_protected {
            return Err(HalError::StorageWriteFailed);
        }
        self.keys[usize::from(slot)].copy_from_slice(key);
        self.responses[usize::from(slot)].copy_from_slice(response);
        Ok(())
    }

    fn erase_all(&mut self) -> HalResult<()> {
        if self.write_protected {
            return Err(HalError::StorageWriteFailed);
        }
        self.keys.zeroize();
        self.responses.zeroize();
        Ok(())
    }
}

impl Drop for RamKeyStore {
    fn drop(&mut self) {
        self.keys.zeroize();
        self.responses.zeroize();
    }
}

// ============================================================================
// Block store
// ============================================================================

/// RAM-backed block store
pub struct RamBlockStore {
    blocks: [Block; BLOCK_COUNT],
    write_protected: bool,
}

impl RamBlockStore {
    /// Create a zero-filled store
    #[must_use]
    pub const fn new() -> Self {
        Self {
            blocks: [[0u8; BLOCK_SIZE]; BLOCK_COUNT],
            write_protected: false,
        }
    }

    /// Reject writes, emulating locked flash
    pub fn set_write_protected(&mut self, protected: bool) {
        self.write_protected = protected;
    }
}

impl Default for RamBlockStore {
    fn default() -> Self {
        Self::new()
    }
}

impl BlockStoreInterface for RamBlockStore {
    fn block(&self, index: u16) -> HalResult<&Block> {
        let index = check_block_index(index, BLOCK_COUNT)?;
        Ok(&self.blocks[index])
    }

    fn store_block(&mut self, index: u16, data: &Block) -> HalResult<()> {
        let index = check_block_index(index, BLOCK_COUNT)?;
        if self.write_protected {
            return Err(HalError::StorageWriteFailed);
        }
        self.blocks[index].copy_from_slice(data);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mem_serial_loopback() {
        let mut a: MemSerial<16> = MemSerial::new();
        let mut b: MemSerial<16> = MemSerial::new();
        a.write(b"abc").unwrap();
        assert_eq!(a.transfer_to(&mut b).unwrap(), 3);
        assert_eq!(b.try_read_byte().unwrap(), Some(b'a'));
        assert_eq!(b.rx_pending(), 2);
    }

    #[test]
    fn test_mem_serial_overflow() {
        let mut s: MemSerial<2> = MemSerial::new();
        assert_eq!(s.inject(b"abc"), Err(HalError::RxOverflow));
        assert_eq!(s.write(b"xyz"), Err(HalError::TxOverflow));
    }

    #[test]
    fn test_step_timer_advances_on_read() {
        let timer = StepTimer::new(5);
        assert_eq!(timer.get_ticks(), 0);
        assert_eq!(timer.get_ticks(), 5);
        timer.advance(10);
        assert_eq!(timer.peek(), 20);
    }

    #[test]
    fn test_rng_fault() {
        let mut rng = XorShiftRng::new(1);
        let mut buf = [0u8; 13];
        rng.fill_bytes(&mut buf).unwrap();
        assert!(buf.iter().any(|&b| b != 0));
        rng.set_faulty(true);
        assert_eq!(rng.fill_bytes(&mut buf), Err(HalError::RngError));
        assert!(!rng.is_ready());
    }
}
