// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Common types for PatternKey
//!
//! Keys, responses and blocks are plain fixed-size byte arrays: the storage
//! collaborator owns them and the core only ever borrows them.

use crate::constants::{BLOCK_SIZE, KEY_SIZE, RESPONSE_SIZE};
use zeroize::Zeroize;

/// A key pattern presented for matching
pub type Key = [u8; KEY_SIZE];

/// The secret response paired with an enrolled key
pub type Response = [u8; RESPONSE_SIZE];

/// One auxiliary storage record
pub type Block = [u8; BLOCK_SIZE];

/// Key slot address
pub type Slot = u8;

/// Fixed-capacity scratch buffer that zeroizes its contents on drop
///
/// Used for I/O buffers that transiently hold keys, responses or block data.
pub struct SecureBuffer<const N: usize> {
    data: [u8; N],
}

impl<const N: usize> SecureBuffer<N> {
    /// Create a zero-filled buffer
    #[must_use]
    pub const fn new() -> Self {
        Self { data: [0u8; N] }
    }

    /// Get the whole buffer
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Get the whole buffer mutably
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Get the capacity
    #[must_use]
    pub const fn capacity(&self) -> usize {
        N
    }
}

impl<const N: usize> Default for SecureBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> AsRef<[u8]> for SecureBuffer<N> {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}

impl<const N: usize> AsMut<[u8]> for SecureBuffer<N> {
    fn as_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }
}

impl<const N: usize> Zeroize for SecureBuffer<N> {
    fn zeroize(&mut self) {
        self.data.zeroize();
    }
}

impl<const N: usize> Drop for SecureBuffer<N> {
    fn drop(&mut self) {
        self.zeroize();
    }
}

/// Check whether a byte record is entirely zero
#[must_use]
pub fn is_all_zero(bytes: &[u8]) -> bool {
    bytes.iter().all(|&b| b == 0)
}
