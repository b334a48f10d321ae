// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! CRC-16-CCITT
//!
//! Polynomial 0x1021, initial value 0xFFFF, MSB first, no final XOR
//! (check value for `"123456789"` is 0x29B1). The host key manager uses the
//! same parameters; they are part of the wire contract.

/// Generator polynomial
pub const CRC16_POLY: u16 = 0x1021;

/// Initial register value
pub const CRC16_INIT: u16 = 0xFFFF;

const TABLE: [u16; 256] = build_table();

const fn build_table() -> [u16; 256] {
    let mut table = [0u16; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = (i as u16) << 8;
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & 0x8000 != 0 {
                (crc << 1) ^ CRC16_POLY
            } else {
                crc << 1
            };
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

/// Incremental CRC-16-CCITT accumulator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Crc16 {
    value: u16,
}

impl Crc16 {
    /// Start a new checksum
    #[must_use]
    pub const fn new() -> Self {
        Self { value: CRC16_INIT }
    }

    /// Feed bytes into the checksum
    pub fn update(&mut self, data: &[u8]) {
        for &byte in data {
            let index = ((self.value >> 8) as u8 ^ byte) as usize;
            self.value = (self.value << 8) ^ TABLE[index];
        }
    }

    /// Current checksum value
    #[must_use]
    pub const fn value(&self) -> u16 {
        self.value
    }
}

impl Default for Crc16 {
    fn default() -> Self {
        Self::new()
    }
}

/// One-shot CRC-16-CCITT of a buffer
#[must_use]
pub fn crc16_ccitt(data: &[u8]) -> u16 {
    let mut crc = Crc16::new();
    crc.update(data);
    crc.value()
}
