// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Text-safe byte encoding
//!
//! Bytes are carried as standard Base64 (RFC 4648 alphabet, `=` padding).
//! The encoder emits four characters per three bytes and flushes a padded
//! group plus [`FRAME_TERMINATOR`] at end of frame. The decoder hands bytes
//! back one at a time and reports any control character as end of frame.
//!
//! After a decode error the decoder discards input up to the next
//! terminator so a corrupted frame cannot bleed into the next one.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use pk_common::constants::FRAME_TERMINATOR;
use pk_common::{Error, Result};
use pk_hal::SerialInterface;

/// One decoded unit of the inbound stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Symbol {
    /// A payload byte
    Byte(u8),
    /// The frame terminator
    EndOfFrame,
}

/// Check whether a wire character ends a frame
#[must_use]
pub const fn is_terminator(ch: u8) -> bool {
    ch < 0x20
}

// ============================================================================
// Decoder
// ============================================================================

/// Streaming Base64 decoder
#[derive(Debug, Clone)]
pub struct Decoder {
    /// Characters of the group being collected
    quad: [u8; 4],
    quad_len: usize,
    /// Bytes decoded from the last complete group
    pending: [u8; 3],
    pending_len: usize,
    pending_pos: usize,
    /// A padded group was decoded; only a terminator may follow
    padded: bool,
    /// Discarding input until the next terminator
    resync: bool,
}

impl Decoder {
    /// Create a decoder at a frame boundary
    #[must_use]
    pub const fn new() -> Self {
        Self {
            quad: [0; 4],
            quad_len: 0,
            pending: [0; 3],
            pending_len: 0,
            pending_pos: 0,
            padded: false,
            resync: false,
        }
    }

    /// Drop any partially decoded frame state
    ///
    /// A pending resynchronisation is kept.
    pub fn reset(&mut self) {
        self.quad_len = 0;
        self.pending = [0; 3];
        self.pending_len = 0;
        self.pending_pos = 0;
        self.padded = false;
    }

    /// Drop the current frame and skip input up to the next terminator
    pub fn resync(&mut self) {
        self.reset();
        self.resync = true;
    }

    /// Check whether the decoder is skipping to the next terminator
    #[must_use]
    pub const fn is_resyncing(&self) -> bool {
        self.resync
    }

    /// Check whether characters of an incomplete group are buffered
    ///
    /// A frame has started on the wire even though no byte has been
    /// decoded from it yet.
    #[must_use]
    pub const fn is_mid_group(&self) -> bool {
        self.quad_len != 0
    }

    /// Decode the next symbol, if the link has delivered enough input
    ///
    /// Returns `Ok(None)` when the link is idle.
    ///
    /// # Errors
    ///
    /// Returns `Error::DecodeError` for malformed text and propagates
    /// transport errors.
    pub fn poll<S: SerialInterface>(&mut self, serial: &mut S) -> Result<Option<Symbol>> {
        loop {
            if self.pending_pos < self.pending_len {
                let byte = self.pending[self.pending_pos];
                self.pending_pos += 1;
                return Ok(Some(Symbol::Byte(byte)));
            }

            let Some(ch) = serial.try_read_byte()? else {
                return Ok(None);
            };

            if is_terminator(ch) {
                if self.resync {
                    self.resync = false;
                    self.reset();
                    continue;
                }
                let truncated = self.quad_len != 0;
                self.reset();
                if truncated {
                    return Err(Error::DecodeError);
                }
                return Ok(Some(Symbol::EndOfFrame));
            }

            if self.resync {
                continue;
            }
            if self.padded {
                self.resync();
                return Err(Error::DecodeError);
            }

            self.quad[self.quad_len] = ch;
            self.quad_len += 1;
            if self.quad_len == self.quad.len() {
                self.quad_len = 0;
                match STANDARD.decode_slice(self.quad, &mut self.pending) {
                    Ok(n) => {
                        self.pending_len = n;
                        self.pending_pos = 0;
                        self.padded = self.quad[3] == b'=';
                    }
                    Err(_) => {
                        self.resync();
                        return Err(Error::DecodeError);
                    }
                }
            }
        }
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Encoder
// ============================================================================

/// Streaming Base64 encoder
#[derive(Debug, Clone)]
pub struct Encoder {
    group: [u8; 3],
    len: usize,
}

impl Encoder {
    /// Create an encoder at a frame boundary
    #[must_use]
    pub const fn new() -> Self {
        Self {
            group: [0; 3],
            len: 0,
        }
    }

    /// Discard any buffered bytes
    pub fn reset(&mut self) {
        self.group = [0; 3];
        self.len = 0;
    }

    /// Encode one byte
    ///
    /// # Errors
    ///
    /// Propagates transport errors.
    pub fn push<S: SerialInterface>(&mut self, serial: &mut S, byte: u8) -> Result<()> {
        self.group[self.len] = byte;
        self.len += 1;
        if self.len == self.group.len() {
            self.emit(serial)?;
        }
        Ok(())
    }

    /// Flush the last group and write the frame terminator
    ///
    /// # Errors
    ///
    /// Propagates transport errors.
    pub fn finish<S: SerialInterface>(&mut self, serial: &mut S) -> Result<()> {
        if self.len > 0 {
            self.emit(serial)?;
        }
        serial.write_byte(FRAME_TERMINATOR)?;
        Ok(())
    }

    fn emit<S: SerialInterface>(&mut self, serial: &mut S) -> Result<()> {
        let mut text = [0u8; 4];
        let n = STANDARD
            .encode_slice(&self.group[..self.len], &mut text)
            .map_err(|_| Error::InternalError)?;
        self.len = 0;
        serial.write(&text[..n])?;
        Ok(())
    }
}

impl Default for Encoder {
    fn default() -> Self {
        Self::new()
    }
}
