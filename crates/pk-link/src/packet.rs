// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Packet framing
//!
//! A packet is a payload followed by its big-endian CRC-16, carried as one
//! encoded frame. The receiver knows in advance which payload sizes it will
//! accept (one, or two alternatives) and drops anything else.
//!
//! # Receive rules
//!
//! - An idle link returns immediately with nothing.
//! - Once the first byte arrives (or the first characters of an incomplete
//!   encoded group), an inactivity deadline starts and is restarted on
//!   every accepted byte.
//! - End of frame completes the packet only if the byte count equals one of
//!   the expected totals and the CRC matches.
//! - Timeout, decode error, wrong length, bad CRC or overflow drop the
//!   frame; the decoder is cleared so the next call starts fresh.

use pk_common::config::LinkConfig;
use pk_common::constants::CRC_SIZE;
use pk_common::time::{Deadline, TickFrequency, Ticks};
use pk_common::{Error, Result};
use pk_hal::{SerialInterface, TimerInterface};

use crate::crc::crc16_ccitt;
use crate::encoding::{Decoder, Encoder, Symbol};

/// Counters for link diagnostics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LinkStats {
    /// Packets received and verified
    pub received: u32,
    /// Packets sent
    pub sent: u32,
    /// Frames dropped (timeout, CRC, length, decode, overflow)
    pub dropped: u32,
}

/// Accepted frame totals (payload + CRC)
#[derive(Debug, Clone, Copy)]
struct FrameLengths {
    primary: usize,
    alternate: Option<usize>,
}

impl FrameLengths {
    fn new(primary: usize, alternate: Option<usize>) -> Result<Self> {
        if primary == 0 || alternate == Some(0) {
            return Err(Error::InvalidParameter);
        }
        Ok(Self {
            primary: primary + CRC_SIZE,
            alternate: alternate.map(|len| len + CRC_SIZE),
        })
    }

    fn max_total(&self) -> usize {
        self.alternate.map_or(self.primary, |alt| alt.max(self.primary))
    }

    fn accepts(&self, total: usize) -> bool {
        total == self.primary || self.alternate == Some(total)
    }

    /// Check a complete frame and return its payload length
    fn verify(&self, frame: &[u8]) -> Result<usize> {
        if frame.len() <= CRC_SIZE || !self.accepts(frame.len()) {
            return Err(Error::FrameLengthMismatch);
        }
        let (payload, crc) = frame.split_at(frame.len() - CRC_SIZE);
        if crc16_ccitt(payload) != u16::from_be_bytes([crc[0], crc[1]]) {
            return Err(Error::CrcMismatch);
        }
        Ok(payload.len())
    }
}

/// Packet-level link over a serial transport
pub struct PacketLink<S, T> {
    serial: S,
    timer: T,
    decoder: Decoder,
    encoder: Encoder,
    config: LinkConfig,
    stats: LinkStats,
}

impl<S: SerialInterface, T: TimerInterface> PacketLink<S, T> {
    /// Create a link over a transport and a tick source
    pub fn new(serial: S, timer: T, config: LinkConfig) -> Self {
        Self {
            serial,
            timer,
            decoder: Decoder::new(),
            encoder: Encoder::new(),
            config,
            stats: LinkStats::default(),
        }
    }

    /// Initialize the transport and the timer
    ///
    /// # Errors
    ///
    /// Propagates HAL initialization errors.
    pub fn init(&mut self) -> Result<()> {
        self.serial.init(self.config.baud_rate)?;
        self.timer.init()?;
        Ok(())
    }

    /// Poll for one packet
    ///
    /// `primary` and `alternate` are payload lengths, excluding the CRC.
    /// Returns `Ok(None)` if the link is idle (or carried an empty frame),
    /// `Ok(Some(len))` with the payload in `buf[..len]` on success.
    ///
    /// # Errors
    ///
    /// Returns the reason a started frame was dropped, or
    /// `Error::BufferTooSmall` / `Error::InvalidParameter` for a bad request.
    pub fn receive(
        &mut self,
        buf: &mut [u8],
        primary: usize,
        alternate: Option<usize>,
    ) -> Result<Option<usize>> {
        let lengths = FrameLengths::new(primary, alternate)?;
        if buf.len() < lengths.max_total() {
            return Err(Error::BufferTooSmall);
        }

        match self.decoder.poll(&mut self.serial) {
            Ok(Some(Symbol::Byte(first))) => self.collect(buf, first, lengths).map(Some),
            Ok(None) if self.decoder.is_mid_group() => {
                // Characters arrived but not a whole group: the frame has
                // started, so it is bounded by the inactivity timeout too.
                let first = self.await_first_byte(self.config.inactivity_timeout_ms)?;
                self.collect(buf, first, lengths).map(Some)
            }
            Ok(Some(Symbol::EndOfFrame) | None) => Ok(None),
            Err(e) => Err(self.abort(e)),
        }
    }

    /// Receive the operand packet that follows an opcode
    ///
    /// Unlike [`receive`](Self::receive), this waits up to the operand
    /// timeout for the first byte; the host sends the operand right after
    /// the opcode and it may still be in flight.
    ///
    /// # Errors
    ///
    /// Returns `Error::FrameTimeout` if nothing arrives, or the reason the
    /// frame was dropped.
    pub fn receive_operand(&mut self, buf: &mut [u8], len: usize) -> Result<usize> {
        let lengths = FrameLengths::new(len, None)?;
        if buf.len() < lengths.max_total() {
            return Err(Error::BufferTooSmall);
        }

        let first = self.await_first_byte(self.config.operand_timeout_ms)?;
        self.collect(buf, first, lengths)
    }

    /// Frame and transmit a payload
    ///
    /// # Errors
    ///
    /// Propagates transport errors; a partially written frame is abandoned.
    pub fn send(&mut self, payload: &[u8]) -> Result<()> {
        let result = self.write_frame(payload);
        match result {
            Ok(()) => self.stats.sent = self.stats.sent.wrapping_add(1),
            Err(_) => self.encoder.reset(),
        }
        result
    }

    /// Transmit a one-byte reply packet
    ///
    /// # Errors
    ///
    /// Propagates transport errors.
    pub fn send_byte(&mut self, byte: u8) -> Result<()> {
        self.send(&[byte])
    }

    /// Milliseconds since the timer started
    pub fn now_millis(&self) -> u32 {
        self.timer.get_millis()
    }

    /// Link counters
    pub fn stats(&self) -> LinkStats {
        self.stats
    }

    /// Link configuration
    pub fn config(&self) -> &LinkConfig {
        &self.config
    }

    /// Borrow the transport
    pub fn serial(&self) -> &S {
        &self.serial
    }

    /// Borrow the transport mutably
    pub fn serial_mut(&mut self) -> &mut S {
        &mut self.serial
    }

    /// Borrow the timer
    pub fn timer(&self) -> &T {
        &self.timer
    }

    /// Poll until a byte is decoded, skipping empty frames
    fn await_first_byte(&mut self, timeout_ms: u32) -> Result<u8> {
        let deadline = self.deadline(timeout_ms);
        loop {
            if deadline.is_expired(self.now()) {
                return Err(self.abort(Error::FrameTimeout));
            }
            match self.decoder.poll(&mut self.serial) {
                Ok(Some(Symbol::Byte(first))) => return Ok(first),
                Ok(Some(Symbol::EndOfFrame) | None) => {}
                Err(e) => return Err(self.abort(e)),
            }
        }
    }

    /// Accumulate the rest of a frame whose first byte has arrived
    fn collect(&mut self, buf: &mut [u8], first: u8, lengths: FrameLengths) -> Result<usize> {
        let max_total = lengths.max_total();
        let mut deadline = self.deadline(self.config.inactivity_timeout_ms);
        buf[0] = first;
        let mut pos = 1;

        loop {
            let now = self.now();
            if deadline.is_expired(now) {
                return Err(self.abort(Error::FrameTimeout));
            }

            match self.decoder.poll(&mut self.serial) {
                Ok(None) => {}
                Ok(Some(Symbol::EndOfFrame)) => {
                    self.decoder.reset();
                    return match lengths.verify(&buf[..pos]) {
                        Ok(len) => {
                            self.stats.received = self.stats.received.wrapping_add(1);
                            Ok(len)
                        }
                        Err(e) => Err(self.abort(e)),
                    };
                }
                Ok(Some(Symbol::Byte(byte))) => {
                    if pos >= max_total {
                        self.decoder.resync();
                        return Err(self.abort(Error::FrameOverflow));
                    }
                    buf[pos] = byte;
                    pos += 1;
                    deadline.restart(now);
                }
                Err(e) => return Err(self.abort(e)),
            }
        }
    }

    fn write_frame(&mut self, payload: &[u8]) -> Result<()> {
        let crc = crc16_ccitt(payload);
        for &byte in payload.iter().chain(crc.to_be_bytes().iter()) {
            self.encoder.push(&mut self.serial, byte)?;
        }
        self.encoder.finish(&mut self.serial)?;
        self.serial.flush()?;
        Ok(())
    }

    fn abort(&mut self, error: Error) -> Error {
        self.decoder.reset();
        self.stats.dropped = self.stats.dropped.wrapping_add(1);
        error
    }

    fn now(&self) -> Ticks {
        Ticks::new(self.timer.get_ticks())
    }

    fn deadline(&self, timeout_ms: u32) -> Deadline {
        let ticks = TickFrequency::from_hz(T::FREQUENCY_HZ).millis_to_ticks(timeout_ms);
        Deadline::new(self.now(), ticks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pk_hal::mem::{MemSerial, StepTimer};

    type TestLink = PacketLink<MemSerial<256>, StepTimer>;

    fn link() -> TestLink {
        PacketLink::new(MemSerial::new(), StepTimer::new(1), LinkConfig::DEFAULT)
    }

    #[test]
    fn test_frame_lengths_reject_zero() {
        assert!(FrameLengths::new(0, None).is_err());
        assert!(FrameLengths::new(4, Some(0)).is_err());
        let lengths = FrameLengths::new(256, Some(1)).unwrap();
        assert_eq!(lengths.max_total(), 258);
        assert!(lengths.accepts(3));
        assert!(lengths.accepts(258));
        assert!(!lengths.accepts(2));
    }

    #[test]
    fn test_verify_checks_crc_big_endian() {
        let lengths = FrameLengths::new(2, None).unwrap();
        let crc = crc16_ccitt(&[0xAB, 0xCD]).to_be_bytes();
        assert_eq!(lengths.verify(&[0xAB, 0xCD, crc[0], crc[1]]), Ok(2));
        assert_eq!(
            lengths.verify(&[0xAB, 0xCD, crc[1], crc[0]]),
            Err(Error::CrcMismatch)
        );
        assert_eq!(lengths.verify(&[0xAB, crc[0], crc[1]]), Err(Error::FrameLengthMismatch));
    }

    #[test]
    fn test_idle_link_returns_immediately() {
        let mut link = link();
        let mut buf = [0u8; 8];
        assert_eq!(link.receive(&mut buf, 4, None), Ok(None));
        assert!(link.timer().peek() <= 1);
    }

    #[test]
    fn test_small_buffer_rejected() {
        let mut link = link();
        let mut buf = [0u8; 4];
        assert_eq!(link.receive(&mut buf, 4, None), Err(Error::BufferTooSmall));
    }

    #[test]
    fn test_send_then_receive_over_loopback() {
        let mut tx = link();
        let mut rx = link();
        tx.send(&[1, 2, 3, 4, 5]).unwrap();
        tx.serial_mut().transfer_to(rx.serial_mut()).unwrap();

        let mut buf = [0u8; 16];
        assert_eq!(rx.receive(&mut buf, 5, Some(1)), Ok(Some(5)));
        assert_eq!(&buf[..5], &[1, 2, 3, 4, 5]);
        assert_eq!(rx.stats().received, 1);
        assert_eq!(tx.stats().sent, 1);
    }
}
