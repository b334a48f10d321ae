// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Host simulator backends
//!
//! The simulator runs the unchanged token core on a workstation. The serial
//! link is replaced by a TCP stream (the host key manager connects to
//! [`SIMULATOR_PORT`]), the tick counter by a monotonic clock, and the TRNG
//! by the operating system's entropy source.

use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::time::Instant;
use std::vec::Vec;

use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};

use crate::error::{HalError, HalResult};
use crate::traits::{RngInterface, SerialInterface, TimerInterface};

pub use pk_common::constants::SIMULATOR_PORT;

/// Bytes buffered before `write_byte` pushes them to the socket
const TX_CHUNK: usize = 512;

/// Bytes pulled from the socket per read
const RX_CHUNK: usize = 256;

// ============================================================================
// Serial over TCP
// ============================================================================

/// Serial link carried over a non-blocking TCP stream
pub struct TcpSerial {
    stream: TcpStream,
    rx: VecDeque<u8>,
    tx: Vec<u8>,
}

impl TcpSerial {
    /// Wrap an established stream
    ///
    /// # Errors
    ///
    /// Returns `HalError::InitFailed` if the stream cannot be made non-blocking.
    pub fn from_stream(stream: TcpStream) -> HalResult<Self> {
        stream.set_nonblocking(true).map_err(|_| HalError::InitFailed)?;
        let _ = stream.set_nodelay(true);
        Ok(Self {
            stream,
            rx: VecDeque::with_capacity(RX_CHUNK),
            tx: Vec::with_capacity(TX_CHUNK),
        })
    }

    /// Wait for the host to connect on `addr`
    ///
    /// # Errors
    ///
    /// Returns `HalError::InitFailed` if the address cannot be bound or the
    /// connection cannot be accepted.
    pub fn listen<A: ToSocketAddrs>(addr: A) -> HalResult<Self> {
        let listener = TcpListener::bind(addr).map_err(|_| HalError::InitFailed)?;
        let (stream, _) = listener.accept().map_err(|_| HalError::InitFailed)?;
        Self::from_stream(stream)
    }

    /// Connect to a listening peer
    ///
    /// # Errors
    ///
    /// Returns `HalError::InitFailed` if the connection is refused.
    pub fn connect<A: ToSocketAddrs>(addr: A) -> HalResult<Self> {
        let stream = TcpStream::connect(addr).map_err(|_| HalError::InitFailed)?;
        Self::from_stream(stream)
    }

    /// Address of the remote end
    ///
    /// # Errors
    ///
    /// Returns `HalError::Disconnected` if the socket is no longer connected.
    pub fn peer_addr(&self) -> HalResult<SocketAddr> {
        self.stream.peer_addr().map_err(|_| HalError::Disconnected)
    }

    fn fill_rx(&mut self) -> HalResult<()> {
        let mut chunk = [0u8; RX_CHUNK];
        match self.stream.read(&mut chunk) {
            Ok(0) => Err(HalError::Disconnected),
            Ok(n) => {
                self.rx.extend(&chunk[..n]);
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => Ok(()),
            Err(_) => Err(HalError::UartError),
        }
    }
}

impl SerialInterface for TcpSerial {
    fn init(&mut self, _baud_rate: u32) -> HalResult<()> {
        // A socket has no line rate.
        Ok(())
    }

    fn try_read_byte(&mut self) -> HalResult<Option<u8>> {
        if self.rx.is_empty() {
            self.fill_rx()?;
        }
        Ok(self.rx.pop_front())
    }

    fn write_byte(&mut self, byte: u8) -> HalResult<()> {
        self.tx.push(byte);
        if self.tx.len() >= TX_CHUNK {
            self.flush()?;
        }
        Ok(())
    }

    fn flush(&mut self) -> HalResult<()> {
        let mut written = 0;
        while written < self.tx.len() {
            match self.stream.write(&self.tx[written..]) {
                Ok(0) => return Err(HalError::Disconnected),
                Ok(n) => written += n,
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => std::thread::yield_now(),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(_) => return Err(HalError::UartError),
            }
        }
        self.tx.clear();
        Ok(())
    }
}

// ============================================================================
// Clock
// ============================================================================

/// Monotonic microsecond clock
pub struct SystemTimer {
    epoch: Instant,
}

impl SystemTimer {
    /// Start a clock at zero
    #[must_use]
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }
}

impl Default for SystemTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl TimerInterface for SystemTimer {
    const FREQUENCY_HZ: u32 = 1_000_000;

    fn init(&mut self) -> HalResult<()> {
        self.epoch = Instant::now();
        Ok(())
    }

    #[allow(clippy::cast_possible_truncation)]
    fn get_ticks(&self) -> u64 {
        self.epoch.elapsed().as_micros() as u64
    }
}

// ============================================================================
// Noise
// ============================================================================

/// Noise source backed by the operating system's entropy
pub struct OsNoise {
    rng: StdRng,
}

impl OsNoise {
    /// Seed a generator from OS entropy
    #[must_use]
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }
}

impl Default for OsNoise {
    fn default() -> Self {
        Self::new()
    }
}

impl RngInterface for OsNoise {
    fn init(&mut self) -> HalResult<()> {
        self.rng = StdRng::from_entropy();
        Ok(())
    }

    fn fill_bytes(&mut self, buffer: &mut [u8]) -> HalResult<()> {
        self.rng.try_fill_bytes(buffer).map_err(|_| HalError::RngError)
    }

    fn is_ready(&self) -> bool {
        true
    }
}
