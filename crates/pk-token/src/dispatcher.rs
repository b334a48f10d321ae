// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Command dispatcher
//!
//! One [`Token::poll`] call is one pass of the main loop:
//!
//! ```text
//! Idle ──packet──▶ 256 bytes ──▶ lookup ──▶ response | NOT_FOUND
//!        │
//!        └───────▶ 1 byte ────▶ opcode ──▶ [operand packet] ──▶ ACK | NAK | data
//! ```
//!
//! Every path returns to idle. Nothing is fatal: dropped frames are logged
//! and recorded in the status flags, rejected commands are answered with
//! NAK. The scratch buffer is wiped after every transaction because it
//! carries key material.

use core::fmt;

use zeroize::Zeroize;

use pk_common::config::TokenConfig;
use pk_common::constants::{
    BLOCK_ADDRESS_SIZE, BLOCK_SIZE, FRAME_BUFFER_SIZE, KEY_ADDRESS_SIZE, KEY_SIZE, NOISE_SIZE,
    OPCODE_SIZE, PERMUTATION_SIZE, PUT_OPERAND_SIZE, REPLY_ACK, REPLY_NAK, REPLY_NOT_FOUND,
    RESPONSE_SIZE, WRITE_OPERAND_SIZE,
};
use pk_common::log::LogBuffer;
use pk_common::{log_debug, log_info, log_warn};
use pk_common::{Block, Error, Key, Response, Result, SecureBuffer, Slot};
use pk_hal::{
    BlockStoreInterface, KeyStoreInterface, RngInterface, SerialInterface, TimerInterface,
};
use pk_link::PacketLink;

use crate::block_store::{read_record, write_record, BlockAddress};
use crate::key_index::{KeyIndex, Permutation};

const MODULE: &str = "dispatch";

// ============================================================================
// Opcodes
// ============================================================================

/// Administrative command opcodes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Opcode {
    /// Replace the permutation vector
    Prime = 0x11,
    /// Write one key/response pair
    Write = 0x22,
    /// Erase every key slot
    Erase = 0x33,
    /// Return random bytes
    Noise = 0x44,
    /// Read one block
    Get = 0x55,
    /// Write one block
    Put = 0x66,
    /// Read and clear the status flags
    Status = 0x77,
}

impl TryFrom<u8> for Opcode {
    type Error = Error;

    fn try_from(v: u8) -> Result<Self> {
        match v {
            0x11 => Ok(Self::Prime),
            0x22 => Ok(Self::Write),
            0x33 => Ok(Self::Erase),
            0x44 => Ok(Self::Noise),
            0x55 => Ok(Self::Get),
            0x66 => Ok(Self::Put),
            0x77 => Ok(Self::Status),
            _ => Err(Error::UnknownOpcode),
        }
    }
}

// ============================================================================
// Status Flags
// ============================================================================

/// Sticky event flags, cleared when read by the host
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusFlags(u8);

impl StatusFlags {
    /// A frame was dropped
    pub const LINK_ERROR: Self = Self(0x01);
    /// An administrative command was answered with NAK
    pub const COMMAND_REJECTED: Self = Self(0x02);
    /// A lookup missed
    pub const NOT_FOUND: Self = Self(0x04);
    /// A storage collaborator reported an error
    pub const STORAGE_FAULT: Self = Self(0x08);
    /// An unknown opcode was received
    pub const PROTOCOL_ERROR: Self = Self(0x10);
    /// A reply could not be written to the transport
    pub const TRANSMIT_FAULT: Self = Self(0x20);

    /// No flags set
    pub const EMPTY: Self = Self(0);

    /// Build from the wire byte
    #[must_use]
    pub const fn from_bits(bits: u8) -> Self {
        Self(bits)
    }

    /// Wire byte
    #[must_use]
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Check whether every flag in `other` is set
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Check whether no flag is set
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Set flags
    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    /// Return the current flags and clear them
    pub fn take(&mut self) -> Self {
        core::mem::take(self)
    }
}

impl core::ops::BitOr for StatusFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

// ============================================================================
// Transactions
// ============================================================================

/// What one pass of the main loop did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transaction {
    /// Nothing arrived
    Idle,
    /// A frame was started but dropped; nothing was sent
    Dropped(Error),
    /// A lookup ran; the matching slot, if any
    Lookup(Option<Slot>),
    /// A command ran and was answered with ACK/data (`Ok`) or NAK (`Err`)
    Command(Opcode, Result<()>),
    /// An unknown opcode was answered with NAK
    Unknown(u8),
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Dropped(e) => write!(f, "dropped: {e}"),
            Self::Lookup(Some(slot)) => write!(f, "lookup hit slot {slot}"),
            Self::Lookup(None) => write!(f, "lookup miss"),
            Self::Command(op, Ok(())) => write!(f, "{op:?} ok"),
            Self::Command(op, Err(e)) => write!(f, "{op:?} rejected: {e}"),
            Self::Unknown(byte) => write!(f, "unknown opcode 0x{byte:02X}"),
        }
    }
}

// ============================================================================
// Token
// ============================================================================

/// The token firmware core
///
/// Owns the link, the key index and the block store, and answers one host
/// request per [`poll`](Self::poll).
pub struct Token<S, T, K, B, R> {
    link: PacketLink<S, T>,
    index: KeyIndex<K>,
    blocks: B,
    rng: R,
    status: StatusFlags,
    log: LogBuffer,
    buffer: SecureBuffer<FRAME_BUFFER_SIZE>,
}

impl<S, T, K, B, R> Token<S, T, K, B, R>
where
    S: SerialInterface,
    T: TimerInterface,
    K: KeyStoreInterface,
    B: BlockStoreInterface,
    R: RngInterface,
{
    /// Assemble a token from its collaborators
    pub fn new(serial: S, timer: T, keys: K, blocks: B, rng: R, config: TokenConfig) -> Self {
        Self {
            link: PacketLink::new(serial, timer, config.link),
            index: KeyIndex::new(keys),
            blocks,
            rng,
            status: StatusFlags::EMPTY,
            log: LogBuffer::with_level(config.log_level),
            buffer: SecureBuffer::new(),
        }
    }

    /// Initialize the hardware and build the search index
    ///
    /// # Errors
    ///
    /// Propagates HAL initialization errors.
    pub fn init(&mut self) -> Result<()> {
        self.link.init()?;
        self.rng.init()?;
        self.index.rebuild();

        let ts = self.link.now_millis();
        log_info!(self.log, ts, MODULE, "ready, {} slots enrolled", self.index.len());
        Ok(())
    }

    /// Serve requests forever
    pub fn run(&mut self) -> ! {
        loop {
            let _ = self.poll();
        }
    }

    /// Run one pass of the main loop
    pub fn poll(&mut self) -> Transaction {
        let transaction = self.dispatch();
        self.buffer.zeroize();
        transaction
    }

    fn dispatch(&mut self) -> Transaction {
        let received = self
            .link
            .receive(self.buffer.as_mut_slice(), KEY_SIZE, Some(OPCODE_SIZE));

        match received {
            Ok(None) => Transaction::Idle,
            Ok(Some(KEY_SIZE)) => self.lookup(),
            Ok(Some(_)) => {
                let opcode = self.buffer.as_slice()[0];
                self.command(opcode)
            }
            Err(e) => {
                self.status.insert(StatusFlags::LINK_ERROR);
                let ts = self.link.now_millis();
                log_warn!(self.log, ts, MODULE, "frame dropped: {}", e);
                Transaction::Dropped(e)
            }
        }
    }

    fn lookup(&mut self) -> Transaction {
        let found = match <&Key>::try_from(&self.buffer.as_slice()[..KEY_SIZE]) {
            Ok(pattern) => self.index.find(pattern),
            Err(_) => None,
        };

        let ts = self.link.now_millis();
        let sent = if let Some(slot) = found {
            log_debug!(self.log, ts, MODULE, "lookup hit slot {}", slot);
            self.link.send(self.index.response(slot))
        } else {
            self.status.insert(StatusFlags::NOT_FOUND);
            log_debug!(self.log, ts, MODULE, "lookup miss");
            self.link.send_byte(REPLY_NOT_FOUND)
        };
        self.check_sent(sent);

        Transaction::Lookup(found)
    }

    fn command(&mut self, byte: u8) -> Transaction {
        let Ok(opcode) = Opcode::try_from(byte) else {
            self.status
                .insert(StatusFlags::PROTOCOL_ERROR | StatusFlags::COMMAND_REJECTED);
            let ts = self.link.now_millis();
            log_warn!(self.log, ts, MODULE, "unknown opcode 0x{:02X}", byte);
            let sent = self.link.send_byte(REPLY_NAK);
            self.check_sent(sent);
            return Transaction::Unknown(byte);
        };

        let result = match opcode {
            Opcode::Prime => self.prime(),
            Opcode::Write => self.write_pair(),
            Opcode::Erase => self.erase(),
            Opcode::Noise => self.noise(),
            Opcode::Get => self.get_block(),
            Opcode::Put => self.put_block(),
            Opcode::Status => self.report_status(),
        };

        if let Err(e) = result {
            self.reject(opcode, e);
        }
        Transaction::Command(opcode, result)
    }

    fn prime(&mut self) -> Result<()> {
        let len = self
            .link
            .receive_operand(self.buffer.as_mut_slice(), PERMUTATION_SIZE)?;
        let permutation = Permutation::from_bytes(&self.buffer.as_slice()[..len])?;
        self.index.set_permutation(permutation);

        let ts = self.link.now_millis();
        log_info!(self.log, ts, MODULE, "permutation replaced");
        self.acknowledge();
        Ok(())
    }

    fn write_pair(&mut self) -> Result<()> {
        self.link
            .receive_operand(self.buffer.as_mut_slice(), WRITE_OPERAND_SIZE)?;

        let operand = &self.buffer.as_slice()[..WRITE_OPERAND_SIZE];
        let (slot, rest) = operand.split_at(KEY_ADDRESS_SIZE);
        let (key, response) = rest.split_at(KEY_SIZE);
        let key: &Key = key.try_into().map_err(|_| Error::MalformedOperand)?;
        let response: &Response = response[..RESPONSE_SIZE]
            .try_into()
            .map_err(|_| Error::MalformedOperand)?;
        let slot = slot[0];

        self.index.write_pair(slot, key, response)?;

        let ts = self.link.now_millis();
        log_info!(self.log, ts, MODULE, "slot {} written", slot);
        self.acknowledge();
        Ok(())
    }

    fn erase(&mut self) -> Result<()> {
        self.index.erase_all()?;

        let ts = self.link.now_millis();
        log_info!(self.log, ts, MODULE, "key table erased");
        self.acknowledge();
        Ok(())
    }

    fn noise(&mut self) -> Result<()> {
        if !self.rng.is_ready() {
            return Err(Error::RngFailure);
        }
        let noise = &mut self.buffer.as_mut_slice()[..NOISE_SIZE];
        self.rng.fill_bytes(noise)?;

        let sent = self.link.send(&self.buffer.as_slice()[..NOISE_SIZE]);
        self.check_sent(sent);
        Ok(())
    }

    fn get_block(&mut self) -> Result<()> {
        self.link
            .receive_operand(self.buffer.as_mut_slice(), BLOCK_ADDRESS_SIZE)?;
        let address = BlockAddress::try_from(&self.buffer.as_slice()[..BLOCK_ADDRESS_SIZE])?;
        let record = read_record(&self.blocks, address)?;

        let sent = self.link.send(record);
        self.check_sent(sent);

        let ts = self.link.now_millis();
        log_debug!(self.log, ts, MODULE, "block {} read", address.index());
        Ok(())
    }

    fn put_block(&mut self) -> Result<()> {
        self.link
            .receive_operand(self.buffer.as_mut_slice(), PUT_OPERAND_SIZE)?;

        let operand = &self.buffer.as_slice()[..PUT_OPERAND_SIZE];
        let (address, data) = operand.split_at(BLOCK_ADDRESS_SIZE);
        let address = BlockAddress::try_from(address)?;
        let data: &Block = data[..BLOCK_SIZE]
            .try_into()
            .map_err(|_| Error::MalformedOperand)?;

        write_record(&mut self.blocks, address, data)?;

        let ts = self.link.now_millis();
        log_info!(self.log, ts, MODULE, "block {} written", address.index());
        self.acknowledge();
        Ok(())
    }

    fn report_status(&mut self) -> Result<()> {
        let flags = self.status.take();
        let sent = self.link.send_byte(flags.bits());
        self.check_sent(sent);
        Ok(())
    }

    fn acknowledge(&mut self) {
        let sent = self.link.send_byte(REPLY_ACK);
        self.check_sent(sent);
    }

    fn reject(&mut self, opcode: Opcode, error: Error) {
        let mut flags = StatusFlags::COMMAND_REJECTED;
        if error.is_link_error() {
            flags.insert(StatusFlags::LINK_ERROR);
        }
        if matches!(error, Error::StorageReadFailed | Error::StorageWriteFailed) {
            flags.insert(StatusFlags::STORAGE_FAULT);
        }
        self.status.insert(flags);

        let ts = self.link.now_millis();
        log_warn!(self.log, ts, MODULE, "{:?} rejected: {}", opcode, error);
        let sent = self.link.send_byte(REPLY_NAK);
        self.check_sent(sent);
    }

    fn check_sent(&mut self, sent: Result<()>) {
        if let Err(e) = sent {
            self.status.insert(StatusFlags::TRANSMIT_FAULT);
            let ts = self.link.now_millis();
            log_warn!(self.log, ts, MODULE, "reply not sent: {}", e);
        }
    }

    /// Current status flags, without clearing them
    #[must_use]
    pub fn status(&self) -> StatusFlags {
        self.status
    }

    /// Key index
    #[must_use]
    pub fn index(&self) -> &KeyIndex<K> {
        &self.index
    }

    /// Block store
    #[must_use]
    pub fn blocks(&self) -> &B {
        &self.blocks
    }

    /// Log buffer
    #[must_use]
    pub fn log(&self) -> &LogBuffer {
        &self.log
    }

    /// Packet link
    #[must_use]
    pub fn link(&self) -> &PacketLink<S, T> {
        &self.link
    }

    /// Packet link, mutably
    pub fn link_mut(&mut self) -> &mut PacketLink<S, T> {
        &mut self.link
    }
}
