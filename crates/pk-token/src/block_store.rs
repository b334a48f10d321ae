// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Auxiliary block store access
//!
//! Blocks are independent of the key table. Addresses arrive on the wire as
//! two big-endian bytes and are validated before they reach storage.

use pk_common::constants::{BLOCK_ADDRESS_SIZE, BLOCK_COUNT};
use pk_common::{Block, Error, Result};
use pk_hal::BlockStoreInterface;

/// Validated block address
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct BlockAddress(u16);

impl BlockAddress {
    /// Validate a block index
    ///
    /// # Errors
    ///
    /// Returns `Error::StorageOutOfBounds` if `index` is not below
    /// `BLOCK_COUNT`.
    pub fn new(index: u16) -> Result<Self> {
        if usize::from(index) < BLOCK_COUNT {
            Ok(Self(index))
        } else {
            Err(Error::StorageOutOfBounds)
        }
    }

    /// Parse the big-endian wire form
    ///
    /// # Errors
    ///
    /// Returns `Error::StorageOutOfBounds` for an address past the store.
    pub fn from_be_bytes(bytes: [u8; BLOCK_ADDRESS_SIZE]) -> Result<Self> {
        Self::new(u16::from_be_bytes(bytes))
    }

    /// Block index
    #[must_use]
    pub const fn index(self) -> u16 {
        self.0
    }

    /// Big-endian wire form
    #[must_use]
    pub const fn to_be_bytes(self) -> [u8; BLOCK_ADDRESS_SIZE] {
        self.0.to_be_bytes()
    }
}

impl TryFrom<&[u8]> for BlockAddress {
    type Error = Error;

    fn try_from(bytes: &[u8]) -> Result<Self> {
        let bytes: [u8; BLOCK_ADDRESS_SIZE] =
            bytes.try_into().map_err(|_| Error::MalformedOperand)?;
        Self::from_be_bytes(bytes)
    }
}

/// Borrow the record at `address`
///
/// # Errors
///
/// Propagates the storage error.
pub fn read_record<B: BlockStoreInterface>(store: &B, address: BlockAddress) -> Result<&Block> {
    Ok(store.block(address.index())?)
}

/// Overwrite the record at `address`
///
/// # Errors
///
/// Propagates the storage error.
pub fn write_record<B: BlockStoreInterface>(
    store: &mut B,
    address: BlockAddress,
    data: &Block,
) -> Result<()> {
    store.store_block(address.index(), data)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pk_common::constants::BLOCK_SIZE;
    use pk_hal::mem::RamBlockStore;

    #[test]
    fn test_address_bounds() {
        assert!(BlockAddress::new(0).is_ok());
        assert!(BlockAddress::new(31).is_ok());
        assert_eq!(BlockAddress::new(32), Err(Error::StorageOutOfBounds));
        assert_eq!(BlockAddress::from_be_bytes([0x01, 0x00]), Err(Error::StorageOutOfBounds));
        assert_eq!(BlockAddress::from_be_bytes([0x00, 0x05]).map(BlockAddress::index), Ok(5));
    }

    #[test]
    fn test_address_from_wire_slice() {
        assert_eq!(BlockAddress::try_from(&[0u8, 7][..]).map(BlockAddress::index), Ok(7));
        assert_eq!(BlockAddress::try_from(&[7u8][..]), Err(Error::MalformedOperand));
    }

    #[test]
    fn test_write_then_read() {
        let mut store = RamBlockStore::new();
        let address = BlockAddress::new(5).unwrap();
        write_record(&mut store, address, &[0xAB; BLOCK_SIZE]).unwrap();
        assert_eq!(read_record(&store, address).unwrap(), &[0xAB; BLOCK_SIZE]);
        assert_eq!(
            read_record(&store, BlockAddress::new(4).unwrap()).unwrap(),
            &[0u8; BLOCK_SIZE]
        );
    }

    #[test]
    fn test_write_protected_store() {
        let mut store = RamBlockStore::new();
        store.set_write_protected(true);
        let address = BlockAddress::new(1).unwrap();
        assert_eq!(
            write_record(&mut store, address, &[1; BLOCK_SIZE]),
            Err(Error::StorageWriteFailed)
        );
    }
}
