// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Key index
//!
//! Enrolled keys are searched through a sorted list of slot numbers. The
//! sort order compares key bytes in the sequence given by the current
//! [`Permutation`], so replacing the permutation reorders the index without
//! touching storage.
//!
//! The index is derived state. It is rebuilt in full after every mutation
//! (permutation change, pair write, erase) and never patched incrementally.

use core::cmp::Ordering;

use heapless::Vec;
use subtle::ConstantTimeEq;

use pk_common::constants::{KEY_COUNT, PERMUTATION_SIZE};
use pk_common::{Error, Key, Response, Result, Slot};
use pk_hal::KeyStoreInterface;

// ============================================================================
// Permutation
// ============================================================================

/// Byte-position order used when comparing keys
///
/// Always a bijection over `0..=255`; the only constructors validate it.
#[derive(Clone, PartialEq, Eq)]
pub struct Permutation([u8; PERMUTATION_SIZE]);

impl Permutation {
    /// Natural byte order, used at startup
    #[allow(clippy::cast_possible_truncation)]
    pub const IDENTITY: Self = {
        let mut order = [0u8; PERMUTATION_SIZE];
        let mut i = 0;
        while i < PERMUTATION_SIZE {
            order[i] = i as u8;
            i += 1;
        }
        Self(order)
    };

    /// Validate a permutation vector
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidParameter` if `bytes` is not exactly
    /// `PERMUTATION_SIZE` long, and `Error::InvalidPermutation` if any
    /// position appears more than once.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let order: [u8; PERMUTATION_SIZE] =
            bytes.try_into().map_err(|_| Error::InvalidParameter)?;

        let mut seen = [false; PERMUTATION_SIZE];
        for &position in &order {
            let entry = &mut seen[usize::from(position)];
            if *entry {
                return Err(Error::InvalidPermutation);
            }
            *entry = true;
        }

        Ok(Self(order))
    }

    /// Raw position order
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; PERMUTATION_SIZE] {
        &self.0
    }

    /// Compare two keys position by position in permutation order
    #[must_use]
    pub fn compare(&self, a: &Key, b: &Key) -> Ordering {
        for &position in &self.0 {
            let position = usize::from(position);
            match a[position].cmp(&b[position]) {
                Ordering::Equal => {}
                other => return other,
            }
        }
        Ordering::Equal
    }
}

impl Default for Permutation {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl core::fmt::Debug for Permutation {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Permutation")
            .field("identity", &(*self == Self::IDENTITY))
            .finish_non_exhaustive()
    }
}

impl TryFrom<&[u8]> for Permutation {
    type Error = Error;

    fn try_from(bytes: &[u8]) -> Result<Self> {
        Self::from_bytes(bytes)
    }
}

// ============================================================================
// Key Index
// ============================================================================

/// Sorted index over the occupied slots of a key store
pub struct KeyIndex<K> {
    store: K,
    permutation: Permutation,
    /// Occupied slots, sorted by key under `permutation`, ties by slot
    order: Vec<Slot, KEY_COUNT>,
}

impl<K: KeyStoreInterface> KeyIndex<K> {
    /// Index an existing store under the identity order
    pub fn new(store: K) -> Self {
        let mut index = Self {
            store,
            permutation: Permutation::IDENTITY,
            order: Vec::new(),
        };
        index.rebuild();
        index
    }

    /// Compare two keys under the current permutation
    #[must_use]
    pub fn compare(&self, a: &Key, b: &Key) -> Ordering {
        self.permutation.compare(a, b)
    }

    /// Rebuild the index from storage
    pub fn rebuild(&mut self) {
        let store = &self.store;
        let permutation = &self.permutation;

        self.order.clear();
        for slot in 0..=Slot::MAX {
            if store.is_occupied(slot) && self.order.push(slot).is_err() {
                break;
            }
        }
        self.order.sort_unstable_by(|&a, &b| {
            permutation
                .compare(store.key(a), store.key(b))
                .then(a.cmp(&b))
        });
    }

    /// Find the slot holding `pattern`
    ///
    /// With duplicate keys the lowest slot is returned.
    #[must_use]
    pub fn find(&self, pattern: &Key) -> Option<Slot> {
        let pos = self.order.partition_point(|&slot| {
            self.permutation.compare(self.store.key(slot), pattern) == Ordering::Less
        });
        let slot = *self.order.get(pos)?;
        let matched: bool = self.store.key(slot)[..].ct_eq(&pattern[..]).into();
        matched.then_some(slot)
    }

    /// Replace the comparison order and rebuild
    pub fn set_permutation(&mut self, permutation: Permutation) {
        self.permutation = permutation;
        self.rebuild();
    }

    /// Store a key/response pair and rebuild
    ///
    /// # Errors
    ///
    /// Propagates the storage error; the index is rebuilt either way.
    pub fn write_pair(&mut self, slot: Slot, key: &Key, response: &Response) -> Result<()> {
        let result = self.store.store_pair(slot, key, response);
        self.rebuild();
        result.map_err(Error::from)
    }

    /// Reset every slot to empty and rebuild
    ///
    /// # Errors
    ///
    /// Propagates the storage error; the index is rebuilt either way.
    pub fn erase_all(&mut self) -> Result<()> {
        let result = self.store.erase_all();
        self.rebuild();
        result.map_err(Error::from)
    }

    /// Response paired with a slot
    #[must_use]
    pub fn response(&self, slot: Slot) -> &Response {
        self.store.response(slot)
    }

    /// Number of indexed slots
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Check whether no slot is enrolled
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Current comparison order
    #[must_use]
    pub fn permutation(&self) -> &Permutation {
        &self.permutation
    }

    /// Indexed slots in search order
    #[must_use]
    pub fn slots(&self) -> &[Slot] {
        &self.order
    }

    /// Borrow the backing store
    #[must_use]
    pub fn store(&self) -> &K {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pk_common::constants::KEY_SIZE;
    use pk_hal::mem::RamKeyStore;

    fn key_with(position: usize, value: u8) -> Key {
        let mut key = [0u8; KEY_SIZE];
        key[position] = value;
        key
    }

    #[test]
    fn test_permutation_rejects_duplicates() {
        let mut bytes = *Permutation::IDENTITY.as_bytes();
        bytes[10] = 11;
        assert_eq!(Permutation::from_bytes(&bytes), Err(Error::InvalidPermutation));
        assert_eq!(
            Permutation::from_bytes(&[0u8; PERMUTATION_SIZE]),
            Err(Error::InvalidPermutation)
        );
    }

    #[test]
    fn test_permutation_rejects_wrong_length() {
        assert_eq!(Permutation::from_bytes(&[0u8; 12]), Err(Error::InvalidParameter));
    }

    #[test]
    fn test_permutation_accepts_reversal() {
        let mut bytes = *Permutation::IDENTITY.as_bytes();
        bytes.reverse();
        let reversed = Permutation::try_from(&bytes[..]).unwrap();

        let a = key_with(0, 1);
        let b = key_with(255, 1);
        assert_eq!(Permutation::IDENTITY.compare(&a, &b), Ordering::Greater);
        assert_eq!(reversed.compare(&a, &b), Ordering::Less);
        assert_eq!(reversed.compare(&a, &a), Ordering::Equal);
    }

    #[test]
    fn test_empty_store_has_empty_index() {
        let index = KeyIndex::new(RamKeyStore::new());
        assert!(index.is_empty());
        assert_eq!(index.find(&[0u8; KEY_SIZE]), None);
    }

    #[test]
    fn test_zero_key_with_nonzero_response_is_indexed() {
        let mut index = KeyIndex::new(RamKeyStore::new());
        index.write_pair(3, &[0u8; KEY_SIZE], &[0xFF; KEY_SIZE]).unwrap();
        assert_eq!(index.len(), 1);
        assert_eq!(index.find(&[0u8; KEY_SIZE]), Some(3));
        assert_eq!(index.response(3), &[0xFF; KEY_SIZE]);
    }

    #[test]
    fn test_duplicate_keys_resolve_to_lowest_slot() {
        let mut index = KeyIndex::new(RamKeyStore::new());
        let key = key_with(7, 0x42);
        index.write_pair(200, &key, &[1; KEY_SIZE]).unwrap();
        index.write_pair(9, &key, &[2; KEY_SIZE]).unwrap();
        assert_eq!(index.find(&key), Some(9));
        assert_eq!(index.slots(), &[9, 200]);
    }

    #[test]
    fn test_rebuild_sorts_under_permutation() {
        let mut index = KeyIndex::new(RamKeyStore::new());
        index.write_pair(0, &key_with(0, 2), &[1; KEY_SIZE]).unwrap();
        index.write_pair(1, &key_with(255, 1), &[1; KEY_SIZE]).unwrap();
        assert_eq!(index.slots(), &[1, 0]);

        let mut bytes = *Permutation::IDENTITY.as_bytes();
        bytes.reverse();
        index.set_permutation(Permutation::from_bytes(&bytes).unwrap());
        assert_eq!(index.slots(), &[0, 1]);
        assert_eq!(index.find(&key_with(255, 1)), Some(1));
    }

    #[test]
    fn test_failed_write_leaves_index_consistent() {
        let mut store = RamKeyStore::new();
        store.set_write_protected(true);
        let mut index = KeyIndex::new(store);
        assert!(index.write_pair(0, &key_with(0, 1), &[1; KEY_SIZE]).is_err());
        assert!(index.is_empty());
    }

    #[test]
    fn test_erase_empties_index() {
        let mut index = KeyIndex::new(RamKeyStore::new());
        index.write_pair(5, &key_with(1, 1), &[1; KEY_SIZE]).unwrap();
        index.erase_all().unwrap();
        assert!(index.is_empty());
        assert_eq!(index.find(&key_with(1, 1)), None);
    }
}
