//! Key sets
//!
//! Small copyable bitset of dispatch keys, iterated in priority order.

use std::fmt;

use super::key::DispatchKey;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct KeySet(u16);

impl KeySet {
    pub const EMPTY: KeySet = KeySet(0);

    pub const fn from_keys(keys: &[DispatchKey]) -> Self {
        let mut bits = 0u16;
        let mut i = 0;
        while i < keys.len() {
            bits |= 1 << keys[i] as u8;
            i += 1;
        }
        KeySet(bits)
    }

    pub fn bits(self) -> u16 {
        self.0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn has(self, key: DispatchKey) -> bool {
        self.0 & (1 << key as u8) != 0
    }

    #[must_use]
    pub fn add(self, key: DispatchKey) -> Self {
        KeySet(self.0 | (1 << key as u8))
    }

    #[must_use]
    pub fn remove(self, key: DispatchKey) -> Self {
        KeySet(self.0 & !(1 << key as u8))
    }

    #[must_use]
    pub fn union(self, other: KeySet) -> Self {
        KeySet(self.0 | other.0)
    }

    #[must_use]
    pub fn intersection(self, other: KeySet) -> Self {
        KeySet(self.0 & other.0)
    }

    #[must_use]
    pub fn difference(self, other: KeySet) -> Self {
        KeySet(self.0 & !other.0)
    }

    /// Highest-priority member, if any.
    pub fn highest(self) -> Option<DispatchKey> {
        if self.0 == 0 {
            return None;
        }
        DispatchKey::from_u8((15 - self.0.leading_zeros()) as u8)
    }

    /// Members, highest priority first.
    pub fn iter(self) -> impl Iterator<Item = DispatchKey> {
        DispatchKey::ALL.into_iter().rev().filter(move |k| self.has(*k))
    }
}

impl FromIterator<DispatchKey> for KeySet {
    fn from_iter<I: IntoIterator<Item = DispatchKey>>(iter: I) -> Self {
        iter.into_iter().fold(KeySet::EMPTY, KeySet::add)
    }
}

impl fmt::Debug for KeySet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}
