//! Fixed-size bit vector over sub-task indices

use serde::{Deserialize, Serialize};
use std::fmt;

const WORD_BITS: usize = u64::BITS as usize;

/// A fixed-size set of sub-task indices.
///
/// The size is chosen at construction and never changes. Indexing outside
/// `0..len` is a programming error and panics.
#[derive(Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "RawBitSet")]
pub struct BitSet {
    len: usize,
    words: Vec<u64>,
}

/// Wire form of [`BitSet`], checked before it is accepted
#[derive(Deserialize)]
struct RawBitSet {
    len: usize,
    words: Vec<u64>,
}

impl TryFrom<RawBitSet> for BitSet {
    type Error = String;

    fn try_from(raw: RawBitSet) -> Result<Self, Self::Error> {
        let expected = raw.len.div_ceil(WORD_BITS);
        if raw.words.len() != expected {
            return Err(format!(
                "bitset of length {} needs {expected} words, got {}",
                raw.len,
                raw.words.len()
            ));
        }

        let tail = raw.len % WORD_BITS;
        if tail != 0 {
            if let Some(last) = raw.words.last() {
                if last >> tail != 0 {
                    return Err(format!(
                        "bitset of length {} has bits set past its end",
                        raw.len
                    ));
                }
            }
        }

        Ok(Self {
            len: raw.len,
            words: raw.words,
        })
    }
}

impl BitSet {
    /// Create an all-clear bitset of `len` bits
    pub fn new(len: usize) -> Self {
        Self {
            len,
            words: vec![0; len.div_ceil(WORD_BITS)],
        }
    }

    /// Create a bitset of `len` bits with the given indices set
    pub fn from_indices(len: usize, indices: impl IntoIterator<Item = usize>) -> Self {
        let mut bits = Self::new(len);
        for idx in indices {
            bits.set(idx);
        }
        bits
    }

    /// Number of significant bits
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn set(&mut self, idx: usize) {
        let (word, mask) = self.locate(idx);
        self.words[word] |= mask;
    }

    pub fn clear(&mut self, idx: usize) {
        let (word, mask) = self.locate(idx);
        self.words[word] &= !mask;
    }

    pub fn is_set(&self, idx: usize) -> bool {
        let (word, mask) = self.locate(idx);
        self.words[word] & mask != 0
    }

    /// Return a new bitset of the same size with every bit flipped.
    ///
    /// The receiver is left untouched.
    #[must_use]
    pub fn invert(&self) -> Self {
        let mut words: Vec<u64> = self.words.iter().map(|w| !w).collect();
        // Bits past `len` in the final word must stay clear so that counts stay exact.
        let tail = self.len % WORD_BITS;
        if tail != 0 {
            if let Some(last) = words.last_mut() {
                *last &= (1u64 << tail) - 1;
            }
        }
        Self {
            len: self.len,
            words,
        }
    }

    /// Number of set bits
    pub fn count_ones(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Set indices in ascending order
    pub fn iter_ones(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.len).filter(move |&idx| self.is_set(idx))
    }

    /// Clear indices in ascending order
    pub fn iter_zeros(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.len).filter(move |&idx| !self.is_set(idx))
    }

    fn locate(&self, idx: usize) -> (usize, u64) {
        assert!(
            idx < self.len,
            "bit index {idx} out of range for bitset of length {}",
            self.len
        );
        (idx / WORD_BITS, 1u64 << (idx % WORD_BITS))
    }
}

impl fmt::Debug for BitSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BitSet")
            .field("len", &self.len)
            .field("ones", &self.iter_ones().collect::<Vec<_>>())
            .finish()
    }
}
