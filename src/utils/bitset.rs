//! A fixed-capacity bit set over small integer indices.
//!
//! The component extractor keeps the set of not-yet-assigned memory cells in a [`BitSet`]: it
//! claims cells by removing them and seeds new blocks from the lowest remaining index.

use crate::Result;

/// A bit vector for set operations over indices in `[0, capacity)`.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct BitSet {
    /// The bits, 64 per word.
    words: Vec<u64>,
    /// The number of addressable bits.
    len: usize,
    /// No set bit lives in a word below this one.
    low_word: usize,
}

impl BitSet {
    /// Creates an empty bit set able to hold indices below `capacity`.
    ///
    /// # Errors
    /// Returns [`crate::Error::OutOfMemory`] if the words cannot be allocated.
    pub fn new(capacity: usize) -> Result<Self> {
        let num_words = capacity.div_ceil(64);
        let mut words = Vec::new();
        words.try_reserve_exact(num_words)?;
        words.resize(num_words, 0);

        Ok(Self {
            words,
            len: capacity,
            low_word: 0,
        })
    }

    /// Sets the bit at `index`.
    ///
    /// # Panics
    ///
    /// Panics if `index` is not below the capacity.
    pub fn insert(&mut self, index: usize) {
        assert!(index < self.len, "index out of bounds");
        let word = index / 64;
        self.words[word] |= 1u64 << (index % 64);
        self.low_word = self.low_word.min(word);
    }

    /// Clears the bit at `index`, returning whether it was set.
    ///
    /// # Panics
    ///
    /// Panics if `index` is not below the capacity.
    pub fn remove(&mut self, index: usize) -> bool {
        assert!(index < self.len, "index out of bounds");
        let word = index / 64;
        let mask = 1u64 << (index % 64);
        let was_set = self.words[word] & mask != 0;
        self.words[word] &= !mask;
        was_set
    }

    /// Returns the number of set bits.
    #[must_use]
    pub fn count(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    /// Clears and returns the lowest set index.
    pub fn pop_first(&mut self) -> Option<usize> {
        while self.low_word < self.words.len() {
            let word = self.words[self.low_word];
            if word != 0 {
                let bit = word.trailing_zeros() as usize;
                self.words[self.low_word] &= word - 1;
                return Some(self.low_word * 64 + bit);
            }
            self.low_word += 1;
        }
        None
    }

    /// Returns an iterator over the set indices in ascending order.
    pub fn iter(&self) -> BitSetIter<'_> {
        BitSetIter {
            set: self,
            word_idx: 0,
            current: self.words.first().copied().unwrap_or(0),
        }
    }
}

impl std::fmt::Debug for BitSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// Iterator over the set bits of a [`BitSet`].
pub struct BitSetIter<'a> {
    set: &'a BitSet,
    word_idx: usize,
    current: u64,
}

impl Iterator for BitSetIter<'_> {
    type Item = usize;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.current != 0 {
                let bit = self.current.trailing_zeros() as usize;
                self.current &= self.current - 1;
                return Some(self.word_idx * 64 + bit);
            }
            self.word_idx += 1;
            self.current = *self.set.words.get(self.word_idx)?;
        }
    }
}
