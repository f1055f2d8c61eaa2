//! Word-packed bitmap views over arena memory.
//!
//! A [`Bitmap`] borrows its words from a graph slice; it never allocates.
//! Bits past `len_bits()` are never set, so the population count of the
//! backing words is the population count of the bitmap.

/// A mutable bitmap over borrowed `u64` words.
#[derive(Debug)]
pub struct Bitmap<'a> {
    bits: usize,
    words: &'a mut [u64],
}

#[inline(always)]
fn bit_word_mask(bit: usize) -> (usize, u64) {
    (bit >> 6, 1u64 << (bit & 63))
}

impl<'a> Bitmap<'a> {
    /// Wraps `words` as a bitmap of `bits` bits.
    ///
    /// # Panics
    /// Panics if `words` is too short to hold `bits` bits.
    pub fn new(words: &'a mut [u64], bits: usize) -> Self {
        assert!(words.len() * 64 >= bits, "bitmap backing too small");
        Self { bits, words }
    }

    /// Number of addressable bits.
    #[inline]
    pub fn len_bits(&self) -> usize {
        self.bits
    }

    /// Clears every bit.
    #[inline]
    pub fn clear_all(&mut self) {
        self.words.fill(0);
    }

    /// Returns whether `bit` is set.
    ///
    /// # Panics
    /// Panics if `bit >= len_bits()`.
    #[inline]
    pub fn is_set(&self, bit: usize) -> bool {
        assert!(bit < self.bits);
        let (word, mask) = bit_word_mask(bit);
        self.words[word] & mask != 0
    }

    /// Sets `bit` and returns `true` iff it was previously clear.
    ///
    /// # Panics
    /// Panics if `bit >= len_bits()`.
    #[inline]
    pub fn test_and_set(&mut self, bit: usize) -> bool {
        assert!(bit < self.bits);
        let (word, mask) = bit_word_mask(bit);
        let prev = self.words[word];
        self.words[word] = prev | mask;
        prev & mask == 0
    }

    /// Number of set bits.
    pub fn count_ones(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_and_query() {
        let mut words = [0u64; 3];
        let mut bitmap = Bitmap::new(&mut words, 130);
        assert_eq!(bitmap.len_bits(), 130);

        assert!(!bitmap.is_set(0));
        assert!(bitmap.test_and_set(0));
        assert!(bitmap.is_set(0));
        assert!(!bitmap.test_and_set(0));

        assert!(bitmap.test_and_set(129));
        assert_eq!(bitmap.count_ones(), 2);

        bitmap.clear_all();
        assert_eq!(bitmap.count_ones(), 0);
        assert!(!bitmap.is_set(129));
    }

    #[test]
    #[should_panic]
    fn out_of_range_bit_panics() {
        let mut words = [0u64; 1];
        let bitmap = Bitmap::new(&mut words, 10);
        bitmap.is_set(10);
    }
}
