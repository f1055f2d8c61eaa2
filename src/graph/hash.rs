//! Seeded hash functions mapping a key to two raw 32-bit hashes.
//!
//! A hash function only produces the raw pair. Reduction into `[0, V)` and
//! the degenerate-pair handling live in [`Graph::hash_key`](super::Graph::hash_key).

use serde::{Deserialize, Serialize};

/// The four seed words of one graph attempt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Seeds(pub [u32; 4]);

impl Seeds {
    /// First seed word.
    #[inline]
    pub fn s1(&self) -> u32 {
        self.0[0]
    }

    /// Second seed word.
    #[inline]
    pub fn s2(&self) -> u32 {
        self.0[1]
    }

    /// Third seed word.
    #[inline]
    pub fn s3(&self) -> u32 {
        self.0[2]
    }

    /// Fourth seed word.
    #[inline]
    pub fn s4(&self) -> u32 {
        self.0[3]
    }
}

/// A function of `(seeds, key)` producing two raw vertex hashes.
///
/// Implementations must be pure: the verifier and the published table replay
/// the same function with the same seeds and must observe identical output.
pub trait SeededHash: Send + Sync {
    /// Returns the two raw (unreduced) hashes of `key`.
    fn hash(&self, seeds: &Seeds, key: u32) -> (u32, u32);
}

impl<H: SeededHash + ?Sized> SeededHash for &H {
    #[inline]
    fn hash(&self, seeds: &Seeds, key: u32) -> (u32, u32) {
        (**self).hash(seeds, key)
    }
}

/// Built-in hash functions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HashFunction {
    /// CRC32-C combined with a rotate; uses seeds 1–3.
    #[default]
    Crc32Rotate,
    /// Rotates and xors; uses all four seeds. Deliberately weak.
    RotateXor,
    /// Add, subtract and xor; uses seeds 1–3.
    AddSubXor,
    /// Input xor'ed with each of seeds 1 and 2.
    Xor,
}

impl HashFunction {
    /// All built-in functions.
    pub const ALL: [HashFunction; 4] = [
        Self::Crc32Rotate,
        Self::RotateXor,
        Self::AddSubXor,
        Self::Xor,
    ];
}

impl SeededHash for HashFunction {
    #[inline]
    fn hash(&self, seeds: &Seeds, key: u32) -> (u32, u32) {
        match self {
            Self::Crc32Rotate => {
                let a = crc32c_u32(seeds.s1(), key);
                let b = crc32c_u32(seeds.s2(), key.rotate_left(15));
                let c = seeds.s3() ^ key;
                let d = crc32c_u32(b, c);
                (a, d)
            }
            Self::RotateXor => {
                let a = (key ^ seeds.s1()).rotate_left(15);
                let b = key.wrapping_add(seeds.s2()).rotate_left(7);
                let c = key.wrapping_sub(seeds.s3()).rotate_right(11);
                let d = (key ^ seeds.s4()).rotate_right(20);
                (a ^ c, b ^ d)
            }
            Self::AddSubXor => {
                let a = key.wrapping_add(seeds.s1());
                let b = key.wrapping_sub(seeds.s2());
                let d = (a ^ b) ^ seeds.s3();
                (a, d)
            }
            Self::Xor => (key ^ seeds.s1(), key ^ seeds.s2()),
        }
    }
}

/// How raw hashes and lookup sums are reduced into `[0, V)`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MaskingType {
    /// `value % V`.
    #[default]
    Modulus,
    /// `value & (V - 1)`; V is a power of two.
    And,
    /// Vertex hashes fold their high half into the low half before the
    /// `And` mask; lookup sums are masked like `And`.
    XorAnd,
}

impl MaskingType {
    /// Every masking type.
    pub const ALL: [MaskingType; 3] = [Self::Modulus, Self::And, Self::XorAnd];

    /// Returns `true` if V must be a power of two.
    #[inline]
    pub const fn needs_power_of_two(self) -> bool {
        matches!(self, Self::And | Self::XorAnd)
    }

    /// Reduces a raw vertex hash into `[0, modulus)`.
    #[inline]
    pub fn apply(self, value: u32, modulus: u32) -> u32 {
        match self {
            Self::XorAnd => Self::And.apply(value ^ (value >> 16), modulus),
            _ => self.apply_index(value, modulus),
        }
    }

    /// Reduces a lookup sum into `[0, modulus)`.
    #[inline]
    pub fn apply_index(self, value: u32, modulus: u32) -> u32 {
        match self {
            Self::Modulus => value % modulus,
            Self::And | Self::XorAnd => {
                debug_assert!(modulus.is_power_of_two());
                value & (modulus - 1)
            }
        }
    }
}

const CRC32C_POLY: u32 = 0x82F6_3B78;

const CRC32C_TABLE: [u32; 256] = {
    let mut table = [0u32; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = i as u32;
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & 1 != 0 { (crc >> 1) ^ CRC32C_POLY } else { crc >> 1 };
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
};

/// One CRC32-C step over a 32-bit value, matching the SSE4.2 `crc32` instruction
/// (no pre/post inversion).
#[inline]
pub fn crc32c_u32(crc: u32, value: u32) -> u32 {
    #[cfg(target_arch = "x86_64")]
    {
        if std::arch::is_x86_feature_detected!("sse4.2") {
            // SAFETY: the feature was detected at runtime.
            return unsafe { crc32c_u32_sse42(crc, value) };
        }
    }
    crc32c_u32_table(crc, value)
}

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "sse4.2")]
unsafe fn crc32c_u32_sse42(crc: u32, value: u32) -> u32 {
    std::arch::x86_64::_mm_crc32_u32(crc, value)
}

#[inline]
fn crc32c_u32_table(mut crc: u32, value: u32) -> u32 {
    for byte in value.to_le_bytes() {
        crc = CRC32C_TABLE[((crc ^ u32::from(byte)) & 0xff) as usize] ^ (crc >> 8);
    }
    crc
}
