//! Key hashing and the probe sequence used by [`Object`](crate::Object).

use core::hash::{Hash, Hasher};

use crate::element::ElementRef;

// =============================================================================
// Hashing
// =============================================================================

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// 64-bit FNV-1a over the bytes an element feeds it (kind tag, then payload).
///
/// Unseeded, so the same key hashes identically in every table and every run.
#[derive(Debug, Clone, Copy)]
pub struct ElementHasher(u64);

impl Default for ElementHasher {
    #[inline]
    fn default() -> Self {
        Self(FNV_OFFSET_BASIS)
    }
}

impl Hasher for ElementHasher {
    #[inline]
    fn write(&mut self, bytes: &[u8]) {
        let mut h = self.0;
        for &b in bytes {
            h ^= u64::from(b);
            h = h.wrapping_mul(FNV_PRIME);
        }
        self.0 = h;
    }

    #[inline]
    fn finish(&self) -> u64 {
        self.0
    }
}

/// Final avalanche (murmur3 fmix64). FNV leaves the low bits weak for short
/// integer payloads and the table indexes with the low bits.
#[inline]
fn mix(mut h: u64) -> u64 {
    h ^= h >> 33;
    h = h.wrapping_mul(0xff51_afd7_ed55_8ccd);
    h ^= h >> 33;
    h = h.wrapping_mul(0xc4ce_b9fe_1a85_ec53);
    h ^ (h >> 33)
}

/// Table hash of a key.
#[inline]
pub(crate) fn hash_key(key: ElementRef<'_>) -> u64 {
    let mut hasher = ElementHasher::default();
    key.hash(&mut hasher);
    mix(hasher.finish())
}

// =============================================================================
// Probe sequence
// =============================================================================

/// Triangular probing over a power-of-two slot count: `h, h+1, h+3, h+6, ...`
/// modulo the capacity. Yields every slot index exactly once, then stops.
#[derive(Debug, Clone)]
pub(crate) struct Probe {
    pos: usize,
    step: usize,
    mask: usize,
    remaining: usize,
}

impl Probe {
    #[inline]
    pub(crate) fn new(hash: u64, capacity: usize) -> Self {
        debug_assert!(capacity == 0 || capacity.is_power_of_two());
        let mask = capacity.wrapping_sub(1);
        Self {
            pos: (hash as usize) & mask,
            step: 0,
            mask,
            remaining: capacity,
        }
    }
}

impl Iterator for Probe {
    type Item = usize;

    #[inline]
    fn next(&mut self) -> Option<usize> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        let current = self.pos;
        self.step += 1;
        self.pos = (self.pos + self.step) & self.mask;
        Some(current)
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl ExactSizeIterator for Probe {}
