//! SipHash
//!
//! Keyed 64-bit hash used to place names into table buckets. The key is a
//! fixed part of the file format (all zeros), so the same name always lands
//! in the same bucket across builds.

use std::hash::Hasher;

/// SipHash with 2 compression and 4 finalization rounds
pub type SipHasher24 = SipHasher<2, 4>;

/// SipHash with 1 compression and 3 finalization rounds
pub type SipHasher13 = SipHasher<1, 3>;

/// Terminator appended after the key bytes, as `str` hashing does
const KEY_TERMINATOR: u8 = 0xff;

/// Streaming SipHash-C-D
#[derive(Debug, Clone)]
pub struct SipHasher<const C: usize, const D: usize> {
    v0: u64,
    v1: u64,
    v2: u64,
    v3: u64,
    /// Pending bytes of the current partial block, little-endian packed
    tail: u64,
    /// Number of valid bytes in `tail`
    ntail: usize,
    /// Total bytes written so far
    length: usize,
}

impl<const C: usize, const D: usize> SipHasher<C, D> {
    /// Hasher keyed with the format's fixed all-zero key
    pub fn new() -> Self {
        Self::new_with_keys(0, 0)
    }

    pub fn new_with_keys(k0: u64, k1: u64) -> Self {
        Self {
            v0: k0 ^ 0x736f_6d65_7073_6575,
            v1: k1 ^ 0x646f_7261_6e64_6f6d,
            v2: k0 ^ 0x6c79_6765_6e65_7261,
            v3: k1 ^ 0x7465_6462_7974_6573,
            tail: 0,
            ntail: 0,
            length: 0,
        }
    }

    /// Hash a storage key: its bytes followed by the `0xFF` terminator
    pub fn hash(bytes: &[u8]) -> u64 {
        let mut hasher = Self::new();
        hasher.write(bytes);
        hasher.write_u8(KEY_TERMINATOR);
        hasher.finish()
    }

    #[inline]
    fn round(&mut self) {
        self.v0 = self.v0.wrapping_add(self.v1);
        self.v1 = self.v1.rotate_left(13);
        self.v1 ^= self.v0;
        self.v0 = self.v0.rotate_left(32);
        self.v2 = self.v2.wrapping_add(self.v3);
        self.v3 = self.v3.rotate_left(16);
        self.v3 ^= self.v2;
        self.v0 = self.v0.wrapping_add(self.v3);
        self.v3 = self.v3.rotate_left(21);
        self.v3 ^= self.v0;
        self.v2 = self.v2.wrapping_add(self.v1);
        self.v1 = self.v1.rotate_left(17);
        self.v1 ^= self.v2;
        self.v2 = self.v2.rotate_left(32);
    }

    #[inline]
    fn compress(&mut self, m: u64) {
        self.v3 ^= m;
        for _ in 0..C {
            self.round();
        }
        self.v0 ^= m;
    }
}

impl<const C: usize, const D: usize> Default for SipHasher<C, D> {
    fn default() -> Self {
        Self::new()
    }
}

/// Little-endian load of up to 8 bytes
#[inline]
fn load_le(bytes: &[u8]) -> u64 {
    bytes
        .iter()
        .rev()
        .fold(0u64, |acc, &b| (acc << 8) | u64::from(b))
}

impl<const C: usize, const D: usize> Hasher for SipHasher<C, D> {
    fn write(&mut self, msg: &[u8]) {
        self.length += msg.len();
        let mut rest = msg;

        // Top up a partial block left over from the previous write
        if self.ntail != 0 {
            let fill = (8 - self.ntail).min(rest.len());
            self.tail |= load_le(&rest[..fill]) << (8 * self.ntail);
            self.ntail += fill;
            rest = &rest[fill..];
            if self.ntail < 8 {
                return;
            }
            let block = self.tail;
            self.compress(block);
            self.tail = 0;
            self.ntail = 0;
        }

        let mut blocks = rest.chunks_exact(8);
        for block in &mut blocks {
            self.compress(load_le(block));
        }

        let remainder = blocks.remainder();
        self.tail = load_le(remainder);
        self.ntail = remainder.len();
    }

    fn finish(&self) -> u64 {
        let mut state = self.clone();
        let last = (((self.length as u64) & 0xff) << 56) | self.tail;

        state.compress(last);
        state.v2 ^= 0xff;
        for _ in 0..D {
            state.round();
        }

        state.v0 ^ state.v1 ^ state.v2 ^ state.v3
    }
}
