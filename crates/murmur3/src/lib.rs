//! MurmurHash3 x64_128.
//!
//! Algorithm by Austin Appleby (public domain). Used for content keys,
//! cache-busting versions and derived object identifiers, so the output must
//! stay identical across platforms: blocks are always read little-endian.

use std::fmt;

const C1: u64 = 0x87c3_7b91_1142_53d5;
const C2: u64 = 0x4cf5_ad43_2745_937f;

/// 128-bit digest as the two 64-bit halves produced by the algorithm.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Digest128 {
    pub h1: u64,
    pub h2: u64,
}

impl Digest128 {
    /// Digest bytes, `h1` then `h2`, each little-endian.
    pub fn to_bytes(self) -> [u8; 16] {
        let mut out = [0u8; 16];
        out[..8].copy_from_slice(&self.h1.to_le_bytes());
        out[8..].copy_from_slice(&self.h2.to_le_bytes());
        out
    }

    /// Lowercase hex of [`Self::to_bytes`], 32 characters.
    pub fn to_hex(self) -> String {
        self.to_bytes().iter().map(|b| format!("{b:02x}")).collect()
    }

    /// First `len` hex characters (clamped to 32).
    pub fn short_hex(self, len: usize) -> String {
        let mut hex = self.to_hex();
        hex.truncate(len.min(32));
        hex
    }
}

impl fmt::Display for Digest128 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

#[inline]
fn fmix64(mut k: u64) -> u64 {
    k ^= k >> 33;
    k = k.wrapping_mul(0xff51_afd7_ed55_8ccd);
    k ^= k >> 33;
    k = k.wrapping_mul(0xc4ce_b9fe_1a85_ec53);
    k ^ (k >> 33)
}

#[inline]
fn mix_k1(k1: u64) -> u64 {
    k1.wrapping_mul(C1).rotate_left(31).wrapping_mul(C2)
}

#[inline]
fn mix_k2(k2: u64) -> u64 {
    k2.wrapping_mul(C2).rotate_left(33).wrapping_mul(C1)
}

/// Little-endian load of up to 8 bytes; missing high bytes are zero.
///
/// This is also the tail rule of the reference implementation, which ORs
/// `tail[i] << (8 * i)` into the lane.
#[inline]
fn load_le(bytes: &[u8]) -> u64 {
    let mut lane = [0u8; 8];
    lane[..bytes.len()].copy_from_slice(bytes);
    u64::from_le_bytes(lane)
}

/// Hash `data` with an explicit seed.
pub fn hash128_with_seed(data: &[u8], seed: u64) -> Digest128 {
    let mut h1 = seed;
    let mut h2 = seed;

    let mut blocks = data.chunks_exact(16);
    for block in &mut blocks {
        h1 ^= mix_k1(load_le(&block[..8]));
        h1 = h1
            .rotate_left(27)
            .wrapping_add(h2)
            .wrapping_mul(5)
            .wrapping_add(0x52dc_e729);

        h2 ^= mix_k2(load_le(&block[8..]));
        h2 = h2
            .rotate_left(31)
            .wrapping_add(h1)
            .wrapping_mul(5)
            .wrapping_add(0x3849_5ab5);
    }

    let tail = blocks.remainder();
    if tail.len() > 8 {
        h2 ^= mix_k2(load_le(&tail[8..]));
    }
    if !tail.is_empty() {
        h1 ^= mix_k1(load_le(&tail[..tail.len().min(8)]));
    }

    let len = data.len() as u64;
    h1 ^= len;
    h2 ^= len;

    h1 = h1.wrapping_add(h2);
    h2 = h2.wrapping_add(h1);
    h1 = fmix64(h1);
    h2 = fmix64(h2);
    h1 = h1.wrapping_add(h2);
    h2 = h2.wrapping_add(h1);

    Digest128 { h1, h2 }
}

/// Hash `data` with seed 0.
#[inline]
pub fn hash128(data: &[u8]) -> Digest128 {
    hash128_with_seed(data, 0)
}

/// Hash several byte strings as one unambiguous message.
///
/// Every part is prefixed with its length, so `["ab", "c"]` and `["a", "bc"]`
/// produce different digests.
pub fn hash_parts<I, P>(parts: I) -> Digest128
where
    I: IntoIterator<Item = P>,
    P: AsRef<[u8]>,
{
    let mut message = Vec::new();
    for part in parts {
        let part = part.as_ref();
        message.extend_from_slice(&(part.len() as u64).to_le_bytes());
        message.extend_from_slice(part);
    }
    hash128(&message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input_seed_zero() {
        assert_eq!(hash128(b""), Digest128 { h1: 0, h2: 0 });
        assert_ne!(hash128_with_seed(b"", 1), Digest128::default());
    }

    #[test]
    fn test_deterministic() {
        let a = hash128(b"The quick brown fox jumps over the lazy dog");
        let b = hash128(b"The quick brown fox jumps over the lazy dog");
        assert_eq!(a, b);
        assert_ne!(a, hash128(b"The quick brown fox jumps over the lazy cog"));
    }

    #[test]
    fn test_every_tail_length_differs() {
        let data: Vec<u8> = (0u8..48).collect();
        let digests: Vec<Digest128> = (0..=data.len()).map(|n| hash128(&data[..n])).collect();
        for i in 0..digests.len() {
            for j in (i + 1)..digests.len() {
                assert_ne!(digests[i], digests[j], "prefix {i} vs {j}");
            }
        }
    }

    #[test]
    fn test_hex_formatting() {
        let d = Digest128 { h1: 0x0102_0304_0506_0708, h2: 0 };
        let hex = d.to_hex();
        assert_eq!(hex.len(), 32);
        assert!(hex.starts_with("0807060504030201"));
        assert_eq!(d.short_hex(4), "0807");
        assert_eq!(d.short_hex(100).len(), 32);
        assert_eq!(d.to_string(), hex);
    }

    #[test]
    fn test_hash_parts_is_unambiguous() {
        assert_ne!(hash_parts(["ab", "c"]), hash_parts(["a", "bc"]));
        assert_eq!(hash_parts(["x", "y"]), hash_parts([b"x".as_slice(), b"y".as_slice()]));
    }
}
