//! Reproducible pseudo-random byte stream derived from a public seed.
//!
//! Block `i` of the stream is
//!
//!   SHA256("zk_mixnet/drbg/v1" || len(seed) as u32 BE || seed || i as u64 BE)
//!
//! Prover and verifier reproduce the same stream from the same seed, which is
//! what generator derivation relies on. Not a source of secret randomness.

use num_bigint::BigUint;
use num_traits::Zero;
use rand::RngCore;
use sha2::{Digest, Sha256};

const DOMAIN_DRBG: &[u8] = b"zk_mixnet/drbg/v1";

#[derive(Clone)]
pub struct DeterministicRandomSequence {
    prefix: Sha256,
    counter: u64,
    block: [u8; 32],
    offset: usize,
}

impl DeterministicRandomSequence {
    pub fn new(seed: &[u8]) -> Self {
        let mut prefix = Sha256::new();
        prefix.update(DOMAIN_DRBG);
        prefix.update((seed.len() as u32).to_be_bytes());
        prefix.update(seed);
        Self {
            prefix,
            counter: 0,
            block: [0u8; 32],
            offset: 32,
        }
    }

    fn refill(&mut self) {
        let mut hasher = self.prefix.clone();
        hasher.update(self.counter.to_be_bytes());
        self.block.copy_from_slice(&hasher.finalize());
        self.counter += 1;
        self.offset = 0;
    }

    /// Uniform integer with at most `bits` bits.
    pub fn next_bits(&mut self, bits: u64) -> BigUint {
        if bits == 0 {
            return BigUint::zero();
        }
        let len = bits.div_ceil(8) as usize;
        let mut bytes = vec![0u8; len];
        self.fill_bytes(&mut bytes);
        let excess = (len as u64) * 8 - bits;
        bytes[0] &= 0xffu8 >> excess;
        BigUint::from_bytes_be(&bytes)
    }

    /// Uniform integer in `[0, bound)` by rejection sampling. `bound` must be
    /// positive.
    pub fn next_below(&mut self, bound: &BigUint) -> BigUint {
        let bits = bound.bits();
        loop {
            let candidate = self.next_bits(bits);
            if &candidate < bound {
                return candidate;
            }
        }
    }
}

impl std::fmt::Debug for DeterministicRandomSequence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeterministicRandomSequence")
            .field("counter", &self.counter)
            .field("offset", &self.offset)
            .finish()
    }
}

impl RngCore for DeterministicRandomSequence {
    fn next_u32(&mut self) -> u32 {
        let mut buf = [0u8; 4];
        self.fill_bytes(&mut buf);
        u32::from_be_bytes(buf)
    }

    fn next_u64(&mut self) -> u64 {
        let mut buf = [0u8; 8];
        self.fill_bytes(&mut buf);
        u64::from_be_bytes(buf)
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        let mut written = 0;
        while written < dest.len() {
            if self.offset == self.block.len() {
                self.refill();
            }
            let take = (dest.len() - written).min(self.block.len() - self.offset);
            dest[written..written + take]
                .copy_from_slice(&self.block[self.offset..self.offset + take]);
            self.offset += take;
            written += take;
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_stream() {
        let mut a = DeterministicRandomSequence::new(b"seed");
        let mut b = DeterministicRandomSequence::new(b"seed");
        let mut c = DeterministicRandomSequence::new(b"other");
        let xs: Vec<u64> = (0..10).map(|_| a.next_u64()).collect();
        let ys: Vec<u64> = (0..10).map(|_| b.next_u64()).collect();
        let zs: Vec<u64> = (0..10).map(|_| c.next_u64()).collect();
        assert_eq!(xs, ys);
        assert_ne!(xs, zs);
    }

    #[test]
    fn test_first_block_layout() {
        let mut seq = DeterministicRandomSequence::new(b"");
        let mut out = [0u8; 32];
        seq.fill_bytes(&mut out);

        let mut hasher = Sha256::new();
        hasher.update(DOMAIN_DRBG);
        hasher.update(0u32.to_be_bytes());
        hasher.update(0u64.to_be_bytes());
        assert_eq!(out.as_slice(), hasher.finalize().as_slice());
    }

    #[test]
    fn test_chunked_reads_match_bulk_read() {
        let mut bulk = DeterministicRandomSequence::new(b"chunks");
        let mut chunked = DeterministicRandomSequence::new(b"chunks");
        let mut expected = [0u8; 100];
        bulk.fill_bytes(&mut expected);
        let mut got = Vec::new();
        for size in [7usize, 30, 1, 62] {
            let mut buf = vec![0u8; size];
            chunked.fill_bytes(&mut buf);
            got.extend_from_slice(&buf);
        }
        assert_eq!(got.as_slice(), expected.as_slice());
    }

    #[test]
    fn test_bounded_sampling() {
        let mut seq = DeterministicRandomSequence::new(b"bounds");
        let bound = BigUint::from(22u32);
        for _ in 0..200 {
            assert!(seq.next_below(&bound) < bound);
        }
        for _ in 0..50 {
            assert!(seq.next_bits(5) < BigUint::from(32u32));
        }
    }
}
