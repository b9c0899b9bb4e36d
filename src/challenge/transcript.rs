//! Canonical byte encoding of random-oracle inputs.
//!
//! Every integer or element is written as a u32 length prefix followed by its
//! big-endian bytes. Sequences and tuples are prefixed with their arity as u64,
//! so distinct shapes never encode to the same bytes.

use num_bigint::BigUint;

use crate::group::GroupElement;

const DOMAIN_TAG: &[u8] = b"zk_mixnet/transcript/v1";

/// Builder for canonical oracle transcripts.
pub struct TranscriptBuilder {
    buffer: Vec<u8>,
}

impl TranscriptBuilder {
    pub fn new(kind: &str) -> Self {
        let mut buffer = Vec::with_capacity(256);
        buffer.extend_from_slice(DOMAIN_TAG);
        buffer.extend_from_slice(&(kind.len() as u16).to_be_bytes());
        buffer.extend_from_slice(kind.as_bytes());
        Self { buffer }
    }

    pub fn append_u8(&mut self, value: u8) {
        self.buffer.push(value);
    }

    pub fn append_u64(&mut self, value: u64) {
        self.buffer.extend_from_slice(&value.to_be_bytes());
    }

    pub fn append_bytes(&mut self, bytes: &[u8]) {
        self.buffer
            .extend_from_slice(&(bytes.len() as u32).to_be_bytes());
        self.buffer.extend_from_slice(bytes);
    }

    pub fn append_biguint(&mut self, value: &BigUint) {
        self.append_bytes(&value.to_bytes_be());
    }

    pub fn append<T: TranscriptEncode + ?Sized>(&mut self, value: &T) {
        value.encode(self);
    }

    pub fn finish(self) -> Vec<u8> {
        self.buffer
    }
}

/// Values with a canonical transcript encoding.
pub trait TranscriptEncode {
    fn encode(&self, builder: &mut TranscriptBuilder);
}

impl TranscriptEncode for BigUint {
    fn encode(&self, builder: &mut TranscriptBuilder) {
        builder.append_biguint(self);
    }
}

impl TranscriptEncode for GroupElement {
    fn encode(&self, builder: &mut TranscriptBuilder) {
        builder.append_biguint(self.value());
    }
}

impl<T: TranscriptEncode> TranscriptEncode for [T] {
    fn encode(&self, builder: &mut TranscriptBuilder) {
        builder.append_u64(self.len() as u64);
        for item in self {
            item.encode(builder);
        }
    }
}

impl<T: TranscriptEncode> TranscriptEncode for Vec<T> {
    fn encode(&self, builder: &mut TranscriptBuilder) {
        self.as_slice().encode(builder);
    }
}

impl<T: TranscriptEncode + ?Sized> TranscriptEncode for &T {
    fn encode(&self, builder: &mut TranscriptBuilder) {
        (**self).encode(builder);
    }
}

impl<A: TranscriptEncode, B: TranscriptEncode> TranscriptEncode for (A, B) {
    fn encode(&self, builder: &mut TranscriptBuilder) {
        builder.append_u64(2);
        self.0.encode(builder);
        self.1.encode(builder);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode<T: TranscriptEncode + ?Sized>(value: &T) -> Vec<u8> {
        let mut builder = TranscriptBuilder::new("test");
        builder.append(value);
        builder.finish()
    }

    #[test]
    fn test_layout() {
        let bytes = encode(&BigUint::from(0x0102u32));
        let mut expected = DOMAIN_TAG.to_vec();
        expected.extend_from_slice(&[0, 4]);
        expected.extend_from_slice(b"test");
        expected.extend_from_slice(&[0, 0, 0, 2, 0x01, 0x02]);
        assert_eq!(bytes, expected);
    }

    #[test]
    fn test_shapes_do_not_collide() {
        let a = vec![BigUint::from(1u32), BigUint::from(2u32)];
        let b = vec![BigUint::from(0x0102u32)];
        assert_ne!(encode(&a), encode(&b));

        let split = (vec![BigUint::from(1u32)], vec![BigUint::from(2u32)]);
        let joined = (a.clone(), Vec::<BigUint>::new());
        assert_ne!(encode(&split), encode(&joined));
    }
}
