use crate::coins::Address;
use crate::{Error, Result};
use std::cmp::Reverse;

/// A map key with an order-preserving byte encoding.
///
/// Integers are big-endian and addresses fixed-length, so composite keys sort
/// component by component and any leading components form an iterable
/// prefix.
pub trait Key: Sized {
    fn append_key(&self, out: &mut Vec<u8>);

    /// Reads a key from the front of `bytes`, returning it and the bytes
    /// which follow it.
    fn read_key(bytes: &[u8]) -> Result<(Self, &[u8])>;

    fn key_bytes(&self) -> Vec<u8> {
        let mut bytes = vec![];
        self.append_key(&mut bytes);
        bytes
    }
}

fn split_key(bytes: &[u8], len: usize) -> Result<(&[u8], &[u8])> {
    if bytes.len() < len {
        return Err(Error::Store("Key too short".into()));
    }
    Ok(bytes.split_at(len))
}

impl Key for u64 {
    fn append_key(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.to_be_bytes());
    }

    fn read_key(bytes: &[u8]) -> Result<(Self, &[u8])> {
        let (head, rest) = split_key(bytes, 8)?;
        let mut buf = [0; 8];
        buf.copy_from_slice(head);
        Ok((u64::from_be_bytes(buf), rest))
    }
}

/// Sorts descending.
impl Key for Reverse<u64> {
    fn append_key(&self, out: &mut Vec<u8>) {
        (u64::MAX - self.0).append_key(out);
    }

    fn read_key(bytes: &[u8]) -> Result<(Self, &[u8])> {
        let (inverted, rest) = u64::read_key(bytes)?;
        Ok((Reverse(u64::MAX - inverted), rest))
    }
}

impl Key for [u8; 20] {
    fn append_key(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(self);
    }

    fn read_key(bytes: &[u8]) -> Result<(Self, &[u8])> {
        let (head, rest) = split_key(bytes, 20)?;
        let mut buf = [0; 20];
        buf.copy_from_slice(head);
        Ok((buf, rest))
    }
}

impl Key for Address {
    fn append_key(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.bytes());
    }

    fn read_key(bytes: &[u8]) -> Result<(Self, &[u8])> {
        let (head, rest) = split_key(bytes, Address::LENGTH)?;
        Ok((Address::try_from(head)?, rest))
    }
}

/// Takes every remaining byte, so it can only be the last component.
impl Key for String {
    fn append_key(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(self.as_bytes());
    }

    fn read_key(bytes: &[u8]) -> Result<(Self, &[u8])> {
        let string = std::str::from_utf8(bytes)
            .map_err(|e| Error::Store(e.to_string()))?
            .to_string();
        Ok((string, &bytes[bytes.len()..]))
    }
}

impl<A: Key, B: Key> Key for (A, B) {
    fn append_key(&self, out: &mut Vec<u8>) {
        self.0.append_key(out);
        self.1.append_key(out);
    }

    fn read_key(bytes: &[u8]) -> Result<(Self, &[u8])> {
        let (a, rest) = A::read_key(bytes)?;
        let (b, rest) = B::read_key(rest)?;
        Ok(((a, b), rest))
    }
}

impl<A: Key, B: Key, C: Key> Key for (A, B, C) {
    fn append_key(&self, out: &mut Vec<u8>) {
        self.0.append_key(out);
        self.1.append_key(out);
        self.2.append_key(out);
    }

    fn read_key(bytes: &[u8]) -> Result<(Self, &[u8])> {
        let (a, rest) = A::read_key(bytes)?;
        let (b, rest) = B::read_key(rest)?;
        let (c, rest) = C::read_key(rest)?;
        Ok(((a, b, c), rest))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reverse_sorts_descending() {
        let a = Address::from([1; 20]);
        let b = Address::from([2; 20]);
        assert!((Reverse(100u64), b).key_bytes() < (Reverse(10u64), a).key_bytes());
        assert!((Reverse(10u64), a).key_bytes() < (Reverse(10u64), b).key_bytes());
    }

    #[test]
    fn integers_sort_numerically() {
        assert!(255u64.key_bytes() < 256u64.key_bytes());
    }

    #[test]
    fn read_composite() -> Result<()> {
        let key = (Address::from([3; 20]), Reverse(7u64), "stake".to_string());
        let bytes = key.key_bytes();
        let (read, rest) = <(Address, Reverse<u64>, String)>::read_key(&bytes)?;
        assert_eq!(read, key);
        assert!(rest.is_empty());

        <(Address, Address)>::read_key(&bytes[..30]).expect_err("Should reject short key");
        Ok(())
    }
}
