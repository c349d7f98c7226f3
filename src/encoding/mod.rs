//! Value encoding for records persisted in the store.
//!
//! Values are encoded with borsh. Keys use the order-preserving encoding of
//! [crate::collections::Key] instead.
use crate::{Error, Result};
use borsh::{BorshDeserialize, BorshSerialize};

pub trait Encode {
    fn encode(&self) -> Result<Vec<u8>>;
}

pub trait Decode: Sized {
    fn decode(bytes: &[u8]) -> Result<Self>;
}

impl<T: BorshSerialize> Encode for T {
    fn encode(&self) -> Result<Vec<u8>> {
        borsh::to_vec(self).map_err(|e| Error::Encoding(e.to_string()))
    }
}

impl<T: BorshDeserialize> Decode for T {
    fn decode(bytes: &[u8]) -> Result<Self> {
        T::try_from_slice(bytes).map_err(|e| Error::Encoding(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(BorshSerialize, BorshDeserialize, Debug, PartialEq)]
    struct Foo {
        a: u64,
        b: Vec<u8>,
        c: bool,
    }

    #[test]
    fn encode_decode() -> Result<()> {
        let foo = Foo {
            a: 5,
            b: vec![1, 2],
            c: true,
        };
        let bytes = foo.encode()?;
        assert_eq!(Foo::decode(bytes.as_slice())?, foo);
        Ok(())
    }

    #[test]
    fn decode_trailing_bytes() {
        let mut bytes = 5u64.encode().unwrap();
        bytes.push(0);
        u64::decode(bytes.as_slice()).expect_err("Should reject trailing bytes");
    }
}
