use crate::{Error, Result};
use bech32::{FromBase32, ToBase32, Variant};
use borsh::{BorshDeserialize, BorshSerialize};
use ripemd::{Digest as _, Ripemd160};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::str::FromStr;

/// Human-readable prefix used when displaying addresses.
pub const ADDRESS_PREFIX: &str = "stake";

/// A 20-byte account or validator operator address.
#[derive(
    BorshSerialize,
    BorshDeserialize,
    Serialize,
    Deserialize,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
)]
pub struct Address([u8; Address::LENGTH]);

impl Address {
    pub const LENGTH: usize = 20;
    pub const NULL: Self = Address([0; Self::LENGTH]);

    /// Derives an address from a compressed secp256k1 public key.
    pub fn from_pubkey(bytes: [u8; 33]) -> Self {
        let sha = Sha256::digest(bytes);
        let hash = Ripemd160::digest(sha);
        let mut address = [0; Self::LENGTH];
        address.copy_from_slice(hash.as_slice());
        Address(address)
    }

    pub fn bytes(&self) -> [u8; Self::LENGTH] {
        self.0
    }
}

impl From<[u8; Address::LENGTH]> for Address {
    fn from(bytes: [u8; Address::LENGTH]) -> Self {
        Address(bytes)
    }
}

impl TryFrom<&[u8]> for Address {
    type Error = Error;

    fn try_from(bytes: &[u8]) -> Result<Self> {
        let bytes: [u8; Address::LENGTH] = bytes
            .try_into()
            .map_err(|_| Error::Encoding("Invalid address length".into()))?;
        Ok(Address(bytes))
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let encoded = bech32::encode(ADDRESS_PREFIX, self.0.to_base32(), Variant::Bech32)
            .map_err(|_| std::fmt::Error)?;
        write!(f, "{}", encoded)
    }
}

impl std::fmt::Debug for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(self, f)
    }
}

impl FromStr for Address {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let (hrp, data, variant) =
            bech32::decode(s).map_err(|e| Error::Encoding(e.to_string()))?;
        if hrp != ADDRESS_PREFIX {
            return Err(Error::Encoding(format!("Invalid address prefix: {}", hrp)));
        }
        if variant != Variant::Bech32 {
            return Err(Error::Encoding("Invalid address variant".into()));
        }
        let bytes = Vec::<u8>::from_base32(&data).map_err(|e| Error::Encoding(e.to_string()))?;
        Address::try_from(bytes.as_slice())
    }
}

/// A validator's 32-byte ed25519 consensus public key.
#[derive(
    BorshSerialize,
    BorshDeserialize,
    Serialize,
    Deserialize,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
)]
pub struct ConsensusKey(pub [u8; 32]);

impl ConsensusKey {
    /// The consensus address, i.e. the first 20 bytes of the SHA-256 hash of
    /// the key.
    pub fn address(&self) -> [u8; 20] {
        let hash = Sha256::digest(self.0);
        let mut address = [0; 20];
        address.copy_from_slice(&hash[..20]);
        address
    }
}

impl std::fmt::Debug for ConsensusKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ConsensusKey({})", hex::encode(self.0))
    }
}
