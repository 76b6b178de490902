//! 34-byte addresses: one discriminant byte followed by a 33-byte payload.
//!
//! A single fixed-width, `Copy`-able identity type with explicit kind
//! predicates, rather than separate types per kind.

use crate::error::{Error, Result};
use sha2::{Digest, Sha256};
use std::fmt;

pub const ADDRESS_SIZE: usize = 34;
const PAYLOAD_SIZE: usize = ADDRESS_SIZE - 1;

/// The discriminant stored in an address's first byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, serde::Serialize, serde::Deserialize)]
#[repr(u8)]
pub enum AddressKind {
    /// The null/invalid address: zero payload, no identity.
    Null = 0,
    /// A public-key-derived user identity.
    User = 1,
    /// A contract-derived identity, produced by hashing a contract name.
    System = 2,
    /// A foreign-chain identity.
    Interop = 3,
}

impl AddressKind {
    fn from_byte(b: u8) -> Result<Self> {
        match b {
            0 => Ok(Self::Null),
            1 => Ok(Self::User),
            2 => Ok(Self::System),
            3 => Ok(Self::Interop),
            other => Err(Error::UnknownAddressKind(other)),
        }
    }
}

/// A 34-byte identity: `User` (public-key-derived), `System` (contract-derived,
/// hashed from a contract name), or `Interop` (foreign-chain identity).
#[derive(Clone, Copy, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Address {
    kind: AddressKind,
    payload: [u8; PAYLOAD_SIZE],
}

impl Address {
    pub fn new(kind: AddressKind, payload: [u8; PAYLOAD_SIZE]) -> Self {
        Self { kind, payload }
    }

    /// The null address: predicate `IsNull` is true, all others false.
    pub fn null() -> Self {
        Self {
            kind: AddressKind::Null,
            payload: [0u8; PAYLOAD_SIZE],
        }
    }

    pub fn user(payload: [u8; PAYLOAD_SIZE]) -> Self {
        Self::new(AddressKind::User, payload)
    }

    pub fn interop(payload: [u8; PAYLOAD_SIZE]) -> Self {
        Self::new(AddressKind::Interop, payload)
    }

    /// The hash-derived address of a named contract/context (used both for
    /// `CTX` context switches and for `IsWitness` on System addresses).
    pub fn from_contract_name(name: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(name.as_bytes());
        let digest = hasher.finalize();
        let mut payload = [0u8; PAYLOAD_SIZE];
        payload.copy_from_slice(&digest[..PAYLOAD_SIZE.min(digest.len())]);
        Self::new(AddressKind::System, payload)
    }

    pub fn kind(&self) -> AddressKind {
        self.kind
    }

    pub fn payload(&self) -> &[u8; PAYLOAD_SIZE] {
        &self.payload
    }

    pub fn is_null(&self) -> bool {
        matches!(self.kind, AddressKind::Null)
    }

    pub fn is_user(&self) -> bool {
        matches!(self.kind, AddressKind::User)
    }

    pub fn is_system(&self) -> bool {
        matches!(self.kind, AddressKind::System)
    }

    pub fn is_interop(&self) -> bool {
        matches!(self.kind, AddressKind::Interop)
    }

    pub fn to_bytes(&self) -> [u8; ADDRESS_SIZE] {
        let mut out = [0u8; ADDRESS_SIZE];
        out[0] = self.kind as u8;
        out[1..].copy_from_slice(&self.payload);
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != ADDRESS_SIZE {
            return Err(Error::MalformedAddress(bytes.len()));
        }
        let kind = AddressKind::from_byte(bytes[0])?;
        let mut payload = [0u8; PAYLOAD_SIZE];
        payload.copy_from_slice(&bytes[1..]);
        Ok(Self { kind, payload })
    }
}

impl PartialEq for Address {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.payload == other.payload
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({})", self.kind, hex::encode(self.payload))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.to_bytes()))
    }
}
