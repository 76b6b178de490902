//! Event log entries.
//!
//! `EventKind` is a closed set of contract-emitted event kinds, plus the
//! `Custom+N` extension point (kind bytes `200..=255`). Authorization (which
//! contract may emit which kind) is a `tx-runtime` concern — see
//! `tx_runtime::runtime::authorized_contract` — because it depends on the
//! current execution context, not on the event type alone.

use crate::address::{Address, ADDRESS_SIZE};
use crate::error::{Error, Result};
use crate::wire::{read_u8, read_varbytes, read_varstring, write_varbytes, write_varstring};

const CUSTOM_RANGE_START: u8 = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum EventKind {
    ChainCreate,
    BlockCreate,
    BlockClose,
    TokenCreate,
    TokenSend,
    TokenReceive,
    TokenMint,
    TokenBurn,
    TokenStake,
    TokenUnstake,
    TokenClaim,
    RoleChange,
    AddressChange,
    GasEscrow,
    GasPayment,
    GasLoan,
    OrderCreated,
    OrderFilled,
    OrderCancelled,
    FeedCreate,
    FileCreate,
    FileDelete,
    ValidatorPropose,
    ValidatorElect,
    ValidatorRemove,
    ValidatorSwitch,
    BrokerRequest,
    ValueCreate,
    ValueUpdate,
    PollCreated,
    PollClosed,
    PollVote,
    Channel,
    Leaderboard,
    Metadata,
    /// Carries a non-fungible token's packed payload; paired by the Oracle
    /// with a matching `TokenSend` when synthesizing an `InteropTransfer`
    /// for NFTs.
    PackedNft,
    /// `Custom+N`: product-defined event kinds outside the fixed set, stored
    /// as the raw wire byte (always in `200..=255`).
    Custom(u8),
}

impl EventKind {
    pub fn to_byte(self) -> u8 {
        match self {
            EventKind::ChainCreate => 0,
            EventKind::BlockCreate => 1,
            EventKind::BlockClose => 2,
            EventKind::TokenCreate => 3,
            EventKind::TokenSend => 4,
            EventKind::TokenReceive => 5,
            EventKind::TokenMint => 6,
            EventKind::TokenBurn => 7,
            EventKind::TokenStake => 8,
            EventKind::TokenUnstake => 9,
            EventKind::TokenClaim => 10,
            EventKind::RoleChange => 11,
            EventKind::AddressChange => 12,
            EventKind::GasEscrow => 13,
            EventKind::GasPayment => 14,
            EventKind::GasLoan => 15,
            EventKind::OrderCreated => 16,
            EventKind::OrderFilled => 17,
            EventKind::OrderCancelled => 18,
            EventKind::FeedCreate => 19,
            EventKind::FileCreate => 20,
            EventKind::FileDelete => 21,
            EventKind::ValidatorPropose => 22,
            EventKind::ValidatorElect => 23,
            EventKind::ValidatorRemove => 24,
            EventKind::ValidatorSwitch => 25,
            EventKind::BrokerRequest => 26,
            EventKind::ValueCreate => 27,
            EventKind::ValueUpdate => 28,
            EventKind::PollCreated => 29,
            EventKind::PollClosed => 30,
            EventKind::PollVote => 31,
            EventKind::Channel => 32,
            EventKind::Leaderboard => 33,
            EventKind::Metadata => 34,
            EventKind::PackedNft => 35,
            EventKind::Custom(n) => n,
        }
    }

    pub fn from_byte(b: u8) -> Result<Self> {
        Ok(match b {
            0 => EventKind::ChainCreate,
            1 => EventKind::BlockCreate,
            2 => EventKind::BlockClose,
            3 => EventKind::TokenCreate,
            4 => EventKind::TokenSend,
            5 => EventKind::TokenReceive,
            6 => EventKind::TokenMint,
            7 => EventKind::TokenBurn,
            8 => EventKind::TokenStake,
            9 => EventKind::TokenUnstake,
            10 => EventKind::TokenClaim,
            11 => EventKind::RoleChange,
            12 => EventKind::AddressChange,
            13 => EventKind::GasEscrow,
            14 => EventKind::GasPayment,
            15 => EventKind::GasLoan,
            16 => EventKind::OrderCreated,
            17 => EventKind::OrderFilled,
            18 => EventKind::OrderCancelled,
            19 => EventKind::FeedCreate,
            20 => EventKind::FileCreate,
            21 => EventKind::FileDelete,
            22 => EventKind::ValidatorPropose,
            23 => EventKind::ValidatorElect,
            24 => EventKind::ValidatorRemove,
            25 => EventKind::ValidatorSwitch,
            26 => EventKind::BrokerRequest,
            27 => EventKind::ValueCreate,
            28 => EventKind::ValueUpdate,
            29 => EventKind::PollCreated,
            30 => EventKind::PollClosed,
            31 => EventKind::PollVote,
            32 => EventKind::Channel,
            33 => EventKind::Leaderboard,
            34 => EventKind::Metadata,
            35 => EventKind::PackedNft,
            n if n >= CUSTOM_RANGE_START => EventKind::Custom(n),
            other => return Err(Error::UnknownEventKind(other)),
        })
    }
}

/// `{kind, address, contract, data}`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Event {
    pub kind: EventKind,
    pub address: Address,
    pub contract: String,
    pub data: Vec<u8>,
}

impl Event {
    pub fn new(kind: EventKind, address: Address, contract: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            kind,
            address,
            contract: contract.into(),
            data,
        }
    }

    /// `kind(u8) | address(34) | varstring(contract) | varbytes(data)`.
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(1 + ADDRESS_SIZE + self.contract.len() + self.data.len() + 8);
        out.push(self.kind.to_byte());
        out.extend_from_slice(&self.address.to_bytes());
        write_varstring(&mut out, &self.contract);
        write_varbytes(&mut out, &self.data);
        out
    }

    pub fn deserialize(buf: &[u8]) -> Result<Self> {
        let mut cursor = 0usize;
        let kind = EventKind::from_byte(read_u8(buf, &mut cursor)?)?;
        if buf.len() < cursor + ADDRESS_SIZE {
            return Err(Error::Truncated("event address"));
        }
        let address = Address::from_bytes(&buf[cursor..cursor + ADDRESS_SIZE])?;
        cursor += ADDRESS_SIZE;
        let contract = read_varstring(buf, &mut cursor)?;
        let data = read_varbytes(buf, &mut cursor)?.to_vec();
        Ok(Self::new(kind, address, contract, data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialize_deserialize_is_a_bijection() {
        let event = Event::new(
            EventKind::GasEscrow,
            Address::null(),
            "gas",
            vec![1, 2, 3, 4],
        );
        let bytes = event.serialize();
        let decoded = Event::deserialize(&bytes).unwrap();
        assert_eq!(decoded, event);
    }

    #[test]
    fn custom_kind_roundtrips() {
        let kind = EventKind::from_byte(210).unwrap();
        assert_eq!(kind, EventKind::Custom(210));
        assert_eq!(kind.to_byte(), 210);
    }

    #[test]
    fn rejects_unknown_kind_below_custom_range() {
        assert!(EventKind::from_byte(199).is_err());
    }
}
