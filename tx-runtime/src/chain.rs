//! Host-provided collaborators the core consumes.
//!
//! These traits are the Rust shape of the external collaborators this core
//! deliberately does not implement itself — block production, P2P,
//! persistence, wallets, external-chain watchers — the node embeds this core
//! by implementing them against its own storage/network stack.

use num_bigint::BigInt;
use tx_core::{Address, Event};
use tx_vm::Script;

pub type Hash = [u8; 32];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub hash: Hash,
    pub height: u64,
    pub tx_hashes: Vec<Hash>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredTransaction {
    pub hash: Hash,
}

/// Read access to committed chain state: blocks, transactions, and the
/// events a past transaction emitted.
pub trait ChainStore: Send + Sync {
    fn get_block_by_hash(&self, hash: &Hash) -> Option<Block>;
    fn get_block_by_height(&self, height: u64) -> Option<Block>;
    fn get_transaction_by_hash(&self, hash: &Hash) -> Option<StoredTransaction>;
    fn get_block_hash_of_transaction(&self, hash: &Hash) -> Option<Hash>;
    fn get_events_for_transaction(&self, hash: &Hash) -> Vec<Event>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenInfo {
    pub symbol: String,
    pub decimals: u32,
    pub is_fungible: bool,
    /// The network's native gas/fuel token: `GetTokenPrice` returns
    /// `StakingPrice / 5` for it.
    pub is_fuel: bool,
    /// A fiat-pegged token: `GetTokenPrice` returns `10^FiatDecimals` for it.
    pub is_fiat: bool,
}

/// The registry of chains, tokens, platforms, and governance values.
pub trait Nexus: Send + Sync {
    fn token_exists(&self, symbol: &str) -> bool;
    fn get_token_info(&self, symbol: &str) -> Option<TokenInfo>;
    fn platform_exists(&self, platform: &str) -> bool;
    fn get_governance_value(&self, name: &str) -> Option<BigInt>;
    fn has_script(&self, address: &Address) -> bool;
    fn look_up_address_script(&self, address: &Address) -> Option<Script>;
    fn transfer_tokens(
        &mut self,
        symbol: &str,
        source: &Address,
        destination: &Address,
        amount: &BigInt,
    ) -> bool;
    fn has_genesis(&self) -> bool;
}

/// Withdraws tokens bridged in from an external platform.
pub trait InteropResolver: Send + Sync {
    fn withdraw_tokens(
        &mut self,
        source: &str,
        destination: &Address,
        symbol: &str,
        amount: &BigInt,
    );
}
