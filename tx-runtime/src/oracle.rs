//! Oracle Reader: a deterministic cache of external reads keyed by URL,
//! `RwLock`-guarded so concurrent read-only views can share it safely.

use crate::chain::{Block, ChainStore, Hash};
use crate::error::{OracleError, Result};
use num_bigint::BigInt;
use parking_lot::RwLock;
use std::collections::HashSet;
use std::sync::Arc;
use tx_core::decimal::Decimal;
use tx_core::event::EventKind;
use tx_core::{Address, StructFields, Value};

/// A price quote as reported by the host, in its own native decimals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceQuote {
    pub mantissa: BigInt,
    pub decimals: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InteropTransfer {
    pub from: Address,
    pub to: Address,
    pub symbol: String,
    pub value: BigInt,
    pub raw_data: Option<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InteropTransaction {
    pub hash: Hash,
    pub transfers: Vec<InteropTransfer>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InteropBlock {
    pub platform: String,
    pub chain: String,
    pub hash: Hash,
    pub tx_hashes: Vec<Hash>,
}

/// Host hooks for everything the local node cannot answer itself.
pub trait OracleHost: Send + Sync {
    fn pull_data(&self, time: u64, url: &str) -> std::result::Result<Vec<u8>, OracleError>;
    fn pull_price(&self, time: u64, symbol: &str) -> std::result::Result<PriceQuote, OracleError>;
    fn pull_platform_block(
        &self,
        platform: &str,
        chain: &str,
        hash: &str,
    ) -> std::result::Result<InteropBlock, OracleError>;
    fn pull_platform_transaction(
        &self,
        platform: &str,
        chain: &str,
        hash: &str,
    ) -> std::result::Result<InteropTransaction, OracleError>;
}

/// The local platform name: `interop://` URLs targeting it are served
/// directly from `ChainStore`/the event log rather than delegated to
/// `OracleHost`.
pub const LOCAL_PLATFORM: &str = "main";

pub struct OracleReader {
    cache: RwLock<std::collections::HashMap<String, Vec<u8>>>,
    chain: Arc<dyn ChainStore>,
    host: Arc<dyn OracleHost>,
    registered_platforms: HashSet<String>,
    fiat_decimals: u32,
}

impl OracleReader {
    pub fn new(
        chain: Arc<dyn ChainStore>,
        host: Arc<dyn OracleHost>,
        registered_platforms: HashSet<String>,
        fiat_decimals: u32,
    ) -> Self {
        Self {
            cache: RwLock::new(std::collections::HashMap::new()),
            chain,
            host,
            registered_platforms,
            fiat_decimals,
        }
    }

    pub fn read(&self, time: u64, url: &str) -> Result<Vec<u8>> {
        if let Some(content) = self.cache.read().get(url) {
            return Ok(content.clone());
        }
        tracing::debug!(url, "oracle cache miss");
        let bytes = self.resolve(time, url)?;
        // First writer wins within a process run.
        let mut cache = self.cache.write();
        let bytes = cache.entry(url.to_string()).or_insert(bytes).clone();
        Ok(bytes)
    }

    /// Wipes all cached entries; callers invoke it between blocks.
    pub fn clear(&self) {
        self.cache.write().clear();
    }

    fn resolve(&self, time: u64, url: &str) -> Result<Vec<u8>> {
        if let Some(symbol) = url.strip_prefix("price://") {
            return self.resolve_price(time, symbol);
        }
        if let Some(rest) = url.strip_prefix("interop://") {
            return self.resolve_interop(rest);
        }
        self.host
            .pull_data(time, url)
            .map_err(Into::into)
    }

    fn resolve_price(&self, time: u64, symbol: &str) -> Result<Vec<u8>> {
        if symbol.contains('/') || symbol.is_empty() {
            return Err(OracleError::MalformedUrl(format!("price://{symbol}")).into());
        }
        let quote = self
            .host
            .pull_price(time, symbol)
            .map_err(|_| OracleError::MissingPrice(symbol.to_string()))?;
        let decimal = Decimal::new(quote.mantissa, quote.decimals);
        let value = decimal.to_big_integer(self.fiat_decimals);
        Ok(tx_core::Value::int_to_bytes(&value))
    }

    fn resolve_interop(&self, rest: &str) -> Result<Vec<u8>> {
        let parts: Vec<&str> = rest.splitn(4, '/').collect();
        let [platform, chain, cmd, arg] = parts[..] else {
            return Err(OracleError::MalformedUrl(format!("interop://{rest}")).into());
        };
        if !self.registered_platforms.contains(platform) {
            return Err(OracleError::UnknownPlatform(platform.to_string()).into());
        }

        if platform != LOCAL_PLATFORM {
            return match cmd {
                "tx" | "transaction" => {
                    let tx = self
                        .host
                        .pull_platform_transaction(platform, chain, arg)
                        .map_err(Into::<crate::error::Error>::into)?;
                    Ok(encode_interop_transaction(&tx))
                }
                "block" => {
                    let block = self
                        .host
                        .pull_platform_block(platform, chain, arg)
                        .map_err(Into::<crate::error::Error>::into)?;
                    Ok(encode_interop_block(&block))
                }
                other => Err(OracleError::MalformedUrl(format!("unknown cmd {other:?}")).into()),
            };
        }

        match cmd {
            "tx" | "transaction" => {
                let hash = parse_hash(arg)?;
                let block_hash = self
                    .chain
                    .get_block_hash_of_transaction(&hash)
                    .ok_or_else(|| OracleError::UnresolvedInteropTransaction(arg.to_string()))?;
                let block = self
                    .chain
                    .get_block_by_hash(&block_hash)
                    .ok_or_else(|| OracleError::UnresolvedInteropTransaction(arg.to_string()))?;
                let transfers = synthesize_transfers(&self.chain, &block)?;
                Ok(encode_interop_transaction(&InteropTransaction { hash, transfers }))
            }
            "block" => {
                let hash = resolve_block_hash(&self.chain, arg)?;
                let block = self
                    .chain
                    .get_block_by_hash(&hash)
                    .ok_or_else(|| OracleError::UnresolvedInteropTransaction(arg.to_string()))?;
                Ok(encode_interop_block(&InteropBlock {
                    platform: platform.to_string(),
                    chain: chain.to_string(),
                    hash: block.hash,
                    tx_hashes: block.tx_hashes,
                }))
            }
            other => Err(OracleError::MalformedUrl(format!("unknown cmd {other:?}")).into()),
        }
    }
}

/// Resolves a `block <hash-or-height>` argument directly, never through an
/// uninitialized intermediate value.
fn resolve_block_hash(chain: &Arc<dyn ChainStore>, arg: &str) -> Result<Hash> {
    if let Ok(hash) = parse_hash(arg) {
        if chain.get_block_by_hash(&hash).is_some() {
            return Ok(hash);
        }
    }
    if let Ok(height) = arg.parse::<u64>() {
        if let Some(block) = chain.get_block_by_height(height) {
            return Ok(block.hash);
        }
    }
    Err(OracleError::UnresolvedInteropTransaction(arg.to_string()).into())
}

fn parse_hash(arg: &str) -> Result<Hash> {
    let bytes = hex::decode(arg).map_err(|_| OracleError::MalformedUrl(arg.to_string()))?;
    if bytes.len() != 32 {
        return Err(OracleError::MalformedUrl(arg.to_string()).into());
    }
    let mut hash = [0u8; 32];
    hash.copy_from_slice(&bytes);
    Ok(hash)
}

/// Token event `data` wire convention used between the natives that emit
/// `TokenSend`/`TokenReceive`/`TokenStake`/`PackedNft` and the Oracle that
/// consumes them here: a canonical `Value::Struct` with `symbol`, `value`,
/// and (for NFTs) `payload` fields.
fn decode_token_event_data(data: &[u8]) -> Option<(String, BigInt)> {
    let value = Value::from_canonical_bytes(data).ok()?;
    let fields = value.as_struct().ok()?;
    let symbol = fields.get("symbol")?.as_str().ok()?.to_string();
    let amount = fields.get("value")?.as_int().ok()?.clone();
    Some((symbol, amount))
}

fn decode_nft_payload(data: &[u8]) -> Option<(String, Vec<u8>)> {
    let value = Value::from_canonical_bytes(data).ok()?;
    let fields = value.as_struct().ok()?;
    let symbol = fields.get("symbol")?.as_str().ok()?.to_string();
    let payload = fields.get("payload")?.as_bytes().ok()?.to_vec();
    Some((symbol, payload))
}

/// Pairs each `TokenSend` with a matching `TokenReceive` (or `TokenStake`) on
/// the same `{symbol, value}`; for non-fungible tokens also requires a
/// `PackedNft` event matching `symbol` and attaches its payload.
fn synthesize_transfers(chain: &Arc<dyn ChainStore>, block: &Block) -> Result<Vec<InteropTransfer>> {
    let mut transfers = Vec::new();
    for tx_hash in &block.tx_hashes {
        let events = chain.get_events_for_transaction(tx_hash);
        let sends: Vec<_> = events
            .iter()
            .filter(|e| e.kind == EventKind::TokenSend)
            .collect();
        for send in sends {
            let (symbol, value) = decode_token_event_data(&send.data).ok_or_else(|| {
                OracleError::MalformedUrl(format!("malformed TokenSend data in {:?}", hex::encode(tx_hash)))
            })?;
            let receive = events.iter().find(|e| {
                matches!(e.kind, EventKind::TokenReceive | EventKind::TokenStake)
                    && decode_token_event_data(&e.data)
                        .map(|(s, v)| s == symbol && v == value)
                        .unwrap_or(false)
            });
            let receive = receive.ok_or_else(|| {
                OracleError::UnresolvedInteropTransaction(format!(
                    "no matching receive for TokenSend({symbol},{value})"
                ))
            })?;

            let nft = events.iter().find_map(|e| {
                if e.kind != EventKind::PackedNft {
                    return None;
                }
                decode_nft_payload(&e.data).and_then(|(sym, payload)| {
                    (sym == symbol).then_some(payload)
                })
            });

            transfers.push(InteropTransfer {
                from: send.address,
                to: receive.address,
                symbol,
                value,
                raw_data: nft,
            });
        }
    }
    Ok(transfers)
}

fn encode_interop_transaction(tx: &InteropTransaction) -> Vec<u8> {
    let mut fields = StructFields::new();
    fields.insert("hash".to_string(), Value::Bytes(tx.hash.to_vec()));
    let transfers: Vec<Value> = tx
        .transfers
        .iter()
        .map(|t| {
            let mut f = StructFields::new();
            f.insert("from".to_string(), Value::Address(t.from));
            f.insert("to".to_string(), Value::Address(t.to));
            f.insert("symbol".to_string(), Value::Str(t.symbol.clone()));
            f.insert("value".to_string(), Value::Int(t.value.clone()));
            f.insert(
                "data".to_string(),
                match &t.raw_data {
                    Some(d) => Value::Bytes(d.clone()),
                    None => Value::Bytes(Vec::new()),
                },
            );
            Value::Struct(f)
        })
        .collect();
    // Encode the transfer list as a struct with numeric keys: this core has
    // no separate `Value::Array` variant, so a struct stands in as the only
    // ordered/keyed aggregate.
    let mut list_fields = StructFields::new();
    for (i, t) in transfers.into_iter().enumerate() {
        list_fields.insert(i.to_string(), t);
    }
    fields.insert("transfers".to_string(), Value::Struct(list_fields));
    Value::Struct(fields).to_canonical_bytes()
}

fn encode_interop_block(block: &InteropBlock) -> Vec<u8> {
    let mut fields = StructFields::new();
    fields.insert("platform".to_string(), Value::Str(block.platform.clone()));
    fields.insert("chain".to_string(), Value::Str(block.chain.clone()));
    fields.insert("hash".to_string(), Value::Bytes(block.hash.to_vec()));
    let mut tx_fields = StructFields::new();
    for (i, h) in block.tx_hashes.iter().enumerate() {
        tx_fields.insert(i.to_string(), Value::Bytes(h.to_vec()));
    }
    fields.insert("tx_hashes".to_string(), Value::Struct(tx_fields));
    Value::Struct(fields).to_canonical_bytes()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::StoredTransaction;
    use std::collections::HashMap as StdHashMap;
    use std::sync::Mutex;
    use tx_core::Event;

    struct FakeChain {
        blocks_by_hash: StdHashMap<Hash, Block>,
        block_of_tx: StdHashMap<Hash, Hash>,
        events: StdHashMap<Hash, Vec<Event>>,
    }

    impl ChainStore for FakeChain {
        fn get_block_by_hash(&self, hash: &Hash) -> Option<Block> {
            self.blocks_by_hash.get(hash).cloned()
        }
        fn get_block_by_height(&self, _height: u64) -> Option<Block> {
            None
        }
        fn get_transaction_by_hash(&self, hash: &Hash) -> Option<StoredTransaction> {
            self.block_of_tx.get(hash).map(|_| StoredTransaction { hash: *hash })
        }
        fn get_block_hash_of_transaction(&self, hash: &Hash) -> Option<Hash> {
            self.block_of_tx.get(hash).copied()
        }
        fn get_events_for_transaction(&self, hash: &Hash) -> Vec<Event> {
            self.events.get(hash).cloned().unwrap_or_default()
        }
    }

    struct CountingHost {
        price_calls: Mutex<u32>,
    }

    impl OracleHost for CountingHost {
        fn pull_data(&self, _time: u64, _url: &str) -> std::result::Result<Vec<u8>, OracleError> {
            Ok(vec![1, 2, 3])
        }
        fn pull_price(&self, _time: u64, _symbol: &str) -> std::result::Result<PriceQuote, OracleError> {
            *self.price_calls.lock().unwrap() += 1;
            Ok(PriceQuote {
                mantissa: BigInt::from(500),
                decimals: 2,
            })
        }
        fn pull_platform_block(&self, _: &str, _: &str, _: &str) -> std::result::Result<InteropBlock, OracleError> {
            unimplemented!()
        }
        fn pull_platform_transaction(
            &self,
            _: &str,
            _: &str,
            _: &str,
        ) -> std::result::Result<InteropTransaction, OracleError> {
            unimplemented!()
        }
    }

    fn addr(n: u8) -> Address {
        Address::user([n; 33])
    }

    fn token_event_data(symbol: &str, value: i64) -> Vec<u8> {
        let mut fields = StructFields::new();
        fields.insert("symbol".to_string(), Value::Str(symbol.to_string()));
        fields.insert("value".to_string(), Value::Int(BigInt::from(value)));
        Value::Struct(fields).to_canonical_bytes()
    }

    #[test]
    fn price_reads_are_cached_after_first_host_call() {
        let chain: Arc<dyn ChainStore> = Arc::new(FakeChain {
            blocks_by_hash: StdHashMap::new(),
            block_of_tx: StdHashMap::new(),
            events: StdHashMap::new(),
        });
        let host = Arc::new(CountingHost {
            price_calls: Mutex::new(0),
        });
        let reader = OracleReader::new(chain, host.clone(), HashSet::new(), 8);

        let first = reader.read(0, "price://SOUL").unwrap();
        let second = reader.read(0, "price://SOUL").unwrap();
        assert_eq!(first, second);
        assert_eq!(*host.price_calls.lock().unwrap(), 1);
    }

    #[test]
    fn interop_tx_synthesizes_transfer_from_paired_events() {
        let tx_hash = [7u8; 32];
        let block_hash = [9u8; 32];
        let mut events = StdHashMap::new();
        events.insert(
            tx_hash,
            vec![
                Event::new(EventKind::TokenSend, addr(1), "gas", token_event_data("SOUL", 10)),
                Event::new(EventKind::TokenReceive, addr(2), "gas", token_event_data("SOUL", 10)),
            ],
        );
        let mut block_of_tx = StdHashMap::new();
        block_of_tx.insert(tx_hash, block_hash);
        let mut blocks_by_hash = StdHashMap::new();
        blocks_by_hash.insert(
            block_hash,
            Block {
                hash: block_hash,
                height: 1,
                tx_hashes: vec![tx_hash],
            },
        );
        let chain: Arc<dyn ChainStore> = Arc::new(FakeChain {
            blocks_by_hash,
            block_of_tx,
            events,
        });
        let host = Arc::new(CountingHost {
            price_calls: Mutex::new(0),
        });
        let mut platforms = HashSet::new();
        platforms.insert(LOCAL_PLATFORM.to_string());
        let reader = OracleReader::new(chain, host, platforms, 8);

        let url = format!("interop://{LOCAL_PLATFORM}/root/tx/{}", hex::encode(tx_hash));
        let bytes = reader.read(0, &url).unwrap();
        let decoded = Value::from_canonical_bytes(&bytes).unwrap();
        let fields = decoded.as_struct().unwrap();
        let transfers = fields.get("transfers").unwrap().as_struct().unwrap();
        assert_eq!(transfers.len(), 1);
    }

    #[test]
    fn interop_tx_without_matching_receive_faults() {
        let tx_hash = [7u8; 32];
        let block_hash = [9u8; 32];
        let mut events = StdHashMap::new();
        events.insert(
            tx_hash,
            vec![Event::new(
                EventKind::TokenSend,
                addr(1),
                "gas",
                token_event_data("SOUL", 10),
            )],
        );
        let mut block_of_tx = StdHashMap::new();
        block_of_tx.insert(tx_hash, block_hash);
        let mut blocks_by_hash = StdHashMap::new();
        blocks_by_hash.insert(
            block_hash,
            Block {
                hash: block_hash,
                height: 1,
                tx_hashes: vec![tx_hash],
            },
        );
        let chain: Arc<dyn ChainStore> = Arc::new(FakeChain {
            blocks_by_hash,
            block_of_tx,
            events,
        });
        let host = Arc::new(CountingHost {
            price_calls: Mutex::new(0),
        });
        let mut platforms = HashSet::new();
        platforms.insert(LOCAL_PLATFORM.to_string());
        let reader = OracleReader::new(chain, host, platforms, 8);

        let url = format!("interop://{LOCAL_PLATFORM}/root/tx/{}", hex::encode(tx_hash));
        assert!(reader.read(0, &url).is_err());
    }
}
