//! End-to-end scenarios exercised against the public `Runtime` surface
//! directly, the way a caller assembles operand stacks and drives native
//! contract dispatch, rather than assembling raw bytecode.

use num_bigint::BigInt;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use tx_core::{Address, Event, EventKind, Value};
use tx_runtime::oracle::{InteropBlock, InteropTransaction, OracleHost, PriceQuote, LOCAL_PLATFORM};
use tx_runtime::{Block, ChainStore, Hash, Nexus, OracleError, OracleReader, StoredTransaction, TokenInfo};
use tx_runtime::{InteropResolver, Runtime};
use tx_vm::{GasMeter, Host, OperandStack, Script};

struct EmptyChain;
impl ChainStore for EmptyChain {
    fn get_block_by_hash(&self, _hash: &Hash) -> Option<Block> {
        None
    }
    fn get_block_by_height(&self, _height: u64) -> Option<Block> {
        None
    }
    fn get_transaction_by_hash(&self, _hash: &Hash) -> Option<StoredTransaction> {
        None
    }
    fn get_block_hash_of_transaction(&self, _hash: &Hash) -> Option<Hash> {
        None
    }
    fn get_events_for_transaction(&self, _hash: &Hash) -> Vec<Event> {
        Vec::new()
    }
}

struct EmptyNexus;
impl Nexus for EmptyNexus {
    fn token_exists(&self, _symbol: &str) -> bool {
        false
    }
    fn get_token_info(&self, _symbol: &str) -> Option<TokenInfo> {
        None
    }
    fn platform_exists(&self, _platform: &str) -> bool {
        false
    }
    fn get_governance_value(&self, _name: &str) -> Option<BigInt> {
        None
    }
    fn has_script(&self, _address: &Address) -> bool {
        false
    }
    fn look_up_address_script(&self, _address: &Address) -> Option<Script> {
        None
    }
    fn transfer_tokens(&mut self, _symbol: &str, _source: &Address, _destination: &Address, _amount: &BigInt) -> bool {
        false
    }
    fn has_genesis(&self) -> bool {
        true
    }
}

/// A `Nexus` where one designated address carries an account script that
/// halts with a given boolean, standing in for an on-chain multi-sig/
/// timelock account's verification logic.
struct ScriptedNexus {
    scripted_address: Address,
    verdict: bool,
}

impl Nexus for ScriptedNexus {
    fn token_exists(&self, _symbol: &str) -> bool {
        false
    }
    fn get_token_info(&self, _symbol: &str) -> Option<TokenInfo> {
        None
    }
    fn platform_exists(&self, _platform: &str) -> bool {
        false
    }
    fn get_governance_value(&self, _name: &str) -> Option<BigInt> {
        None
    }
    fn has_script(&self, address: &Address) -> bool {
        *address == self.scripted_address
    }
    fn look_up_address_script(&self, address: &Address) -> Option<Script> {
        if *address != self.scripted_address {
            return None;
        }
        Some(Script::new(vec![
            tx_vm::Instruction::Push(Value::Bool(self.verdict)),
            tx_vm::Instruction::Ret,
        ]))
    }
    fn transfer_tokens(&mut self, _symbol: &str, _source: &Address, _destination: &Address, _amount: &BigInt) -> bool {
        false
    }
    fn has_genesis(&self) -> bool {
        true
    }
}

/// Records every withdrawal it is asked to settle.
struct RecordingInterop {
    withdrawals: Mutex<Vec<(String, Address, String, BigInt)>>,
}

impl InteropResolver for RecordingInterop {
    fn withdraw_tokens(&mut self, source: &str, destination: &Address, symbol: &str, amount: &BigInt) {
        self.withdrawals
            .lock()
            .unwrap()
            .push((source.to_string(), *destination, symbol.to_string(), amount.clone()));
    }
}

struct CountingPriceHost {
    calls: Mutex<u32>,
}

impl OracleHost for CountingPriceHost {
    fn pull_data(&self, _time: u64, _url: &str) -> Result<Vec<u8>, OracleError> {
        Ok(vec![0])
    }
    fn pull_price(&self, _time: u64, _symbol: &str) -> Result<PriceQuote, OracleError> {
        *self.calls.lock().unwrap() += 1;
        Ok(PriceQuote {
            mantissa: BigInt::from(314),
            decimals: 2,
        })
    }
    fn pull_platform_block(&self, _platform: &str, _chain: &str, _hash: &str) -> Result<InteropBlock, OracleError> {
        unimplemented!()
    }
    fn pull_platform_transaction(
        &self,
        _platform: &str,
        _chain: &str,
        _hash: &str,
    ) -> Result<InteropTransaction, OracleError> {
        unimplemented!()
    }
}

struct StubHost;
impl OracleHost for StubHost {
    fn pull_data(&self, _time: u64, _url: &str) -> Result<Vec<u8>, OracleError> {
        Ok(Vec::new())
    }
    fn pull_price(&self, _time: u64, _symbol: &str) -> Result<PriceQuote, OracleError> {
        Err(OracleError::MissingPrice(_symbol.to_string()))
    }
    fn pull_platform_block(&self, _platform: &str, _chain: &str, _hash: &str) -> Result<InteropBlock, OracleError> {
        unimplemented!()
    }
    fn pull_platform_transaction(
        &self,
        _platform: &str,
        _chain: &str,
        _hash: &str,
    ) -> Result<InteropTransaction, OracleError> {
        unimplemented!()
    }
}

struct InteropChain {
    block_hash: Hash,
    tx_hash: Hash,
    events: HashMap<Hash, Vec<Event>>,
}

impl ChainStore for InteropChain {
    fn get_block_by_hash(&self, hash: &Hash) -> Option<Block> {
        (*hash == self.block_hash).then(|| Block {
            hash: self.block_hash,
            height: 1,
            tx_hashes: vec![self.tx_hash],
        })
    }
    fn get_block_by_height(&self, _height: u64) -> Option<Block> {
        None
    }
    fn get_transaction_by_hash(&self, hash: &Hash) -> Option<StoredTransaction> {
        (*hash == self.tx_hash).then(|| StoredTransaction { hash: self.tx_hash })
    }
    fn get_block_hash_of_transaction(&self, hash: &Hash) -> Option<Hash> {
        (*hash == self.tx_hash).then_some(self.block_hash)
    }
    fn get_events_for_transaction(&self, hash: &Hash) -> Vec<Event> {
        self.events.get(hash).cloned().unwrap_or_default()
    }
}

fn user(n: u8) -> Address {
    Address::user([n; 33])
}

fn new_runtime<'a>(
    chain: &'a dyn ChainStore,
    nexus: &'a mut dyn Nexus,
    oracle: &'a OracleReader,
    chain_address: Address,
) -> Runtime<'a> {
    Runtime::new(
        chain,
        nexus,
        oracle,
        None,
        chain_address,
        [0u8; 32],
        [0u8; 32],
        0,
        Vec::new(),
        8,
    )
}

fn stub_oracle_reader(chain: Arc<dyn ChainStore>) -> OracleReader {
    OracleReader::new(chain, Arc::new(StubHost), HashSet::new(), 8)
}

/// Gas escrow/payment round trip.
#[test]
fn gas_escrow_and_payment_round_trip_settles_cleanly() {
    let chain = EmptyChain;
    let mut nexus = EmptyNexus;
    let target = user(1);
    let oracle = stub_oracle_reader(Arc::new(EmptyChain));
    let mut runtime = new_runtime(&chain, &mut nexus, &oracle, Address::null());
    let entry_address = Address::null();
    let mut gas = GasMeter::new(0, 1, true, false);

    let mut escrow_stack = OperandStack::new();
    escrow_stack.push(Value::Int(BigInt::from(1))).unwrap(); // price
    escrow_stack.push(Value::Int(BigInt::from(100))).unwrap(); // amount
    escrow_stack.push(Value::Address(target)).unwrap();
    escrow_stack.push(Value::Str("Escrow".into())).unwrap();
    runtime.invoke_native("gas", &mut escrow_stack, &mut gas, &entry_address).unwrap();

    assert_eq!(gas.max_gas, 100);
    assert_eq!(gas.gas_price, 1);
    assert_eq!(gas.gas_target, Some(target));

    gas.validate_opcode(40).unwrap();

    let mut payment_stack = OperandStack::new();
    payment_stack.push(Value::Int(BigInt::from(40))).unwrap();
    payment_stack.push(Value::Address(target)).unwrap();
    payment_stack.push(Value::Str("Payment".into())).unwrap();
    runtime.invoke_native("gas", &mut payment_stack, &mut gas, &entry_address).unwrap();

    assert_eq!(gas.used_gas, 40);
    assert_eq!(gas.paid_gas, 40);
    assert_eq!(gas.fee_target_address, Some(target));
    assert!(gas.settle_on_halt().is_ok());

    let kinds: Vec<_> = runtime.events().iter().map(|e| e.kind).collect();
    assert_eq!(kinds, vec![EventKind::GasEscrow, EventKind::GasPayment]);
}

/// Unpaid gas faults at halt.
#[test]
fn unpaid_gas_faults_at_halt() {
    let chain = EmptyChain;
    let mut nexus = EmptyNexus;
    let target = user(1);
    let oracle = stub_oracle_reader(Arc::new(EmptyChain));
    let mut runtime = new_runtime(&chain, &mut nexus, &oracle, Address::null());
    let entry_address = Address::null();
    let mut gas = GasMeter::new(0, 1, true, false);

    let mut escrow_stack = OperandStack::new();
    escrow_stack.push(Value::Int(BigInt::from(1))).unwrap();
    escrow_stack.push(Value::Int(BigInt::from(100))).unwrap();
    escrow_stack.push(Value::Address(target)).unwrap();
    escrow_stack.push(Value::Str("Escrow".into())).unwrap();
    runtime.invoke_native("gas", &mut escrow_stack, &mut gas, &entry_address).unwrap();

    gas.validate_opcode(40).unwrap();

    assert!(gas.settle_on_halt().is_err());
}

/// Block-op mode restricts `CTX` to the token contract.
#[test]
fn block_op_mode_restricts_contexts_to_token() {
    let chain = EmptyChain;
    let mut nexus = EmptyNexus;
    let oracle = stub_oracle_reader(Arc::new(EmptyChain));
    let mut runtime = new_runtime(&chain, &mut nexus, &oracle, Address::null());
    let entry_address = Address::null();
    let mut gas = GasMeter::new(1_000, 1, true, false);

    let mut create_stack = OperandStack::new();
    create_stack.push(Value::Address(Address::null())).unwrap();
    create_stack.push(Value::Str("Create".into())).unwrap();
    runtime.invoke_native("block", &mut create_stack, &mut gas, &entry_address).unwrap();

    let err = runtime.load_context("validator").unwrap_err();
    assert!(matches!(err, tx_vm::Error::ContextNotAvailableInBlockOperations(_)));

    // the token contract remains reachable during block operations.
    assert!(runtime.load_context("token").is_ok());

    let mut send_stack = OperandStack::new();
    send_stack.push(Value::Bytes(vec![1, 2, 3])).unwrap();
    send_stack.push(Value::Address(user(9))).unwrap();
    send_stack.push(Value::Str("Send".into())).unwrap();
    runtime.invoke_native("token", &mut send_stack, &mut gas, &entry_address).unwrap();
    assert_eq!(runtime.events().last().unwrap().kind, EventKind::TokenSend);
}

/// Each of the remaining authorized contracts can reach its native methods
/// and have them recorded under its own name.
#[test]
fn authorized_native_contracts_emit_their_own_event_kinds() {
    let chain = EmptyChain;
    let mut nexus = EmptyNexus;
    let oracle = stub_oracle_reader(Arc::new(EmptyChain));
    let mut runtime = new_runtime(&chain, &mut nexus, &oracle, Address::null());
    let entry_address = Address::null();
    let mut gas = GasMeter::new(1_000, 1, true, false);

    let cases: &[(&str, &str, EventKind)] = &[
        ("nexus", "CreateChain", EventKind::ChainCreate),
        ("nexus", "CreateToken", EventKind::TokenCreate),
        ("nexus", "CreateFeed", EventKind::FeedCreate),
        ("storage", "CreateFile", EventKind::FileCreate),
        ("storage", "DeleteFile", EventKind::FileDelete),
        ("validator", "Propose", EventKind::ValidatorPropose),
        ("validator", "Elect", EventKind::ValidatorElect),
        ("validator", "Remove", EventKind::ValidatorRemove),
        ("consensus", "CreatePoll", EventKind::PollCreated),
        ("consensus", "ClosePoll", EventKind::PollClosed),
        ("consensus", "Vote", EventKind::PollVote),
        ("interop", "Request", EventKind::BrokerRequest),
        ("governance", "CreateValue", EventKind::ValueCreate),
        ("governance", "UpdateValue", EventKind::ValueUpdate),
    ];

    for (contract, method, kind) in cases {
        let mut stack = OperandStack::new();
        stack.push(Value::Bytes(vec![7])).unwrap();
        stack.push(Value::Address(user(1))).unwrap();
        stack.push(Value::Str((*method).into())).unwrap();
        runtime.invoke_native(contract, &mut stack, &mut gas, &entry_address).unwrap();
        let last = runtime.events().last().unwrap();
        assert_eq!(last.kind, *kind);
        assert_eq!(&last.contract, contract);
    }
}

/// A contract trying to emit another contract's authorized event kind
/// through its own native dispatch faults rather than silently recording the
/// event under the wrong name.
#[test]
fn native_dispatch_never_lets_a_contract_emit_anothers_kind() {
    let chain = EmptyChain;
    let mut nexus = EmptyNexus;
    let oracle = stub_oracle_reader(Arc::new(EmptyChain));
    let mut runtime = new_runtime(&chain, &mut nexus, &oracle, Address::null());
    let entry_address = Address::null();
    let mut gas = GasMeter::new(1_000, 1, true, false);

    // "storage" has no "Propose" method; the wrong contract can't borrow
    // another's method name.
    let mut stack = OperandStack::new();
    stack.push(Value::Bytes(vec![7])).unwrap();
    stack.push(Value::Address(user(1))).unwrap();
    stack.push(Value::Str("Propose".into())).unwrap();
    assert!(runtime.invoke_native("storage", &mut stack, &mut gas, &entry_address).is_err());
}

/// Oracle price reads are cached; the host is consulted exactly once per
/// URL.
#[test]
fn oracle_price_reads_are_cached() {
    let host = Arc::new(CountingPriceHost { calls: Mutex::new(0) });
    let reader = OracleReader::new(Arc::new(EmptyChain), host.clone(), HashSet::new(), 8);

    let first = reader.read(0, "price://SOUL").unwrap();
    let second = reader.read(0, "price://SOUL").unwrap();

    assert_eq!(first, second);
    assert_eq!(*host.calls.lock().unwrap(), 1);
}

/// A block containing a paired `TokenSend`/`TokenReceive` synthesizes a
/// single `InteropTransfer` via `interop://main/.../tx/<hash>`.
#[test]
fn interop_tx_read_synthesizes_single_transfer() {
    let tx_hash: Hash = [1u8; 32];
    let block_hash: Hash = [2u8; 32];
    let from = user(3);
    let to = user(4);

    let mut data = tx_core::StructFields::new();
    data.insert("symbol".to_string(), Value::Str("SYM".to_string()));
    data.insert("value".to_string(), Value::Int(BigInt::from(10)));
    let payload = Value::Struct(data).to_canonical_bytes();

    let mut events = HashMap::new();
    events.insert(
        tx_hash,
        vec![
            Event::new(EventKind::TokenSend, from, "token", payload.clone()),
            Event::new(EventKind::TokenReceive, to, "token", payload),
        ],
    );
    let chain = Arc::new(InteropChain { block_hash, tx_hash, events });

    let mut platforms = HashSet::new();
    platforms.insert(LOCAL_PLATFORM.to_string());
    let reader = OracleReader::new(chain, Arc::new(StubHost), platforms, 8);

    let url = format!("interop://{LOCAL_PLATFORM}/root/tx/{}", hex::encode(tx_hash));
    let bytes = reader.read(0, &url).unwrap();
    let decoded = Value::from_canonical_bytes(&bytes).unwrap();
    let fields = decoded.as_struct().unwrap();
    let transfers = fields.get("transfers").unwrap().as_struct().unwrap();
    assert_eq!(transfers.len(), 1);

    let transfer = transfers.get("0").unwrap().as_struct().unwrap();
    assert_eq!(transfer.get("from").unwrap(), &Value::Address(from));
    assert_eq!(transfer.get("to").unwrap(), &Value::Address(to));
    assert_eq!(transfer.get("symbol").unwrap(), &Value::Str("SYM".to_string()));
    assert_eq!(transfer.get("value").unwrap(), &Value::Int(BigInt::from(10)));
}

/// An unauthorized emitter faults.
#[test]
fn unauthorized_event_emission_faults() {
    let chain = EmptyChain;
    let mut nexus = EmptyNexus;
    let oracle = stub_oracle_reader(Arc::new(EmptyChain));
    let mut runtime = new_runtime(&chain, &mut nexus, &oracle, Address::null());
    let entry_address = Address::null();
    let mut gas = GasMeter::new(1_000, 1, true, false);

    let mut stack = OperandStack::new();
    stack.push(Value::Int(BigInt::from(EventKind::GasPayment.to_byte()))).unwrap();
    stack.push(Value::Address(user(5))).unwrap();
    stack.push(Value::Bytes(vec![9])).unwrap();

    let err = runtime
        .call_extern("Notify", &mut stack, &mut gas, "custom", &entry_address)
        .unwrap_err();
    assert!(matches!(err, tx_vm::Error::Fault(_)));
    assert!(runtime.events().is_empty());
}

/// A User address with no account script and no matching signer is not a
/// witness.
#[test]
fn is_witness_false_for_unscripted_unsigned_address() {
    let chain = EmptyChain;
    let mut nexus = EmptyNexus;
    let oracle = stub_oracle_reader(Arc::new(EmptyChain));
    let mut runtime = new_runtime(&chain, &mut nexus, &oracle, Address::null());
    let entry_address = Address::null();
    let mut gas = GasMeter::new(1_000, 1, true, false);

    let mut stack = OperandStack::new();
    stack.push(Value::Address(user(9))).unwrap();
    runtime
        .call_extern("IsWitness", &mut stack, &mut gas, "custom", &entry_address)
        .unwrap();
    assert_eq!(stack.pop().unwrap(), Value::Bool(false));
}

/// A User address carrying an account script defers to the `OnWitness`
/// trigger rather than the signer-set check — here the account's script
/// halts with `true` even though it never signed.
#[test]
fn is_witness_invokes_on_witness_trigger_for_scripted_address() {
    let chain = EmptyChain;
    let scripted = user(9);
    let mut nexus = ScriptedNexus {
        scripted_address: scripted,
        verdict: true,
    };
    let oracle = stub_oracle_reader(Arc::new(EmptyChain));
    let mut runtime = new_runtime(&chain, &mut nexus, &oracle, Address::null());
    let entry_address = Address::null();
    let mut gas = GasMeter::new(1_000, 1, true, false);

    let mut stack = OperandStack::new();
    stack.push(Value::Address(scripted)).unwrap();
    runtime
        .call_extern("IsWitness", &mut stack, &mut gas, "custom", &entry_address)
        .unwrap();
    assert_eq!(stack.pop().unwrap(), Value::Bool(true));
    assert!(gas.used_gas > 0, "the trigger's own gas use must be absorbed into the parent");
}

/// A scripted account whose `OnWitness` trigger halts `false` is not a
/// witness, and the trigger's gas use still lands on the parent.
#[test]
fn is_witness_respects_a_negative_on_witness_verdict() {
    let chain = EmptyChain;
    let scripted = user(9);
    let mut nexus = ScriptedNexus {
        scripted_address: scripted,
        verdict: false,
    };
    let oracle = stub_oracle_reader(Arc::new(EmptyChain));
    let mut runtime = new_runtime(&chain, &mut nexus, &oracle, Address::null());
    let entry_address = Address::null();
    let mut gas = GasMeter::new(1_000, 1, true, false);

    let mut stack = OperandStack::new();
    stack.push(Value::Address(scripted)).unwrap();
    runtime
        .call_extern("IsWitness", &mut stack, &mut gas, "custom", &entry_address)
        .unwrap();
    assert_eq!(stack.pop().unwrap(), Value::Bool(false));
    assert!(gas.used_gas > 0);
}

/// `interop.Withdraw` settles the bridged transfer through `InteropResolver`
/// before recording the `BrokerRequest` event.
#[test]
fn interop_withdraw_calls_the_resolver_and_notifies() {
    let chain = EmptyChain;
    let mut nexus = EmptyNexus;
    let oracle = stub_oracle_reader(Arc::new(EmptyChain));
    let mut interop = RecordingInterop {
        withdrawals: Mutex::new(Vec::new()),
    };
    let destination = user(2);
    let mut runtime = Runtime::new(
        &chain,
        &mut nexus,
        &oracle,
        Some(&mut interop),
        Address::null(),
        [0u8; 32],
        [0u8; 32],
        0,
        Vec::new(),
        8,
    );
    let entry_address = Address::null();
    let mut gas = GasMeter::new(1_000, 1, true, false);

    let mut stack = OperandStack::new();
    stack.push(Value::Str("neo".into())).unwrap(); // source
    stack.push(Value::Address(destination)).unwrap(); // destination
    stack.push(Value::Str("SOUL".into())).unwrap(); // symbol
    stack.push(Value::Int(BigInt::from(50))).unwrap(); // amount
    stack.push(Value::Str("Withdraw".into())).unwrap();
    runtime.invoke_native("interop", &mut stack, &mut gas, &entry_address).unwrap();

    assert_eq!(runtime.events().last().unwrap().kind, EventKind::BrokerRequest);
    assert_eq!(&runtime.events().last().unwrap().contract, "interop");

    let calls = interop.withdrawals.lock().unwrap();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, "neo");
    assert_eq!(calls[0].1, destination);
    assert_eq!(calls[0].2, "SOUL");
    assert_eq!(calls[0].3, BigInt::from(50));
}
