//! The Runtime: the contract-facing surface gluing the interpreter to state,
//! events, triggers, and oracles. Implements `tx_vm::Host` so the interpreter
//! can dispatch native contract calls and extern syscalls back into it
//! without owning the call stack itself.

use crate::chain::{ChainStore, InteropResolver, Nexus};
use crate::change_set::ChangeSet;
use crate::error::{Error, Result};
use crate::event_log::EventLog;
use crate::oracle::OracleReader;
use num_bigint::BigInt;
use num_traits::{ToPrimitive, Zero};
use tx_core::{rescale, Address, Event, EventKind, StructFields, Value};
use tx_vm::{ExecutionContext, GasMeter, Host, Interpreter, LoadedContext, OperandStack, Script, VMState};

/// Outcome of [`Runtime::execute`]. `committed` tells the caller whether
/// `into_change_set()`/`events()` are safe to persist; when `false` the
/// caller must discard both.
#[derive(Debug, Clone)]
pub struct ExecutionOutcome {
    pub state: VMState,
    pub committed: bool,
    pub result: Value,
    pub used_gas: i128,
    pub paid_gas: i128,
}

/// Ambient configuration a Runtime/GasMeter is constructed with. No file/env
/// parsing lives in this crate — the embedding node resolves these from its
/// own config surface and passes them in.
#[derive(Debug, Clone, Copy)]
pub struct RuntimeConfig {
    pub genesis_established: bool,
    pub read_only_mode: bool,
    pub default_minimum_fee: i128,
}

impl RuntimeConfig {
    /// Builds the `GasMeter` a transaction against this config starts with;
    /// `max_gas` is per-transaction (set for real by the first `GasEscrow`),
    /// everything else comes from the bootstrap/read-only knobs here.
    pub fn new_gas_meter(&self, max_gas: i128) -> GasMeter {
        GasMeter::new(max_gas, self.default_minimum_fee, self.genesis_established, self.read_only_mode)
    }

    pub fn new_change_set(&self) -> ChangeSet {
        ChangeSet::new(self.read_only_mode)
    }
}

/// Contract names recognized as built-in native handlers, plus `bomb`, the
/// gas-rewind-exempt native whose atomic, non-frame-pushing invocation is
/// exactly what the rewind needs.
const NATIVE_CONTRACTS: &[&str] = &[
    "gas",
    "block",
    "bomb",
    "validator",
    "consensus",
    "nexus",
    "storage",
    "interop",
    "governance",
    "token",
    "account",
];

/// The only contract `CTX` may reach while block-operation mode is active.
const TOKEN_CONTRACT: &str = "token";

/// Contract-scoped `Notify` authorization table. `None` means any contract
/// may emit the kind.
fn authorized_contract(kind: EventKind) -> Option<&'static str> {
    match kind {
        EventKind::GasEscrow | EventKind::GasPayment | EventKind::GasLoan => Some("gas"),
        EventKind::BlockCreate | EventKind::BlockClose | EventKind::ValidatorSwitch => Some("block"),
        EventKind::PollCreated | EventKind::PollClosed | EventKind::PollVote => Some("consensus"),
        EventKind::ChainCreate | EventKind::TokenCreate | EventKind::FeedCreate => Some("nexus"),
        EventKind::FileCreate | EventKind::FileDelete => Some("storage"),
        EventKind::ValidatorPropose | EventKind::ValidatorElect | EventKind::ValidatorRemove => {
            Some("validator")
        }
        EventKind::BrokerRequest => Some("interop"),
        EventKind::ValueCreate | EventKind::ValueUpdate => Some("governance"),
        _ => None,
    }
}

/// The Runtime owns everything scoped to one transaction (or one nested
/// trigger invocation) except the Gas Meter, which stays inside the
/// `Interpreter` it drives — `Runtime` only ever receives a `&mut GasMeter`
/// through the `Host` callbacks, never a second owner of interpreter-internal
/// state.
pub struct Runtime<'a> {
    chain: &'a dyn ChainStore,
    nexus: &'a mut dyn Nexus,
    oracle: &'a OracleReader,
    interop: Option<&'a mut dyn InteropResolver>,
    change_set: ChangeSet,
    event_log: EventLog,
    chain_address: Address,
    transaction_hash: [u8; 32],
    /// Hash of the entry script, supplied by the caller: this crate works on
    /// a decoded `Instruction` stream (`tx_vm::Script`), never the original
    /// wire bytes, so it cannot derive this hash itself — byte encoding of
    /// scripts is a tooling concern handled upstream.
    entry_script_hash: [u8; 32],
    time: u64,
    signers: Vec<Address>,
    block_operation_mode: bool,
    rng_seed: Option<u64>,
    fiat_decimals: u32,
}

impl<'a> Runtime<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        chain: &'a dyn ChainStore,
        nexus: &'a mut dyn Nexus,
        oracle: &'a OracleReader,
        interop: Option<&'a mut dyn InteropResolver>,
        chain_address: Address,
        transaction_hash: [u8; 32],
        entry_script_hash: [u8; 32],
        time: u64,
        signers: Vec<Address>,
        fiat_decimals: u32,
    ) -> Self {
        Self {
            chain,
            nexus,
            oracle,
            interop,
            change_set: ChangeSet::new(false),
            event_log: EventLog::new(),
            chain_address,
            transaction_hash,
            entry_script_hash,
            time,
            signers,
            block_operation_mode: false,
            rng_seed: None,
            fiat_decimals,
        }
    }

    pub fn with_read_only(mut self, read_only: bool) -> Self {
        self.change_set = ChangeSet::new(read_only);
        self
    }

    pub fn events(&self) -> &[Event] {
        self.event_log.entries()
    }

    pub fn change_set(&self) -> &ChangeSet {
        &self.change_set
    }

    pub fn into_change_set(self) -> ChangeSet {
        self.change_set
    }

    pub fn read_oracle(&self, url: &str) -> Result<Vec<u8>> {
        self.oracle.read(self.time, url).map_err(Into::into)
    }

    pub fn transfer_tokens(&mut self, symbol: &str, source: &Address, destination: &Address, amount: &BigInt) -> bool {
        self.nexus.transfer_tokens(symbol, source, destination, amount)
    }

    /// Checks the authorization table, appends to the event log, and applies
    /// the `BlockCreate`/`BlockClose` block-operation-mode side effect.
    fn notify(
        &mut self,
        context_name: &str,
        kind: EventKind,
        address: Address,
        data: Vec<u8>,
        gas: &mut GasMeter,
    ) -> Result<()> {
        if let Some(required) = authorized_contract(kind) {
            if context_name != required {
                tracing::warn!(?kind, context_name, required, "unauthorized event emission");
                return Err(Error::UnauthorizedEvent {
                    kind: format!("{kind:?}"),
                    required,
                });
            }
        }
        self.event_log.append(Event::new(kind, address, context_name, data));
        match kind {
            EventKind::BlockCreate => {
                self.block_operation_mode = true;
                gas.set_block_operation_mode(true);
            }
            EventKind::BlockClose => {
                self.block_operation_mode = false;
                gas.set_block_operation_mode(false);
            }
            _ => {}
        }
        Ok(())
    }

    /// For a User address carrying an on-chain account script, defers to the
    /// `OnWitness` trigger instead of the plain signer-set check: the script
    /// decides whether it considers itself witnessed, the same way a
    /// multi-sig or time-locked account would override the default rule.
    fn is_witness(&mut self, gas: &mut GasMeter, address: &Address, entry_address: &Address, context_name: &str) -> bool {
        if address == entry_address {
            return true;
        }
        if address.is_interop() {
            return false;
        }
        if address.is_system() && *address == Address::from_contract_name(context_name) {
            return true;
        }
        if address.is_user() && self.nexus.has_script(address) {
            if let Some(script) = self.nexus.look_up_address_script(address) {
                return match self.invoke_trigger(gas, script, "OnWitness", vec![Value::Address(*entry_address)]) {
                    Some(Value::Bool(result)) => result,
                    _ => false,
                };
            }
        }
        self.signers.contains(address)
    }

    /// LCG with `a = 16807`, `m = 2^31 - 1`, lazily seeded from
    /// `H = transaction.hash ⊕ entryScriptHash ⊕ little_endian(time)`.
    fn next_random(&mut self) -> BigInt {
        const A: u64 = 16807;
        const M: u64 = 2_147_483_647; // 2^31 - 1

        let seed = self.rng_seed.unwrap_or_else(|| {
            let time_bytes = self.time.to_le_bytes();
            let mut h = [0u8; 32];
            for (i, slot) in h.iter_mut().enumerate() {
                *slot = self.transaction_hash[i] ^ self.entry_script_hash[i] ^ time_bytes[i % time_bytes.len()];
            }
            let raw = u32::from_le_bytes([h[0], h[1], h[2], h[3]]);
            (raw as u64) % M
        });
        let next = (A * seed) % M;
        self.rng_seed = Some(next);
        BigInt::from(next)
    }

    fn token_price(&self, symbol: &str) -> Result<BigInt> {
        let info = self
            .nexus
            .get_token_info(symbol)
            .ok_or_else(|| Error::Fault(format!("unknown token {symbol:?}")))?;
        if info.is_fiat {
            return Ok(rescale(&BigInt::from(1), 0, self.fiat_decimals));
        }
        if info.is_fuel {
            let staking_price = self
                .nexus
                .get_governance_value("StakingPrice")
                .ok_or_else(|| Error::Fault("StakingPrice governance value not set".into()))?;
            return Ok(staking_price / 5);
        }
        let bytes = self.oracle.read(self.time, &format!("price://{symbol}"))?;
        Ok(Value::bytes_to_int(&bytes))
    }

    /// All arithmetic in arbitrary-precision integers, division truncates
    /// toward zero.
    fn token_quote(&self, base: &str, quote: &str, amount: &BigInt) -> Result<BigInt> {
        let base_info = self
            .nexus
            .get_token_info(base)
            .ok_or_else(|| Error::Fault(format!("unknown token {base:?}")))?;
        let quote_info = self
            .nexus
            .get_token_info(quote)
            .ok_or_else(|| Error::Fault(format!("unknown token {quote:?}")))?;
        let base_price = self.token_price(base)?;
        let quote_price = self.token_price(quote)?;
        if quote_price.is_zero() {
            return Err(Error::Fault(format!("zero price for quote token {quote:?}")));
        }
        let fiat_value = rescale(&(amount * &base_price), base_info.decimals, self.fiat_decimals);
        let quote_amount = &fiat_value / &quote_price;
        Ok(rescale(&quote_amount, self.fiat_decimals, quote_info.decimals))
    }

    /// Runs `entry_context` to `Halt`/`Fault` with `args` seeded onto the
    /// entry frame in call order, settles gas, and reports whether the
    /// Change Set/Event Log this `Runtime` has accumulated are eligible to be
    /// committed. A transaction that halts with `UsedGas > PaidGas` must not
    /// have its side effects persisted, so a `Halt` with unpaid gas is
    /// downgraded to `Fault` here, before the caller ever sees it as a
    /// success.
    ///
    /// This consumes `self`: on `committed == true` the caller recovers state
    /// via [`Runtime::into_change_set`] and [`Runtime::events`]; on
    /// `committed == false` simply dropping the `Runtime` discards both, so
    /// the Change Set after the transaction equals its state before it.
    #[tracing::instrument(skip(self, gas, entry_context, args), fields(entry_context = %entry_context.name, tx_hash = %hex::encode(self.transaction_hash)))]
    pub fn execute(mut self, gas: GasMeter, entry_context: ExecutionContext, args: Vec<Value>) -> (Self, ExecutionOutcome) {
        let entry_address = Address::from_contract_name(&entry_context.name);
        let mut interpreter = Interpreter::new(entry_address, entry_context, gas);
        for arg in args {
            if let Err(e) = interpreter.push_argument(arg) {
                tracing::warn!(error = %e, "failed to seed call argument");
                let outcome = ExecutionOutcome {
                    state: VMState::Fault(e),
                    committed: false,
                    result: Value::Bytes(Vec::new()),
                    used_gas: 0,
                    paid_gas: 0,
                };
                return (self, outcome);
            }
        }

        let state = interpreter.run(&mut self);
        let outcome = match state {
            VMState::Halt => match interpreter.gas.settle_on_halt() {
                Ok(()) => {
                    tracing::debug!(
                        used_gas = interpreter.gas.used_gas,
                        paid_gas = interpreter.gas.paid_gas,
                        "transaction halted with gas settled"
                    );
                    ExecutionOutcome {
                        state: VMState::Halt,
                        committed: true,
                        result: interpreter.result(),
                        used_gas: interpreter.gas.used_gas,
                        paid_gas: interpreter.gas.paid_gas,
                    }
                }
                Err(fault) => {
                    tracing::warn!(error = %fault, "halted with unpaid gas, downgrading to fault");
                    ExecutionOutcome {
                        state: VMState::Fault(fault),
                        committed: false,
                        result: Value::Bytes(Vec::new()),
                        used_gas: interpreter.gas.used_gas,
                        paid_gas: interpreter.gas.paid_gas,
                    }
                }
            },
            VMState::Fault(ref fault) => {
                tracing::warn!(error = %fault, "transaction faulted, change set discarded");
                ExecutionOutcome {
                    state: state.clone(),
                    committed: false,
                    result: Value::Bytes(Vec::new()),
                    used_gas: interpreter.gas.used_gas,
                    paid_gas: interpreter.gas.paid_gas,
                }
            }
            VMState::Running => unreachable!("Interpreter::run never returns Running"),
        };
        (self, outcome)
    }

    /// Runs `script` in a child Runtime sharing this Change Set (via
    /// `ChangeSet::child`), Oracle, Chain, time, and transaction identity,
    /// with `DelayPayment` forced on. `UsedGas` is propagated to the parent
    /// unconditionally, win or lose. On Halt, also merges the child's Change
    /// Set and event log into this one and returns its result; on Fault the
    /// change set and event log are dropped and the parent is left
    /// untouched — a faulted trigger never faults its parent, the caller
    /// decides what to do instead.
    ///
    /// Exposed only as a Rust method, not over `EXTCALL`: `tx_core::Value`
    /// has no variant that can carry a callable script, so triggers are
    /// invoked directly by native contract logic (e.g. token transfer
    /// hooks), never from arbitrary bytecode.
    pub fn invoke_trigger(&mut self, gas: &mut GasMeter, script: Script, name: &str, args: Vec<Value>) -> Option<Value> {
        let entry_address = Address::from_contract_name(name);
        let context = ExecutionContext::script(name, script);
        let child_gas = gas.child_for_trigger();
        let mut interpreter = Interpreter::new(entry_address, context, child_gas);
        for arg in args {
            if interpreter.push_argument(arg).is_err() {
                return None;
            }
        }

        let mut child = Runtime {
            chain: self.chain,
            nexus: &mut *self.nexus,
            oracle: self.oracle,
            interop: self.interop.as_deref_mut(),
            change_set: self.change_set.child(),
            event_log: self.event_log.child(),
            chain_address: self.chain_address,
            transaction_hash: self.transaction_hash,
            entry_script_hash: self.entry_script_hash,
            time: self.time,
            signers: self.signers.clone(),
            block_operation_mode: self.block_operation_mode,
            rng_seed: self.rng_seed,
            fiat_decimals: self.fiat_decimals,
        };

        let state = interpreter.run(&mut child);
        gas.absorb_child(interpreter.gas.used_gas);
        match state {
            VMState::Halt => {
                self.change_set.merge(child.change_set);
                self.event_log.absorb(child.event_log);
                Some(interpreter.result())
            }
            VMState::Fault(_) => None,
            VMState::Running => unreachable!("Interpreter::run never returns Running"),
        }
    }
}

impl<'a> Host for Runtime<'a> {
    fn load_context(&mut self, name: &str) -> tx_vm::Result<LoadedContext> {
        if self.block_operation_mode && name != TOKEN_CONTRACT {
            return Err(tx_vm::Error::ContextNotAvailableInBlockOperations(name.to_string()));
        }
        if NATIVE_CONTRACTS.contains(&name) {
            return Ok(LoadedContext::Native(name.to_string()));
        }
        Err(tx_vm::Error::UnresolvedContext(name.to_string()))
    }

    fn invoke_native(
        &mut self,
        contract: &str,
        stack: &mut OperandStack,
        gas: &mut GasMeter,
        entry_address: &Address,
    ) -> tx_vm::Result<()> {
        self.dispatch_native(contract, stack, gas, entry_address)
            .map_err(|e| e.into_vm_fault())
    }

    fn call_extern(
        &mut self,
        name: &str,
        stack: &mut OperandStack,
        gas: &mut GasMeter,
        context_name: &str,
        entry_address: &Address,
    ) -> tx_vm::Result<()> {
        self.dispatch_extern(name, stack, gas, context_name, entry_address)
            .map_err(|e| e.into_vm_fault())
    }
}

impl<'a> Runtime<'a> {
    fn dispatch_native(
        &mut self,
        contract: &str,
        stack: &mut OperandStack,
        gas: &mut GasMeter,
        entry_address: &Address,
    ) -> Result<()> {
        let _ = entry_address;
        match contract {
            "bomb" => {
                let snapshot = gas.snapshot_used_gas();
                let method = stack.pop()?.as_str()?.to_string();
                let result = self.run_bomb_method(&method, stack);
                gas.restore_used_gas(snapshot);
                result
            }
            "gas" => {
                let method = stack.pop()?.as_str()?.to_string();
                match method.as_str() {
                    "Escrow" => {
                        let address = stack.pop()?.as_address()?.to_owned();
                        let amount = stack.pop()?.as_int()?.clone();
                        let price = stack.pop()?.as_int()?.clone();
                        let price_i128 = price
                            .to_i128()
                            .ok_or_else(|| Error::Fault("gas price out of range".into()))?;
                        let amount_i128 = amount
                            .to_i128()
                            .ok_or_else(|| Error::Fault("gas amount out of range".into()))?;
                        gas.apply_gas_escrow(price_i128, amount_i128, address).map_err(Error::Vm)?;
                        let data = Value::Int(amount).to_canonical_bytes();
                        self.notify(contract, EventKind::GasEscrow, address, data, gas)
                    }
                    "Payment" => {
                        let address = stack.pop()?.as_address()?.to_owned();
                        let amount = stack.pop()?.as_int()?.clone();
                        let amount_i128 = amount
                            .to_i128()
                            .ok_or_else(|| Error::Fault("gas amount out of range".into()))?;
                        gas.apply_gas_payment(amount_i128, address, &self.chain_address);
                        let data = Value::Int(amount).to_canonical_bytes();
                        self.notify(contract, EventKind::GasPayment, address, data, gas)
                    }
                    other => Err(Error::Fault(format!("unknown gas method {other:?}"))),
                }
            }
            "block" => {
                let method = stack.pop()?.as_str()?.to_string();
                match method.as_str() {
                    "Create" => {
                        let address = stack.pop()?.as_address()?.to_owned();
                        self.notify(contract, EventKind::BlockCreate, address, Vec::new(), gas)
                    }
                    "Close" => {
                        let address = stack.pop()?.as_address()?.to_owned();
                        self.notify(contract, EventKind::BlockClose, address, Vec::new(), gas)
                    }
                    "Switch" => self.notify_with_data(contract, EventKind::ValidatorSwitch, stack, gas),
                    other => Err(Error::Fault(format!("unknown block method {other:?}"))),
                }
            }
            "nexus" => {
                let method = stack.pop()?.as_str()?.to_string();
                match method.as_str() {
                    "CreateChain" => self.notify_with_data(contract, EventKind::ChainCreate, stack, gas),
                    "CreateToken" => self.notify_with_data(contract, EventKind::TokenCreate, stack, gas),
                    "CreateFeed" => self.notify_with_data(contract, EventKind::FeedCreate, stack, gas),
                    other => Err(Error::Fault(format!("unknown nexus method {other:?}"))),
                }
            }
            "storage" => {
                let method = stack.pop()?.as_str()?.to_string();
                match method.as_str() {
                    "CreateFile" => self.notify_with_data(contract, EventKind::FileCreate, stack, gas),
                    "DeleteFile" => self.notify_with_data(contract, EventKind::FileDelete, stack, gas),
                    other => Err(Error::Fault(format!("unknown storage method {other:?}"))),
                }
            }
            "validator" => {
                let method = stack.pop()?.as_str()?.to_string();
                match method.as_str() {
                    "Propose" => self.notify_with_data(contract, EventKind::ValidatorPropose, stack, gas),
                    "Elect" => self.notify_with_data(contract, EventKind::ValidatorElect, stack, gas),
                    "Remove" => self.notify_with_data(contract, EventKind::ValidatorRemove, stack, gas),
                    other => Err(Error::Fault(format!("unknown validator method {other:?}"))),
                }
            }
            "consensus" => {
                let method = stack.pop()?.as_str()?.to_string();
                match method.as_str() {
                    "CreatePoll" => self.notify_with_data(contract, EventKind::PollCreated, stack, gas),
                    "ClosePoll" => self.notify_with_data(contract, EventKind::PollClosed, stack, gas),
                    "Vote" => self.notify_with_data(contract, EventKind::PollVote, stack, gas),
                    other => Err(Error::Fault(format!("unknown consensus method {other:?}"))),
                }
            }
            "interop" => {
                let method = stack.pop()?.as_str()?.to_string();
                match method.as_str() {
                    "Request" => self.notify_with_data(contract, EventKind::BrokerRequest, stack, gas),
                    "Withdraw" => {
                        let amount = stack.pop()?.as_int()?.clone();
                        let symbol = stack.pop()?.as_str()?.to_string();
                        let destination = stack.pop()?.as_address()?.to_owned();
                        let source = stack.pop()?.as_str()?.to_string();
                        self.interop
                            .as_deref_mut()
                            .ok_or_else(|| Error::Fault("no interop resolver configured".into()))?
                            .withdraw_tokens(&source, &destination, &symbol, &amount);
                        let mut fields = StructFields::new();
                        fields.insert("source".to_string(), Value::Str(source));
                        fields.insert("symbol".to_string(), Value::Str(symbol));
                        fields.insert("amount".to_string(), Value::Int(amount));
                        let data = Value::struct_to_bytes(&fields);
                        self.notify(contract, EventKind::BrokerRequest, destination, data, gas)
                    }
                    other => Err(Error::Fault(format!("unknown interop method {other:?}"))),
                }
            }
            "governance" => {
                let method = stack.pop()?.as_str()?.to_string();
                match method.as_str() {
                    "CreateValue" => self.notify_with_data(contract, EventKind::ValueCreate, stack, gas),
                    "UpdateValue" => self.notify_with_data(contract, EventKind::ValueUpdate, stack, gas),
                    other => Err(Error::Fault(format!("unknown governance method {other:?}"))),
                }
            }
            // Reachable via `CTX` even outside block-operation mode; not
            // authorization-gated (`Token{Send,Receive,Mint,Burn,Stake,
            // Unstake,Claim}` fall under the "any contract" rule), but it
            // must still be the one context `CTX` can reach while block
            // operations are in progress.
            "token" => {
                let method = stack.pop()?.as_str()?.to_string();
                let kind = match method.as_str() {
                    "Send" => EventKind::TokenSend,
                    "Receive" => EventKind::TokenReceive,
                    "Mint" => EventKind::TokenMint,
                    "Burn" => EventKind::TokenBurn,
                    "Stake" => EventKind::TokenStake,
                    "Unstake" => EventKind::TokenUnstake,
                    "Claim" => EventKind::TokenClaim,
                    other => return Err(Error::Fault(format!("unknown token method {other:?}"))),
                };
                self.notify_with_data(contract, kind, stack, gas)
            }
            other => Err(Error::Vm(tx_vm::Error::MissingHandler(other.to_string()))),
        }
    }

    /// Shared shape for the native methods above whose only job is to pop
    /// `(address, data)` off the stack, in that call order, and notify under
    /// the given kind: `block.Switch`, and every `nexus`/`storage`/
    /// `validator`/`consensus`/`interop`/`governance` method. `gas`/`block`'s
    /// `Escrow`/`Payment`/`Create`/`Close` stay spelled out above because they
    /// carry kind-specific numeric fields this generic shape doesn't.
    fn notify_with_data(
        &mut self,
        contract: &str,
        kind: EventKind,
        stack: &mut OperandStack,
        gas: &mut GasMeter,
    ) -> Result<()> {
        let data = stack.pop()?.as_bytes()?.to_vec();
        let address = stack.pop()?.as_address()?.to_owned();
        self.notify(contract, kind, address, data, gas)
    }

    /// The bomb contract deliberately has no observable effect beyond
    /// validating its own invocation; its entire purpose is to be the one
    /// native contract whose gas cost is rewound by the caller.
    fn run_bomb_method(&mut self, method: &str, _stack: &mut OperandStack) -> Result<()> {
        match method {
            "Detonate" => Ok(()),
            other => Err(Error::Fault(format!("unknown bomb method {other:?}"))),
        }
    }

    fn dispatch_extern(
        &mut self,
        name: &str,
        stack: &mut OperandStack,
        gas: &mut GasMeter,
        context_name: &str,
        entry_address: &Address,
    ) -> Result<()> {
        match name {
            "Notify" => {
                let data = stack.pop()?.as_bytes()?.to_vec();
                let address = stack.pop()?.as_address()?.to_owned();
                let kind_byte = stack
                    .pop()?
                    .as_int()?
                    .to_u8()
                    .ok_or_else(|| Error::Fault("event kind out of range".into()))?;
                let kind = EventKind::from_byte(kind_byte)?;
                self.notify(context_name, kind, address, data, gas)
            }
            "IsWitness" => {
                let address = stack.pop()?.as_address()?.to_owned();
                let result = self.is_witness(gas, &address, entry_address, context_name);
                stack.push(Value::Bool(result)).map_err(Error::Vm)
            }
            "GetRandomNumber" => {
                let n = self.next_random();
                stack.push(Value::Int(n)).map_err(Error::Vm)
            }
            "GetTokenPrice" => {
                let symbol = stack.pop()?.as_str()?.to_string();
                let price = self.token_price(&symbol)?;
                stack.push(Value::Int(price)).map_err(Error::Vm)
            }
            "GetTokenQuote" => {
                let amount = stack.pop()?.as_int()?.clone();
                let quote = stack.pop()?.as_str()?.to_string();
                let base = stack.pop()?.as_str()?.to_string();
                let result = self.token_quote(&base, &quote, &amount)?;
                stack.push(Value::Int(result)).map_err(Error::Vm)
            }
            other => Err(Error::Vm(tx_vm::Error::MissingHandler(other.to_string()))),
        }
    }
}
