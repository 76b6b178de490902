//! The seam between the interpreter and the Runtime: a dispatch trait with
//! the Runtime as the receiver, so the Runtime threads itself explicitly into
//! opcode dispatch instead of the interpreter holding a direct reference back
//! to it.
//!
//! Breaks what would otherwise be a `Runtime <-> Interpreter <->
//! ExecutionContext` reference cycle: `ExecutionContext` (see
//! `crate::context`) holds only a decoded instruction stream and a name; the
//! interpreter calls back into the Runtime through this trait for everything
//! that needs chain/oracle/event state.

use crate::context::ExecutionContext;
use crate::error::Result;
use crate::gas::GasMeter;
use crate::stack::OperandStack;
use tx_core::Address;

/// What `CTX` resolved to.
pub enum LoadedContext {
    Script(ExecutionContext),
    /// A native contract; the interpreter does not step through its
    /// instructions, it calls `Host::invoke_native` once and continues.
    Native(String),
}

/// Host callback surface the interpreter needs. Implemented by
/// `tx_runtime::Runtime`. `gas`/`entry_address` are threaded through every
/// call so the Runtime can mutate gas-meter state (`GasEscrow`/`GasPayment`)
/// and evaluate `IsWitness` without the interpreter exposing its private
/// frame stack.
pub trait Host {
    /// Resolve `CTX <name>`. During block-operation mode, the Runtime must
    /// reject any name other than the token contract with
    /// `Error::ContextNotAvailableInBlockOperations`.
    fn load_context(&mut self, name: &str) -> Result<LoadedContext>;

    /// Invoke a native contract's method. The native context pops its method
    /// name and arguments off `stack` by its own convention and pushes a
    /// single result value (or nothing, for void methods). `contract` is
    /// also the current context's name for authorization purposes (e.g.
    /// `Notify`'s contract-scoped event table).
    fn invoke_native(
        &mut self,
        contract: &str,
        stack: &mut OperandStack,
        gas: &mut GasMeter,
        entry_address: &Address,
    ) -> Result<()>;

    /// `EXTCALL <name>`: look up `name` in the host handler table and invoke
    /// it, popping arguments and pushing a single result the same way
    /// `invoke_native` does. Missing handlers fault.
    /// `context_name` is the calling script's context name (the `Notify`
    /// author when `name == "Notify"`).
    fn call_extern(
        &mut self,
        name: &str,
        stack: &mut OperandStack,
        gas: &mut GasMeter,
        context_name: &str,
        entry_address: &Address,
    ) -> Result<()>;
}
