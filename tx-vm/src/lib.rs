//! Execution stack & frame, bytecode interpreter, and gas meter: a decoded
//! instruction stream, a frame stack with per-frame state, and a gas meter
//! threaded through every dispatch.

pub mod context;
pub mod error;
pub mod frame;
pub mod gas;
pub mod host;
pub mod interpreter;
pub mod opcode;
pub mod stack;

pub use context::{ContextBody, ExecutionContext, Script};
pub use error::{Error, Result};
pub use frame::Frame;
pub use gas::GasMeter;
pub use host::{Host, LoadedContext};
pub use interpreter::{Interpreter, VMState};
pub use opcode::Instruction;
pub use stack::{OperandStack, MAX_STACK_ITEMS};
