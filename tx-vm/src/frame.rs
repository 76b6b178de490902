//! Call frames.

use crate::context::ExecutionContext;
use crate::stack::OperandStack;
use indexmap::IndexMap;
use tx_core::{Address, Value};

/// `{entry_address, context, return_offset, locals}` plus the frame-local
/// operand stack and instruction pointer needed to resume execution on RET.
#[derive(Debug, Clone)]
pub struct Frame {
    pub entry_address: Address,
    pub context: ExecutionContext,
    pub return_offset: u32,
    /// Per-frame key-value map read/written by `LOAD`/`GET`/`PUT`.
    pub locals: IndexMap<String, Value>,
    pub stack: OperandStack,
    pub pc: usize,
}

impl Frame {
    pub fn new(entry_address: Address, context: ExecutionContext, return_offset: u32) -> Self {
        Self {
            entry_address,
            context,
            return_offset,
            locals: IndexMap::new(),
            stack: OperandStack::new(),
            pc: 0,
        }
    }
}
