//! Execution contexts: a named executable unit, either user-deployed bytecode
//! or a built-in native handler.

use crate::opcode::Instruction;
use std::sync::Arc;

/// A decoded instruction stream.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Script(pub Vec<Instruction>);

impl Script {
    pub fn new(instructions: Vec<Instruction>) -> Self {
        Self(instructions)
    }

    pub fn get(&self, offset: usize) -> Option<&Instruction> {
        self.0.get(offset)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Either user-deployed bytecode or a built-in contract implemented in host
/// code. Native contexts are opaque to the interpreter: the Runtime resolves
/// `EXTCALL`/`CTX` targets and the interpreter never inspects native state.
#[derive(Clone)]
pub enum ContextBody {
    Script(Arc<Script>),
    Native,
}

impl std::fmt::Debug for ContextBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContextBody::Script(s) => write!(f, "Script({} instructions)", s.len()),
            ContextBody::Native => write!(f, "Native"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExecutionContext {
    pub name: String,
    pub body: ContextBody,
}

impl ExecutionContext {
    pub fn script(name: impl Into<String>, script: Script) -> Self {
        Self {
            name: name.into(),
            body: ContextBody::Script(Arc::new(script)),
        }
    }

    pub fn native(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            body: ContextBody::Native,
        }
    }

    pub fn is_native(&self) -> bool {
        matches!(self.body, ContextBody::Native)
    }
}
