use thiserror::Error;

/// VM-level faults.
///
/// Every variant here is terminal: once raised, the interpreter transitions to
/// `VMState::Fault` and the caller (the Runtime) discards the Change Set.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    #[error("value error: {0}")]
    Value(#[from] tx_core::Error),

    #[error("unknown opcode")]
    UnknownOpcode,

    #[error("operand stack underflow")]
    StackUnderflow,

    #[error("operand stack overflow: frame stack is limited to {0} items")]
    StackOverflow(usize),

    #[error("frame stack underflow: RET with no active frame")]
    FrameUnderflow,

    #[error("gas exhausted: used {used} > max {max}")]
    GasExhausted { used: i128, max: i128 },

    #[error("gas escrow price {price} is below minimum fee {minimum}")]
    GasPriceBelowMinimum { price: i128, minimum: i128 },

    #[error("unpaid gas at halt: paid {paid} < used {used}")]
    UnpaidGasAtHalt { paid: i128, used: i128 },

    #[error("context {0:?} not resolved")]
    UnresolvedContext(String),

    #[error("context {0:?} not available in block operations")]
    ContextNotAvailableInBlockOperations(String),

    #[error("no handler registered for interop call {0:?}")]
    MissingHandler(String),

    #[error("contract assertion failed: {0}")]
    AssertionFailed(String),

    #[error("jump target {0} out of range")]
    InvalidJumpTarget(i64),

    #[error("switch table has no entry for index {0}")]
    SwitchOutOfRange(i64),

    #[error("{0}")]
    Fault(String),
}

pub type Result<T> = std::result::Result<T, Error>;
