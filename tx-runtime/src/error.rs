use thiserror::Error;

/// Oracle failures.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum OracleError {
    #[error("unknown platform {0:?}")]
    UnknownPlatform(String),

    #[error("malformed oracle url {0:?}")]
    MalformedUrl(String),

    #[error("unresolved interop transaction {0:?}")]
    UnresolvedInteropTransaction(String),

    #[error("missing NFT pairing for symbol {0:?}")]
    MissingNftPairing(String),

    #[error("missing price for symbol {0:?}")]
    MissingPrice(String),

    #[error("host unavailable: {0}")]
    HostUnavailable(String),
}

/// Runtime-level errors. Wraps `tx_vm::Error` (itself wrapping
/// `tx_core::Error`) so a single `Result` threads through `Runtime::execute`.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    #[error(transparent)]
    Vm(#[from] tx_vm::Error),

    /// Value coercion/serialization errors (`tx_core::Error`), kept distinct
    /// from `Vm` so `?` works directly on `Value::as_*` calls without an
    /// intermediate `tx_vm::Error::Value` wrap.
    #[error("value error: {0}")]
    Value(#[from] tx_core::Error),

    #[error("oracle error: {0}")]
    Oracle(#[from] OracleError),

    #[error("event kind {kind:?} may only be emitted by the {required:?} contract")]
    UnauthorizedEvent { kind: String, required: &'static str },

    #[error("storage write attempted in read-only mode")]
    ReadOnlyWrite,

    #[error("{0}")]
    Fault(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Converts any fault into the terminating `tx_vm::Error::Fault` shape
    /// used when propagating a Runtime-level failure back through the
    /// interpreter's `Host` trait, preserving the original message.
    pub fn into_vm_fault(self) -> tx_vm::Error {
        match self {
            Error::Vm(e) => e,
            other => tx_vm::Error::Fault(other.to_string()),
        }
    }
}
