use thiserror::Error;

/// Errors raised while constructing or converting core value-model types.
///
/// These never represent a VM fault by themselves — `tx-vm` and `tx-runtime`
/// wrap them into their own error types at the point where a fault actually
/// becomes observable to a transaction.
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum Error {
    #[error("malformed address: expected 34 bytes, got {0}")]
    MalformedAddress(usize),

    #[error("unknown address kind byte: {0}")]
    UnknownAddressKind(u8),

    #[error("malformed event: {0}")]
    MalformedEvent(String),

    #[error("unknown event kind byte: {0}")]
    UnknownEventKind(u8),

    #[error("unknown value kind byte: {0}")]
    UnknownValueKind(u8),

    #[error("truncated wire data while reading {0}")]
    Truncated(&'static str),

    #[error("value of kind {0} cannot be coerced to {1}")]
    Coercion(&'static str, &'static str),

    #[error("values of kind {0} are not comparable")]
    NotComparable(&'static str),

    #[error("struct field {0:?} is not present")]
    MissingField(String),
}

pub type Result<T> = std::result::Result<T, Error>;
