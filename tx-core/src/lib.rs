//! Value model, address, and event primitives for the transactional execution
//! core: the dynamically-typed value the VM manipulates, the fixed-width
//! address identity, and the append-only event record shape contracts emit.

pub mod address;
pub mod decimal;
pub mod error;
pub mod event;
pub mod value;
mod wire;

pub use address::{Address, AddressKind, ADDRESS_SIZE};
pub use decimal::{rescale, Decimal};
pub use error::{Error, Result};
pub use event::{Event, EventKind};
pub use value::{StructFields, Value, ValueKind};
