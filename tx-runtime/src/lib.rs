//! Runtime glue: contract-call surface, oracle reader, event log, and state
//! change set.

pub mod chain;
pub mod change_set;
pub mod error;
pub mod event_log;
pub mod oracle;
pub mod runtime;

pub use chain::{Block, ChainStore, Hash, InteropResolver, Nexus, StoredTransaction, TokenInfo};
pub use change_set::{ChangeSet, ReadOnlyWrite, RootStore};
pub use error::{Error, OracleError, Result};
pub use event_log::EventLog;
pub use oracle::{InteropBlock, InteropTransaction, InteropTransfer, OracleHost, OracleReader, PriceQuote, LOCAL_PLATFORM};
pub use runtime::{ExecutionOutcome, Runtime, RuntimeConfig};
