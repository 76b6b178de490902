//! Append-only event log: a plain `Vec<Event>` accumulator attached to one
//! execution, extended with child/parent merge support for nested trigger
//! invocations.

use tx_core::Event;

/// An ordered, append-only sequence of events produced during one execution.
/// Entries are never removed or reordered.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    entries: Vec<Event>,
}

impl EventLog {
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    pub fn append(&mut self, event: Event) {
        self.entries.push(event);
    }

    pub fn entries(&self) -> &[Event] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Creates a fresh log for a child trigger invocation.
    pub fn child(&self) -> Self {
        Self::new()
    }

    /// Appends a child trigger's events onto this log in order, preserving
    /// parent-then-child ordering for successful trigger invocations. A
    /// faulted trigger's events are simply never merged (the caller drops
    /// the child log instead of calling this).
    pub fn absorb(&mut self, child: EventLog) {
        self.entries.extend(child.entries);
    }
}
