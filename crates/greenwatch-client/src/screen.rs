//! Per-screen data that is replaced wholesale on every refresh.
//!
//! Screens re-fetch their list after each mutation. When two refreshes are in
//! flight, whichever response arrives last would win; tickets make the newest
//! request win instead.

/// Identifies one refresh request. Issued by [`Refreshable::begin`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Ticket(u64);

#[derive(Debug, Clone)]
pub struct Refreshable<T> {
    value: Option<T>,
    error: Option<String>,
    issued: u64,
    applied: u64,
}

impl<T> Default for Refreshable<T> {
    fn default() -> Self {
        Self {
            value: None,
            error: None,
            issued: 0,
            applied: 0,
        }
    }
}

impl<T> Refreshable<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a refresh. Pass the ticket back with its outcome.
    pub fn begin(&mut self) -> Ticket {
        self.issued += 1;
        Ticket(self.issued)
    }

    /// Store a fetched value. Returns false, and changes nothing, when a newer
    /// refresh has already landed.
    pub fn apply(&mut self, ticket: Ticket, value: T) -> bool {
        if !self.accept(ticket) {
            return false;
        }
        self.value = Some(value);
        self.error = None;
        true
    }

    /// Record a failed refresh. The last good value stays visible.
    pub fn fail(&mut self, ticket: Ticket, message: impl Into<String>) -> bool {
        if !self.accept(ticket) {
            return false;
        }
        self.error = Some(message.into());
        true
    }

    /// Apply the outcome of a fetch, keeping the error's display text.
    pub fn settle<E: std::fmt::Display>(&mut self, ticket: Ticket, outcome: Result<T, E>) -> bool {
        match outcome {
            Ok(value) => self.apply(ticket, value),
            Err(e) => self.fail(ticket, e.to_string()),
        }
    }

    fn accept(&mut self, ticket: Ticket) -> bool {
        if ticket.0 <= self.applied {
            return false;
        }
        self.applied = ticket.0;
        true
    }

    pub fn value(&self) -> Option<&T> {
        self.value.as_ref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    /// True while the most recent refresh has not settled.
    pub fn is_loading(&self) -> bool {
        self.issued > self.applied
    }
}
