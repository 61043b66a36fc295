//! State machine for a single session/role resolution attempt.
//!
//! The UI-facing `loading` flag is derived from this machine: it is `true`
//! exactly while an attempt is in `Resolving`. Transitions into `Resolved`
//! or `TimedOut` are terminal for that attempt, so whichever finishes first,
//! the real response or its paired timeout, decides the observed flag; a
//! late real response may still update session/role data but can never flip
//! `loading` back on.

/// Phase of the current resolution attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Resolving,
    Resolved,
    TimedOut,
}

/// Ticket identifying one resolution attempt. Stale tickets are ignored by
/// `complete`/`expire`, which is what makes re-arming the timeout safe.
pub type Ticket = u64;

#[derive(Debug)]
pub struct Resolution {
    phase: Phase,
    attempt: Ticket,
}

impl Resolution {
    pub fn new() -> Self {
        Self {
            phase: Phase::Idle,
            attempt: 0,
        }
    }

    /// Start a new attempt, superseding any earlier one.
    pub fn begin(&mut self) -> Ticket {
        self.attempt += 1;
        self.phase = Phase::Resolving;
        self.attempt
    }

    /// Mark the attempt finished by its real outcome. Returns whether this
    /// call ended the attempt; `false` means the ticket was stale or the
    /// attempt already hit a terminal phase.
    pub fn complete(&mut self, ticket: Ticket) -> bool {
        if self.phase == Phase::Resolving && self.attempt == ticket {
            self.phase = Phase::Resolved;
            true
        } else {
            false
        }
    }

    /// End the current attempt (if still running) and invalidate every
    /// outstanding ticket, so in-flight work from earlier attempts can no
    /// longer apply its result.
    pub fn supersede(&mut self) {
        if self.phase == Phase::Resolving {
            self.phase = Phase::Resolved;
        }
        self.attempt += 1;
    }

    /// Mark the attempt finished by its timeout, under the same guard.
    pub fn expire(&mut self, ticket: Ticket) -> bool {
        if self.phase == Phase::Resolving && self.attempt == ticket {
            self.phase = Phase::TimedOut;
            true
        } else {
            false
        }
    }

    pub fn is_loading(&self) -> bool {
        self.phase == Phase::Resolving
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn current_ticket(&self) -> Ticket {
        self.attempt
    }
}

impl Default for Resolution {
    fn default() -> Self {
        Self::new()
    }
}
