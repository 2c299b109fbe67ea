//! Broadcast wait-gate: one-shot wake-up shared by every parked read session.
//!
//! Each generation is a `CancellationToken`. Parked sessions clone the current
//! token and wait on it; firing cancels it, which wakes every waiter at once and
//! leaves the token permanently fired, so a session that starts waiting after the
//! fire returns immediately. The next `acquire` lazily creates a fresh generation.

use std::sync::{Mutex, PoisonError};

use tokio_util::sync::CancellationToken;

#[derive(Debug, Default)]
struct GateState {
    current: Option<CancellationToken>,
    generation: u64,
}

/// Generation-based broadcast signal.
#[derive(Debug, Default)]
pub struct WaitGate {
    state: Mutex<GateState>,
}

impl WaitGate {
    /// Create a gate with no live generation.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Token for the current generation, creating one if none is live.
    pub fn acquire(&self) -> CancellationToken {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(token) = &state.current {
            return token.clone();
        }
        let token = CancellationToken::new();
        state.current = Some(token.clone());
        state.generation += 1;
        token
    }

    /// Fire the live generation, if any, and clear it. Returns true if waiters may have
    /// been woken.
    pub fn release(&self) -> bool {
        let token = self
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .current
            .take();
        match token {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Number of generations created so far.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .generation
    }

    /// True while a generation is live (someone acquired it and it has not fired).
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .current
            .is_some()
    }
}
