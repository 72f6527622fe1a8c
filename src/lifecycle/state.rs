//! Application state machine.
//!
//! # States
//! - Created: constructed, startup not finished
//! - Running: start hook completed
//! - ShuttingDown: stop sequence in progress
//! - Terminated: exit status decided
//!
//! # State Transitions
//! ```text
//! Created → Running → ShuttingDown → Terminated
//! Created → ShuttingDown            (signal during startup)
//! Created → Terminated              (startup failed)
//! ```
//!
//! # Design Decisions
//! - Transitions only move forward; a lost race is reported, never retried
//! - Backed by a single atomic so signal tasks need no lock

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};

/// Lifecycle phase of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum ApplicationState {
    Created = 0,
    Running = 1,
    ShuttingDown = 2,
    Terminated = 3,
}

impl ApplicationState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Created,
            1 => Self::Running,
            2 => Self::ShuttingDown,
            _ => Self::Terminated,
        }
    }
}

impl fmt::Display for ApplicationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Created => "created",
            Self::Running => "running",
            Self::ShuttingDown => "shutting_down",
            Self::Terminated => "terminated",
        };
        f.write_str(name)
    }
}

/// Atomic holder of an [`ApplicationState`].
#[derive(Debug)]
pub struct StateCell(AtomicU8);

impl Default for StateCell {
    fn default() -> Self {
        Self::new()
    }
}

impl StateCell {
    pub fn new() -> Self {
        Self(AtomicU8::new(ApplicationState::Created as u8))
    }

    pub fn get(&self) -> ApplicationState {
        ApplicationState::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Move from exactly `from` to `to`. On failure returns the current state.
    pub fn transition(&self, from: ApplicationState, to: ApplicationState) -> Result<(), ApplicationState> {
        if to <= from {
            return Err(self.get());
        }
        self.0
            .compare_exchange(from as u8, to as u8, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| ())
            .map_err(ApplicationState::from_u8)
    }

    /// Move to `to` from any earlier state. Returns the state left behind.
    pub fn advance(&self, to: ApplicationState) -> Result<ApplicationState, ApplicationState> {
        self.0
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                (current < to as u8).then_some(to as u8)
            })
            .map(ApplicationState::from_u8)
            .map_err(ApplicationState::from_u8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ApplicationState::*;

    #[test]
    fn test_forward_transitions() {
        let state = StateCell::new();
        assert_eq!(state.get(), Created);
        assert!(state.transition(Created, Running).is_ok());
        assert_eq!(state.advance(ShuttingDown), Ok(Running));
        assert_eq!(state.advance(Terminated), Ok(ShuttingDown));
        assert_eq!(state.get(), Terminated);
    }

    #[test]
    fn test_rejects_backwards_and_repeated() {
        let state = StateCell::new();
        assert_eq!(state.advance(ShuttingDown), Ok(Created));
        assert_eq!(state.advance(ShuttingDown), Err(ShuttingDown));
        assert_eq!(state.advance(Running), Err(ShuttingDown));
        assert_eq!(state.transition(Created, Running), Err(ShuttingDown));
        assert_eq!(state.transition(Running, Created), Err(ShuttingDown));
    }

    #[test]
    fn test_single_winner_under_contention() {
        let state = std::sync::Arc::new(StateCell::new());
        let winners: usize = (0..8)
            .map(|_| {
                let state = state.clone();
                std::thread::spawn(move || state.advance(ShuttingDown).is_ok())
            })
            .collect::<Vec<_>>()
            .into_iter()
            .map(|h| h.join().unwrap() as usize)
            .sum();
        assert_eq!(winners, 1);
    }
}
