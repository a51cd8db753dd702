//! Run state machine.
//!
//! ```text
//! INIT -> SYNCED -> LOOPING <-> BUILDING
//!                   LOOPING -> GATE -> PUBLISHING -> DONE
//!                              GATE -> DONE (nothing left to build)
//! any non-terminal state -> FAILED
//! ```

use serde::{Deserialize, Serialize};

use crate::domain::error::{AutobuildError, Result};

/// How errors raised while in a state are handled.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorPolicy {
    /// The first error ends the run.
    FailFast,
    /// Errors are recorded against the current target and the loop goes on.
    FailIsolated,
}

impl ErrorPolicy {
    /// Apply the policy to `result`. Under `FailIsolated` an error is handed
    /// to `isolate`, whose value stands in for the failed step; under
    /// `FailFast` it is returned unchanged.
    pub fn apply<T>(self, result: Result<T>, isolate: impl FnOnce(AutobuildError) -> T) -> Result<T> {
        match (self, result) {
            (_, Ok(value)) => Ok(value),
            (ErrorPolicy::FailIsolated, Err(e)) => Ok(isolate(e)),
            (ErrorPolicy::FailFast, Err(e)) => Err(e),
        }
    }
}

/// Where a run currently is.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum RunState {
    Init,
    Synced,
    Looping,
    Building,
    Gate,
    Publishing,
    Done,
    Failed,
}

impl RunState {
    /// Only a build attempt is isolated. Release-status checks and failure
    /// reports happen in `LOOPING` and end the run.
    pub fn policy(&self) -> ErrorPolicy {
        match self {
            RunState::Building => ErrorPolicy::FailIsolated,
            _ => ErrorPolicy::FailFast,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Done | RunState::Failed)
    }

    pub fn can_transition_to(&self, next: RunState) -> bool {
        use RunState::*;
        if next == Failed {
            return !self.is_terminal();
        }
        matches!(
            (self, next),
            (Init, Synced)
                | (Synced, Looping)
                | (Looping, Building)
                | (Building, Looping)
                | (Looping, Gate)
                | (Gate, Publishing)
                | (Gate, Done)
                | (Publishing, Done)
        )
    }
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            RunState::Init => "INIT",
            RunState::Synced => "SYNCED",
            RunState::Looping => "LOOPING",
            RunState::Building => "BUILDING",
            RunState::Gate => "GATE",
            RunState::Publishing => "PUBLISHING",
            RunState::Done => "DONE",
            RunState::Failed => "FAILED",
        };
        f.write_str(name)
    }
}

/// Per-target result inside the loop.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum TargetState {
    Skipped,
    Built,
    Failed,
}

/// Tracks the current [`RunState`] and rejects illegal transitions.
#[derive(Debug, Clone)]
pub struct RunMachine {
    state: RunState,
    history: Vec<RunState>,
}

impl Default for RunMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl RunMachine {
    pub fn new() -> Self {
        Self {
            state: RunState::Init,
            history: vec![RunState::Init],
        }
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Every state entered so far, starting with `INIT`.
    pub fn history(&self) -> &[RunState] {
        &self.history
    }

    pub fn advance(&mut self, next: RunState) -> Result<RunState> {
        if !self.state.can_transition_to(next) {
            return Err(AutobuildError::InvalidTransition {
                from: self.state,
                to: next,
            });
        }
        let prev = self.state;
        self.state = next;
        self.history.push(next);
        Ok(prev)
    }
}
