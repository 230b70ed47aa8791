//! Run state machine
//!
//! Pure state machine: receives events, returns (new_state, action).
//! The runner executes the I/O implied by each action.
//!
//! `Init -> Authenticating -> Requesting -> {Succeeded, Failed} -> Exited`

/// Which phase a run failed in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureStage {
    Auth,
    Request,
}

/// Run states
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunState {
    /// Nothing started yet
    Init,
    /// Waiting for the token source
    Authenticating { total: usize },
    /// Operation `index` of `total` is in flight
    Requesting { index: usize, total: usize },
    /// Every operation returned 2xx
    Succeeded { completed: usize },
    /// Stopped at the first failure; earlier operations are not rolled back
    Failed {
        stage: FailureStage,
        completed: usize,
    },
    /// Terminal state
    Exited { exit_code: i32 },
}

/// Events that drive state transitions
#[derive(Debug)]
pub enum RunEvent {
    /// Run begins with this many operations planned
    Start { steps: usize },
    TokenAcquired,
    AuthFailed,
    OperationSucceeded,
    OperationFailed,
    /// Outcome reported, process may exit
    Exit,
}

/// Actions the caller should execute after a state transition
#[derive(Debug, PartialEq, Eq)]
pub enum RunAction {
    /// Obtain the bearer token
    AcquireToken,
    /// Send operation `index`
    Dispatch { index: usize },
    /// Report the outcome, then send `RunEvent::Exit`
    Finish { exit_code: i32 },
    /// Exit the process
    Shutdown { exit_code: i32 },
    /// No-op
    None,
}

impl RunState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunState::Exited { .. })
    }
}

/// Handle a state transition. Pure function: no I/O.
pub fn handle_event(state: RunState, event: RunEvent) -> (RunState, RunAction) {
    match (state, event) {
        // --- Init ---
        (RunState::Init, RunEvent::Start { steps }) => (
            RunState::Authenticating { total: steps },
            RunAction::AcquireToken,
        ),

        // --- Authenticating ---
        (RunState::Authenticating { total: 0 }, RunEvent::TokenAcquired) => (
            RunState::Succeeded { completed: 0 },
            RunAction::Finish { exit_code: 0 },
        ),

        (RunState::Authenticating { total }, RunEvent::TokenAcquired) => (
            RunState::Requesting { index: 0, total },
            RunAction::Dispatch { index: 0 },
        ),

        (RunState::Authenticating { .. }, RunEvent::AuthFailed) => (
            RunState::Failed {
                stage: FailureStage::Auth,
                completed: 0,
            },
            RunAction::Finish { exit_code: 1 },
        ),

        // --- Requesting ---
        (RunState::Requesting { index, total }, RunEvent::OperationSucceeded)
            if index + 1 < total =>
        {
            (
                RunState::Requesting {
                    index: index + 1,
                    total,
                },
                RunAction::Dispatch { index: index + 1 },
            )
        }

        (RunState::Requesting { total, .. }, RunEvent::OperationSucceeded) => (
            RunState::Succeeded { completed: total },
            RunAction::Finish { exit_code: 0 },
        ),

        (RunState::Requesting { index, .. }, RunEvent::OperationFailed) => (
            RunState::Failed {
                stage: FailureStage::Request,
                completed: index,
            },
            RunAction::Finish { exit_code: 1 },
        ),

        // --- Terminal outcomes ---
        (RunState::Succeeded { .. }, RunEvent::Exit) => (
            RunState::Exited { exit_code: 0 },
            RunAction::Shutdown { exit_code: 0 },
        ),

        (RunState::Failed { .. }, RunEvent::Exit) => (
            RunState::Exited { exit_code: 1 },
            RunAction::Shutdown { exit_code: 1 },
        ),

        // --- Invalid/unhandled transition: stay in current state ---
        (state, _event) => (state, RunAction::None),
    }
}
