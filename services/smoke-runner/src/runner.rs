//! Run driver
//!
//! Feeds events into the pure state machine in `run` and performs the I/O
//! each returned action asks for: acquire the token, dispatch the next
//! step, report the outcome.

use identity_auth::{IdToken, TokenSource, now_millis};
use remote_op::{Dispatcher, HeaderInjection, Outcome, RequestDescriptor};
use serde_json::Value;
use tracing::{error, info, instrument, warn};

use crate::error::RunError;
use crate::run::{RunAction, RunEvent, RunState, handle_event};
use crate::scenario::Step;

/// Everything a run needs, borrowed for its duration.
pub struct Runner<'a> {
    pub run_id: String,
    pub source: &'a dyn TokenSource,
    pub dispatcher: &'a Dispatcher,
    pub headers: &'a [HeaderInjection],
}

/// Result of one run
#[derive(Debug)]
pub struct RunReport {
    pub exit_code: i32,
    /// Response bodies of the operations that succeeded, in order
    pub responses: Vec<Value>,
    /// The failure that stopped the run
    pub error: Option<RunError>,
    /// uid of the authenticated account, once known
    pub user_id: Option<String>,
}

impl RunReport {
    pub fn completed(&self) -> usize {
        self.responses.len()
    }
}

impl Runner<'_> {
    /// Authenticate once, then run `steps` in order until the first failure.
    #[instrument(skip_all, fields(run_id = %self.run_id, steps = steps.len()))]
    pub async fn execute(&self, steps: &[Step]) -> RunReport {
        let mut report = RunReport {
            exit_code: 1,
            responses: Vec::new(),
            error: None,
            user_id: None,
        };
        let mut token: Option<IdToken> = None;

        let (mut state, mut action) =
            handle_event(RunState::Init, RunEvent::Start { steps: steps.len() });

        loop {
            let event = match action {
                RunAction::AcquireToken => match self.source.acquire().await {
                    Ok(acquired) => {
                        info!(
                            source = self.source.id(),
                            user_id = acquired.user_id(),
                            expires_at = acquired.expires_at_millis(),
                            "token acquired"
                        );
                        report.user_id = Some(acquired.user_id().to_string());
                        token = Some(acquired);
                        RunEvent::TokenAcquired
                    }
                    Err(e) => {
                        let err = RunError::from(e);
                        error!(
                            kind = err.kind(),
                            source = self.source.id(),
                            status = ?err.status(),
                            error = %err,
                            "authentication failed"
                        );
                        report.error = Some(err);
                        RunEvent::AuthFailed
                    }
                },

                RunAction::Dispatch { index } => {
                    let (Some(step), Some(token)) = (steps.get(index), token.as_ref()) else {
                        warn!(index, "dispatch requested without a step or token");
                        break;
                    };
                    match self.dispatch(step, token).await {
                        Ok(body) => {
                            report.responses.push(body);
                            RunEvent::OperationSucceeded
                        }
                        Err(e) => {
                            report.error = Some(e);
                            RunEvent::OperationFailed
                        }
                    }
                }

                RunAction::Finish { exit_code } => {
                    info!(
                        ?state,
                        exit_code,
                        completed = report.completed(),
                        "run finished"
                    );
                    RunEvent::Exit
                }

                RunAction::Shutdown { exit_code } => {
                    debug_assert!(state.is_terminal());
                    report.exit_code = exit_code;
                    break;
                }

                RunAction::None => {
                    warn!(?state, "run stalled");
                    break;
                }
            };

            let (next_state, next_action) = handle_event(state, event);
            state = next_state;
            action = next_action;
        }

        report
    }

    async fn dispatch(&self, step: &Step, token: &IdToken) -> Result<Value, RunError> {
        let operation = step.operation_for(token);
        if token.is_expired_at(now_millis()) {
            // No re-acquire mid-run; the endpoint decides whether to reject it
            warn!(
                operation = operation.name(),
                expires_at = token.expires_at_millis(),
                "bearer token expired before dispatch"
            );
        }
        let request = RequestDescriptor::authorized(
            &step.url,
            &operation,
            token.value().expose(),
            self.headers,
        );

        let result = self.dispatcher.send(&request).await;
        match Outcome::from(&result) {
            Outcome::Success(body) => {
                info!(
                    operation = operation.name(),
                    url = %step.url,
                    response = %body,
                    "{}",
                    step.label
                );
            }
            Outcome::Failure(record) => {
                error!(
                    kind = "RequestError",
                    operation = operation.name(),
                    url = %step.url,
                    message = %record.message_text(),
                    status = ?record.status,
                    status_text = ?record.status_text,
                    details = %record.details,
                    "operation failed"
                );
            }
        }
        result.map_err(RunError::from)
    }
}
