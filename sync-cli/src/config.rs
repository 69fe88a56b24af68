//! Scenario files for `tidesync run`.
//!
//! A scenario is a TOML document with an optional `[setup]` table and a list
//! of `[[step]]` entries:
//!
//! ```toml
//! [setup]
//! first_ever_pending = true
//! long_sync = "completed"
//!
//! [[step]]
//! action = "start_sync"
//! expect = "REALTIME"
//!
//! [[step]]
//! action = "set_http"
//! outcome = "timed_out"
//! ```

use serde::Deserialize;
use std::path::{Path, PathBuf};
use sync_core::{HttpOutcome, LongSyncOutcome, RealtimeOutcome};
use sync_types::{ParseSyncStateError, SyncState};
use thiserror::Error;

/// Errors raised while loading a scenario.
#[derive(Debug, Error)]
pub enum ScenarioError {
    /// The file could not be read.
    #[error("failed to read scenario {path}: {source}")]
    Read {
        /// Path that was read.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// The document is not valid scenario TOML.
    #[error("invalid scenario: {0}")]
    Parse(#[from] toml::de::Error),

    /// A step is missing a field its action needs.
    #[error("step {step} ({action}): missing `{field}`")]
    MissingField {
        /// 1-based step number.
        step: usize,
        /// Action of the step.
        action: &'static str,
        /// Name of the missing field.
        field: &'static str,
    },

    /// A step's `outcome` does not fit its action.
    #[error("step {step} ({action}): invalid outcome {value:?}")]
    InvalidOutcome {
        /// 1-based step number.
        step: usize,
        /// Action of the step.
        action: &'static str,
        /// Offending value.
        value: String,
    },

    /// A step's `expect` is not a state name.
    #[error("step {step}: {source}")]
    UnknownState {
        /// 1-based step number.
        step: usize,
        /// Parse failure.
        source: ParseSyncStateError,
    },

    /// The scenario has no steps.
    #[error("scenario has no steps")]
    Empty,
}

/// Initial collaborator configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Setup {
    /// A user is logged in.
    pub logged_in: bool,
    /// The first-ever sync has not completed yet.
    pub first_ever_pending: bool,
    /// The app starts in the foreground.
    pub in_foreground: bool,
    /// Scripted request/response sync outcome.
    pub http: HttpOutcome,
    /// Scripted long-poll sync outcome.
    pub long_sync: LongSyncOutcome,
    /// Scripted realtime attempt outcome.
    pub realtime: RealtimeOutcome,
    /// Realtime init fails.
    pub realtime_init_fails: bool,
    /// The realtime channel starts operational.
    pub realtime_operational: bool,
}

impl Default for Setup {
    fn default() -> Self {
        Self {
            logged_in: true,
            first_ever_pending: false,
            in_foreground: true,
            http: HttpOutcome::default(),
            long_sync: LongSyncOutcome::default(),
            realtime: RealtimeOutcome::default(),
            realtime_init_fails: false,
            realtime_operational: true,
        }
    }
}

/// Step as written in the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
enum ActionName {
    StartSync,
    Reset,
    Foreground,
    Background,
    SpuriousShutdown,
    CompleteHttp,
    HttpUnsuccessful,
    HttpTimeout,
    CompleteLongSync,
    SetForeground,
    SetLoggedIn,
    SetHttp,
    SetLongSync,
    SetRealtime,
    SetRealtimeInitFails,
}

impl ActionName {
    fn as_str(self) -> &'static str {
        match self {
            ActionName::StartSync => "start_sync",
            ActionName::Reset => "reset",
            ActionName::Foreground => "foreground",
            ActionName::Background => "background",
            ActionName::SpuriousShutdown => "spurious_shutdown",
            ActionName::CompleteHttp => "complete_http",
            ActionName::HttpUnsuccessful => "http_unsuccessful",
            ActionName::HttpTimeout => "http_timeout",
            ActionName::CompleteLongSync => "complete_long_sync",
            ActionName::SetForeground => "set_foreground",
            ActionName::SetLoggedIn => "set_logged_in",
            ActionName::SetHttp => "set_http",
            ActionName::SetLongSync => "set_long_sync",
            ActionName::SetRealtime => "set_realtime",
            ActionName::SetRealtimeInitFails => "set_realtime_init_fails",
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawStep {
    action: ActionName,
    value: Option<bool>,
    outcome: Option<String>,
    expect: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawScenario {
    #[serde(default)]
    setup: Setup,
    #[serde(default)]
    step: Vec<RawStep>,
}

/// One validated scenario step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepAction {
    /// Call `start_sync`.
    StartSync,
    /// Call `reset`.
    Reset,
    /// Move the app to the foreground and notify.
    Foreground,
    /// Move the app to the background and notify.
    Background,
    /// Drop the realtime channel unsolicited.
    SpuriousShutdown,
    /// Report a request/response outcome now.
    CompleteHttp(HttpOutcome),
    /// Report long-poll completion now.
    CompleteLongSync,
    /// Change the foreground flag silently.
    SetForeground(bool),
    /// Change the login state.
    SetLoggedIn(bool),
    /// Script later request/response outcomes.
    SetHttp(HttpOutcome),
    /// Script later long-poll outcomes.
    SetLongSync(LongSyncOutcome),
    /// Script later realtime attempt outcomes.
    SetRealtime(RealtimeOutcome),
    /// Make later realtime inits fail (or succeed).
    SetRealtimeInitFails(bool),
}

/// A step plus its optional expectation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    /// Action name as written.
    pub name: &'static str,
    /// What to do.
    pub action: StepAction,
    /// State required after the step.
    pub expect: Option<SyncState>,
}

/// A loaded scenario.
#[derive(Debug, Clone)]
pub struct Scenario {
    /// Initial configuration.
    pub setup: Setup,
    /// Steps in order.
    pub steps: Vec<Step>,
}

impl Scenario {
    /// Load a scenario from a file.
    pub async fn load(path: &Path) -> Result<Self, ScenarioError> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|source| ScenarioError::Read {
                path: path.to_path_buf(),
                source,
            })?;
        Self::parse(&contents)
    }

    /// Parse and validate a scenario document.
    pub fn parse(contents: &str) -> Result<Self, ScenarioError> {
        let raw: RawScenario = toml::from_str(contents)?;
        if raw.step.is_empty() {
            return Err(ScenarioError::Empty);
        }

        let steps = raw
            .step
            .into_iter()
            .enumerate()
            .map(|(i, step)| validate(i + 1, step))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            setup: raw.setup,
            steps,
        })
    }
}

fn validate(step: usize, raw: RawStep) -> Result<Step, ScenarioError> {
    let name = raw.action.as_str();
    let value = || {
        raw.value.ok_or(ScenarioError::MissingField {
            step,
            action: name,
            field: "value",
        })
    };

    let action = match raw.action {
        ActionName::StartSync => StepAction::StartSync,
        ActionName::Reset => StepAction::Reset,
        ActionName::Foreground => StepAction::Foreground,
        ActionName::Background => StepAction::Background,
        ActionName::SpuriousShutdown => StepAction::SpuriousShutdown,
        ActionName::CompleteHttp => StepAction::CompleteHttp(HttpOutcome::Completed),
        ActionName::HttpUnsuccessful => StepAction::CompleteHttp(HttpOutcome::Unsuccessful),
        ActionName::HttpTimeout => StepAction::CompleteHttp(HttpOutcome::TimedOut),
        ActionName::CompleteLongSync => StepAction::CompleteLongSync,
        ActionName::SetForeground => StepAction::SetForeground(value()?),
        ActionName::SetLoggedIn => StepAction::SetLoggedIn(value()?),
        ActionName::SetRealtimeInitFails => StepAction::SetRealtimeInitFails(value()?),
        ActionName::SetHttp => StepAction::SetHttp(outcome(step, name, raw.outcome.as_deref())?),
        ActionName::SetLongSync => {
            StepAction::SetLongSync(outcome(step, name, raw.outcome.as_deref())?)
        }
        ActionName::SetRealtime => {
            StepAction::SetRealtime(outcome(step, name, raw.outcome.as_deref())?)
        }
    };

    let expect = raw
        .expect
        .as_deref()
        .map(str::parse::<SyncState>)
        .transpose()
        .map_err(|source| ScenarioError::UnknownState { step, source })?;

    Ok(Step {
        name,
        action,
        expect,
    })
}

/// Decode an outcome name through the outcome type's serde representation.
fn outcome<T>(step: usize, action: &'static str, value: Option<&str>) -> Result<T, ScenarioError>
where
    T: for<'de> Deserialize<'de>,
{
    let value = value.ok_or(ScenarioError::MissingField {
        step,
        action,
        field: "outcome",
    })?;
    toml::Value::String(value.to_string())
        .try_into()
        .map_err(|_| ScenarioError::InvalidOutcome {
            step,
            action,
            value: value.to_string(),
        })
}
