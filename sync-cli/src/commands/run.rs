//! Replay a scenario against an orchestrator wired to mock collaborators.

use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::io::Write;
use std::path::Path;
use sync_core::{MockCollaborators, SyncOrchestrator, SyncSnapshot};
use sync_types::SyncState;

use crate::config::{Scenario, Setup, Step, StepAction};

/// One line of `--json` output.
#[derive(Debug, Serialize)]
struct StepReport<'a> {
    step: usize,
    action: &'a str,
    #[serde(flatten)]
    snapshot: SyncSnapshot,
    #[serde(skip_serializing_if = "Option::is_none")]
    expected: Option<SyncState>,
}

/// Run the `run` command.
pub async fn run(path: &Path, json: bool) -> Result<()> {
    let scenario = Scenario::load(path)
        .await
        .context("Failed to load scenario")?;
    let stdout = std::io::stdout();
    replay(&scenario, &mut stdout.lock(), json)
}

/// Replay `scenario`, writing one line per step to `out`.
///
/// Stops at the first step whose resulting state differs from its `expect`.
pub fn replay(scenario: &Scenario, out: &mut impl Write, json: bool) -> Result<()> {
    let mocks = MockCollaborators::new();
    arrange(&mocks, &scenario.setup);
    let orchestrator = SyncOrchestrator::new(mocks.collaborators());

    for (i, step) in scenario.steps.iter().enumerate() {
        let number = i + 1;
        tracing::debug!(step = number, action = step.name, "replaying step");
        perform(&orchestrator, &mocks, step);

        let snapshot = orchestrator.snapshot();
        if json {
            let report = StepReport {
                step: number,
                action: step.name,
                snapshot,
                expected: step.expect,
            };
            writeln!(out, "{}", serde_json::to_string(&report)?)?;
        } else {
            let verdict = match step.expect {
                Some(expected) if expected == snapshot.state => "  ok",
                Some(_) => "  FAILED",
                None => "",
            };
            writeln!(
                out,
                "[{:>3}] {:<24} -> {}{}",
                number, step.name, snapshot.state, verdict
            )?;
        }

        if let Some(expected) = step.expect {
            if expected != snapshot.state {
                bail!(
                    "step {} ({}): expected {}, got {}",
                    number,
                    step.name,
                    expected,
                    snapshot.state
                );
            }
        }
    }

    if !json {
        writeln!(out)?;
        writeln!(
            out,
            "calls: http={} long_sync={} realtime={} realtime_init={} realtime_shut_down={}",
            mocks.http.calls(),
            mocks.long_sync.calls(),
            mocks.realtime.sync_calls(),
            mocks.realtime.init_calls(),
            mocks.realtime.shut_down_calls(),
        )?;
    }

    Ok(())
}

fn arrange(mocks: &MockCollaborators, setup: &Setup) {
    mocks.login.set_logged_in(setup.logged_in);
    mocks
        .preferences
        .set_waiting_for_first_ever_sync(setup.first_ever_pending);
    mocks.foreground.set_in_foreground(setup.in_foreground);
    mocks.http.set_outcome(setup.http);
    mocks.long_sync.set_outcome(setup.long_sync);
    mocks.realtime.set_outcome(setup.realtime);
    mocks.realtime.set_init_fails(setup.realtime_init_fails);
    mocks.realtime.set_operational(setup.realtime_operational);
}

fn perform(orchestrator: &SyncOrchestrator, mocks: &MockCollaborators, step: &Step) {
    match step.action {
        StepAction::StartSync => orchestrator.start_sync(),
        StepAction::Reset => orchestrator.reset(),
        StepAction::Foreground => mocks.foreground.notify_foreground(),
        StepAction::Background => mocks.foreground.notify_background(),
        StepAction::SpuriousShutdown => mocks.realtime.spurious_shut_down(),
        StepAction::CompleteHttp(outcome) => mocks.http.complete(outcome),
        StepAction::CompleteLongSync => mocks.long_sync.complete(),
        StepAction::SetForeground(value) => mocks.foreground.set_in_foreground(value),
        StepAction::SetLoggedIn(value) => mocks.login.set_logged_in(value),
        StepAction::SetHttp(outcome) => mocks.http.set_outcome(outcome),
        StepAction::SetLongSync(outcome) => mocks.long_sync.set_outcome(outcome),
        StepAction::SetRealtime(outcome) => mocks.realtime.set_outcome(outcome),
        StepAction::SetRealtimeInitFails(value) => mocks.realtime.set_init_fails(value),
    }
}
