//! Print the orchestrator's transition table.

use anyhow::Result;
use std::io::Write;
use sync_core::{transition_table, Facts, SyncMachine, Transition};

/// Run the `table` command.
pub fn run(background: bool, first_ever: bool, all: bool) -> Result<()> {
    let facts = Facts {
        app_in_foreground: !background,
        waiting_for_first_ever_sync: first_ever,
        ..Facts::default()
    };
    let stdout = std::io::stdout();
    render(facts, all, &mut stdout.lock())
}

/// Write the table for `facts`. Ignored events are skipped unless `all`.
pub fn render(facts: Facts, all: bool, out: &mut impl Write) -> Result<()> {
    writeln!(
        out,
        "facts: logged_in={} first_ever_pending={} foreground={} realtime_operational={}",
        facts.user_logged_in,
        facts.waiting_for_first_ever_sync,
        facts.app_in_foreground,
        facts.realtime_operational
    )?;
    writeln!(out)?;
    writeln!(out, "{:<20} {:<28} {:<20} actions", "from", "event", "to")?;

    for row in transition_table(facts) {
        if row.is_ignored() && !all {
            continue;
        }
        writeln!(out, "{}", format_row(&row))?;
    }
    Ok(())
}

fn format_row(row: &Transition) -> String {
    let actions = if row.actions.is_empty() {
        "-".to_string()
    } else {
        row.actions
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    };
    format!(
        "{:<20} {:<28} {:<20} {}",
        machine_label(row.from),
        row.event.name(),
        machine_label(row.to),
        actions
    )
}

/// State name, with `*` when a fallback attempt is in flight.
fn machine_label(machine: SyncMachine) -> String {
    if machine.fallback_attempt_in_progress() {
        format!("{}*", machine.state())
    } else {
        machine.state().to_string()
    }
}
