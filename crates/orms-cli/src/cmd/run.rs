use crate::cmd::dev_all;
use crate::output::{print_json, print_table};
use anyhow::Result;
use orms_core::exec;
use orms_core::{ExternalCommand, Plan};
use std::time::Duration;

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

/// `grace` is how long `dev all` waits after SIGTERM before killing a service.
pub fn run(plan: &Plan, dry_run: bool, json: bool, grace: Duration) -> Result<()> {
    if dry_run {
        return print_plan(plan, json);
    }
    match plan {
        Plan::Sequential { steps } => exec::run_sequence(steps)?,
        Plan::FanOutDev {
            databases,
            services,
        } => dev_all::run(databases, services, grace)?,
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// --dry-run
// ---------------------------------------------------------------------------

fn print_plan(plan: &Plan, json: bool) -> Result<()> {
    if json {
        return print_json(plan);
    }

    let rows = match plan {
        Plan::Sequential { steps } => plan_rows("sequential", steps),
        Plan::FanOutDev {
            databases,
            services,
        } => {
            let mut rows = plan_rows("sequential", databases);
            rows.extend(plan_rows("concurrent", services));
            rows
        }
    };
    print_table(&["PHASE", "STEP", "DIR", "COMMAND"], rows);
    Ok(())
}

fn plan_rows(phase: &str, commands: &[ExternalCommand]) -> Vec<Vec<String>> {
    commands
        .iter()
        .map(|cmd| {
            vec![
                phase.to_string(),
                cmd.label.clone(),
                cmd.cwd
                    .as_ref()
                    .map(|d| d.display().to_string())
                    .unwrap_or_else(|| ".".to_string()),
                cmd.command_line(),
            ]
        })
        .collect()
}
