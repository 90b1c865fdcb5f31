//! Pure mapping from a validated `(Verb, Target)` pair to the external
//! commands it runs. Nothing here touches the filesystem or spawns processes.

use crate::command::{quote, ExternalCommand};
use crate::error::{OrmsError, Result};
use crate::registry::ServiceRegistry;
use crate::types::{Orm, Target, Verb};
use serde::Serialize;

/// What an invocation will run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Plan {
    /// Run each step to completion in order; the first failure aborts.
    Sequential { steps: Vec<ExternalCommand> },
    /// Bring every database up in order, then run every service concurrently.
    FanOutDev {
        databases: Vec<ExternalCommand>,
        services: Vec<ExternalCommand>,
    },
}

impl Plan {
    /// Every command in execution order (fan-out services listed last).
    pub fn commands(&self) -> Vec<&ExternalCommand> {
        match self {
            Plan::Sequential { steps } => steps.iter().collect(),
            Plan::FanOutDev {
                databases,
                services,
            } => databases.iter().chain(services.iter()).collect(),
        }
    }
}

/// Validate the two positional arguments.
///
/// Order: missing arguments, then the target, then the command, then the
/// command/target combination. Empty strings count as missing.
pub fn parse_invocation(command: Option<&str>, target: Option<&str>) -> Result<(Verb, Target)> {
    let (Some(command), Some(target)) = (
        command.filter(|s| !s.is_empty()),
        target.filter(|s| !s.is_empty()),
    ) else {
        return Err(OrmsError::MissingArguments);
    };

    let target: Target = target.parse()?;
    let verb: Verb = command.parse()?;

    if target == Target::All && !verb.supports_fan_out() {
        return Err(OrmsError::UnsupportedFanOut(verb.as_str().to_string()));
    }
    Ok((verb, target))
}

/// Resolve the commands for `verb` applied to `target`.
pub fn plan(verb: Verb, target: Target, registry: &ServiceRegistry) -> Result<Plan> {
    match (verb, target) {
        (Verb::Dev, Target::All) => Ok(Plan::FanOutDev {
            databases: Orm::ALL.iter().map(|o| db_up(registry, *o)).collect(),
            services: Orm::ALL
                .iter()
                .map(|o| service_task(registry, *o, Verb::ServiceDev))
                .collect(),
        }),
        (Verb::ServiceDev | Verb::ServiceStart, Target::All) => {
            Err(OrmsError::UnsupportedFanOut(verb.as_str().to_string()))
        }
        _ => {
            let steps = target
                .orms()
                .into_iter()
                .flat_map(|orm| single_target_steps(verb, orm, registry))
                .collect();
            Ok(Plan::Sequential { steps })
        }
    }
}

fn single_target_steps(verb: Verb, orm: Orm, registry: &ServiceRegistry) -> Vec<ExternalCommand> {
    match verb {
        Verb::DbUp => vec![db_up(registry, orm)],
        Verb::DbDown => vec![db_down(registry, orm)],
        Verb::DbReset => vec![db_reset(registry, orm)],
        Verb::ServiceDev => vec![service_task(registry, orm, verb)],
        Verb::ServiceStart => vec![service_task(registry, orm, verb)],
        Verb::Dev => vec![
            db_up(registry, orm),
            service_task(registry, orm, Verb::ServiceDev),
        ],
    }
}

fn label(orm: Orm, verb: Verb) -> String {
    format!("{orm} {verb}")
}

fn db_up(registry: &ServiceRegistry, orm: Orm) -> ExternalCommand {
    ExternalCommand::new(label(orm, Verb::DbUp), &registry.tools().docker)
        .args(["compose", "up", "-d"])
        .current_dir(registry.package_dir(orm))
}

fn db_down(registry: &ServiceRegistry, orm: Orm) -> ExternalCommand {
    ExternalCommand::new(label(orm, Verb::DbDown), &registry.tools().docker)
        .args(["compose", "down"])
        .current_dir(registry.package_dir(orm))
}

/// `down -v` and `up -d` composed into a single shell step.
fn db_reset(registry: &ServiceRegistry, orm: Orm) -> ExternalCommand {
    let tools = registry.tools();
    let docker = quote(&tools.docker);
    ExternalCommand::shell(
        label(orm, Verb::DbReset),
        &tools.shell,
        format!("{docker} compose down -v && {docker} compose up -d"),
    )
    .current_dir(registry.package_dir(orm))
}

/// `dotenv -e .env -- pnpm --filter <service> dev|start` from the workspace root.
fn service_task(registry: &ServiceRegistry, orm: Orm, verb: Verb) -> ExternalCommand {
    let tools = registry.tools();
    let task = match verb {
        Verb::ServiceStart => "start",
        _ => "dev",
    };
    ExternalCommand::new(label(orm, verb), &tools.dotenv)
        .args(["-e", registry.env_file(), "--"])
        .arg(&tools.pnpm)
        .args(["--filter", registry.service_name(orm), task])
        .current_dir(registry.root())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
