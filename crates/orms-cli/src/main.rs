mod cmd;
mod output;
mod root;

use anyhow::Context;
use clap::Parser;
use orms_core::config::Config;
use orms_core::{OrmsError, ServiceRegistry};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "orm-helper",
    about = "Start and stop per-ORM databases and services",
    version
)]
struct Cli {
    /// Workspace root (default: auto-detect from pnpm-workspace.yaml, packages/ or .git/)
    #[arg(long, env = "ORM_HELPER_ROOT")]
    root: Option<PathBuf>,

    /// Print the commands that would run instead of running them
    #[arg(long)]
    dry_run: bool,

    /// With --dry-run, print the plan as JSON
    #[arg(long, short = 'j')]
    json: bool,

    /// db:up, db:down, db:reset, service:dev, service:start or dev
    #[arg(value_name = "COMMAND")]
    command: Option<String>,

    /// prisma, typeorm, sequelize, drizzle or all
    #[arg(value_name = "ORM")]
    target: Option<String>,
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        // --help and --version print to stdout and exit 0.
        Err(e) if !e.use_stderr() => e.exit(),
        Err(e) => {
            let _ = e.print();
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(cli) {
        report(&e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let (verb, target) =
        orms_core::parse_invocation(cli.command.as_deref(), cli.target.as_deref())?;

    let root = root::resolve_root(cli.root.as_deref());
    let config = Config::load(&root).context("failed to load orm-helper.yaml")?;
    let registry = ServiceRegistry::new(&root, &config);
    tracing::debug!(root = %root.display(), %verb, %target, "dispatching");

    let plan = orms_core::plan(verb, target, &registry)?;
    tracing::debug!(steps = plan.commands().len(), "planned");
    cmd::run::run(&plan, cli.dry_run, cli.json, config.stop_timeout())
}

fn report(e: &anyhow::Error) {
    match e.downcast_ref::<OrmsError>() {
        Some(err) if err.is_validation() => eprintln!("{err}"),
        // The tool already printed its own diagnostics.
        Some(err @ OrmsError::CommandFailed { .. }) => tracing::debug!("{err}"),
        // Print the full error chain (anyhow's alternate Display)
        _ => eprintln!("error: {e:#}"),
    }
}
