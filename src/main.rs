use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use apr::commands::attach::AttachArgs;
use apr::commands::backfill::BackfillArgs;
use apr::commands::dashboard::DashboardArgs;
use apr::commands::diff::DiffArgs;
use apr::commands::history::HistoryArgs;
use apr::commands::list::ListArgs;
use apr::commands::robot::RobotArgs;
use apr::commands::run::RunArgs;
use apr::commands::setup::SetupArgs;
use apr::commands::show::ShowArgs;
use apr::commands::stats::StatsArgs;
use apr::commands::status::StatusArgs;
use apr::context::EnvSnapshot;
use apr::error::ExitError;
use apr::ui::Ui;
use apr::{telemetry, update};

#[derive(Debug, Parser)]
#[command(
    name = "apr",
    version,
    about = "Multi-round AI document revision orchestrator"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Project root directory (default: current directory)
    #[arg(long, global = true)]
    project_root: Option<PathBuf>,

    /// Suppress informational output (errors are always printed)
    #[arg(short = 'q', long, global = true)]
    quiet: bool,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Launch a revision round
    Run(RunArgs),
    /// Create a workflow interactively
    Setup(SetupArgs),
    /// Show project and oracle status
    Status(StatusArgs),
    /// Attach to a running session by slug
    Attach(AttachArgs),
    /// List configured workflows
    List(ListArgs),
    /// List stored rounds for a workflow
    History(HistoryArgs),
    /// Print a round's content
    Show(ShowArgs),
    /// Diff two rounds
    Diff(DiffArgs),
    /// Round statistics and metric exports
    Stats(StatsArgs),
    /// Retroactively compute round metrics
    Backfill(BackfillArgs),
    /// Terminal dashboard
    Dashboard(DashboardArgs),
    /// Machine-readable command surface for coding agents
    #[command(disable_help_subcommand = true)]
    Robot(RobotArgs),
}

impl Commands {
    const fn name(&self) -> &'static str {
        match self {
            Self::Run(_) => "run",
            Self::Setup(_) => "setup",
            Self::Status(_) => "status",
            Self::Attach(_) => "attach",
            Self::List(_) => "list",
            Self::History(_) => "history",
            Self::Show(_) => "show",
            Self::Diff(_) => "diff",
            Self::Stats(_) => "stats",
            Self::Backfill(_) => "backfill",
            Self::Dashboard(_) => "dashboard",
            Self::Robot(_) => "robot",
        }
    }
}

fn main() -> ExitCode {
    telemetry::init();

    let cli = Cli::parse();
    let env = EnvSnapshot::capture();
    let root = cli
        .project_root
        .clone()
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."));

    let _span = tracing::info_span!("command", name = cli.command.name()).entered();

    match cli.command {
        // Robot mode owns its output contract (one stdout document,
        // structured codes) entirely; nothing else may print around it.
        Commands::Robot(args) => args.execute(root, env),
        command => {
            update::maybe_check(&env);
            let ui = Ui::from_env(&env, cli.quiet);

            let result = match command {
                Commands::Run(args) => args.execute(&root, &env, &ui),
                Commands::Setup(args) => args.execute(&root, &ui),
                Commands::Status(args) => args.execute(&root, &env, &ui),
                Commands::Attach(args) => args.execute(&env),
                Commands::List(args) => args.execute(&root, &ui),
                Commands::History(args) => args.execute(&root, &ui),
                Commands::Show(args) => args.execute(&root, &ui),
                Commands::Diff(args) => args.execute(&root, &ui),
                Commands::Stats(args) => args.execute(&root, &ui),
                Commands::Backfill(args) => args.execute(&root, &ui),
                Commands::Dashboard(args) => args.execute(&root, &ui),
                Commands::Robot(_) => unreachable!("handled above"),
            };

            match result {
                Ok(()) => ExitCode::SUCCESS,
                Err(e) => {
                    ui.error(&format!("{e:#}"));
                    e.downcast_ref::<ExitError>()
                        .map_or(ExitCode::FAILURE, ExitError::exit_code)
                }
            }
        }
    }
}
