//! Robot mode: the machine-oriented command surface.
//!
//! Every subcommand writes exactly one JSON (or TOON) document to stdout.
//! Failures additionally write an `APR_ERROR_CODE=<code>` line to stderr so
//! shell callers can branch without a JSON parser. The process exits 0 iff
//! the envelope says `ok`.

pub mod help;
pub mod init;
pub mod integrate;
pub mod query;
pub mod run;
pub mod stats;
pub mod status;
pub mod validate;
pub mod workflows;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Subcommand};
use serde_json::json;

use crate::context::{EnvSnapshot, InvocationContext, OutputFormat};
use crate::envelope::{self, Envelope};
use crate::error::ExitError;
use crate::oracle::SystemOracle;

#[derive(Debug, Args)]
pub struct RobotArgs {
    #[command(subcommand)]
    pub command: RobotCommand,

    /// Workflow to operate on (default: the project's default_workflow)
    #[arg(short = 'w', long, global = true)]
    pub workflow: Option<String>,

    /// Output format
    #[arg(short = 'f', long, global = true, value_enum)]
    pub format: Option<OutputFormat>,

    /// Minify the JSON output
    #[arg(long, global = true)]
    pub compact: bool,

    /// Report JSON/TOON byte sizes on stderr
    #[arg(long = "stats", global = true)]
    pub emit_stats: bool,

    /// Include the implementation document in prompts
    #[arg(short = 'i', long = "include-impl", global = true)]
    pub include_impl: bool,
}

#[derive(Debug, Subcommand)]
pub enum RobotCommand {
    /// Report configuration and runtime environment
    Status,
    /// List configured workflows
    Workflows,
    /// Create the .apr/ directory skeleton (idempotent)
    Init,
    /// Check preconditions for a revision round without running it
    Validate {
        /// Round number
        round: String,
    },
    /// Launch a revision round (fire-and-forget)
    Run {
        /// Round number
        round: String,
    },
    /// Print a round's content
    Show {
        /// Round number
        round: String,
    },
    /// Diff two rounds (or one round against its predecessor)
    Diff {
        /// "From" round
        a: String,
        /// "To" round (default: a against a-1)
        b: Option<String>,
    },
    /// List stored rounds in ascending order
    History,
    /// Export round metrics
    Stats {
        /// Export format: json, csv, or md
        #[arg(long, value_name = "FMT")]
        export: Option<String>,
        /// Restrict to an inclusive round range (A-B)
        #[arg(long, value_name = "A-B")]
        rounds: Option<String>,
    },
    /// Render the integration prompt for a completed round
    Integrate {
        /// Round number
        round: String,
        /// Write the prompt to a file instead of the envelope
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Describe the robot command surface
    Help,
}

impl RobotArgs {
    pub fn execute(self, project_root: PathBuf, env: EnvSnapshot) -> ExitCode {
        let ctx = InvocationContext::new(
            project_root,
            self.workflow,
            self.format,
            self.compact,
            self.emit_stats,
            self.include_impl,
            env,
        );

        let result = match self.command {
            RobotCommand::Status => status::run(&ctx),
            RobotCommand::Workflows => workflows::run(&ctx),
            RobotCommand::Init => init::run(&ctx),
            RobotCommand::Validate { round } => validate::run(&ctx, &round),
            RobotCommand::Run { round } => {
                let oracle = SystemOracle::from_env(&ctx.env);
                run::run(&ctx, &round, &oracle)
            }
            RobotCommand::Show { round } => query::show(&ctx, &round),
            RobotCommand::Diff { a, b } => query::diff(&ctx, &a, b.as_deref()),
            RobotCommand::History => query::history(&ctx),
            RobotCommand::Stats { export, rounds } => {
                stats::run(&ctx, export.as_deref(), rounds.as_deref())
            }
            RobotCommand::Integrate { round, output } => {
                integrate::run(&ctx, &round, output.as_deref())
            }
            RobotCommand::Help => help::run(&ctx),
        };

        let envelope = match result {
            Ok(envelope) => envelope,
            Err(err) => match err.downcast_ref::<ExitError>() {
                Some(exit_err) => envelope_for(exit_err),
                None => {
                    // Truly unexpected condition: unstructured stderr, exit 1.
                    eprintln!("error: {err:#}");
                    return ExitCode::FAILURE;
                }
            },
        };

        let rendered = envelope::render(&envelope, &ctx);
        envelope::emit(&rendered);

        if envelope.ok {
            ExitCode::SUCCESS
        } else {
            eprintln!("APR_ERROR_CODE={}", envelope.code);
            envelope.code.exit_code()
        }
    }
}

/// Convert a foreseeable failure into a structured envelope.
fn envelope_for(err: &ExitError) -> Envelope {
    Envelope::failure(
        err.error_code(),
        json!({ "error": err.to_string() }),
        hint_for(err),
    )
}

fn hint_for(err: &ExitError) -> Option<String> {
    match err {
        ExitError::NotConfigured(_) => {
            Some("run `apr robot init`, then `apr setup` to create a workflow".into())
        }
        ExitError::LockHeld { .. } => {
            Some("another revision round is in progress; wait for it or let a dead lock go stale".into())
        }
        ExitError::ToolNotFound { tool } => {
            Some(format!("install {tool} or point the matching APR_*_BIN variable at it"))
        }
        _ => None,
    }
}

/// Parse a round argument, mapping non-numeric input to a usage error.
pub(crate) fn parse_round(raw: &str) -> anyhow::Result<u32> {
    match raw.trim().parse::<u32>() {
        Ok(n) if n >= 1 => Ok(n),
        _ => Err(ExitError::Usage(format!(
            "round must be a positive integer, got {raw:?}"
        ))
        .into()),
    }
}
