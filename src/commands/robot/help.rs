//! `robot help`: structured documentation of the robot surface.
//!
//! Built by walking the same clap command tree that parses the CLI, so this
//! output and `apr robot --help` cannot drift apart.

use clap::{Args, Command};
use serde_json::json;

use crate::context::InvocationContext;
use crate::envelope::Envelope;

pub fn run(_ctx: &InvocationContext) -> anyhow::Result<Envelope> {
    let cmd = super::RobotArgs::augment_args(Command::new("robot").disable_help_subcommand(true));

    let flags: Vec<serde_json::Value> = cmd
        .get_arguments()
        .filter(|a| a.get_id() != "help")
        .map(describe_arg)
        .collect();

    let commands: Vec<serde_json::Value> = cmd
        .get_subcommands()
        .filter(|sub| sub.get_name() != "help")
        .map(|sub| {
            let args: Vec<serde_json::Value> = sub
                .get_arguments()
                .filter(|a| a.get_id() != "help")
                .map(describe_arg)
                .collect();
            json!({
                "name": sub.get_name(),
                "about": sub.get_about().map(ToString::to_string).unwrap_or_default(),
                "args": args,
            })
        })
        .collect();

    Ok(Envelope::success(json!({
        "tool": "apr robot",
        "flags": flags,
        "commands": commands,
    })))
}

fn describe_arg(arg: &clap::Arg) -> serde_json::Value {
    json!({
        "name": arg.get_id().as_str(),
        "long": arg.get_long(),
        "short": arg.get_short().map(String::from),
        "positional": arg.is_positional(),
        "help": arg.get_help().map(ToString::to_string).unwrap_or_default(),
    })
}
