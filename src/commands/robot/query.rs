//! Read-only robot queries: `show`, `diff`, `history`.

use serde_json::json;

use crate::config::{self, WorkflowConfig};
use crate::context::InvocationContext;
use crate::envelope::Envelope;
use crate::error::ExitError;
use crate::metrics::iso_at;
use crate::rounds::RoundStore;

fn load_workflow(ctx: &InvocationContext) -> anyhow::Result<WorkflowConfig> {
    let name = config::resolve_workflow_name(ctx.root(), ctx.workflow_flag())?;
    WorkflowConfig::load(ctx.root(), &name)
}

pub fn show(ctx: &InvocationContext, raw_round: &str) -> anyhow::Result<Envelope> {
    let round = super::parse_round(raw_round)?;
    let workflow = load_workflow(ctx)?;
    let content = RoundStore::new(&workflow.output_dir).read(round)?;
    Ok(Envelope::success(json!({
        "workflow": workflow.name,
        "round": round,
        "content": content,
    })))
}

pub fn diff(ctx: &InvocationContext, raw_a: &str, raw_b: Option<&str>) -> anyhow::Result<Envelope> {
    let workflow = load_workflow(ctx)?;
    let store = RoundStore::new(&workflow.output_dir);

    let result = match raw_b {
        Some(raw_b) => {
            let a = super::parse_round(raw_a)?;
            let b = super::parse_round(raw_b)?;
            store.diff(a, b)?
        }
        None => store.diff_prev(super::parse_round(raw_a)?)?,
    };

    Ok(Envelope::success(json!({
        "workflow": workflow.name,
        "comparing": { "from": result.from, "to": result.to },
        "diff": result.diff,
    })))
}

pub fn history(ctx: &InvocationContext) -> anyhow::Result<Envelope> {
    let workflow = load_workflow(ctx)?;
    if !workflow.output_dir.is_dir() {
        return Err(ExitError::ValidationFailed(format!(
            "rounds directory {} does not exist",
            workflow.output_dir.display()
        ))
        .into());
    }

    let rounds: Vec<serde_json::Value> = RoundStore::new(&workflow.output_dir)
        .list()
        .into_iter()
        .map(|r| {
            json!({
                "round": r.round,
                "size_bytes": r.size_bytes,
                "modified": r.modified.map(iso_at),
            })
        })
        .collect();

    Ok(Envelope::success(json!({
        "workflow": workflow.name,
        "count": rounds.len(),
        "rounds": rounds,
    })))
}
