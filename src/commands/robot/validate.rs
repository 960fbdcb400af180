//! `robot validate`: check every precondition for a revision round without
//! committing to the expensive oracle call.

use serde_json::json;

use crate::config::{self, WorkflowConfig};
use crate::context::InvocationContext;
use crate::envelope::Envelope;
use crate::error::ErrorCode;
use crate::oracle::{OracleLauncher, SystemOracle};
use crate::rounds::{round_file_name, RoundStore};

/// Outcome of the precondition checks, shared with `robot run`.
#[derive(Debug)]
pub struct Validation {
    pub round: Option<u32>,
    pub workflow: Option<WorkflowConfig>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl Validation {
    pub fn valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// The `{valid, errors, warnings, workflow, round}` payload.
    pub fn to_data(&self, raw_round: &str) -> serde_json::Value {
        json!({
            "valid": self.valid(),
            "errors": self.errors,
            "warnings": self.warnings,
            "workflow": self.workflow.as_ref().map(|w| w.name.clone()),
            "round": self.round.map_or_else(|| json!(raw_round), |n| json!(n)),
        })
    }
}

/// Run every check, accumulating errors and warnings instead of stopping at
/// the first failure so callers see the whole picture at once.
pub fn collect(
    ctx: &InvocationContext,
    raw_round: &str,
    oracle: &dyn OracleLauncher,
) -> Validation {
    let mut v = Validation {
        round: None,
        workflow: None,
        errors: Vec::new(),
        warnings: Vec::new(),
    };

    match raw_round.trim().parse::<u32>() {
        Ok(n) if n >= 1 => v.round = Some(n),
        _ => v
            .errors
            .push(format!("round must be a positive integer, got {raw_round:?}")),
    }

    let root = ctx.root();
    if config::is_configured(root) {
        match config::resolve_workflow_name(root, ctx.workflow_flag()) {
            Ok(name) => match WorkflowConfig::load(root, &name) {
                Ok(workflow) => v.workflow = Some(workflow),
                Err(e) => v.errors.push(e.to_string()),
            },
            Err(e) => v.errors.push(e.to_string()),
        }
    } else {
        v.errors.push(format!(
            "no {}/ directory at {}",
            config::APR_DIR,
            root.display()
        ));
    }

    if let Some(workflow) = &v.workflow {
        for (label, path) in [("readme", &workflow.readme), ("spec", &workflow.spec)] {
            if !path.is_file() {
                v.errors
                    .push(format!("{label} document missing: {}", path.display()));
            }
        }
        if ctx.include_impl {
            match &workflow.implementation {
                Some(path) if !path.is_file() => v
                    .errors
                    .push(format!("implementation document missing: {}", path.display())),
                Some(_) => {}
                None => v.warnings.push(
                    "include-impl requested but the workflow defines no implementation document"
                        .into(),
                ),
            }
        }
        if workflow.prompt_template(ctx.include_impl).is_empty() {
            v.warnings
                .push("workflow defines no template; the built-in default will be used".into());
        }
    }

    let availability = oracle.probe();
    if !availability.available {
        v.errors.push(format!(
            "oracle binary {:?} not available (via {})",
            availability.bin, availability.method
        ));
    }

    if let (Some(round), Some(workflow)) = (v.round, &v.workflow) {
        let store = RoundStore::new(&workflow.output_dir);
        if round > 1 {
            let prev = store.round_path(round - 1);
            if !prev.is_file() {
                v.errors.push(format!(
                    "previous round output missing: {} ({})",
                    round_file_name(round - 1),
                    prev.display()
                ));
            }
        }
        if store.round_path(round).is_file() {
            v.warnings
                .push(format!("round {round} output already exists and will be replaced"));
        }
    }

    v
}

pub fn run(ctx: &InvocationContext, raw_round: &str) -> anyhow::Result<Envelope> {
    let oracle = SystemOracle::from_env(&ctx.env);
    let v = collect(ctx, raw_round, &oracle);
    let data = v.to_data(raw_round);
    if v.valid() {
        Ok(Envelope::success(data))
    } else {
        Ok(Envelope::failure(
            ErrorCode::ValidationFailed,
            data,
            Some("fix the listed errors, then re-run validate".into()),
        ))
    }
}
