//! `robot run`: launch a revision round, fire-and-forget.
//!
//! Automated callers are never blocked on the oracle session: the launch
//! returns immediately with the session PID and slug; polling or attaching
//! is the caller's business via the oracle's own session mechanism.

use anyhow::Context;
use serde_json::json;

use crate::config;
use crate::context::InvocationContext;
use crate::envelope::Envelope;
use crate::error::ErrorCode;
use crate::lock::LockManager;
use crate::oracle::{generate_slug, LaunchSpec, OracleLauncher, SessionHandle};
use crate::rounds::round_file_name;
use crate::template::build_revision_prompt;

use super::validate;

pub fn run(
    ctx: &InvocationContext,
    raw_round: &str,
    oracle: &dyn OracleLauncher,
) -> anyhow::Result<Envelope> {
    // A malformed round is a usage error; everything validate covers is a
    // structured validation failure.
    let round = super::parse_round(raw_round)?;

    let v = validate::collect(ctx, raw_round, oracle);
    if !v.valid() {
        return Ok(Envelope::failure(
            ErrorCode::ValidationFailed,
            v.to_data(raw_round),
            Some("fix the listed errors, then re-run".into()),
        ));
    }
    let workflow = v
        .workflow
        .context("validation passed without a workflow")?;

    // Guard the (workflow, round) pair before touching anything expensive.
    let lock = LockManager::new(ctx.root()).acquire(&workflow.name, round)?;

    let prompt = build_revision_prompt(&workflow, round, ctx.include_impl)?;
    let slug = generate_slug();

    let tmp_dir = config::apr_dir(ctx.root()).join("tmp");
    std::fs::create_dir_all(&tmp_dir)
        .with_context(|| format!("creating {}", tmp_dir.display()))?;
    let prompt_file = tmp_dir.join(format!("{slug}.prompt.md"));
    std::fs::write(&prompt_file, &prompt)
        .with_context(|| format!("writing {}", prompt_file.display()))?;

    std::fs::create_dir_all(&workflow.output_dir)
        .with_context(|| format!("creating {}", workflow.output_dir.display()))?;
    let output_file = workflow.output_dir.join(round_file_name(round));

    let spec = LaunchSpec {
        model: workflow.oracle_model.clone(),
        prompt_file,
        output_file: output_file.clone(),
        slug: slug.clone(),
        login: false,
        keep_browser: false,
    };
    let pid = oracle.launch_detached(&spec)?;
    let handle = SessionHandle {
        slug,
        pid,
        output_file,
    };

    // Hand the lock to the detached session: it stays live while the
    // session runs and goes stale (reclaimable) the moment it exits.
    lock.transfer(handle.pid)?;

    tracing::info!(
        workflow = %workflow.name,
        round,
        slug = %handle.slug,
        pid = handle.pid,
        "session launched"
    );

    let mut data = serde_json::to_value(&handle)?;
    if let Some(map) = data.as_object_mut() {
        map.insert("workflow".into(), json!(workflow.name));
        map.insert("round".into(), json!(round));
        map.insert("include_impl".into(), json!(ctx.include_impl));
        map.insert("status".into(), json!("running"));
    }
    Ok(Envelope::success(data))
}
