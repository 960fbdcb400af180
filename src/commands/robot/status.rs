//! `robot status`: configuration and runtime snapshot. Always succeeds;
//! an unconfigured project reports `configured: false` rather than failing.

use serde_json::json;

use crate::config;
use crate::context::InvocationContext;
use crate::envelope::Envelope;
use crate::oracle::{OracleLauncher, SystemOracle};

pub fn run(ctx: &InvocationContext) -> anyhow::Result<Envelope> {
    let root = ctx.root();
    let configured = config::is_configured(root);
    let default = config::default_workflow(root);
    let workflows = config::list_workflows(root);
    let names: Vec<&String> = workflows.iter().map(|(name, _)| name).collect();
    let availability = SystemOracle::from_env(&ctx.env).probe();

    Ok(Envelope::success(json!({
        "configured": configured,
        "default_workflow": if default.is_empty() {
            serde_json::Value::Null
        } else {
            json!(default)
        },
        "workflow_count": names.len(),
        "workflows": names,
        "oracle": availability,
        "paths": {
            "project_root": root.display().to_string(),
            "config": config::config_path(root).display().to_string(),
            "workflows_dir": config::workflows_dir(root).display().to_string(),
            "locks_dir": config::locks_dir(root).display().to_string(),
            "data_dir": data_dir(ctx).map(|p| p.display().to_string()),
            "cache_dir": cache_dir(ctx).map(|p| p.display().to_string()),
        },
    })))
}

/// Data directory: `APR_HOME` override, else the platform default.
fn data_dir(ctx: &InvocationContext) -> Option<std::path::PathBuf> {
    ctx.env
        .home
        .as_ref()
        .map(std::path::PathBuf::from)
        .or_else(|| dirs::data_dir().map(|d| d.join("apr")))
}

/// Cache directory: `APR_CACHE` override, else the platform default.
fn cache_dir(ctx: &InvocationContext) -> Option<std::path::PathBuf> {
    ctx.env
        .cache
        .as_ref()
        .map(std::path::PathBuf::from)
        .or_else(|| dirs::cache_dir().map(|d| d.join("apr")))
}
