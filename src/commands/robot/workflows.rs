//! `robot workflows`: list configured workflows.

use serde_json::json;

use crate::config;
use crate::context::InvocationContext;
use crate::envelope::Envelope;
use crate::error::ExitError;

pub fn run(ctx: &InvocationContext) -> anyhow::Result<Envelope> {
    let root = ctx.root();
    if !config::is_configured(root) {
        return Err(ExitError::NotConfigured(format!(
            "no {}/ directory at {}",
            config::APR_DIR,
            root.display()
        ))
        .into());
    }

    let workflows: Vec<serde_json::Value> = config::list_workflows(root)
        .into_iter()
        .map(|(name, description)| json!({ "name": name, "description": description }))
        .collect();

    Ok(Envelope::success(json!({
        "count": workflows.len(),
        "workflows": workflows,
    })))
}
