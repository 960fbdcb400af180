pub mod attach;
pub mod backfill;
pub mod dashboard;
pub mod diff;
pub mod history;
pub mod list;
pub mod robot;
pub mod run;
pub mod setup;
pub mod show;
pub mod stats;
pub mod status;

use std::path::Path;

use crate::config::{self, WorkflowConfig};

/// Resolve and load the active workflow for a human-mode command.
pub(crate) fn load_workflow(root: &Path, flag: Option<&str>) -> anyhow::Result<WorkflowConfig> {
    let name = config::resolve_workflow_name(root, flag)?;
    WorkflowConfig::load(root, &name)
}
