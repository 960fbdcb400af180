use std::path::Path;

use clap::Args;

use crate::config::{self, WorkflowConfig};
use crate::metrics;
use crate::ui::Ui;

#[derive(Debug, Args)]
pub struct BackfillArgs {
    /// Workflow to backfill
    #[arg(short = 'w', long)]
    pub workflow: Option<String>,
    /// Backfill every configured workflow
    #[arg(long)]
    pub all: bool,
    /// Recompute metrics even for rounds that already have entries
    #[arg(long)]
    pub force: bool,
}

impl BackfillArgs {
    pub fn execute(&self, root: &Path, ui: &Ui) -> anyhow::Result<()> {
        let targets: Vec<String> = if self.all {
            config::list_workflows(root)
                .into_iter()
                .map(|(name, _)| name)
                .collect()
        } else {
            vec![config::resolve_workflow_name(root, self.workflow.as_deref())?]
        };

        if targets.is_empty() {
            ui.info("No workflows to backfill.");
            return Ok(());
        }

        for name in targets {
            let workflow = WorkflowConfig::load(root, &name)?;
            if !workflow.output_dir.is_dir() {
                ui.warn(&format!("{name}: no rounds directory, skipping"));
                continue;
            }
            let (_, outcome) = metrics::backfill(root, &workflow, self.force)?;
            ui.success(&format!(
                "{name}: {} computed, {} kept, {} total",
                outcome.computed, outcome.skipped, outcome.total
            ));
        }
        Ok(())
    }
}
