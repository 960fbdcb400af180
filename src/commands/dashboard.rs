use std::io::IsTerminal;
use std::path::Path;

use clap::Args;

use crate::config;
use crate::error::ExitError;
use crate::rounds::RoundStore;
use crate::ui::Ui;

#[derive(Debug, Args)]
pub struct DashboardArgs {}

impl DashboardArgs {
    pub fn execute(&self, root: &Path, ui: &Ui) -> anyhow::Result<()> {
        if !std::io::stdout().is_terminal() {
            return Err(ExitError::Other(
                "dashboard requires an interactive terminal (stdout is not a TTY); \
                 use `apr robot status` for machine-readable output"
                    .into(),
            )
            .into());
        }
        if !config::is_configured(root) {
            return Err(ExitError::NotConfigured(
                "nothing to show; run `apr robot init` first".into(),
            )
            .into());
        }

        use std::fmt::Write;
        let default = config::default_workflow(root);
        let mut md = String::from("# apr dashboard\n\n");
        md.push_str("| Workflow | Rounds | Last activity |\n|---|---|---|\n");
        for (name, _) in config::list_workflows(root) {
            let Ok(workflow) = config::WorkflowConfig::load(root, &name) else {
                continue;
            };
            let rounds = RoundStore::new(&workflow.output_dir).list();
            let last = rounds
                .iter()
                .filter_map(|r| r.modified)
                .max()
                .map(crate::metrics::iso_at)
                .unwrap_or_else(|| "-".into());
            let marker = if name == default { " (default)" } else { "" };
            let _ = writeln!(md, "| {name}{marker} | {} | {last} |", rounds.len());
        }
        ui.markdown(&md);
        Ok(())
    }
}
