use std::path::Path;

use clap::Args;

use crate::config;
use crate::error::ExitError;
use crate::ui::Ui;

#[derive(Debug, Args)]
pub struct ListArgs {}

impl ListArgs {
    pub fn execute(&self, root: &Path, ui: &Ui) -> anyhow::Result<()> {
        if !config::is_configured(root) {
            return Err(ExitError::NotConfigured(format!(
                "no {}/ directory at {}",
                config::APR_DIR,
                root.display()
            ))
            .into());
        }

        let default = config::default_workflow(root);
        let workflows = config::list_workflows(root);
        if workflows.is_empty() {
            ui.info("No workflows configured. Run `apr setup` to create one.");
            return Ok(());
        }

        for (name, description) in workflows {
            let marker = if name == default { "*" } else { " " };
            if description.is_empty() {
                ui.info(&format!("{marker} {name}"));
            } else {
                ui.info(&format!("{marker} {name} — {description}"));
            }
        }
        Ok(())
    }
}
