use std::path::Path;

use chrono::{Duration, Utc};
use clap::Args;

use crate::config;
use crate::context::EnvSnapshot;
use crate::oracle::{OracleLauncher, SystemOracle};
use crate::rounds::RoundStore;
use crate::ui::Ui;

#[derive(Debug, Args)]
pub struct StatusArgs {
    /// Look-back window for recent activity
    #[arg(long, default_value_t = 24)]
    pub hours: i64,
}

impl StatusArgs {
    pub fn execute(&self, root: &Path, env: &EnvSnapshot, ui: &Ui) -> anyhow::Result<()> {
        if !config::is_configured(root) {
            ui.info("Not configured. Run `apr robot init`, then `apr setup`.");
            return Ok(());
        }

        let default = config::default_workflow(root);
        let workflows = config::list_workflows(root);
        ui.info(&format!(
            "{} workflow(s); default: {}",
            workflows.len(),
            if default.is_empty() { "(none)" } else { &default }
        ));

        let availability = SystemOracle::from_env(env).probe();
        if availability.available {
            ui.info(&format!(
                "oracle: available via {} ({})",
                availability.method,
                availability.version.as_deref().unwrap_or("unknown version")
            ));
        } else {
            ui.warn(&format!(
                "oracle: NOT available ({:?} via {})",
                availability.bin, availability.method
            ));
        }

        let cutoff = Utc::now() - Duration::hours(self.hours);
        let mut recent = 0usize;
        for (name, _) in &workflows {
            let Ok(workflow) = config::WorkflowConfig::load(root, name) else {
                continue;
            };
            for round in RoundStore::new(&workflow.output_dir).list() {
                if round.modified.is_some_and(|t| t > cutoff) {
                    ui.info(&format!(
                        "  {name}: round {} updated {}",
                        round.round,
                        round.modified.map(crate::metrics::iso_at).unwrap_or_default()
                    ));
                    recent += 1;
                }
            }
        }
        if recent == 0 {
            ui.info(&format!("no round activity in the last {}h", self.hours));
        }
        Ok(())
    }
}
