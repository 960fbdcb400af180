use std::path::Path;

use clap::Args;

use crate::rounds::RoundStore;
use crate::ui::Ui;

#[derive(Debug, Args)]
pub struct HistoryArgs {
    /// Workflow to inspect
    #[arg(short = 'w', long)]
    pub workflow: Option<String>,
}

impl HistoryArgs {
    pub fn execute(&self, root: &Path, ui: &Ui) -> anyhow::Result<()> {
        let workflow = super::load_workflow(root, self.workflow.as_deref())?;
        let rounds = RoundStore::new(&workflow.output_dir).list();

        if rounds.is_empty() {
            ui.info(&format!("No rounds yet for workflow {:?}.", workflow.name));
            return Ok(());
        }

        ui.info(&format!(
            "{} round(s) for workflow {:?}:",
            rounds.len(),
            workflow.name
        ));
        for round in rounds {
            let when = round.modified.map(crate::metrics::iso_at).unwrap_or_default();
            ui.info(&format!(
                "  round {:<3} {:>8} bytes  {}",
                round.round, round.size_bytes, when
            ));
        }
        Ok(())
    }
}
