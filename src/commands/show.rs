use std::path::Path;

use clap::Args;

use crate::rounds::RoundStore;
use crate::ui::Ui;

#[derive(Debug, Args)]
pub struct ShowArgs {
    /// Round number
    pub round: u32,
    /// Workflow to inspect
    #[arg(short = 'w', long)]
    pub workflow: Option<String>,
}

impl ShowArgs {
    pub fn execute(&self, root: &Path, ui: &Ui) -> anyhow::Result<()> {
        let workflow = super::load_workflow(root, self.workflow.as_deref())?;
        let content = RoundStore::new(&workflow.output_dir).read(self.round)?;
        ui.markdown(&content);
        Ok(())
    }
}
