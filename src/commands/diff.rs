use std::path::Path;

use clap::Args;

use crate::rounds::RoundStore;
use crate::ui::Ui;

#[derive(Debug, Args)]
pub struct DiffArgs {
    /// "From" round
    pub a: u32,
    /// "To" round (default: compare A against A-1)
    pub b: Option<u32>,
    /// Workflow to inspect
    #[arg(short = 'w', long)]
    pub workflow: Option<String>,
}

impl DiffArgs {
    pub fn execute(&self, root: &Path, ui: &Ui) -> anyhow::Result<()> {
        let workflow = super::load_workflow(root, self.workflow.as_deref())?;
        let store = RoundStore::new(&workflow.output_dir);

        let result = match self.b {
            Some(b) => store.diff(self.a, b)?,
            None => store.diff_prev(self.a)?,
        };

        ui.info(&format!(
            "diff round {} -> round {} ({})",
            result.from, result.to, workflow.name
        ));
        // The diff body goes to stdout verbatim so it can be piped.
        print!("{}", result.diff);
        Ok(())
    }
}
