use std::path::Path;

use clap::Args;

use crate::error::ExitError;
use crate::metrics::MetricsRecord;
use crate::rounds::{parse_round_range, RoundStore};
use crate::ui::Ui;

#[derive(Debug, Args)]
pub struct StatsArgs {
    /// Workflow to inspect
    #[arg(short = 'w', long)]
    pub workflow: Option<String>,
    /// Print the computed statistics as JSON
    #[arg(long)]
    pub json: bool,
    /// Include per-round sizes
    #[arg(long)]
    pub detailed: bool,
    /// Export the metrics record: json, csv, or md
    #[arg(long, value_name = "FMT")]
    pub export: Option<String>,
    /// Restrict to an inclusive round range (A-B)
    #[arg(long, value_name = "A-B")]
    pub rounds: Option<String>,
}

impl StatsArgs {
    pub fn execute(&self, root: &Path, ui: &Ui) -> anyhow::Result<()> {
        let workflow = super::load_workflow(root, self.workflow.as_deref())?;
        let filter = self.rounds.as_deref().map(parse_round_range).transpose()?;

        if let Some(format) = self.export.as_deref() {
            return export_metrics(root, &workflow.name, format, filter);
        }

        let report = RoundStore::new(&workflow.output_dir).stats(filter, self.detailed)?;
        if self.json {
            println!("{}", serde_json::to_string_pretty(&report)?);
            return Ok(());
        }

        ui.info(&format!("Workflow {:?}:", workflow.name));
        ui.info(&format!("  rounds:     {}", report.count));
        ui.info(&format!("  total size: {} bytes", report.total_bytes));
        ui.info(&format!("  avg size:   {} bytes", report.avg_bytes));
        ui.info(&format!(
            "  min/max:    {} / {} bytes",
            report.min_bytes, report.max_bytes
        ));
        if let Some(rounds) = &report.rounds {
            for entry in rounds {
                ui.info(&format!(
                    "  round {:<3} {:>8} bytes",
                    entry.round, entry.size_bytes
                ));
            }
        }
        Ok(())
    }
}

/// Exports go to stdout verbatim so they can be piped into files.
fn export_metrics(
    root: &Path,
    workflow: &str,
    format: &str,
    filter: Option<(u32, u32)>,
) -> anyhow::Result<()> {
    let Some(mut record) = MetricsRecord::load(root, workflow)? else {
        return Err(ExitError::ValidationFailed(format!(
            "no metrics for workflow {workflow:?}; run `apr backfill` first"
        ))
        .into());
    };
    if let Some((lo, hi)) = filter {
        record.rounds.retain(|round, _| *round >= lo && *round <= hi);
    }

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&record)?),
        "csv" => print!("{}", record.to_csv()),
        "md" | "markdown" => print!("{}", record.to_markdown()),
        other => {
            return Err(ExitError::Usage(format!(
                "unknown export format {other:?} (expected json, csv, or md)"
            ))
            .into());
        }
    }
    Ok(())
}
