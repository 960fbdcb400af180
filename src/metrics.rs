//! Per-workflow analytics: the `metrics.json` record and backfill.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::config::{self, WorkflowConfig};
use crate::error::ExitError;
use crate::rounds::RoundStore;

pub const SCHEMA_VERSION: u32 = 1;

/// Per-round metrics entry. `backfilled` marks entries computed
/// retroactively from the round file rather than captured live.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundMetrics {
    pub timestamp: String,
    pub output_chars: u64,
    #[serde(default)]
    pub backfilled: bool,
}

/// The analytics document at `.apr/analytics/<workflow>/metrics.json`.
///
/// `rounds` is keyed by round number; entries are append-only except under
/// an explicit force-overwrite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsRecord {
    pub schema_version: u32,
    pub workflow: String,
    pub generated_at: String,
    pub rounds: BTreeMap<u32, RoundMetrics>,
}

impl MetricsRecord {
    pub fn new(workflow: &str) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            workflow: workflow.to_string(),
            generated_at: iso_now(),
            rounds: BTreeMap::new(),
        }
    }

    /// Load the record for a workflow, or `None` when no metrics exist yet.
    pub fn load(root: &Path, workflow: &str) -> anyhow::Result<Option<Self>> {
        let path = config::analytics_path(root, workflow);
        if !path.is_file() {
            return Ok(None);
        }
        let text = std::fs::read_to_string(&path)
            .with_context(|| format!("reading {}", path.display()))?;
        let record = serde_json::from_str(&text)
            .with_context(|| format!("parsing {}", path.display()))?;
        Ok(Some(record))
    }

    /// Write the record back, replacing the file atomically.
    pub fn save(&self, root: &Path) -> anyhow::Result<()> {
        let path = config::analytics_path(root, &self.workflow);
        let body = serde_json::to_string_pretty(self).context("serializing metrics")?;
        write_atomic(&path, &body)
    }

    /// Record a live (non-backfilled) entry for a freshly completed round.
    /// Existing entries are left untouched.
    pub fn record_live(&mut self, round: u32, output_chars: u64) {
        self.rounds.entry(round).or_insert_with(|| RoundMetrics {
            timestamp: iso_now(),
            output_chars,
            backfilled: false,
        });
    }

    /// CSV export. First line is exactly `round,timestamp,output_chars`.
    pub fn to_csv(&self) -> String {
        use std::fmt::Write;
        let mut out = String::from("round,timestamp,output_chars\n");
        for (round, entry) in &self.rounds {
            let _ = writeln!(out, "{round},{},{}", entry.timestamp, entry.output_chars);
        }
        out
    }

    /// Markdown report with a fixed title heading.
    pub fn to_markdown(&self) -> String {
        use std::fmt::Write;
        let mut out = String::from("# Round Metrics Report\n\n");
        let _ = writeln!(
            out,
            "Workflow: `{}`  \nRounds tracked: {}\n",
            self.workflow,
            self.rounds.len()
        );
        out.push_str("| Round | Timestamp | Output chars | Backfilled |\n");
        out.push_str("|---|---|---|---|\n");
        for (round, entry) in &self.rounds {
            let _ = writeln!(
                out,
                "| {round} | {} | {} | {} |",
                entry.timestamp,
                entry.output_chars,
                if entry.backfilled { "yes" } else { "no" }
            );
        }
        out
    }
}

/// Outcome of one backfill pass.
#[derive(Debug, Serialize)]
pub struct BackfillOutcome {
    pub workflow: String,
    pub computed: usize,
    pub skipped: usize,
    pub total: usize,
}

/// Compute metrics for every round lacking an entry (every round under
/// `force`), mark the computed entries `backfilled`, and persist the merged
/// record. Existing entries are never overwritten without `force`.
pub fn backfill(
    root: &Path,
    workflow: &WorkflowConfig,
    force: bool,
) -> anyhow::Result<(MetricsRecord, BackfillOutcome)> {
    let store = RoundStore::new(&workflow.output_dir);
    if !workflow.output_dir.is_dir() {
        return Err(ExitError::ValidationFailed(format!(
            "rounds directory {} does not exist",
            workflow.output_dir.display()
        ))
        .into());
    }

    let mut record = MetricsRecord::load(root, &workflow.name)?
        .unwrap_or_else(|| MetricsRecord::new(&workflow.name));

    let mut computed = 0;
    let mut skipped = 0;
    let rounds = store.list();
    for round in &rounds {
        if !force && record.rounds.contains_key(&round.round) {
            skipped += 1;
            continue;
        }
        let content = store.read(round.round)?;
        let chars = u64::try_from(content.chars().count()).unwrap_or(u64::MAX);
        record.rounds.insert(
            round.round,
            RoundMetrics {
                timestamp: round.modified.map_or_else(iso_now, iso_at),
                output_chars: chars,
                backfilled: true,
            },
        );
        computed += 1;
    }

    record.generated_at = iso_now();
    record.save(root)?;

    let outcome = BackfillOutcome {
        workflow: workflow.name.clone(),
        computed,
        skipped,
        total: rounds.len(),
    };
    Ok((record, outcome))
}

/// ISO-8601 UTC, second precision, `Z` suffix.
pub fn iso_now() -> String {
    iso_at(Utc::now())
}

pub fn iso_at(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Replace a file's contents via temp-file + rename so concurrent readers
/// never observe a partial write.
pub fn write_atomic(path: &Path, contents: &str) -> anyhow::Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| ExitError::Other(format!("no parent directory for {}", path.display())))?;
    std::fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, contents).with_context(|| format!("writing {}", tmp.display()))?;
    std::fs::rename(&tmp, path)
        .with_context(|| format!("renaming {} -> {}", tmp.display(), path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::workflows_dir;
    use crate::rounds::round_file_name;

    fn project_with_rounds(rounds: &[(u32, &str)]) -> (tempfile::TempDir, WorkflowConfig) {
        let dir = tempfile::tempdir().unwrap();
        let wf_dir = workflows_dir(dir.path());
        std::fs::create_dir_all(&wf_dir).unwrap();
        std::fs::write(wf_dir.join("demo.yaml"), "description: d\n").unwrap();
        let wf = WorkflowConfig::load(dir.path(), "demo").unwrap();
        std::fs::create_dir_all(&wf.output_dir).unwrap();
        for (n, body) in rounds {
            std::fs::write(wf.output_dir.join(round_file_name(*n)), body).unwrap();
        }
        (dir, wf)
    }

    #[test]
    fn backfill_computes_missing_entries() {
        let (dir, wf) = project_with_rounds(&[(1, "hello"), (2, "worldwide")]);
        let (record, outcome) = backfill(dir.path(), &wf, false).unwrap();

        assert_eq!(outcome.computed, 2);
        assert_eq!(outcome.skipped, 0);
        assert_eq!(record.rounds.len(), 2);
        assert_eq!(record.rounds[&1].output_chars, 5);
        assert_eq!(record.rounds[&2].output_chars, 9);
        assert!(record.rounds[&1].backfilled);

        // Persisted and reloadable.
        let reloaded = MetricsRecord::load(dir.path(), "demo").unwrap().unwrap();
        assert_eq!(reloaded.schema_version, SCHEMA_VERSION);
        assert_eq!(reloaded.rounds.len(), 2);
    }

    #[test]
    fn backfill_never_overwrites_without_force() {
        let (dir, wf) = project_with_rounds(&[(1, "hello")]);
        let (_, first) = backfill(dir.path(), &wf, false).unwrap();
        assert_eq!(first.computed, 1);

        // Grow the round file; a plain backfill must keep the old entry.
        std::fs::write(wf.output_dir.join(round_file_name(1)), "hello again").unwrap();
        let (record, second) = backfill(dir.path(), &wf, false).unwrap();
        assert_eq!(second.computed, 0);
        assert_eq!(second.skipped, 1);
        assert_eq!(record.rounds[&1].output_chars, 5);

        let (record, forced) = backfill(dir.path(), &wf, true).unwrap();
        assert_eq!(forced.computed, 1);
        assert_eq!(record.rounds[&1].output_chars, 11);
    }

    #[test]
    fn backfill_missing_dir_is_validation_failure() {
        let dir = tempfile::tempdir().unwrap();
        let wf_dir = workflows_dir(dir.path());
        std::fs::create_dir_all(&wf_dir).unwrap();
        std::fs::write(wf_dir.join("demo.yaml"), "description: d\n").unwrap();
        let wf = WorkflowConfig::load(dir.path(), "demo").unwrap();

        let err = backfill(dir.path(), &wf, false).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ExitError>().unwrap(),
            ExitError::ValidationFailed(_)
        ));
    }

    #[test]
    fn csv_header_is_exact() {
        let (dir, wf) = project_with_rounds(&[(1, "a"), (2, "bb")]);
        let (record, _) = backfill(dir.path(), &wf, false).unwrap();
        let csv = record.to_csv();
        let mut lines = csv.lines();
        assert_eq!(lines.next().unwrap(), "round,timestamp,output_chars");
        assert_eq!(lines.clone().count(), 2);
        assert!(lines.next().unwrap().starts_with("1,"));
    }

    #[test]
    fn markdown_report_has_title() {
        let record = MetricsRecord::new("demo");
        let md = record.to_markdown();
        assert!(md.starts_with("# Round Metrics Report\n"));
        assert!(md.contains("`demo`"));
    }

    #[test]
    fn record_live_does_not_clobber() {
        let mut record = MetricsRecord::new("demo");
        record.record_live(1, 10);
        record.record_live(1, 99);
        assert_eq!(record.rounds[&1].output_chars, 10);
        assert!(!record.rounds[&1].backfilled);
    }

    #[test]
    fn iso_timestamps_are_second_precision_utc() {
        let ts = iso_now();
        assert!(ts.ends_with('Z'));
        // 2026-08-06T12:34:56Z, no fractional seconds.
        assert_eq!(ts.len(), 20);
        assert!(!ts.contains('.'));
    }

    #[test]
    fn write_atomic_replaces_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/out.json");
        write_atomic(&path, "one").unwrap();
        write_atomic(&path, "two").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "two");
        assert!(!path.with_extension("tmp").exists());
    }
}
