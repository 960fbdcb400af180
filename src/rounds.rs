//! Round artifacts: numbered, immutable markdown files under a workflow's
//! output directory.

use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Serialize;
use similar::TextDiff;

use crate::error::ExitError;

/// One stored round, metadata only; content is loaded on demand.
#[derive(Debug, Clone, Serialize)]
pub struct Round {
    pub round: u32,
    #[serde(skip)]
    pub path: PathBuf,
    pub size_bytes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified: Option<DateTime<Utc>>,
}

/// Result of diffing two rounds. `from`/`to` order is exactly the caller's
/// argument order; a reversed diff is a correctness bug, not cosmetics.
#[derive(Debug, Serialize)]
pub struct DiffResult {
    pub from: u32,
    pub to: u32,
    pub diff: String,
}

/// Aggregate statistics over the stored rounds.
#[derive(Debug, Serialize)]
pub struct StatsReport {
    pub count: usize,
    pub total_bytes: u64,
    pub avg_bytes: u64,
    pub min_bytes: u64,
    pub max_bytes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rounds: Option<Vec<RoundSize>>,
}

#[derive(Debug, Serialize)]
pub struct RoundSize {
    pub round: u32,
    pub size_bytes: u64,
}

pub fn round_file_name(round: u32) -> String {
    format!("round_{round}.md")
}

/// Reads round files for one workflow output directory.
pub struct RoundStore {
    output_dir: PathBuf,
}

impl RoundStore {
    pub fn new(output_dir: &Path) -> Self {
        Self {
            output_dir: output_dir.to_path_buf(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn round_path(&self, round: u32) -> PathBuf {
        self.output_dir.join(round_file_name(round))
    }

    /// All rounds, ascending by round number regardless of filesystem
    /// iteration order. Malformed names are ignored; an empty or absent
    /// directory yields an empty list.
    pub fn list(&self) -> Vec<Round> {
        #[allow(clippy::unwrap_used)] // literal pattern
        let pattern = Regex::new(r"^round_([0-9]+)\.md$").unwrap();
        let Ok(entries) = std::fs::read_dir(&self.output_dir) else {
            return Vec::new();
        };
        let mut rounds: Vec<Round> = entries
            .filter_map(Result::ok)
            .filter_map(|entry| {
                let name = entry.file_name();
                let captures = pattern.captures(name.to_str()?)?;
                let round: u32 = captures.get(1)?.as_str().parse().ok()?;
                if round == 0 {
                    return None;
                }
                let meta = entry.metadata().ok()?;
                Some(Round {
                    round,
                    path: entry.path(),
                    size_bytes: meta.len(),
                    modified: meta.modified().ok().map(DateTime::<Utc>::from),
                })
            })
            .collect();
        rounds.sort_by_key(|r| r.round);
        rounds
    }

    /// Read a round's content.
    pub fn read(&self, round: u32) -> anyhow::Result<String> {
        let path = self.round_path(round);
        if !path.is_file() {
            return Err(ExitError::NotFound(format!(
                "round {round} ({} missing)",
                path.display()
            ))
            .into());
        }
        std::fs::read_to_string(&path).with_context(|| format!("reading {}", path.display()))
    }

    /// Unified diff from round `a` to round `b`.
    pub fn diff(&self, a: u32, b: u32) -> anyhow::Result<DiffResult> {
        let old = self.read(a)?;
        let new = self.read(b)?;
        let text = TextDiff::from_lines(&old, &new)
            .unified_diff()
            .context_radius(3)
            .header(&round_file_name(a), &round_file_name(b))
            .to_string();
        Ok(DiffResult {
            from: a,
            to: b,
            diff: text,
        })
    }

    /// Diff round `b` against its predecessor `b - 1`.
    pub fn diff_prev(&self, b: u32) -> anyhow::Result<DiffResult> {
        if b <= 1 {
            return Err(ExitError::Usage(format!(
                "round {b} has no previous round to compare against"
            ))
            .into());
        }
        self.diff(b - 1, b)
    }

    /// Compute aggregate statistics.
    ///
    /// `filter` restricts the included rounds to an inclusive `A-B` range.
    /// Fails with a validation error when the workflow's output directory
    /// does not exist (as opposed to existing but empty).
    pub fn stats(&self, filter: Option<(u32, u32)>, detailed: bool) -> anyhow::Result<StatsReport> {
        if !self.output_dir.is_dir() {
            return Err(ExitError::ValidationFailed(format!(
                "rounds directory {} does not exist",
                self.output_dir.display()
            ))
            .into());
        }

        let rounds: Vec<Round> = self
            .list()
            .into_iter()
            .filter(|r| filter.is_none_or(|(lo, hi)| r.round >= lo && r.round <= hi))
            .collect();

        let count = rounds.len();
        let total: u64 = rounds.iter().map(|r| r.size_bytes).sum();
        let sizes = rounds.iter().map(|r| r.size_bytes);
        let divisor = u64::try_from(count).unwrap_or(u64::MAX);
        Ok(StatsReport {
            count,
            total_bytes: total,
            avg_bytes: if count == 0 { 0 } else { total / divisor },
            min_bytes: sizes.clone().min().unwrap_or(0),
            max_bytes: sizes.max().unwrap_or(0),
            rounds: detailed.then(|| {
                rounds
                    .iter()
                    .map(|r| RoundSize {
                        round: r.round,
                        size_bytes: r.size_bytes,
                    })
                    .collect()
            }),
        })
    }
}

/// Parse a round filter: `A-B` (inclusive on both ends) or a bare `N`.
pub fn parse_round_range(s: &str) -> anyhow::Result<(u32, u32)> {
    let parsed = match s.split_once('-') {
        Some((a, b)) => a.trim().parse().ok().zip(b.trim().parse().ok()),
        None => s.trim().parse().ok().map(|n: u32| (n, n)),
    };
    match parsed {
        Some((lo, hi)) if lo >= 1 && lo <= hi => Ok((lo, hi)),
        _ => Err(ExitError::Usage(format!(
            "invalid rounds filter {s:?} (expected A-B with 1 <= A <= B)"
        ))
        .into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with_rounds(contents: &[(u32, &str)]) -> (tempfile::TempDir, RoundStore) {
        let dir = tempfile::tempdir().unwrap();
        for (n, body) in contents {
            std::fs::write(dir.path().join(round_file_name(*n)), body).unwrap();
        }
        let store = RoundStore::new(dir.path());
        (dir, store)
    }

    #[test]
    fn list_empty_and_absent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        assert!(RoundStore::new(dir.path()).list().is_empty());
        assert!(RoundStore::new(&dir.path().join("missing")).list().is_empty());
    }

    #[test]
    fn list_orders_numerically_and_skips_malformed() {
        let (dir, store) = store_with_rounds(&[(10, "ten"), (2, "two"), (1, "one")]);
        std::fs::write(dir.path().join("round_x.md"), "junk").unwrap();
        std::fs::write(dir.path().join("notes.md"), "junk").unwrap();
        std::fs::write(dir.path().join("round_0.md"), "zero is invalid").unwrap();

        let rounds: Vec<u32> = store.list().iter().map(|r| r.round).collect();
        assert_eq!(rounds, vec![1, 2, 10]);
    }

    #[test]
    fn read_missing_round_is_not_found() {
        let (_dir, store) = store_with_rounds(&[(1, "one")]);
        let err = store.read(2).unwrap_err();
        let exit = err.downcast_ref::<ExitError>().unwrap();
        assert!(matches!(exit, ExitError::NotFound(_)));
    }

    #[test]
    fn diff_preserves_argument_order() {
        let (_dir, store) = store_with_rounds(&[(1, "alpha\nshared\n"), (2, "beta\nshared\n")]);

        let forward = store.diff(1, 2).unwrap();
        assert_eq!((forward.from, forward.to), (1, 2));
        assert!(forward.diff.contains("-alpha"));
        assert!(forward.diff.contains("+beta"));

        let backward = store.diff(2, 1).unwrap();
        assert_eq!((backward.from, backward.to), (2, 1));
        assert!(backward.diff.contains("-beta"));
        assert!(backward.diff.contains("+alpha"));

        assert_ne!(forward.diff, backward.diff);
    }

    #[test]
    fn diff_prev_compares_against_predecessor() {
        let (_dir, store) = store_with_rounds(&[(1, "a\n"), (2, "b\n")]);
        let result = store.diff_prev(2).unwrap();
        assert_eq!((result.from, result.to), (1, 2));
    }

    #[test]
    fn diff_prev_rejects_round_one() {
        let (_dir, store) = store_with_rounds(&[(1, "a\n")]);
        let err = store.diff_prev(1).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ExitError>().unwrap(),
            ExitError::Usage(_)
        ));
    }

    #[test]
    fn stats_counts_and_averages() {
        let (_dir, store) = store_with_rounds(&[(1, "1234"), (2, "12345678")]);
        let report = store.stats(None, true).unwrap();
        assert_eq!(report.count, 2);
        assert_eq!(report.total_bytes, 12);
        assert_eq!(report.avg_bytes, 6);
        assert_eq!(report.min_bytes, 4);
        assert_eq!(report.max_bytes, 8);
        let detail = report.rounds.unwrap();
        assert_eq!(detail.len(), 2);
        assert_eq!(detail[0].round, 1);
    }

    #[test]
    fn stats_range_filter_is_inclusive() {
        let (_dir, store) = store_with_rounds(&[(1, "a"), (2, "bb"), (3, "ccc")]);
        let report = store.stats(Some((1, 1)), true).unwrap();
        assert_eq!(report.count, 1);
        assert_eq!(report.total_bytes, 1);

        let wide = store.stats(Some((1, 3)), false).unwrap();
        assert_eq!(wide.count, 3);
        assert!(wide.rounds.is_none());
    }

    #[test]
    fn stats_missing_dir_is_validation_failure() {
        let dir = tempfile::tempdir().unwrap();
        let store = RoundStore::new(&dir.path().join("nope"));
        let err = store.stats(None, false).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ExitError>().unwrap(),
            ExitError::ValidationFailed(_)
        ));
    }

    #[test]
    fn parse_round_range_forms() {
        assert_eq!(parse_round_range("1-3").unwrap(), (1, 3));
        assert_eq!(parse_round_range("1-1").unwrap(), (1, 1));
        assert_eq!(parse_round_range("4").unwrap(), (4, 4));
        assert!(parse_round_range("3-1").is_err());
        assert!(parse_round_range("0-2").is_err());
        assert!(parse_round_range("a-b").is_err());
        assert!(parse_round_range("").is_err());
    }
}
