//! `robot stats`: export round metrics.

use serde_json::json;

use crate::config::{self, WorkflowConfig};
use crate::context::InvocationContext;
use crate::envelope::Envelope;
use crate::error::ExitError;
use crate::metrics::MetricsRecord;
use crate::rounds::parse_round_range;

pub fn run(
    ctx: &InvocationContext,
    export: Option<&str>,
    rounds: Option<&str>,
) -> anyhow::Result<Envelope> {
    let name = config::resolve_workflow_name(ctx.root(), ctx.workflow_flag())?;
    let workflow = WorkflowConfig::load(ctx.root(), &name)?;

    let Some(mut record) = MetricsRecord::load(ctx.root(), &workflow.name)? else {
        return Err(ExitError::ValidationFailed(format!(
            "no metrics for workflow {:?}; run `apr backfill` first",
            workflow.name
        ))
        .into());
    };

    if let Some(range) = rounds {
        let (lo, hi) = parse_round_range(range)?;
        record.rounds.retain(|round, _| *round >= lo && *round <= hi);
    }

    let data = match export.unwrap_or("json") {
        "json" => serde_json::to_value(&record)?,
        "csv" => json!({ "format": "csv", "content": record.to_csv() }),
        "md" | "markdown" => json!({ "format": "markdown", "content": record.to_markdown() }),
        other => {
            return Err(ExitError::Usage(format!(
                "unknown export format {other:?} (expected json, csv, or md)"
            ))
            .into());
        }
    };
    Ok(Envelope::success(data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{EnvSnapshot, OutputFormat};
    use crate::error::ErrorCode;
    use crate::metrics::backfill;
    use crate::rounds::round_file_name;

    fn ctx(root: &std::path::Path) -> InvocationContext {
        InvocationContext {
            project_root: root.to_path_buf(),
            workflow: None,
            format: OutputFormat::Json,
            compact: false,
            emit_stats: false,
            include_impl: false,
            env: EnvSnapshot::default(),
        }
    }

    fn project_with_metrics() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(config::workflows_dir(dir.path())).unwrap();
        std::fs::write(
            config::workflows_dir(dir.path()).join("demo.yaml"),
            "description: d\n",
        )
        .unwrap();
        std::fs::write(config::config_path(dir.path()), "default_workflow: demo\n").unwrap();
        let wf = WorkflowConfig::load(dir.path(), "demo").unwrap();
        std::fs::create_dir_all(&wf.output_dir).unwrap();
        std::fs::write(wf.output_dir.join(round_file_name(1)), "one").unwrap();
        std::fs::write(wf.output_dir.join(round_file_name(2)), "twotwo").unwrap();
        backfill(dir.path(), &wf, false).unwrap();
        dir
    }

    #[test]
    fn json_export_includes_schema_version() {
        let dir = project_with_metrics();
        let envelope = run(&ctx(dir.path()), None, None).unwrap();
        assert!(envelope.ok);
        assert_eq!(envelope.data["schema_version"], 1);
        assert_eq!(envelope.data["workflow"], "demo");
        assert!(envelope.data["rounds"]["1"].is_object());
    }

    #[test]
    fn csv_export_has_exact_header() {
        let dir = project_with_metrics();
        let envelope = run(&ctx(dir.path()), Some("csv"), None).unwrap();
        let content = envelope.data["content"].as_str().unwrap();
        assert!(content.starts_with("round,timestamp,output_chars\n"));
        assert_eq!(content.lines().count(), 3);
    }

    #[test]
    fn markdown_export_has_title() {
        let dir = project_with_metrics();
        let envelope = run(&ctx(dir.path()), Some("md"), None).unwrap();
        let content = envelope.data["content"].as_str().unwrap();
        assert!(content.starts_with("# Round Metrics Report"));
    }

    #[test]
    fn rounds_filter_is_inclusive() {
        let dir = project_with_metrics();
        let envelope = run(&ctx(dir.path()), None, Some("1-1")).unwrap();
        let rounds = envelope.data["rounds"].as_object().unwrap();
        assert_eq!(rounds.len(), 1);
        assert!(rounds.contains_key("1"));
    }

    #[test]
    fn missing_metrics_is_validation_failed() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(config::workflows_dir(dir.path())).unwrap();
        std::fs::write(
            config::workflows_dir(dir.path()).join("demo.yaml"),
            "description: d\n",
        )
        .unwrap();
        std::fs::write(config::config_path(dir.path()), "default_workflow: demo\n").unwrap();

        let err = run(&ctx(dir.path()), None, None).unwrap_err();
        assert_eq!(
            err.downcast_ref::<ExitError>().unwrap().error_code(),
            ErrorCode::ValidationFailed
        );
    }

    #[test]
    fn unknown_export_format_is_usage_error() {
        let dir = project_with_metrics();
        let err = run(&ctx(dir.path()), Some("xml"), None).unwrap_err();
        assert_eq!(
            err.downcast_ref::<ExitError>().unwrap().error_code(),
            ErrorCode::UsageError
        );
    }
}
