//! `robot integrate`: render the integration prompt for a completed round.

use std::path::Path;

use anyhow::Context;
use serde_json::json;

use crate::config::{self, WorkflowConfig};
use crate::context::InvocationContext;
use crate::envelope::Envelope;
use crate::rounds::RoundStore;
use crate::template::render_integration_prompt;

pub fn run(
    ctx: &InvocationContext,
    raw_round: &str,
    output: Option<&Path>,
) -> anyhow::Result<Envelope> {
    let round = super::parse_round(raw_round)?;
    let name = config::resolve_workflow_name(ctx.root(), ctx.workflow_flag())?;
    let workflow = WorkflowConfig::load(ctx.root(), &name)?;

    let content = RoundStore::new(&workflow.output_dir).read(round)?;
    let prompt = render_integration_prompt(&workflow, round, &content)?;

    let data = match output {
        Some(path) => {
            std::fs::write(path, &prompt)
                .with_context(|| format!("writing {}", path.display()))?;
            json!({
                "workflow": workflow.name,
                "round": round,
                "written_to": path.display().to_string(),
            })
        }
        None => json!({
            "workflow": workflow.name,
            "round": round,
            "prompt": prompt,
        }),
    };
    Ok(Envelope::success(data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{EnvSnapshot, OutputFormat};
    use crate::error::{ErrorCode, ExitError};
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

    fn project_with_round() -> tempfile::TempDir {
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
        std::fs::write(wf.output_dir.join(round_file_name(1)), "round one feedback").unwrap();
        dir
    }

    #[test]
    fn prompt_embeds_round_content() {
        let dir = project_with_round();
        let envelope = run(&ctx(dir.path()), "1", None).unwrap();
        assert!(envelope.ok);
        let prompt = envelope.data["prompt"].as_str().unwrap();
        assert!(prompt.contains("round one feedback"));
        assert!(prompt.contains("demo"));
    }

    #[test]
    fn output_flag_writes_file_instead() {
        let dir = project_with_round();
        let out = dir.path().join("integrate.md");
        let envelope = run(&ctx(dir.path()), "1", Some(&out)).unwrap();
        assert!(envelope.ok);
        assert!(envelope.data["prompt"].is_null());
        assert_eq!(
            envelope.data["written_to"],
            out.display().to_string()
        );
        assert!(std::fs::read_to_string(out)
            .unwrap()
            .contains("round one feedback"));
    }

    #[test]
    fn missing_round_is_not_found() {
        let dir = project_with_round();
        let err = run(&ctx(dir.path()), "7", None).unwrap_err();
        assert_eq!(
            err.downcast_ref::<ExitError>().unwrap().error_code(),
            ErrorCode::NotFound
        );
    }
}
