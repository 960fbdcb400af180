//! `robot init`: create the `.apr/` directory skeleton. Idempotent.

use std::path::Path;

use anyhow::Context;
use serde_json::json;

use crate::config;
use crate::context::InvocationContext;
use crate::envelope::Envelope;

const CONFIG_STUB: &str = "\
# apr project configuration
# Point default_workflow at a file under .apr/workflows/ (without .yaml):
# default_workflow: <name>
";

pub fn run(ctx: &InvocationContext) -> anyhow::Result<Envelope> {
    let root = ctx.root();
    let mut created: Vec<String> = Vec::new();
    let mut existed: Vec<String> = Vec::new();

    let dirs = [
        config::apr_dir(root),
        config::workflows_dir(root),
        config::apr_dir(root).join(config::ROUNDS_DIR),
        config::apr_dir(root).join(config::ANALYTICS_DIR),
        config::locks_dir(root),
    ];
    for dir in &dirs {
        track(dir, dir.is_dir(), &mut created, &mut existed, || {
            std::fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))
        })?;
    }

    let config_path = config::config_path(root);
    track(
        &config_path,
        config_path.is_file(),
        &mut created,
        &mut existed,
        || {
            std::fs::write(&config_path, CONFIG_STUB)
                .with_context(|| format!("writing {}", config_path.display()))
        },
    )?;

    Ok(Envelope::success(json!({
        "created": created,
        "existed": existed,
    })))
}

fn track<F>(
    path: &Path,
    already: bool,
    created: &mut Vec<String>,
    existed: &mut Vec<String>,
    make: F,
) -> anyhow::Result<()>
where
    F: FnOnce() -> anyhow::Result<()>,
{
    let display = path.display().to_string();
    if already {
        existed.push(display);
    } else {
        make()?;
        created.push(display);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{EnvSnapshot, OutputFormat};

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

    #[test]
    fn creates_skeleton_then_reports_existing() {
        let dir = tempfile::tempdir().unwrap();

        let first = run(&ctx(dir.path())).unwrap();
        assert!(first.ok);
        assert_eq!(first.data["created"].as_array().unwrap().len(), 6);
        assert!(first.data["existed"].as_array().unwrap().is_empty());

        assert!(config::workflows_dir(dir.path()).is_dir());
        assert!(config::locks_dir(dir.path()).is_dir());
        assert!(config::config_path(dir.path()).is_file());

        let second = run(&ctx(dir.path())).unwrap();
        assert!(second.ok);
        assert!(second.data["created"].as_array().unwrap().is_empty());
        assert_eq!(second.data["existed"].as_array().unwrap().len(), 6);
    }

    #[test]
    fn does_not_clobber_existing_config() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(config::apr_dir(dir.path())).unwrap();
        std::fs::write(config::config_path(dir.path()), "default_workflow: demo\n").unwrap();

        run(&ctx(dir.path())).unwrap();
        let text = std::fs::read_to_string(config::config_path(dir.path())).unwrap();
        assert_eq!(text, "default_workflow: demo\n");
    }
}
