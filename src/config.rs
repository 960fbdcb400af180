use std::path::{Path, PathBuf};

use crate::error::ExitError;
use crate::yaml;

/// Project state directory name constants.
pub const APR_DIR: &str = ".apr";
pub const CONFIG_FILE: &str = "config.yaml";
pub const WORKFLOWS_DIR: &str = "workflows";
pub const ROUNDS_DIR: &str = "rounds";
pub const ANALYTICS_DIR: &str = "analytics";
pub const LOCKS_DIR: &str = "locks";

pub const DEFAULT_ORACLE_MODEL: &str = "gpt-5-pro";

pub fn apr_dir(root: &Path) -> PathBuf {
    root.join(APR_DIR)
}

pub fn config_path(root: &Path) -> PathBuf {
    apr_dir(root).join(CONFIG_FILE)
}

pub fn workflows_dir(root: &Path) -> PathBuf {
    apr_dir(root).join(WORKFLOWS_DIR)
}

pub fn workflow_path(root: &Path, name: &str) -> PathBuf {
    workflows_dir(root).join(format!("{name}.yaml"))
}

pub fn rounds_dir(root: &Path, workflow: &str) -> PathBuf {
    apr_dir(root).join(ROUNDS_DIR).join(workflow)
}

pub fn analytics_path(root: &Path, workflow: &str) -> PathBuf {
    apr_dir(root)
        .join(ANALYTICS_DIR)
        .join(workflow)
        .join("metrics.json")
}

pub fn locks_dir(root: &Path) -> PathBuf {
    apr_dir(root).join(LOCKS_DIR)
}

/// True when the project has an `.apr/` directory.
pub fn is_configured(root: &Path) -> bool {
    apr_dir(root).is_dir()
}

/// `default_workflow` from `.apr/config.yaml`, empty when unset.
pub fn default_workflow(root: &Path) -> String {
    yaml::get_value_from("default_workflow", &config_path(root))
}

/// Resolve the active workflow name.
///
/// Order: explicit `-w` flag value, then `default_workflow` from the project
/// config. Fails with a `NotConfigured` error when neither resolves or the
/// `.apr/` directory is absent.
pub fn resolve_workflow_name(root: &Path, explicit: Option<&str>) -> anyhow::Result<String> {
    if !is_configured(root) {
        return Err(ExitError::NotConfigured(format!(
            "no {APR_DIR}/ directory at {} (run `apr robot init` or `apr setup`)",
            root.display()
        ))
        .into());
    }
    if let Some(name) = explicit {
        return Ok(name.to_string());
    }
    let default = default_workflow(root);
    if default.is_empty() {
        return Err(ExitError::NotConfigured(
            "no workflow given and no default_workflow in .apr/config.yaml".into(),
        )
        .into());
    }
    Ok(default)
}

/// A named workflow definition loaded from `.apr/workflows/<name>.yaml`.
#[derive(Debug, Clone)]
pub struct WorkflowConfig {
    pub name: String,
    pub description: String,
    pub readme: PathBuf,
    pub spec: PathBuf,
    pub implementation: Option<PathBuf>,
    pub oracle_model: String,
    pub output_dir: PathBuf,
    pub template: String,
    pub template_with_impl: String,
}

impl WorkflowConfig {
    /// Load a workflow definition. Fails with a `NotFound` error when the
    /// workflow file does not exist.
    pub fn load(root: &Path, name: &str) -> anyhow::Result<Self> {
        let path = workflow_path(root, name);
        if !path.is_file() {
            return Err(ExitError::NotFound(format!(
                "workflow {name:?} ({} missing)",
                path.display()
            ))
            .into());
        }
        let text = yaml::load(&path);

        let description = yaml::get_value("description", &text);
        let readme = yaml::get_value("documents.readme", &text);
        let spec = yaml::get_value("documents.spec", &text);
        let implementation = yaml::get_value("documents.implementation", &text);
        let mut oracle_model = yaml::get_value("oracle.model", &text);
        if oracle_model.is_empty() {
            oracle_model = DEFAULT_ORACLE_MODEL.to_string();
        }
        let output_dir = yaml::get_value("rounds.output_dir", &text);

        Ok(Self {
            name: name.to_string(),
            description,
            readme: root.join(if readme.is_empty() {
                "README.md"
            } else {
                readme.as_str()
            }),
            spec: root.join(if spec.is_empty() { "spec.md" } else { spec.as_str() }),
            implementation: (!implementation.is_empty()).then(|| root.join(&implementation)),
            oracle_model,
            output_dir: if output_dir.is_empty() {
                rounds_dir(root, name)
            } else {
                root.join(&output_dir)
            },
            template: yaml::get_block("template", &text),
            template_with_impl: yaml::get_block("template_with_impl", &text),
        })
    }

    /// Pick the prompt template: `template_with_impl` when requested and
    /// present, else `template`. Empty when neither exists; empty prompts
    /// are a caller concern, not an error.
    pub fn prompt_template(&self, include_impl: bool) -> &str {
        if include_impl && !self.template_with_impl.is_empty() {
            &self.template_with_impl
        } else {
            &self.template
        }
    }
}

/// List workflow `(name, description)` pairs from `.apr/workflows/`.
///
/// Sorted by name; non-`.yaml` entries are ignored. An absent directory
/// yields an empty list.
pub fn list_workflows(root: &Path) -> Vec<(String, String)> {
    let dir = workflows_dir(root);
    let Ok(entries) = std::fs::read_dir(&dir) else {
        return Vec::new();
    };
    let mut out: Vec<(String, String)> = entries
        .filter_map(Result::ok)
        .filter_map(|e| {
            let path = e.path();
            let name = path.file_stem()?.to_str()?.to_string();
            if path.extension().and_then(|x| x.to_str()) != Some("yaml") {
                return None;
            }
            let description = yaml::get_value_from("description", &path);
            Some((name, description))
        })
        .collect();
    out.sort();
    out
}
