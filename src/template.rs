//! Prompt rendering for revision rounds and integration.

use anyhow::Context;
use minijinja::Environment;
use serde::Serialize;

use crate::config::WorkflowConfig;
use crate::rounds::RoundStore;

const DEFAULT_REVISION_TEMPLATE: &str = include_str!("templates/revision-prompt.md.jinja");
const DEFAULT_INTEGRATION_TEMPLATE: &str = include_str!("templates/integration-prompt.md.jinja");

/// Values available to prompt templates as `{{PLACEHOLDER}}` substitutions.
#[derive(Debug, Serialize)]
pub struct PromptContext {
    #[serde(rename = "WORKFLOW")]
    pub workflow: String,
    #[serde(rename = "ROUND")]
    pub round: u32,
    #[serde(rename = "README")]
    pub readme: String,
    #[serde(rename = "SPEC")]
    pub spec: String,
    /// Empty when not requested; empty strings are falsy in `{% if %}`.
    #[serde(rename = "IMPLEMENTATION")]
    pub implementation: String,
    /// Empty when the round has no predecessor on disk.
    #[serde(rename = "PREVIOUS_ROUND")]
    pub previous_round: String,
}

/// Render a template source against a context.
pub fn render(source: &str, ctx: &impl Serialize) -> anyhow::Result<String> {
    let mut env = Environment::new();
    env.add_template("prompt", source)
        .context("compiling prompt template")?;
    let template = env.get_template("prompt").context("loading prompt template")?;
    template.render(ctx).context("rendering prompt template")
}

/// Build the full revision prompt for one round.
///
/// Uses the workflow's own template (with the `template_with_impl` fallback
/// chain) and falls back to the built-in default when the workflow defines
/// none. Reads the configured documents; the previous round's content is
/// included when it exists.
pub fn build_revision_prompt(
    workflow: &WorkflowConfig,
    round: u32,
    include_impl: bool,
) -> anyhow::Result<String> {
    let readme = std::fs::read_to_string(&workflow.readme)
        .with_context(|| format!("reading {}", workflow.readme.display()))?;
    let spec = std::fs::read_to_string(&workflow.spec)
        .with_context(|| format!("reading {}", workflow.spec.display()))?;

    let implementation = match (&workflow.implementation, include_impl) {
        (Some(path), true) => std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?,
        _ => String::new(),
    };

    let store = RoundStore::new(&workflow.output_dir);
    let previous_round = if round > 1 {
        store.read(round - 1).unwrap_or_default()
    } else {
        String::new()
    };

    let ctx = PromptContext {
        workflow: workflow.name.clone(),
        round,
        readme,
        spec,
        implementation,
        previous_round,
    };

    let source = workflow.prompt_template(include_impl);
    let source = if source.is_empty() {
        DEFAULT_REVISION_TEMPLATE
    } else {
        source
    };
    render(source, &ctx)
}

#[derive(Debug, Serialize)]
struct IntegrationContext {
    #[serde(rename = "WORKFLOW")]
    workflow: String,
    #[serde(rename = "ROUND")]
    round: u32,
    #[serde(rename = "ROUND_CONTENT")]
    round_content: String,
}

/// Render the integration prompt for an existing round's content.
pub fn render_integration_prompt(
    workflow: &WorkflowConfig,
    round: u32,
    round_content: &str,
) -> anyhow::Result<String> {
    render(
        DEFAULT_INTEGRATION_TEMPLATE,
        &IntegrationContext {
            workflow: workflow.name.clone(),
            round,
            round_content: round_content.to_string(),
        },
    )
}
