//! Interactive setup: create a workflow definition and point the project
//! config at it.

use std::io::IsTerminal;
use std::path::Path;

use anyhow::{Context, Result};
use clap::Args;

use crate::config;
use crate::error::ExitError;
use crate::ui::Ui;
use crate::yaml;

#[derive(Debug, Args)]
pub struct SetupArgs {
    /// Workflow name
    #[arg(long)]
    pub name: Option<String>,
    /// One-line workflow description
    #[arg(long)]
    pub description: Option<String>,
    /// Path to the README document
    #[arg(long)]
    pub readme: Option<String>,
    /// Path to the specification document
    #[arg(long)]
    pub spec: Option<String>,
    /// Path to the implementation document (optional)
    #[arg(long)]
    pub implementation: Option<String>,
    /// Oracle model identifier
    #[arg(long)]
    pub model: Option<String>,
    /// Non-interactive mode
    #[arg(long)]
    pub no_interactive: bool,
    /// Overwrite an existing workflow definition
    #[arg(long)]
    pub force: bool,
    /// Do not change default_workflow
    #[arg(long)]
    pub no_default: bool,
}

struct SetupChoices {
    name: String,
    description: String,
    readme: String,
    spec: String,
    implementation: Option<String>,
    model: String,
}

impl SetupArgs {
    pub fn execute(&self, root: &Path, ui: &Ui) -> Result<()> {
        let interactive = !self.no_interactive && std::io::stdin().is_terminal();
        let choices = self.gather_choices(interactive)?;

        // Skeleton first, so a bare directory works.
        for dir in [
            config::workflows_dir(root),
            config::apr_dir(root).join(config::ROUNDS_DIR),
            config::apr_dir(root).join(config::ANALYTICS_DIR),
            config::locks_dir(root),
        ] {
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("creating {}", dir.display()))?;
        }

        let workflow_path = config::workflow_path(root, &choices.name);
        if workflow_path.exists() && !self.force {
            return Err(ExitError::Other(format!(
                "workflow {:?} already exists; use --force to overwrite",
                choices.name
            ))
            .into());
        }
        std::fs::write(&workflow_path, render_workflow_yaml(&choices))
            .with_context(|| format!("writing {}", workflow_path.display()))?;
        ui.success(&format!("wrote {}", workflow_path.display()));

        if !self.no_default {
            set_default_workflow(root, &choices.name)?;
            ui.success(&format!("default_workflow set to {:?}", choices.name));
        }

        ui.info(&format!(
            "next: `apr validate 1 -w {}` then `apr run 1 -w {}`",
            choices.name, choices.name
        ));
        Ok(())
    }

    fn gather_choices(&self, interactive: bool) -> Result<SetupChoices> {
        let name = if let Some(ref n) = self.name {
            validate_name(n, "workflow name")?;
            n.clone()
        } else if interactive {
            let n = prompt_input("Workflow name", Some("default"))?;
            validate_name(&n, "workflow name")?;
            n
        } else {
            return Err(
                ExitError::Usage("--name is required in non-interactive mode".into()).into(),
            );
        };

        let description = if let Some(ref d) = self.description {
            d.clone()
        } else if interactive {
            prompt_input("Description", Some(""))?
        } else {
            String::new()
        };

        let readme = path_choice(interactive, self.readme.as_ref(), "README path", "README.md")?;
        let spec = path_choice(interactive, self.spec.as_ref(), "Spec path", "spec.md")?;

        let implementation = if self.implementation.is_some() {
            self.implementation.clone()
        } else if interactive && prompt_confirm("Include an implementation document?", false)? {
            Some(prompt_input("Implementation path", Some("src/lib.rs"))?)
        } else {
            None
        };

        let model = if let Some(ref m) = self.model {
            m.clone()
        } else if interactive {
            prompt_input("Oracle model", Some(config::DEFAULT_ORACLE_MODEL))?
        } else {
            config::DEFAULT_ORACLE_MODEL.to_string()
        };

        Ok(SetupChoices {
            name,
            description,
            readme,
            spec,
            implementation,
            model,
        })
    }

}

fn path_choice(
    interactive: bool,
    flag: Option<&String>,
    prompt: &str,
    default: &str,
) -> Result<String> {
    if let Some(value) = flag {
        Ok(value.clone())
    } else if interactive {
        prompt_input(prompt, Some(default))
    } else {
        Ok(default.to_string())
    }
}

/// Workflow names double as filesystem path segments; keep them boring.
fn validate_name(name: &str, label: &str) -> Result<()> {
    if name.is_empty() || name.len() > 64 {
        anyhow::bail!("{label} must be 1-64 characters, got {}", name.len());
    }
    if !name
        .bytes()
        .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
    {
        anyhow::bail!("{label} must match [a-z0-9-], got {name:?}");
    }
    if name.starts_with('-') || name.ends_with('-') {
        anyhow::bail!("{label} must not start or end with '-', got {name:?}");
    }
    Ok(())
}

fn render_workflow_yaml(choices: &SetupChoices) -> String {
    use std::fmt::Write;
    let mut out = String::new();
    let _ = writeln!(out, "name: {}", choices.name);
    if !choices.description.is_empty() {
        let _ = writeln!(out, "description: {}", choices.description);
    }
    out.push_str("documents:\n");
    let _ = writeln!(out, "  readme: {}", choices.readme);
    let _ = writeln!(out, "  spec: {}", choices.spec);
    if let Some(ref implementation) = choices.implementation {
        let _ = writeln!(out, "  implementation: {implementation}");
    }
    out.push_str("oracle:\n");
    let _ = writeln!(out, "  model: {}", choices.model);
    out.push_str("rounds:\n");
    let _ = writeln!(out, "  output_dir: .apr/rounds/{}", choices.name);
    out
}

/// Rewrite `default_workflow` in the project config, preserving the rest of
/// the file.
fn set_default_workflow(root: &Path, name: &str) -> Result<()> {
    let path = config::config_path(root);
    let existing = yaml::load(&path);

    let mut lines: Vec<String> = Vec::new();
    let mut replaced = false;
    for line in existing.lines() {
        if matches!(
            yaml::classify(line),
            yaml::LineKind::Key {
                key: "default_workflow",
                indent: 0,
                ..
            }
        ) {
            lines.push(format!("default_workflow: {name}"));
            replaced = true;
        } else {
            lines.push(line.to_string());
        }
    }
    if !replaced {
        lines.push(format!("default_workflow: {name}"));
    }
    let mut body = lines.join("\n");
    body.push('\n');
    std::fs::write(&path, body).with_context(|| format!("writing {}", path.display()))
}

// --- Interactive prompts using dialoguer ---

fn prompt_input(prompt: &str, default: Option<&str>) -> Result<String> {
    let mut builder = dialoguer::Input::<String>::new().with_prompt(prompt);
    if let Some(d) = default {
        builder = builder.default(d.to_string());
    }
    builder.interact_text().context("reading user input")
}

fn prompt_confirm(prompt: &str, default: bool) -> Result<bool> {
    dialoguer::Confirm::new()
        .with_prompt(prompt)
        .default(default)
        .interact()
        .context("reading user confirmation")
}
