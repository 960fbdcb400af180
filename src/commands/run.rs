//! Human-mode `run`: launch a revision round interactively.

use std::path::Path;

use anyhow::Context;
use clap::Args;

use crate::config;
use crate::context::{EnvSnapshot, InvocationContext, OutputFormat};
use crate::error::ExitError;
use crate::lock::{CleanupState, LockManager};
use crate::metrics::MetricsRecord;
use crate::oracle::{generate_slug, LaunchSpec, OracleLauncher, SystemOracle};
use crate::rounds::round_file_name;
use crate::subprocess::Tool;
use crate::template::build_revision_prompt;
use crate::ui::Ui;

use super::robot::validate;

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Round number
    pub round: String,
    /// Workflow to run
    #[arg(short = 'w', long)]
    pub workflow: Option<String>,
    /// Include the implementation document in the prompt
    #[arg(short = 'i', long = "include-impl")]
    pub include_impl: bool,
    /// Print what would run without launching anything
    #[arg(short = 'd', long)]
    pub dry_run: bool,
    /// Print the rendered prompt and exit
    #[arg(short = 'r', long)]
    pub render: bool,
    /// Copy the rendered prompt to the clipboard and exit
    #[arg(short = 'c', long)]
    pub copy: bool,
    /// Block until the session finishes instead of detaching
    #[arg(long)]
    pub wait: bool,
    /// Ask the oracle to run its login flow first
    #[arg(long)]
    pub login: bool,
    /// Keep the oracle's browser open after the session
    #[arg(long)]
    pub keep_browser: bool,
}

impl RunArgs {
    pub fn execute(&self, root: &Path, env: &EnvSnapshot, ui: &Ui) -> anyhow::Result<()> {
        let round: u32 = self.round.trim().parse().map_err(|_| {
            ExitError::Usage(format!(
                "round must be a positive integer, got {:?}",
                self.round
            ))
        })?;
        if round == 0 {
            return Err(ExitError::Usage("round must be >= 1".into()).into());
        }

        let workflow = super::load_workflow(root, self.workflow.as_deref())?;
        let prompt = build_revision_prompt(&workflow, round, self.include_impl)?;

        if self.render {
            println!("{prompt}");
            return Ok(());
        }
        if self.copy {
            copy_to_clipboard(&prompt)?;
            ui.success("prompt copied to clipboard");
            return Ok(());
        }

        let oracle = SystemOracle::from_env(env);
        let slug = generate_slug();
        let output_file = workflow.output_dir.join(round_file_name(round));

        if self.dry_run {
            ui.info(&format!(
                "would launch: model={} workflow={} round={round} slug={slug}",
                workflow.oracle_model, workflow.name
            ));
            ui.info(&format!("would write:  {}", output_file.display()));
            return Ok(());
        }

        // Full precondition pass before the expensive call.
        let ctx = InvocationContext {
            project_root: root.to_path_buf(),
            workflow: self.workflow.clone(),
            format: OutputFormat::Json,
            compact: false,
            emit_stats: false,
            include_impl: self.include_impl,
            env: env.clone(),
        };
        let v = validate::collect(&ctx, &self.round, &oracle);
        for warning in &v.warnings {
            ui.warn(warning);
        }
        if !v.valid() {
            for error in &v.errors {
                ui.error(error);
            }
            return Err(ExitError::ValidationFailed(format!(
                "{} precondition error(s)",
                v.errors.len()
            ))
            .into());
        }

        let cleanup = CleanupState::new();
        let mut lock = LockManager::new(root).acquire(&workflow.name, round)?;
        lock.register(&cleanup);

        let tmp_dir = config::apr_dir(root).join("tmp");
        std::fs::create_dir_all(&tmp_dir)
            .with_context(|| format!("creating {}", tmp_dir.display()))?;
        let prompt_file = tmp_dir.join(format!("{slug}.prompt.md"));
        std::fs::write(&prompt_file, &prompt)
            .with_context(|| format!("writing {}", prompt_file.display()))?;
        std::fs::create_dir_all(&workflow.output_dir)
            .with_context(|| format!("creating {}", workflow.output_dir.display()))?;

        let spec = LaunchSpec {
            model: workflow.oracle_model.clone(),
            prompt_file: prompt_file.clone(),
            output_file: output_file.clone(),
            slug: slug.clone(),
            login: self.login,
            keep_browser: self.keep_browser,
        };

        if self.wait {
            // Blocking mode owns the lock and the scratch file for the whole
            // session; the signal handler covers interrupted exits.
            cleanup.set_temp_dir(prompt_file.clone());
            if let Err(e) = CleanupState::install_signal_handler(&cleanup) {
                tracing::debug!(error = %e, "signal handler unavailable");
            }
            ui.info(&format!(
                "running round {round} (slug {slug}); this can take a while..."
            ));
            oracle.run_blocking(&spec)?;
            lock.release();

            let output = std::fs::read_to_string(&output_file)
                .with_context(|| format!("reading {}", output_file.display()))?;
            let chars = u64::try_from(output.chars().count()).unwrap_or(u64::MAX);
            let mut record = MetricsRecord::load(root, &workflow.name)?
                .unwrap_or_else(|| MetricsRecord::new(&workflow.name));
            record.record_live(round, chars);
            record.save(root)?;
            cleanup.cleanup();

            ui.success(&format!(
                "round {round} complete: {} ({chars} chars)",
                output_file.display()
            ));
        } else {
            let pid = oracle.launch_detached(&spec)?;
            lock.transfer(pid)?;
            ui.success(&format!("round {round} launched (slug {slug}, pid {pid})"));
            ui.info(&format!("attach with: apr attach {slug}"));
            ui.info(&format!("output will land at {}", output_file.display()));
        }
        Ok(())
    }
}

/// Pipe text into the first clipboard helper that works.
fn copy_to_clipboard(text: &str) -> anyhow::Result<()> {
    let candidates: [(&str, &[&str]); 3] = [
        ("pbcopy", &[]),
        ("wl-copy", &[]),
        ("xclip", &["-selection", "clipboard"]),
    ];
    for (bin, args) in candidates {
        match Tool::new(bin).args(args).stdin(text).run() {
            Ok(output) if output.success() => return Ok(()),
            _ => {}
        }
    }
    Err(ExitError::ToolNotFound {
        tool: "clipboard helper (pbcopy/wl-copy/xclip)".into(),
    }
    .into())
}
