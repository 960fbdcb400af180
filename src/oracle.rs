//! The external reasoning service ("oracle") collaborator.
//!
//! The core never touches process-spawning primitives directly: it talks to
//! an [`OracleLauncher`] and consumes only the narrow surface the service
//! exposes: exit code, child PID, session slug, and the output file path.
//! Sessions run for minutes to an hour, so the default launch mode is
//! fire-and-forget; blocking waits are an explicit opt-in.

use std::path::PathBuf;
use std::time::Duration;

use rand::seq::IndexedRandom;
use rand::Rng;
use serde::Serialize;

use crate::context::EnvSnapshot;
use crate::error::ExitError;
use crate::subprocess::Tool;

/// Default oracle binary name, overridable via `APR_ORACLE_BIN`.
pub const ORACLE_BIN: &str = "oracle";

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// A launched (or launchable) revision session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionHandle {
    pub slug: String,
    pub pid: u32,
    pub output_file: PathBuf,
}

/// Everything needed to start one session.
#[derive(Debug, Clone)]
pub struct LaunchSpec {
    pub model: String,
    pub prompt_file: PathBuf,
    pub output_file: PathBuf,
    pub slug: String,
    pub login: bool,
    pub keep_browser: bool,
}

impl LaunchSpec {
    fn to_args(&self) -> Vec<String> {
        let mut args = vec![
            "run".to_string(),
            "--model".to_string(),
            self.model.clone(),
            "--prompt-file".to_string(),
            self.prompt_file.display().to_string(),
            "--output".to_string(),
            self.output_file.display().to_string(),
            "--slug".to_string(),
            self.slug.clone(),
        ];
        if self.login {
            args.push("--login".to_string());
        }
        if self.keep_browser {
            args.push("--keep-browser".to_string());
        }
        args
    }
}

/// Result of probing for the oracle binary.
#[derive(Debug, Clone, Serialize)]
pub struct Availability {
    pub available: bool,
    /// How the binary was located: `env` (`APR_ORACLE_BIN`) or `path`.
    pub method: String,
    pub bin: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// Narrow interface to the reasoning service, mockable in tests.
pub trait OracleLauncher {
    fn probe(&self) -> Availability;
    /// Fire-and-forget launch; returns the detached session PID.
    fn launch_detached(&self, spec: &LaunchSpec) -> anyhow::Result<u32>;
    /// Launch and block until the session exits.
    fn run_blocking(&self, spec: &LaunchSpec) -> anyhow::Result<()>;
}

/// Launcher backed by the real binary.
pub struct SystemOracle {
    bin: String,
    method: String,
}

impl SystemOracle {
    pub fn from_env(env: &EnvSnapshot) -> Self {
        env.oracle_bin.as_ref().map_or_else(
            || Self {
                bin: ORACLE_BIN.to_string(),
                method: "path".to_string(),
            },
            |bin| Self {
                bin: bin.clone(),
                method: "env".to_string(),
            },
        )
    }

    /// Attach the terminal to a running session. Stdio is inherited so the
    /// service can drive the screen directly.
    pub fn attach(&self, slug: &str) -> anyhow::Result<()> {
        let status = std::process::Command::new(&self.bin)
            .args(["attach", slug])
            .status()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    anyhow::Error::from(ExitError::ToolNotFound {
                        tool: self.bin.clone(),
                    })
                } else {
                    anyhow::Error::new(e)
                }
            })?;
        if status.success() {
            Ok(())
        } else {
            Err(ExitError::ToolFailed {
                tool: self.bin.clone(),
                code: status.code().unwrap_or(-1),
                message: format!("attach {slug} failed"),
            }
            .into())
        }
    }
}

impl OracleLauncher for SystemOracle {
    fn probe(&self) -> Availability {
        let result = Tool::new(&self.bin)
            .arg("--version")
            .timeout(PROBE_TIMEOUT)
            .run();
        match result {
            Ok(output) if output.success() => Availability {
                available: true,
                method: self.method.clone(),
                bin: self.bin.clone(),
                version: Some(output.stdout.trim().to_string()).filter(|v| !v.is_empty()),
            },
            _ => Availability {
                available: false,
                method: self.method.clone(),
                bin: self.bin.clone(),
                version: None,
            },
        }
    }

    fn launch_detached(&self, spec: &LaunchSpec) -> anyhow::Result<u32> {
        let mut args = spec.to_args();
        args.push("--detach".to_string());
        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        Tool::new(&self.bin).args(&arg_refs).spawn_detached()
    }

    fn run_blocking(&self, spec: &LaunchSpec) -> anyhow::Result<()> {
        let args = spec.to_args();
        let arg_refs: Vec<&str> = args.iter().map(String::as_str).collect();
        Tool::new(&self.bin).args(&arg_refs).run_ok().map(|_| ())
    }
}

const SLUG_ADJECTIVES: &[&str] = &[
    "amber", "bold", "calm", "deft", "eager", "fleet", "glad", "keen", "lucid", "merry", "noble",
    "quick", "ripe", "sage", "tidy", "vivid",
];

const SLUG_NOUNS: &[&str] = &[
    "aspen", "brook", "cedar", "dune", "ember", "fern", "grove", "heron", "inlet", "juniper",
    "knoll", "larch", "mesa", "otter", "pine", "wren",
];

/// Generate a human-readable session slug (`calm-heron-3f2a`).
pub fn generate_slug() -> String {
    let mut rng = rand::rng();
    let adjective = SLUG_ADJECTIVES.choose(&mut rng).unwrap_or(&"plain");
    let noun = SLUG_NOUNS.choose(&mut rng).unwrap_or(&"round");
    let suffix: u16 = rng.random();
    format!("{adjective}-{noun}-{suffix:04x}")
}
