//! Per-invocation context.
//!
//! Every robot command runs against one immutable [`InvocationContext`]
//! built from parsed arguments plus an explicit [`EnvSnapshot`]. Components
//! receive the context as a parameter; nothing reads ambient process state
//! after startup.

use std::path::{Path, PathBuf};

/// Environment variable names consumed by apr.
pub mod env_vars {
    /// Tool-specific output format override.
    pub const OUTPUT_FORMAT: &str = "APR_OUTPUT_FORMAT";
    /// Suite-wide output format override (lower precedence).
    pub const SUITE_OUTPUT_FORMAT: &str = "AGENT_OUTPUT_FORMAT";
    /// Path to the TOON encoder binary.
    pub const TOON_BIN: &str = "APR_TOON_BIN";
    /// Path to the external reasoning-service binary.
    pub const ORACLE_BIN: &str = "APR_ORACLE_BIN";
    /// Data directory override.
    pub const HOME: &str = "APR_HOME";
    /// Cache directory override.
    pub const CACHE: &str = "APR_CACHE";
    /// Opt-in update check.
    pub const CHECK_UPDATES: &str = "APR_CHECK_UPDATES";
    /// Disable styled terminal output.
    pub const NO_GUM: &str = "APR_NO_GUM";
}

/// Output format for robot commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON envelope (default).
    Json,
    /// Token-dense TOON re-encoding of the JSON envelope.
    Toon,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Json => f.write_str("json"),
            Self::Toon => f.write_str("toon"),
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "toon" => Ok(Self::Toon),
            other => Err(format!("unknown output format: {other} (expected json or toon)")),
        }
    }
}

/// Immutable snapshot of the environment taken once at startup.
#[derive(Debug, Clone, Default)]
pub struct EnvSnapshot {
    pub tool_format: Option<String>,
    pub suite_format: Option<String>,
    pub toon_bin: Option<String>,
    pub oracle_bin: Option<String>,
    pub home: Option<String>,
    pub cache: Option<String>,
    pub check_updates: bool,
    pub no_color: bool,
    pub ci: bool,
    pub no_gum: bool,
}

impl EnvSnapshot {
    pub fn capture() -> Self {
        let get = |k: &str| std::env::var(k).ok().filter(|v| !v.is_empty());
        Self {
            tool_format: get(env_vars::OUTPUT_FORMAT),
            suite_format: get(env_vars::SUITE_OUTPUT_FORMAT),
            toon_bin: get(env_vars::TOON_BIN),
            oracle_bin: get(env_vars::ORACLE_BIN),
            home: get(env_vars::HOME),
            cache: get(env_vars::CACHE),
            check_updates: get(env_vars::CHECK_UPDATES).is_some_and(|v| v != "0"),
            no_color: get("NO_COLOR").is_some(),
            ci: get("CI").is_some(),
            no_gum: get(env_vars::NO_GUM).is_some(),
        }
    }
}

/// Resolve the effective output format.
///
/// Precedence: explicit `-f/--format` flag, then `APR_OUTPUT_FORMAT`, then
/// the suite-wide override, then JSON. Unparseable environment values are
/// skipped rather than fatal so a stray variable cannot break robot callers.
pub fn resolve_format(flag: Option<OutputFormat>, env: &EnvSnapshot) -> OutputFormat {
    if let Some(f) = flag {
        return f;
    }
    for candidate in [&env.tool_format, &env.suite_format].into_iter().flatten() {
        match candidate.parse() {
            Ok(f) => return f,
            Err(_) => {
                tracing::debug!(value = %candidate, "ignoring unparseable output format override");
            }
        }
    }
    OutputFormat::Json
}

/// Immutable invocation state threaded into every component call.
#[derive(Debug, Clone)]
pub struct InvocationContext {
    pub project_root: PathBuf,
    /// Explicit `-w/--workflow` value, if any.
    pub workflow: Option<String>,
    pub format: OutputFormat,
    pub compact: bool,
    pub emit_stats: bool,
    pub include_impl: bool,
    pub env: EnvSnapshot,
}

impl InvocationContext {
    pub fn new(
        project_root: PathBuf,
        workflow: Option<String>,
        format_flag: Option<OutputFormat>,
        compact: bool,
        emit_stats: bool,
        include_impl: bool,
        env: EnvSnapshot,
    ) -> Self {
        let format = resolve_format(format_flag, &env);
        Self {
            project_root,
            workflow,
            format,
            compact,
            emit_stats,
            include_impl,
            env,
        }
    }

    pub fn root(&self) -> &Path {
        &self.project_root
    }

    pub fn workflow_flag(&self) -> Option<&str> {
        self.workflow.as_deref()
    }
}
