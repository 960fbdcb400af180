//! The uniform robot-mode response envelope.
//!
//! Every robot command produces exactly one `{ok, code, data, hint?, meta}`
//! document on stdout. TOON re-encoding is best-effort: the encoder is an
//! external binary that may not be installed, and when it is missing or
//! fails the JSON envelope still goes to stdout with a single `[warn]` line
//! on stderr. Machine-readability never depends on a companion tool.

use std::time::Duration;

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::context::{EnvSnapshot, InvocationContext, OutputFormat};
use crate::error::ErrorCode;
use crate::subprocess::Tool;

/// Default TOON encoder binary, overridable via `APR_TOON_BIN`.
const TOON_BIN: &str = "toon";
const ENCODER_TIMEOUT: Duration = Duration::from_secs(10);

/// Stderr marker for the encoder fallback, greppable by scripts.
pub const WARN_MARKER: &str = "[warn]";
/// Stderr marker for byte-savings statistics, greppable by scripts.
pub const STATS_MARKER: &str = "[stats]";

#[derive(Debug, Serialize)]
pub struct Meta {
    pub v: &'static str,
    pub ts: String,
}

/// The wire-format contract for every robot command.
#[derive(Debug, Serialize)]
pub struct Envelope {
    pub ok: bool,
    pub code: ErrorCode,
    pub data: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    pub meta: Meta,
}

impl Envelope {
    pub fn new(code: ErrorCode, data: Value, hint: Option<String>) -> Self {
        Self {
            ok: code == ErrorCode::Ok,
            code,
            data,
            hint,
            meta: Meta {
                v: env!("CARGO_PKG_VERSION"),
                ts: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            },
        }
    }

    pub fn success(data: Value) -> Self {
        Self::new(ErrorCode::Ok, data, None)
    }

    pub fn failure(code: ErrorCode, data: Value, hint: Option<String>) -> Self {
        debug_assert!(code != ErrorCode::Ok, "failure envelope with ok code");
        Self::new(code, data, hint)
    }

    /// Serialize. Compact mode has no insignificant whitespace.
    pub fn to_json(&self, compact: bool) -> String {
        let result = if compact {
            serde_json::to_string(self)
        } else {
            serde_json::to_string_pretty(self)
        };
        // Envelope fields are all serializable; this arm is unreachable in
        // practice but must not panic in a robot-mode process.
        result.unwrap_or_else(|e| {
            format!("{{\"ok\":false,\"code\":\"validation_failed\",\"data\":{{\"error\":\"serialization: {e}\"}}}}")
        })
    }
}

/// What a robot command ultimately writes: one stdout document plus any
/// stderr diagnostics. Split out from the printing so tests can assert on
/// both channels without capturing process output.
#[derive(Debug)]
pub struct Rendered {
    pub stdout: String,
    pub stderr: Vec<String>,
}

/// Re-encode a compact JSON document through the external TOON encoder.
///
/// Fails cleanly (no partial output) when the encoder binary is absent,
/// exits nonzero, or produces an empty document.
pub fn encode_toon(json: &str, env: &EnvSnapshot) -> anyhow::Result<String> {
    let bin = env.toon_bin.as_deref().unwrap_or(TOON_BIN);
    let output = Tool::new(bin)
        .arg("encode")
        .stdin(json)
        .timeout(ENCODER_TIMEOUT)
        .run_ok()?;
    if output.stdout.trim().is_empty() {
        anyhow::bail!("{bin} produced no output");
    }
    Ok(output.stdout)
}

/// Render an envelope for the invocation's format, applying the TOON
/// fallback policy and optional byte-savings statistics.
pub fn render(envelope: &Envelope, ctx: &InvocationContext) -> Rendered {
    let json = envelope.to_json(ctx.compact);
    let mut stderr = Vec::new();

    let toon = match ctx.format {
        OutputFormat::Toon => Some(encode_toon(&json, &ctx.env)),
        // Stats mode wants both sizes even when JSON was selected.
        OutputFormat::Json if ctx.emit_stats => Some(encode_toon(&json, &ctx.env)),
        OutputFormat::Json => None,
    };

    let stdout = match (ctx.format, &toon) {
        (OutputFormat::Toon, Some(Ok(encoded))) => encoded.trim_end().to_string(),
        (OutputFormat::Toon, Some(Err(e))) => {
            stderr.push(format!(
                "apr: {WARN_MARKER} toon encoder unavailable ({e}); falling back to json"
            ));
            json.clone()
        }
        _ => json.clone(),
    };

    if ctx.emit_stats {
        stderr.push(stats_line(&json, toon.as_ref()));
    }

    Rendered { stdout, stderr }
}

fn stats_line(json: &str, toon: Option<&anyhow::Result<String>>) -> String {
    let json_bytes = json.len();
    match toon {
        Some(Ok(encoded)) => {
            let toon_bytes = encoded.trim_end().len();
            #[allow(clippy::cast_precision_loss)] // envelope sizes are tiny
            let delta = if json_bytes == 0 {
                0.0
            } else {
                (toon_bytes as f64 - json_bytes as f64) / json_bytes as f64 * 100.0
            };
            format!("apr: {STATS_MARKER} json={json_bytes}B toon={toon_bytes}B delta={delta:+.1}%")
        }
        _ => format!("apr: {STATS_MARKER} json={json_bytes}B toon=unavailable"),
    }
}

/// Print a rendered response: document to stdout, diagnostics to stderr.
pub fn emit(rendered: &Rendered) {
    println!("{}", rendered.stdout);
    for line in &rendered.stderr {
        eprintln!("{line}");
    }
}
