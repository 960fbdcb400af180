//! Opt-in update check.
//!
//! Runs only when `APR_CHECK_UPDATES` is set, never in CI, and at most once
//! per day (throttled via a stamp file under the cache directory). Output
//! goes to stderr only; failures are logged at debug level and otherwise
//! ignored; the check must never affect the command's own outcome.

use std::path::PathBuf;
use std::time::Duration;

use crate::context::EnvSnapshot;

const RELEASES_URL: &str = "https://api.github.com/repos/bobisme/apr/releases/latest";
const CHECK_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

/// Whether the environment permits an update check at all.
pub fn enabled(env: &EnvSnapshot) -> bool {
    env.check_updates && !env.ci
}

fn cache_dir(env: &EnvSnapshot) -> Option<PathBuf> {
    env.cache
        .as_ref()
        .map(PathBuf::from)
        .or_else(|| dirs::cache_dir().map(|d| d.join("apr")))
}

fn stamp_is_fresh(stamp: &std::path::Path) -> bool {
    std::fs::metadata(stamp)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|t| t.elapsed().ok())
        .is_some_and(|age| age < CHECK_INTERVAL)
}

fn fetch_latest_version() -> anyhow::Result<String> {
    let body = ureq::get(RELEASES_URL)
        .call()?
        .into_body()
        .read_to_string()?;
    let value: serde_json::Value = serde_json::from_str(&body)?;
    let tag = value
        .get("tag_name")
        .and_then(|v| v.as_str())
        .unwrap_or_default();
    Ok(tag.trim_start_matches('v').to_string())
}

/// Best-effort check; prints a one-line hint to stderr when a newer release
/// exists.
pub fn maybe_check(env: &EnvSnapshot) {
    if !enabled(env) {
        return;
    }
    let Some(dir) = cache_dir(env) else {
        return;
    };
    let stamp = dir.join("last-update-check");
    if stamp_is_fresh(&stamp) {
        return;
    }
    let _ = std::fs::create_dir_all(&dir);
    let _ = std::fs::write(&stamp, "");

    match fetch_latest_version() {
        Ok(latest) if !latest.is_empty() && latest != env!("CARGO_PKG_VERSION") => {
            eprintln!(
                "apr: a newer release is available ({latest}, running {})",
                env!("CARGO_PKG_VERSION")
            );
        }
        Ok(_) => {}
        Err(e) => tracing::debug!(error = %e, "update check failed"),
    }
}
