//! Advisory per-(workflow, round) locks.
//!
//! A lock is a file under `.apr/locks/` holding the owning PID. A lock is
//! live iff the file exists and the recorded PID maps to a running process;
//! anything else is stale and silently reclaimed on the next acquire. Stale
//! reclamation is a hard requirement here: oracle sessions run for tens of
//! minutes, and a crash mid-session must not wedge the (workflow, round)
//! pair until someone deletes a file by hand.
//!
//! The check-then-create sequence is not atomic against a true multi-process
//! race. Target deployment is single-operator interactive or CI use.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::Context;

use crate::config;
use crate::error::ExitError;

/// Narrow OS-facing probe for PID liveness, injectable in tests.
pub trait ProcessProbe {
    fn is_alive(&self, pid: u32) -> bool;
}

/// Probe backed by signal 0.
pub struct SystemProbe;

#[cfg(unix)]
impl ProcessProbe for SystemProbe {
    fn is_alive(&self, pid: u32) -> bool {
        use nix::sys::signal::kill;
        use nix::unistd::Pid;
        kill(Pid::from_raw(pid.cast_signed()), None).is_ok()
    }
}

#[cfg(not(unix))]
impl ProcessProbe for SystemProbe {
    fn is_alive(&self, _pid: u32) -> bool {
        // No cheap liveness probe; treat every recorded PID as live so
        // locks are never reclaimed out from under a running session.
        true
    }
}

static SYSTEM_PROBE: SystemProbe = SystemProbe;

/// Lock file path for a (workflow, round) pair.
pub fn lock_path(root: &Path, workflow: &str, round: u32) -> PathBuf {
    config::locks_dir(root).join(format!("{workflow}.round_{round}.lock"))
}

/// Acquires and releases advisory locks for one project root.
pub struct LockManager<'p> {
    root: PathBuf,
    probe: &'p dyn ProcessProbe,
}

impl LockManager<'static> {
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
            probe: &SYSTEM_PROBE,
        }
    }
}

impl<'p> LockManager<'p> {
    pub fn with_probe(root: &Path, probe: &'p dyn ProcessProbe) -> Self {
        Self {
            root: root.to_path_buf(),
            probe,
        }
    }

    /// Acquire the lock for `(workflow, round)`.
    ///
    /// An existing lock whose PID is dead (or unreadable) is reclaimed.
    /// An existing lock whose PID is alive fails with `LockHeld`, leaving
    /// the lock untouched.
    pub fn acquire(&self, workflow: &str, round: u32) -> anyhow::Result<LockGuard> {
        let path = lock_path(&self.root, workflow, round);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }

        if path.exists() {
            match read_pid(&path) {
                Some(pid) if self.probe.is_alive(pid) => {
                    return Err(ExitError::LockHeld {
                        pid,
                        path: path.display().to_string(),
                    }
                    .into());
                }
                stale => {
                    tracing::debug!(path = %path.display(), pid = ?stale, "reclaiming stale lock");
                    std::fs::remove_file(&path)
                        .with_context(|| format!("reclaiming {}", path.display()))?;
                }
            }
        }

        let pid = std::process::id();
        std::fs::write(&path, pid.to_string())
            .with_context(|| format!("writing {}", path.display()))?;
        Ok(LockGuard {
            path,
            armed: true,
            cleanup: None,
        })
    }
}

fn read_pid(path: &Path) -> Option<u32> {
    std::fs::read_to_string(path).ok()?.trim().parse().ok()
}

/// Holder of one acquired lock. Dropping the guard releases it; `release`
/// may also be called explicitly any number of times.
#[derive(Debug)]
pub struct LockGuard {
    path: PathBuf,
    armed: bool,
    cleanup: Option<Arc<CleanupState>>,
}

impl LockGuard {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Register this lock with a cleanup state so signal handlers can
    /// release it too.
    pub fn register(&mut self, state: &Arc<CleanupState>) {
        state.set_lock(self.path.clone());
        self.cleanup = Some(Arc::clone(state));
    }

    /// Delete the lock file this process created. Idempotent: missing files
    /// and repeat calls are no-ops.
    pub fn release(&mut self) {
        if !self.armed {
            return;
        }
        self.armed = false;
        if let Err(e) = std::fs::remove_file(&self.path)
            && e.kind() != std::io::ErrorKind::NotFound
        {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to release lock");
        }
        if let Some(state) = self.cleanup.take() {
            state.clear_lock();
        }
    }

    /// Hand the lock to a successor process and disarm this guard.
    ///
    /// Used by fire-and-forget runs: the lock file is rewritten with the
    /// detached session's PID so it stays live for the session's lifetime
    /// and goes stale (reclaimable) the moment the session exits.
    pub fn transfer(mut self, pid: u32) -> anyhow::Result<()> {
        std::fs::write(&self.path, pid.to_string())
            .with_context(|| format!("transferring {}", self.path.display()))?;
        self.armed = false;
        if let Some(state) = self.cleanup.take() {
            state.clear_lock();
        }
        Ok(())
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        self.release();
    }
}

/// Best-effort terminal cleanup shared with the signal handler.
///
/// Tracks at most one lock path and one scratch directory for the current
/// process. `cleanup` runs on every exit path of a long-running operation
/// and no-ops cleanly when there is nothing to clean.
#[derive(Default, Debug)]
pub struct CleanupState {
    inner: Mutex<CleanupInner>,
}

#[derive(Default, Debug)]
struct CleanupInner {
    lock_path: Option<PathBuf>,
    temp_dir: Option<PathBuf>,
}

impl CleanupState {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_lock(&self, path: PathBuf) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.lock_path = Some(path);
        }
    }

    pub fn clear_lock(&self) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.lock_path = None;
        }
    }

    pub fn set_temp_dir(&self, path: PathBuf) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.temp_dir = Some(path);
        }
    }

    /// Remove the scratch directory (if set) and release any held lock.
    /// Idempotent; errors are swallowed.
    pub fn cleanup(&self) {
        let Ok(mut inner) = self.inner.lock() else {
            return;
        };
        if let Some(path) = inner.lock_path.take() {
            let _ = std::fs::remove_file(path);
        }
        if let Some(path) = inner.temp_dir.take() {
            if std::fs::remove_dir_all(&path).is_err() {
                // Scratch path may be a single file.
                let _ = std::fs::remove_file(&path);
            }
        }
    }

    /// Install a SIGINT handler that runs cleanup before exiting.
    pub fn install_signal_handler(state: &Arc<Self>) -> anyhow::Result<()> {
        let state = Arc::clone(state);
        ctrlc::set_handler(move || {
            state.cleanup();
            std::process::exit(130);
        })
        .context("installing signal handler")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct AlwaysAlive;
    impl ProcessProbe for AlwaysAlive {
        fn is_alive(&self, _pid: u32) -> bool {
            true
        }
    }

    struct AlwaysDead;
    impl ProcessProbe for AlwaysDead {
        fn is_alive(&self, _pid: u32) -> bool {
            false
        }
    }

    struct OnlyDead(u32);
    impl ProcessProbe for OnlyDead {
        fn is_alive(&self, pid: u32) -> bool {
            pid != self.0
        }
    }

    #[test]
    fn acquire_release_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let mgr = LockManager::with_probe(dir.path(), &AlwaysAlive);

        let mut guard = mgr.acquire("wf", 1).unwrap();
        let path = guard.path().to_path_buf();
        assert!(path.exists());

        guard.release();
        assert!(!path.exists());

        // Same key is acquirable again.
        let _guard2 = mgr.acquire("wf", 1).unwrap();
    }

    #[test]
    fn drop_releases() {
        let dir = tempfile::tempdir().unwrap();
        let mgr = LockManager::with_probe(dir.path(), &AlwaysAlive);
        let path = {
            let guard = mgr.acquire("wf", 2).unwrap();
            guard.path().to_path_buf()
        };
        assert!(!path.exists());
    }

    #[test]
    fn live_lock_blocks_same_key_only() {
        let dir = tempfile::tempdir().unwrap();
        let mgr = LockManager::with_probe(dir.path(), &AlwaysAlive);

        let _held = mgr.acquire("wf", 1).unwrap();

        let err = mgr.acquire("wf", 1).unwrap_err();
        let exit = err.downcast_ref::<ExitError>().unwrap();
        assert!(matches!(exit, ExitError::LockHeld { .. }));

        // Different round and different workflow both succeed.
        let _other_round = mgr.acquire("wf", 2).unwrap();
        let _other_wf = mgr.acquire("wf2", 1).unwrap();
    }

    #[test]
    fn stale_lock_is_reclaimed_silently() {
        let dir = tempfile::tempdir().unwrap();
        let path = lock_path(dir.path(), "wf", 3);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "999999").unwrap();

        let mgr = LockManager::with_probe(dir.path(), &AlwaysDead);
        let guard = mgr.acquire("wf", 3).unwrap();
        let recorded = std::fs::read_to_string(guard.path()).unwrap();
        assert_eq!(recorded.trim(), std::process::id().to_string());
    }

    #[test]
    fn specific_dead_pid_is_reclaimed_but_live_is_not() {
        let dir = tempfile::tempdir().unwrap();
        let probe = OnlyDead(4242);
        let path = lock_path(dir.path(), "wf", 1);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();

        std::fs::write(&path, "4242").unwrap();
        let mgr = LockManager::with_probe(dir.path(), &probe);
        let mut guard = mgr.acquire("wf", 1).unwrap();
        guard.release();

        std::fs::write(&path, "7").unwrap();
        let err = mgr.acquire("wf", 1).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ExitError>().unwrap(),
            ExitError::LockHeld { pid: 7, .. }
        ));
    }

    #[test]
    fn corrupt_lock_file_counts_as_stale() {
        let dir = tempfile::tempdir().unwrap();
        let path = lock_path(dir.path(), "wf", 1);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "not a pid").unwrap();

        let mgr = LockManager::with_probe(dir.path(), &AlwaysAlive);
        assert!(mgr.acquire("wf", 1).is_ok());
    }

    #[test]
    fn release_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let mgr = LockManager::with_probe(dir.path(), &AlwaysAlive);
        let mut guard = mgr.acquire("wf", 1).unwrap();
        guard.release();
        guard.release();
        guard.release();
        // Drop fires one more release; none of this may panic.
    }

    #[test]
    fn transfer_keeps_lock_alive_past_drop() {
        let dir = tempfile::tempdir().unwrap();
        let mgr = LockManager::with_probe(dir.path(), &AlwaysAlive);
        let guard = mgr.acquire("wf", 1).unwrap();
        let path = guard.path().to_path_buf();

        guard.transfer(31337).unwrap();
        assert!(path.exists());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "31337");
    }

    #[test]
    fn cleanup_state_is_idempotent_and_tolerates_empty() {
        let state = CleanupState::new();
        state.cleanup();
        state.cleanup();

        let dir = tempfile::tempdir().unwrap();
        let lock = dir.path().join("x.lock");
        let scratch = dir.path().join("scratch");
        std::fs::write(&lock, "1").unwrap();
        std::fs::create_dir_all(&scratch).unwrap();

        state.set_lock(lock.clone());
        state.set_temp_dir(scratch.clone());
        state.cleanup();
        assert!(!lock.exists());
        assert!(!scratch.exists());

        state.cleanup();
    }

    #[test]
    fn guard_registered_with_cleanup_state_clears_on_release() {
        let dir = tempfile::tempdir().unwrap();
        let mgr = LockManager::with_probe(dir.path(), &AlwaysAlive);
        let state = CleanupState::new();

        let mut guard = mgr.acquire("wf", 1).unwrap();
        guard.register(&state);
        guard.release();

        // Cleanup after release must not touch anything else.
        state.cleanup();
    }
}
