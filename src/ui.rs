//! Human-mode terminal output.
//!
//! Styled output degrades to plain text under `NO_COLOR`, `CI`,
//! `APR_NO_GUM`, or a non-terminal stdout. Quiet mode suppresses
//! informational, success, and warning output, never errors.

use std::io::IsTerminal;

use termimad::MadSkin;

use crate::context::EnvSnapshot;

pub struct Ui {
    plain: bool,
    quiet: bool,
}

impl Ui {
    pub fn from_env(env: &EnvSnapshot, quiet: bool) -> Self {
        let plain =
            env.no_color || env.ci || env.no_gum || !std::io::stdout().is_terminal();
        Self { plain, quiet }
    }

    pub const fn plain(&self) -> bool {
        self.plain
    }

    /// Informational line; suppressed by quiet mode.
    pub fn info(&self, msg: &str) {
        if !self.quiet {
            println!("{msg}");
        }
    }

    /// Success line; suppressed by quiet mode.
    pub fn success(&self, msg: &str) {
        if self.quiet {
            return;
        }
        if self.plain {
            println!("ok: {msg}");
        } else {
            println!("✓ {msg}");
        }
    }

    /// Warning to stderr; suppressed by quiet mode.
    pub fn warn(&self, msg: &str) {
        if self.quiet {
            return;
        }
        if self.plain {
            eprintln!("warning: {msg}");
        } else {
            eprintln!("⚠ {msg}");
        }
    }

    /// Error to stderr with a visible indicator. Never suppressed.
    pub fn error(&self, msg: &str) {
        if self.plain {
            eprintln!("error: {msg}");
        } else {
            eprintln!("✗ {msg}");
        }
    }

    /// Render markdown to the terminal, or print it raw in plain mode.
    pub fn markdown(&self, text: &str) {
        if self.plain {
            println!("{text}");
        } else {
            MadSkin::default().print_text(text);
        }
    }
}
