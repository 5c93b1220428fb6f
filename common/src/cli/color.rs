//! Standardized CLI color policy.
//!
//! An explicit `--color` choice always wins. In `Auto` mode, `NO_COLOR` and
//! `EMACS` disable colour, otherwise it follows whether the stream is a TTY.

use std::env;

/// When to emit ANSI colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorWhen {
    /// Enable colors only when output is a TTY.
    Auto,

    /// Always enable colors.
    Always,

    /// Never enable colors.
    Never,
}

impl ColorWhen {
    // ---
    /// Returns whether log output on stderr should carry ANSI colour.
    pub fn should_color_stderr(self) -> bool {
        // ---
        self.resolve(
            env::var_os("NO_COLOR").is_some() || env::var_os("EMACS").is_some(),
            atty::is(atty::Stream::Stderr),
        )
    }

    /// Pure policy, separated from the environment lookups.
    fn resolve(self, env_disables: bool, is_tty: bool) -> bool {
        // ---
        match self {
            ColorWhen::Always => true,
            ColorWhen::Never => false,
            ColorWhen::Auto => !env_disables && is_tty,
        }
    }
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;

    #[test]
    fn test_auto_follows_tty() {
        // ---
        assert!(ColorWhen::Auto.resolve(false, true));
        assert!(!ColorWhen::Auto.resolve(false, false));
    }

    #[test]
    fn test_env_disables_auto_only() {
        // ---
        assert!(!ColorWhen::Auto.resolve(true, true));
        assert!(ColorWhen::Always.resolve(true, false));
        assert!(!ColorWhen::Never.resolve(false, true));
    }
}
