//! Interactive terminal vs CI/build pipeline detection

use std::io::IsTerminal;

/// Variables whose presence means output is captured into a log
const NON_INTERACTIVE_VARS: &[&str] = &[
    "CI",
    "CNB_PLATFORM_API",
    "CNB_LAYERS_DIR",
    "GITHUB_ACTIONS",
    "GITLAB_CI",
    "BUILDKITE",
    "JENKINS_URL",
    "TF_BUILD",
];

/// Decides whether output may use spinners and colors
#[derive(Debug, Clone)]
pub struct UiContext {
    interactive: bool,
}

impl UiContext {
    /// Detect the current environment
    pub fn detect() -> Self {
        Self {
            interactive: interactive_from(std::io::stdout().is_terminal(), |var| {
                std::env::var_os(var).is_some()
            }),
        }
    }

    /// Plain output regardless of the terminal
    #[cfg(test)]
    pub fn non_interactive() -> Self {
        Self { interactive: false }
    }

    /// Whether to draw spinners and colors
    pub fn use_fancy_output(&self) -> bool {
        self.interactive
    }
}

fn interactive_from(stdout_is_tty: bool, is_set: impl Fn(&str) -> bool) -> bool {
    stdout_is_tty && !NON_INTERACTIVE_VARS.iter().any(|var| is_set(var))
}
