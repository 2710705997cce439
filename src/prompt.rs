//! Interactive prompts.

use anyhow::{Context, Result};
use dialoguer::{Password, Select, theme::ColorfulTheme};

/// The two questions asked during a run.
pub trait Prompter {
    /// Lets the user pick one of the bracketed `headers` and returns the bare profile name.
    ///
    /// # Errors
    ///
    /// Fails when the terminal cannot be read or the user cancels the menu.
    fn select_profile(&self, headers: &[String]) -> Result<String>;

    /// Reads an MFA code without echoing it. The code is returned as typed.
    fn mfa_code(&self) -> Result<String>;
}

/// Prompter drawing on the terminal (stderr), leaving stdout untouched.
#[derive(Default)]
pub struct TerminalPrompter {
    /// Shared by both prompts
    theme: ColorfulTheme,
}

impl Prompter for TerminalPrompter {
    fn select_profile(&self, headers: &[String]) -> Result<String> {
        let index = Select::with_theme(&self.theme)
            .with_prompt("Select a AWS profile")
            .items(headers)
            .default(0)
            .interact_opt()
            .context("Failed to read profile selection")?
            .context("No profile selected")?;

        Ok(strip_brackets(&headers[index]).to_string())
    }

    fn mfa_code(&self) -> Result<String> {
        Password::with_theme(&self.theme)
            .with_prompt("MFA Code")
            .interact()
            .context("Failed to read MFA code")
    }
}

/// `"[dev]"` -> `"dev"`. Anything not wrapped in brackets is returned as is.
pub fn strip_brackets(header: &str) -> &str {
    header
        .strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(header)
}
