//! # Operator Prompts
//!
//! The onboarding run asks the operator for a handful of things: which tools
//! to install, their GUID, an email for a new SSH key, and confirmations at
//! the points where a human has to act (Xcode dialog, VPN switch, SSH key
//! registration). All of it goes through the [`Prompter`] trait so the
//! pipeline can be driven by a scripted prompter in tests.
//!
//! [`DialoguerPrompter`] is the terminal implementation built on `dialoguer`.

use colored::Colorize;
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, Input, MultiSelect};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PromptError {
    #[error("{0} was cancelled")]
    Cancelled(String),
    #[error("cannot prompt for {title}: {source}")]
    Terminal {
        title: String,
        source: dialoguer::Error,
    },
}

pub trait Prompter {
    /// Free-text answer, `default` pre-filled. May be empty.
    fn input(&mut self, title: &str, prompt: &str, default: &str) -> Result<String, PromptError>;

    /// Yes/no question. Cancelling is an error, answering "no" is not.
    fn confirm(&mut self, title: &str, prompt: &str) -> Result<bool, PromptError>;

    /// Multi-selection of `options`, with `defaults` pre-checked. Returns the
    /// chosen options in display order.
    fn choose(
        &mut self,
        title: &str,
        prompt: &str,
        options: &[String],
        defaults: &[String],
    ) -> Result<Vec<String>, PromptError>;

    /// Shows `message` and blocks until the operator acknowledges it.
    fn alert(&mut self, title: &str, message: &str) -> Result<(), PromptError>;
}

/// Interactive prompts on the controlling terminal.
pub struct DialoguerPrompter {
    theme: ColorfulTheme,
}

impl Default for DialoguerPrompter {
    fn default() -> Self {
        Self {
            theme: ColorfulTheme::default(),
        }
    }
}

impl DialoguerPrompter {
    fn heading(title: &str) {
        println!("\n{}", format!("── {title} ").bold());
    }

    fn terminal(title: &str) -> impl FnOnce(dialoguer::Error) -> PromptError + '_ {
        move |source| PromptError::Terminal {
            title: title.to_string(),
            source,
        }
    }
}

impl Prompter for DialoguerPrompter {
    fn input(&mut self, title: &str, prompt: &str, default: &str) -> Result<String, PromptError> {
        Self::heading(title);
        let mut input = Input::<String>::with_theme(&self.theme)
            .with_prompt(prompt)
            .allow_empty(true);
        if !default.is_empty() {
            input = input.with_initial_text(default);
        }
        input.interact_text().map_err(Self::terminal(title))
    }

    fn confirm(&mut self, title: &str, prompt: &str) -> Result<bool, PromptError> {
        Self::heading(title);
        Confirm::with_theme(&self.theme)
            .with_prompt(prompt)
            .default(true)
            .interact_opt()
            .map_err(Self::terminal(title))?
            .ok_or_else(|| PromptError::Cancelled(title.to_string()))
    }

    fn choose(
        &mut self,
        title: &str,
        prompt: &str,
        options: &[String],
        defaults: &[String],
    ) -> Result<Vec<String>, PromptError> {
        Self::heading(title);
        let checked: Vec<bool> = options.iter().map(|o| defaults.contains(o)).collect();
        let picked = MultiSelect::with_theme(&self.theme)
            .with_prompt(prompt)
            .items(options)
            .defaults(&checked)
            .interact_opt()
            .map_err(Self::terminal(title))?
            .ok_or_else(|| PromptError::Cancelled(title.to_string()))?;
        Ok(picked.into_iter().map(|i| options[i].clone()).collect())
    }

    fn alert(&mut self, title: &str, message: &str) -> Result<(), PromptError> {
        Self::heading(title);
        println!("{message}");
        Input::<String>::with_theme(&self.theme)
            .with_prompt("Press Enter to continue")
            .allow_empty(true)
            .interact_text()
            .map_err(Self::terminal(title))?;
        Ok(())
    }
}
