//! Terminal prompts backed by dialoguer.

use dialoguer::theme::ColorfulTheme;
use dialoguer::{Confirm, Input, Select};

use tether_core::prompt::Prompter;

pub struct TermPrompter {
    theme: ColorfulTheme,
}

impl TermPrompter {
    pub fn new() -> Self {
        Self {
            theme: ColorfulTheme::default(),
        }
    }
}

impl Prompter for TermPrompter {
    fn input(&self, message: &str, default: Option<&str>) -> anyhow::Result<String> {
        let mut prompt = Input::with_theme(&self.theme).with_prompt(message);
        if let Some(default) = default {
            prompt = prompt.default(default.to_string());
        }
        Ok(prompt.interact_text()?)
    }

    fn select(&self, message: &str, items: &[String], default: usize) -> anyhow::Result<usize> {
        let index = Select::with_theme(&self.theme)
            .with_prompt(message)
            .items(items)
            .default(default)
            .interact()?;
        Ok(index)
    }

    fn confirm(&self, message: &str, default: bool) -> anyhow::Result<bool> {
        let answer = Confirm::with_theme(&self.theme)
            .with_prompt(message)
            .default(default)
            .interact()?;
        Ok(answer)
    }
}
