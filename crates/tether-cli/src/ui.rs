//! Terminal output: styled result lines and a transient spinner.
//!
//! Uses indicatif for in-progress feedback and console for styling, with
//! ASCII fallbacks on terminals without unicode support.

use std::time::Duration;

use console::{Emoji, style};
use indicatif::{ProgressBar, ProgressStyle};

use tether_core::report::Reporter;

pub struct Symbols;
impl Symbols {
    pub const SUCCESS: Emoji<'static, 'static> = Emoji("✔", "+");
    pub const ERROR: Emoji<'static, 'static> = Emoji("✖", "x");
    pub const INFO: Emoji<'static, 'static> = Emoji("ℹ", "i");
    pub const ARROW: Emoji<'static, 'static> = Emoji("➜", ">");
}

pub fn print_success(message: &str) {
    println!("{} {}", style(Symbols::SUCCESS).green(), message);
}

pub fn print_error(message: &str) {
    eprintln!("{} {}", style(Symbols::ERROR).red(), message);
}

pub fn print_next_step(message: &str) {
    println!("{} {}", style(Symbols::ARROW).cyan(), message);
}

/// Progress reporter backed by an indicatif spinner. Transient status lines
/// replace the spinner message; info lines persist above it.
pub struct SpinnerReporter {
    spinner: ProgressBar,
}

impl SpinnerReporter {
    pub fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.blue} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spinner.enable_steady_tick(Duration::from_millis(80));
        Self { spinner }
    }

    /// Clear the spinner line; call before printing final output.
    pub fn finish(&self) {
        self.spinner.finish_and_clear();
    }
}

impl Reporter for SpinnerReporter {
    fn status(&self, message: &str) {
        self.spinner.set_message(message.to_string());
    }

    fn info(&self, message: &str) {
        self.spinner
            .println(format!("{} {}", style(Symbols::INFO).blue(), message));
    }
}
