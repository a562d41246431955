//! Interactive prompt seam.
//!
//! The workflows ask questions through this trait; the CLI provides a
//! terminal implementation and tests script the answers. Prompts block the
//! calling task until answered, so implementations must not be called from
//! code that needs to stay responsive.

/// Question renderer consumed by the workflows.
pub trait Prompter: Send + Sync {
    /// Free-form text input, optionally pre-filled with a default.
    fn input(&self, message: &str, default: Option<&str>) -> anyhow::Result<String>;

    /// Pick one item from a list; returns the chosen index.
    fn select(&self, message: &str, items: &[String], default: usize) -> anyhow::Result<usize>;

    /// Yes/no question with a default answer.
    fn confirm(&self, message: &str, default: bool) -> anyhow::Result<bool>;
}
