//! Remote command execution seam.

pub mod ssh;

use async_trait::async_trait;

pub use ssh::SshExec;

/// Runs commands on a target device over a remote shell channel.
///
/// Both operations treat an unreachable host and a non-zero exit as errors;
/// stderr is folded into the error so callers never lose the remote
/// diagnostic.
#[async_trait]
pub trait RemoteExec: Send + Sync {
    /// Run `command` on the device at `address` and return captured stdout.
    async fn exec(&self, address: &str, command: &str) -> anyhow::Result<String>;

    /// Run `command`, forwarding output lines to `sink` as they arrive
    /// instead of returning them. For long-running commands that report
    /// progress.
    ///
    /// The `for<'a>` binder is required: the macro names elided lifetimes,
    /// and the sink must accept lines borrowed from the read loop.
    async fn exec_streaming(
        &self,
        address: &str,
        command: &str,
        sink: &(dyn for<'a> Fn(&'a str) + Send + Sync),
    ) -> anyhow::Result<()>;
}
