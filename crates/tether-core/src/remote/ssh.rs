//! SSH implementation of remote command execution.
//!
//! Devices expose a root shell on a dedicated port for provisioning.
//! Connections are opened per call and authenticated with the user's
//! default key files; nothing is held between workflow steps.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use russh::client;
use russh_keys::key::PublicKey;
use tokio::net::TcpStream;
use tracing::debug;

use super::RemoteExec;

/// Port of the device-local provisioning shell.
pub const REMOTE_SHELL_PORT: u16 = 22222;

/// User the provisioning shell runs as.
pub const REMOTE_SHELL_USER: &str = "root";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Accepts any server key. Device host keys are regenerated per OS flash,
/// so there is nothing stable to pin them against.
struct AcceptingHandler;

#[async_trait]
impl client::Handler for AcceptingHandler {
    type Error = russh::Error;

    async fn check_server_key(
        &mut self,
        _server_public_key: &PublicKey,
    ) -> Result<bool, Self::Error> {
        Ok(true)
    }
}

struct RunOutput {
    stdout: String,
    stderr: String,
    exit_status: Option<u32>,
}

pub struct SshExec {
    port: u16,
    username: String,
}

impl Default for SshExec {
    fn default() -> Self {
        Self::new()
    }
}

impl SshExec {
    pub fn new() -> Self {
        Self {
            port: REMOTE_SHELL_PORT,
            username: REMOTE_SHELL_USER.to_string(),
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    async fn session(&self, address: &str) -> anyhow::Result<client::Handle<AcceptingHandler>> {
        let config = Arc::new(client::Config::default());

        let stream = tokio::time::timeout(
            CONNECT_TIMEOUT,
            TcpStream::connect((address, self.port)),
        )
        .await
        .with_context(|| format!("Connection timeout to {}:{}", address, self.port))?
        .with_context(|| format!("Failed to connect to {}:{}", address, self.port))?;

        let mut session = client::connect_stream(config, stream, AcceptingHandler).await?;

        let home =
            dirs::home_dir().ok_or_else(|| anyhow::anyhow!("Cannot find home directory"))?;
        let key_paths = [
            home.join(".ssh/id_ed25519"),
            home.join(".ssh/id_rsa"),
            home.join(".ssh/id_ecdsa"),
        ];

        let mut authenticated = false;
        for key_path in &key_paths {
            if !key_path.exists() {
                continue;
            }
            let Ok(key) = load_private_key(key_path).await else {
                continue;
            };
            match session
                .authenticate_publickey(&self.username, Arc::new(key))
                .await
            {
                Ok(true) => {
                    authenticated = true;
                    break;
                }
                Ok(false) | Err(_) => continue,
            }
        }

        if !authenticated {
            anyhow::bail!(
                "Authentication failed for {}@{}; add your SSH key to the device",
                self.username,
                address
            );
        }

        Ok(session)
    }

    async fn run(
        &self,
        address: &str,
        command: &str,
        sink: Option<&(dyn for<'a> Fn(&'a str) + Send + Sync)>,
    ) -> anyhow::Result<RunOutput> {
        debug!("running remote command on {address}:{}", self.port);
        let session = self.session(address).await?;
        let mut channel = session.channel_open_session().await?;

        channel.exec(true, command).await?;

        let mut stdout = Vec::new();
        let mut stderr = Vec::new();
        let mut exit_status = None;
        let mut pending = String::new();

        loop {
            match channel.wait().await {
                Some(russh::ChannelMsg::Data { data }) => {
                    if let Some(sink) = sink {
                        pending.push_str(&String::from_utf8_lossy(&data));
                        while let Some(pos) = pending.find('\n') {
                            let line: String = pending.drain(..=pos).collect();
                            sink(line.trim_end());
                        }
                    } else {
                        stdout.extend_from_slice(&data);
                    }
                }
                Some(russh::ChannelMsg::ExtendedData { data, ext }) => {
                    if ext == 1 {
                        stderr.extend_from_slice(&data);
                    }
                }
                Some(russh::ChannelMsg::ExitStatus {
                    exit_status: status,
                }) => {
                    exit_status = Some(status);
                }
                Some(russh::ChannelMsg::Eof) => {}
                Some(russh::ChannelMsg::Close) | None => break,
                _ => {}
            }
        }

        if let Some(sink) = sink {
            if !pending.is_empty() {
                sink(pending.trim_end());
            }
        }

        let _ = session
            .disconnect(russh::Disconnect::ByApplication, "", "en")
            .await;

        Ok(RunOutput {
            stdout: String::from_utf8_lossy(&stdout).to_string(),
            stderr: String::from_utf8_lossy(&stderr).to_string(),
            exit_status,
        })
    }

    fn check_status(address: &str, output: &RunOutput) -> anyhow::Result<()> {
        match output.exit_status {
            Some(0) => Ok(()),
            Some(code) => anyhow::bail!(
                "Remote command on {} exited with status {}: {}",
                address,
                code,
                output.stderr.trim()
            ),
            None => anyhow::bail!(
                "Remote command on {} closed without an exit status",
                address
            ),
        }
    }
}

#[async_trait]
impl RemoteExec for SshExec {
    async fn exec(&self, address: &str, command: &str) -> anyhow::Result<String> {
        let output = self.run(address, command, None).await?;
        Self::check_status(address, &output)?;
        Ok(output.stdout)
    }

    async fn exec_streaming(
        &self,
        address: &str,
        command: &str,
        sink: &(dyn for<'a> Fn(&'a str) + Send + Sync),
    ) -> anyhow::Result<()> {
        let output = self.run(address, command, Some(sink)).await?;
        Self::check_status(address, &output)
    }
}

async fn load_private_key(path: &Path) -> anyhow::Result<russh_keys::key::KeyPair> {
    let content = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read key file: {}", path.display()))?;

    russh_keys::decode_secret_key(&content, None)
        .with_context(|| format!("Failed to decode private key: {}", path.display()))
}
