//! Provider subprocess client.
//!
//! A remote store is reached through an external binary named
//! `poolday-remote-<name>` found in PATH. Each call spawns it, writes one
//! JSON request line to stdin and reads one JSON response from stdout.
//! Providers own their credentials and endpoints; core only speaks the
//! protocol.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::io::AsyncWriteExt;
use tokio::process::Command as TokioCommand;
use tokio::time::timeout;
use tracing::debug;

use crate::constants::REMOTE_BINARY_PREFIX;
use crate::error::{PoolDayError, PoolDayResult};
use crate::remote::protocol::{Command, ProviderCommand, Request, Response};

#[derive(Clone, Debug)]
pub struct Provider {
    name: String,
    timeout: Duration,
}

impl Provider {
    pub fn new(name: &str, timeout: Duration) -> Self {
        Provider {
            name: name.to_string(),
            timeout,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn binary_name(&self) -> String {
        format!("{}{}", REMOTE_BINARY_PREFIX, self.name)
    }

    fn binary_path(&self) -> PoolDayResult<PathBuf> {
        which::which(self.binary_name())
            .map_err(|_| PoolDayError::ProviderNotInstalled(self.binary_name()))
    }

    /// Call a typed provider command, bounded by the provider's timeout.
    ///
    /// The child process is killed if the deadline passes.
    pub async fn call<C: ProviderCommand>(&self, cmd: C) -> PoolDayResult<C::Response> {
        timeout(self.timeout, self.call_raw(C::command(), cmd))
            .await
            .map_err(|_| PoolDayError::RemoteTimeout(self.timeout))?
    }

    async fn call_raw<P: Serialize, R: DeserializeOwned>(
        &self,
        command: Command,
        params: P,
    ) -> PoolDayResult<R> {
        let params = serde_json::to_value(params)
            .map_err(|e| PoolDayError::Serialization(e.to_string()))?;
        let request = Request { command, params };
        let request_json = serde_json::to_string(&request)
            .map_err(|e| PoolDayError::Serialization(e.to_string()))?;

        let binary_path = self.binary_path()?;
        debug!(provider = %self.name, ?command, "calling remote provider");

        let mut child = TokioCommand::new(&binary_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                PoolDayError::RemoteUnavailable(format!(
                    "Failed to spawn {}: {}",
                    binary_path.display(),
                    e
                ))
            })?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| PoolDayError::RemoteUnavailable("Provider stdin unavailable".into()))?;
        stdin
            .write_all(format!("{request_json}\n").as_bytes())
            .await?;
        drop(stdin);

        let output = child.wait_with_output().await?;

        if !output.status.success() {
            return Err(PoolDayError::RemoteUnavailable(format!(
                "Provider exited with status: {}",
                output.status.code().unwrap_or(-1)
            )));
        }

        let response_str = String::from_utf8_lossy(&output.stdout);
        parse_response(&response_str)
    }
}

fn parse_response<R: DeserializeOwned>(raw: &str) -> PoolDayResult<R> {
    if raw.trim().is_empty() {
        return Err(PoolDayError::RemoteUnavailable(
            "Provider returned no response".into(),
        ));
    }

    let response: Response<R> = serde_json::from_str(raw).map_err(|e| {
        PoolDayError::RemoteUnavailable(format!("Failed to parse response: {}", e))
    })?;

    match response {
        Response::Success { data } => Ok(data),
        Response::Error {
            error,
            rejected: true,
        } => Err(PoolDayError::RemoteRejected(error)),
        Response::Error { error, .. } => Err(PoolDayError::RemoteUnavailable(error)),
    }
}
