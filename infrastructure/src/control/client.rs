//! Control socket client used by the CLI.

use super::protocol::{ControlRequest, ControlResponse};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;

#[derive(Debug, Error)]
pub enum ControlClientError {
    #[error("cannot reach the daemon at {path}: {source}")]
    Connect {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("control socket i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("daemon closed the connection without responding")]
    NoResponse,

    #[error("malformed response from daemon: {0}")]
    Malformed(#[from] serde_json::Error),
}

pub struct ControlClient {
    socket_path: PathBuf,
}

impl ControlClient {
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: socket_path.into(),
        }
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Send one request and wait for its response.
    pub async fn request(
        &self,
        request: &ControlRequest,
    ) -> Result<ControlResponse, ControlClientError> {
        let stream = UnixStream::connect(&self.socket_path)
            .await
            .map_err(|source| ControlClientError::Connect {
                path: self.socket_path.clone(),
                source,
            })?;
        let (reader, mut writer) = stream.into_split();

        let mut json = serde_json::to_string(request)?;
        json.push('\n');
        writer.write_all(json.as_bytes()).await?;
        writer.flush().await?;

        let mut lines = BufReader::new(reader).lines();
        let line = lines
            .next_line()
            .await?
            .ok_or(ControlClientError::NoResponse)?;
        Ok(serde_json::from_str(&line)?)
    }
}
