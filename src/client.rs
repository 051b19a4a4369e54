//! Client side: ask the server for the bid once, then write it to a file,
//! with both steps sharing a single deadline.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::deadline::{Deadline, Expiry};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("failed to create request: {0}")]
    RequestCreation(String),

    #[error("request to server failed: {0}")]
    Transport(String),

    #[error("server responded with status {0}")]
    ServerStatus(String),

    #[error("failed to read response body: {0}")]
    ReadBody(String),

    #[error("failed to create file {}: {source}", .path.display())]
    FileCreate { path: PathBuf, source: io::Error },

    #[error("failed to write to file: {0}")]
    FileWrite(io::Error),

    #[error("context deadline exceeded")]
    DeadlineExceeded,

    #[error("context cancelled")]
    Cancelled,
}

impl From<Expiry> for ClientError {
    fn from(value: Expiry) -> Self {
        match value {
            Expiry::DeadlineExceeded => ClientError::DeadlineExceeded,
            Expiry::Cancelled => ClientError::Cancelled,
        }
    }
}

pub fn format_output(body: &str) -> String {
    format!("Dolar: {}", body)
}

/// Fetches the bid and writes `Dolar: <bid>` to `config.output_path`.
/// Returns the written content.
pub async fn run(config: &ClientConfig) -> Result<String, ClientError> {
    let deadline = Deadline::root("client", config.timeout);
    let client = reqwest::Client::new();

    let body = fetch_bid(&client, &config.server_url, &deadline).await?;
    let content = format_output(&body);

    write_file_within(&deadline, &config.output_path, content.clone()).await?;
    info!(path = %config.output_path.display(), "Wrote quotation file");

    Ok(content)
}

pub async fn fetch_bid(
    client: &reqwest::Client,
    url: &str,
    deadline: &Deadline,
) -> Result<String, ClientError> {
    let request = client
        .get(url)
        .build()
        .map_err(|e| ClientError::RequestCreation(e.to_string()))?;

    deadline
        .run(async {
            let resp = client
                .execute(request)
                .await
                .map_err(|e| ClientError::Transport(e.to_string()))?;

            let status = resp.status();
            if !status.is_success() {
                return Err(ClientError::ServerStatus(status.to_string()));
            }

            resp.text()
                .await
                .map_err(|e| ClientError::ReadBody(e.to_string()))
        })
        .await?
}

/// Writes `content` to `path` on a detached task and waits for it only as
/// long as `deadline` allows.
///
/// If the deadline fires first the caller gets the expiry error while the
/// task keeps going: it finishes the write, flushes, closes the file and logs
/// that the result went unobserved.
pub async fn write_file_within(
    deadline: &Deadline,
    path: &Path,
    content: String,
) -> Result<(), ClientError> {
    let mut file = tokio::fs::File::create(path)
        .await
        .map_err(|source| ClientError::FileCreate {
            path: path.to_path_buf(),
            source,
        })?;

    let (tx, rx) = oneshot::channel::<io::Result<()>>();
    let target = path.to_path_buf();

    tokio::spawn(async move {
        let result = async {
            file.write_all(content.as_bytes()).await?;
            file.flush().await
        }
        .await;
        drop(file);

        if let Err(unobserved) = tx.send(result) {
            match unobserved {
                Ok(()) => warn!(path = %target.display(), "File write completed after the caller gave up"),
                Err(e) => warn!(path = %target.display(), "File write failed after the caller gave up: {}", e),
            }
        } else {
            debug!(path = %target.display(), "File write reported");
        }
    });

    tokio::select! {
        biased;
        expiry = deadline.expired() => Err(expiry.into()),
        result = rx => match result {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(ClientError::FileWrite(e)),
            Err(_) => Err(ClientError::FileWrite(io::Error::new(
                io::ErrorKind::Other,
                "write task ended without reporting",
            ))),
        },
    }
}
