// src/exec/tee.rs

//! Output duplication.
//!
//! A [`Tee`] persists every chunk the child writes to a capture file and
//! echoes it to the agent's own stdout or stderr, so someone watching the
//! agent still sees the output live. When a reporter is attached the chunk
//! is also appended to its buffers.

use anyhow::Context;
use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::errors::Result;
use crate::report::SharedReporter;
use crate::types::is_capture_path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Stdout,
    Stderr,
}

pub struct Tee {
    kind: StreamKind,
    file: Option<File>,
    echo: Box<dyn AsyncWrite + Send + Unpin>,
    reporter: Option<SharedReporter>,
}

impl Tee {
    /// Create a tee for `kind`, truncating `path` unless it is empty or `-`.
    pub async fn create(
        path: &str,
        kind: StreamKind,
        reporter: Option<SharedReporter>,
    ) -> Result<Self> {
        let file = if is_capture_path(path) {
            let f = File::create(path)
                .await
                .with_context(|| format!("creating capture file {path:?}"))?;
            Some(f)
        } else {
            None
        };

        let echo: Box<dyn AsyncWrite + Send + Unpin> = match kind {
            StreamKind::Stdout => Box::new(tokio::io::stdout()),
            StreamKind::Stderr => Box::new(tokio::io::stderr()),
        };

        Ok(Self::with_echo(kind, file, echo, reporter))
    }

    /// Build a tee around explicit sinks.
    pub fn with_echo(
        kind: StreamKind,
        file: Option<File>,
        echo: Box<dyn AsyncWrite + Send + Unpin>,
        reporter: Option<SharedReporter>,
    ) -> Self {
        Self {
            kind,
            file,
            echo,
            reporter,
        }
    }

    /// Persist and echo one chunk.
    ///
    /// A failing echo (e.g. the agent's own stdout was closed) is logged and
    /// does not stop the capture file from being written. A failing capture
    /// file is dropped so the child's pipe keeps being drained.
    pub async fn write_chunk(&mut self, buf: &[u8]) {
        if let Some(file) = self.file.as_mut() {
            if let Err(e) = file.write_all(buf).await {
                warn!(stream = ?self.kind, error = %e, "writing capture file failed; no longer capturing");
                self.file = None;
            }
        }

        if let Err(e) = self.echo.write_all(buf).await {
            debug!(stream = ?self.kind, error = %e, "echo failed");
        } else {
            let _ = self.echo.flush().await;
        }

        if let Some(reporter) = &self.reporter {
            match reporter.lock() {
                Ok(mut r) => match self.kind {
                    StreamKind::Stdout => r.append_stdout(buf),
                    StreamKind::Stderr => r.append_stderr(buf),
                },
                Err(_) => warn!(stream = ?self.kind, "reporter lock poisoned; dropping chunk"),
            }
        }
    }

    /// Flush the capture file to disk.
    pub async fn close(mut self) -> Result<()> {
        if let Some(file) = self.file.as_mut() {
            file.flush().await.context("flushing capture file")?;
            file.sync_all().await.context("syncing capture file")?;
        }
        Ok(())
    }
}

/// Copy `reader` into `tee` until EOF.
pub fn spawn_pump<R>(mut reader: R, mut tee: Tee) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let kind = tee.kind;
        let mut buf = vec![0u8; 8192];
        loop {
            match reader.read(&mut buf).await {
                Ok(0) => break,
                Ok(n) => tee.write_chunk(&buf[..n]).await,
                Err(e) => {
                    debug!(stream = ?kind, error = %e, "child stream read failed");
                    break;
                }
            }
        }

        if let Err(e) = tee.close().await {
            warn!(stream = ?kind, error = %e, "closing capture file failed");
        }
        debug!(stream = ?kind, "output pump finished");
    })
}
