// SPDX-FileCopyrightText: 2026 hyperdat contributors
// SPDX-License-Identifier: MIT

//! Recursive downloads.
//!
//! A download either materialises archive files below a local directory or
//! pulls their bytes through a discarding sink, which forces the engine to
//! replicate the content without writing a second copy anywhere.

use std::path::{Path, PathBuf};

use futures::FutureExt as _;
use futures::TryStreamExt as _;
use futures::future::BoxFuture;
use hyperdat_store_core::{ArchivePath, ByteStream, ReadStreamOptions, Replica, ReplicaStore};
use tokio::io::{AsyncWrite, AsyncWriteExt as _};
use tracing::{debug, trace};

use crate::error::ClientError;
use crate::events::{ClientEvent, EventBus};
use crate::fanout;
use crate::metrics::ClientMetrics;
use crate::tree::is_self_or_parent;

/// Where downloaded bytes go.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadTarget {
    /// Write to this local path.
    Materialize(PathBuf),
    /// Read everything, keep nothing.
    Discard,
}

impl DownloadTarget {
    fn child(&self, name: &str) -> Self {
        match self {
            DownloadTarget::Materialize(dir) => DownloadTarget::Materialize(dir.join(name)),
            DownloadTarget::Discard => DownloadTarget::Discard,
        }
    }

    fn mode(&self) -> &'static str {
        match self {
            DownloadTarget::Materialize(_) => "materialize",
            DownloadTarget::Discard => "replicate",
        }
    }
}

pub(crate) struct Downloader<'a, R> {
    pub(crate) store: &'a ReplicaStore<R>,
    pub(crate) events: &'a EventBus,
    pub(crate) metrics: Option<&'a ClientMetrics>,
}

impl<R: Replica> Downloader<'_, R> {
    /// Download `remote`, dispatching on its kind. The archive root is
    /// always treated as a directory.
    pub(crate) fn download(
        &self,
        remote: ArchivePath,
        target: DownloadTarget,
    ) -> BoxFuture<'_, Result<(), ClientError>> {
        async move {
            if remote.is_root() {
                return self.download_dir(remote, target).await;
            }
            let stat = self.store.stat(&remote).await?;
            if stat.is_directory() {
                self.download_dir(remote, target).await
            } else {
                self.download_file(&remote, &target).await.map(|_| ())
            }
        }
        .boxed()
    }

    /// Pipe one file into `target`. Returns the number of bytes moved.
    pub(crate) async fn download_file(
        &self,
        remote: &ArchivePath,
        target: &DownloadTarget,
    ) -> Result<u64, ClientError> {
        let stream = self
            .store
            .read_stream(remote, ReadStreamOptions::default())
            .await?;
        let bytes = match target {
            DownloadTarget::Materialize(local) => materialize(stream, local).await?,
            DownloadTarget::Discard => pipe(stream, tokio::io::sink(), None).await?,
        };
        trace!(path = %remote, bytes, mode = target.mode(), "file downloaded");
        if let Some(metrics) = self.metrics {
            metrics
                .files_downloaded
                .with_label_values(&[target.mode()])
                .inc();
            metrics.bytes_downloaded.inc_by(bytes);
        }
        self.events.emit(ClientEvent::FileDownloaded {
            path: remote.clone(),
            bytes,
        });
        Ok(bytes)
    }

    /// Download every entry below `remote` concurrently. Completes once
    /// every child has; the first child failure is the result.
    pub(crate) fn download_dir(
        &self,
        remote: ArchivePath,
        target: DownloadTarget,
    ) -> BoxFuture<'_, Result<(), ClientError>> {
        async move {
            if let DownloadTarget::Materialize(dir) = &target {
                create_dir_all(dir).await?;
            }
            let names = self.store.readdir(&remote).await?;
            debug!(
                path = %remote,
                entries = names.len(),
                mode = target.mode(),
                "downloading directory"
            );
            fanout::join_all(
                names
                    .into_iter()
                    .filter(|name| !is_self_or_parent(name))
                    .map(|name| self.download(remote.join(&name), target.child(&name))),
            )
            .await?;
            Ok(())
        }
        .boxed()
    }
}

async fn create_dir_all(dir: &Path) -> Result<(), ClientError> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| ClientError::local_write("create directory", dir, e))
}

/// Write `stream` to a new file at `local`. A partially written file is
/// removed again when the transfer fails.
async fn materialize(stream: ByteStream, local: &Path) -> Result<u64, ClientError> {
    if let Some(parent) = local.parent() {
        create_dir_all(parent).await?;
    }
    let file = tokio::fs::File::create(local)
        .await
        .map_err(|e| ClientError::local_write("create", local, e))?;
    let result = pipe(stream, file, Some(local)).await;
    if result.is_err() {
        if let Err(e) = tokio::fs::remove_file(local).await {
            debug!(path = %local.display(), error = %e, "failed to remove partial download");
        }
    }
    result
}

async fn pipe<W>(
    mut stream: ByteStream,
    mut sink: W,
    local: Option<&Path>,
) -> Result<u64, ClientError>
where
    W: AsyncWrite + Unpin + Send,
{
    let write_error = |operation: &'static str, e: std::io::Error| {
        let path = local.map(Path::to_path_buf).unwrap_or_default();
        ClientError::local_write(operation, path, e)
    };
    let mut written = 0u64;
    while let Some(chunk) = stream.try_next().await? {
        sink.write_all(&chunk)
            .await
            .map_err(|e| write_error("write", e))?;
        written += chunk.len() as u64;
    }
    sink.shutdown().await.map_err(|e| write_error("finish", e))?;
    Ok(written)
}
