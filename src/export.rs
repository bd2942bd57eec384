//! Export delivery: ordered byte chunks into any sink.

use std::path::Path;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::{Stream, StreamExt};
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::exec::ExportByteStream;
use crate::Result;

/// Serialization format for geometry exports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Stl,
    Step,
}

impl ExportFormat {
    pub fn wire_name(self) -> &'static str {
        match self {
            ExportFormat::Stl => "export_stl",
            ExportFormat::Step => "export_step",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Stl => "stl",
            ExportFormat::Step => "step",
        }
    }
}

/// Length-unbounded export byte stream.
///
/// Chunks arrive in delivery order. A failure mid-stream surfaces as a
/// `StreamInterrupted` error item; already-delivered chunks are not
/// replayed (restart the export to recover).
pub struct ExportStream {
    inner: ExportByteStream,
}

impl std::fmt::Debug for ExportStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExportStream").finish_non_exhaustive()
    }
}

impl ExportStream {
    pub(crate) fn new(inner: ExportByteStream) -> Self {
        Self { inner }
    }

    pub async fn next_chunk(&mut self) -> Option<Result<Bytes>> {
        self.inner.next().await
    }

    /// Forward every chunk into an async writer. Returns bytes written.
    pub async fn write_to<W: AsyncWrite + Unpin>(mut self, writer: &mut W) -> Result<u64> {
        let mut total = 0u64;
        while let Some(chunk) = self.inner.next().await {
            let chunk = chunk?;
            writer.write_all(&chunk).await?;
            total += chunk.len() as u64;
        }
        writer.flush().await?;
        Ok(total)
    }

    /// Collect the full export into memory.
    pub async fn collect(mut self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        while let Some(chunk) = self.inner.next().await {
            out.extend_from_slice(&chunk?);
        }
        Ok(out)
    }

    /// Stream the export into a file. Returns bytes written.
    pub async fn save(self, path: impl AsRef<Path>) -> Result<u64> {
        let mut file = tokio::fs::File::create(path).await?;
        self.write_to(&mut file).await
    }
}

impl Stream for ExportStream {
    type Item = Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    fn chunks(parts: &[&[u8]]) -> ExportStream {
        let items: Vec<Result<Bytes>> = parts
            .iter()
            .map(|p| Ok(Bytes::copy_from_slice(p)))
            .collect();
        ExportStream::new(Box::pin(stream::iter(items)))
    }

    #[tokio::test]
    async fn collects_in_order() {
        let data = chunks(&[b"solid ", b"part", b"\n"]).collect().await.unwrap();
        assert_eq!(data, b"solid part\n");
    }

    #[tokio::test]
    async fn writes_to_sink() {
        let mut sink = Vec::new();
        let written = chunks(&[b"abc", b"def"]).write_to(&mut sink).await.unwrap();
        assert_eq!(written, 6);
        assert_eq!(sink, b"abcdef");
    }
}
