//! In-memory driver used by unit tests, with failure injection.

use std::collections::{HashMap, HashSet};
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::task::{Context, Poll};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use tokio::io::{AsyncRead, ReadBuf};

use super::{ObjectEntry, StorageDriver};

#[derive(Default)]
pub struct MemoryDriver {
    buckets: HashMap<String, Vec<(String, Vec<u8>)>>,
    failing_lists: HashSet<String>,
    failing_opens: HashSet<String>,
    /// Object -> bytes served before the read error
    failing_reads: HashMap<String, usize>,
    list_calls: AtomicUsize,
    open_calls: AtomicUsize,
}

impl MemoryDriver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_object(mut self, bucket: &str, name: &str, data: &[u8]) -> Self {
        self.buckets
            .entry(bucket.to_string())
            .or_default()
            .push((name.to_string(), data.to_vec()));
        self
    }

    pub fn with_bucket(mut self, bucket: &str) -> Self {
        self.buckets.entry(bucket.to_string()).or_default();
        self
    }

    pub fn failing_list(mut self, bucket: &str) -> Self {
        self.failing_lists.insert(bucket.to_string());
        self
    }

    pub fn failing_open(mut self, object: &str) -> Self {
        self.failing_opens.insert(object.to_string());
        self
    }

    pub fn failing_read(self, object: &str) -> Self {
        self.failing_read_after(object, 0)
    }

    /// Serve the first `n_bytes` of `object`, then fail the read
    pub fn failing_read_after(mut self, object: &str, n_bytes: usize) -> Self {
        self.failing_reads.insert(object.to_string(), n_bytes);
        self
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn open_calls(&self) -> usize {
        self.open_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StorageDriver for MemoryDriver {
    fn name(&self) -> &str {
        "memory"
    }

    async fn list_objects(&self, bucket: &str) -> Result<Vec<ObjectEntry>> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_lists.contains(bucket) {
            return Err(anyhow!("listing {} failed: permission denied", bucket));
        }
        let objects = self
            .buckets
            .get(bucket)
            .ok_or_else(|| anyhow!("bucket not found: {}", bucket))?;
        Ok(objects
            .iter()
            .map(|(name, data)| ObjectEntry::new(name.as_str()).size(data.len() as u64))
            .collect())
    }

    async fn open_reader(
        &self,
        bucket: &str,
        object: &str,
    ) -> Result<Box<dyn AsyncRead + Unpin + Send>> {
        self.open_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_opens.contains(object) {
            return Err(anyhow!("object {} is unavailable", object));
        }
        let data = self
            .buckets
            .get(bucket)
            .and_then(|objects| objects.iter().rev().find(|(name, _)| name == object))
            .map(|(_, data)| data.clone())
            .ok_or_else(|| anyhow!("object not found: {}/{}", bucket, object))?;
        if let Some(&n_bytes) = self.failing_reads.get(object) {
            let head = data[..n_bytes.min(data.len())].to_vec();
            return Ok(Box::new(FailingReader { head, pos: 0 }));
        }
        Ok(Box::new(std::io::Cursor::new(data)))
    }
}

/// Yields `head`, then errors on every later read
struct FailingReader {
    head: Vec<u8>,
    pos: usize,
}

impl AsyncRead for FailingReader {
    fn poll_read(
        mut self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        if self.pos < self.head.len() {
            let n = buf.remaining().min(self.head.len() - self.pos);
            let start = self.pos;
            buf.put_slice(&self.head[start..start + n]);
            self.pos += n;
            return Poll::Ready(Ok(()));
        }
        Poll::Ready(Err(std::io::Error::new(
            std::io::ErrorKind::ConnectionReset,
            "connection reset by storage backend",
        )))
    }
}
