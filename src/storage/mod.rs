use async_trait::async_trait;
use anyhow::Result;
use tokio::io::AsyncRead;

/// Object entry as reported by a bucket listing / 对象条目
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectEntry {
    /// Bucket-relative object path, e.g. `docs/readme.txt` / 对象路径
    pub name: String,
    /// Object size in bytes, when the backend reports it / 对象大小
    pub size: Option<u64>,
    /// Stored content type, when the backend reports it / 存储的内容类型
    pub content_type: Option<String>,
}

impl ObjectEntry {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            size: None,
            content_type: None,
        }
    }

    pub fn size(mut self, size: u64) -> Self {
        self.size = Some(size);
        self
    }

    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

/// Storage driver interface (read-only primitives) / 存储驱动接口
///
/// A driver is a handle to one storage account; buckets are addressed per call.
#[async_trait]
pub trait StorageDriver: Send + Sync {
    /// Driver name / 驱动名称
    fn name(&self) -> &str;

    /// List every object in the bucket, following pagination to the end.
    /// Any error other than the normal end of the listing is returned.
    async fn list_objects(&self, bucket: &str) -> Result<Vec<ObjectEntry>>;

    /// Open a read stream for exactly one object / 打开对象读取流
    async fn open_reader(
        &self,
        bucket: &str,
        object: &str,
    ) -> Result<Box<dyn AsyncRead + Unpin + Send>>;
}

pub mod factory;
pub mod local_factory;
#[cfg(test)]
pub(crate) mod memory;

pub use factory::{DriverFactory, DriverBox};
pub use local_factory::LocalDriverFactory;
