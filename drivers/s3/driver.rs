//! S3驱动核心实现
//!
//! One credential set and region are shared by all buckets; a rust-s3
//! `Bucket` handle is built per call, which is cheap and holds no connection.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use futures::TryStreamExt;
use s3::bucket::Bucket;
use s3::creds::Credentials;
use s3::Region;
use tokio::io::AsyncRead;
use tokio_util::io::StreamReader;

use crate::storage::{ObjectEntry, StorageDriver};
use super::config::S3Config;

/// S3驱动
pub struct S3Driver {
    config: S3Config,
    credentials: Credentials,
    region: Region,
}

impl S3Driver {
    /// 创建新的S3驱动实例
    pub fn new(config: S3Config) -> Result<Self> {
        let credentials = if config.access_key_id.is_empty() {
            Credentials::anonymous()
                .map_err(|e| anyhow!("创建S3凭证失败: {}", e))?
        } else {
            Credentials::new(
                Some(&config.access_key_id),
                Some(&config.secret_access_key),
                if config.session_token.is_empty() { None } else { Some(&config.session_token) },
                None,
                None,
            ).map_err(|e| anyhow!("创建S3凭证失败: {}", e))?
        };

        let region = Region::Custom {
            region: config.region.clone(),
            endpoint: Self::endpoint_for(&config),
        };

        Ok(Self { config, credentials, region })
    }

    fn endpoint_for(config: &S3Config) -> String {
        if config.endpoint.is_empty() {
            format!("https://s3.{}.amazonaws.com", config.region)
        } else {
            config.endpoint.trim_end_matches('/').to_string()
        }
    }

    pub fn endpoint(&self) -> String {
        Self::endpoint_for(&self.config)
    }

    /// 创建S3 Bucket客户端
    fn bucket(&self, name: &str) -> Result<Box<Bucket>> {
        let bucket = Bucket::new(name, self.region.clone(), self.credentials.clone())
            .map_err(|e| anyhow!("创建S3 Bucket失败: {}", e))?;

        let bucket = if self.config.force_path_style {
            bucket.with_path_style()
        } else {
            bucket
        };

        Ok(bucket)
    }
}

/// Validate an object key before it is sent to the backend
fn check_key(object: &str) -> Result<&str> {
    if object.is_empty() {
        return Err(anyhow!("Empty object key"));
    }
    Ok(object)
}

#[async_trait]
impl StorageDriver for S3Driver {
    fn name(&self) -> &str {
        "s3"
    }

    async fn list_objects(&self, bucket: &str) -> Result<Vec<ObjectEntry>> {
        let handle = self.bucket(bucket)?;

        // No delimiter: the whole bucket, flat; rust-s3 follows continuation tokens
        let results = handle
            .list(String::new(), None)
            .await
            .map_err(|e| anyhow!("列出S3对象失败: {}", e))?;

        let mut entries = Vec::new();
        for result in results {
            for obj in result.contents {
                entries.push(ObjectEntry::new(obj.key).size(obj.size as u64));
            }
        }

        Ok(entries)
    }

    async fn open_reader(
        &self,
        bucket: &str,
        object: &str,
    ) -> Result<Box<dyn AsyncRead + Unpin + Send>> {
        let key = check_key(object)?;
        let handle = self.bucket(bucket)?;

        let response = handle
            .get_object_stream(key)
            .await
            .map_err(|e| anyhow!("获取S3对象失败: {}", e))?;

        let status = response.status_code;
        if !(200..300).contains(&status) {
            return Err(anyhow!("获取S3对象失败: HTTP {} {}/{}", status, bucket, key));
        }

        let stream = response
            .bytes
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e));
        Ok(Box::new(StreamReader::new(stream)))
    }
}
