use async_trait::async_trait;
use anyhow::{anyhow, Context, Result};
use std::path::PathBuf;
use tokio::io::AsyncRead;

use crate::storage::{ObjectEntry, StorageDriver};

pub struct LocalDriver {
    root: PathBuf,
}

impl LocalDriver {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Get root directory / 获取根目录
    pub fn root(&self) -> &PathBuf {
        &self.root
    }

    /// Resolve a bucket directory, rejecting names that escape the root / 解析存储桶目录
    fn bucket_dir(&self, bucket: &str) -> Result<PathBuf> {
        if bucket.is_empty() || bucket == "." || bucket == ".." || bucket.contains(['/', '\\']) {
            return Err(anyhow!("Invalid bucket name: {}", bucket));
        }
        Ok(self.root.join(bucket))
    }

    /// Normalize object path to prevent directory traversal attacks / 规范化路径
    fn object_path(&self, bucket: &str, object: &str) -> Result<PathBuf> {
        let dir = self.bucket_dir(bucket)?;
        let object = object.replace('\\', "/");

        let normalized: Vec<&str> = object
            .split('/')
            .filter(|s| !s.is_empty() && *s != ".")
            .collect();
        if normalized.is_empty() {
            return Err(anyhow!("Invalid object name: {:?}", object));
        }
        for component in &normalized {
            if *component == ".." {
                return Err(anyhow!("Access path exceeds bucket scope: {}", object));
            }
        }

        Ok(dir.join(normalized.join("/")))
    }
}

#[async_trait]
impl StorageDriver for LocalDriver {
    fn name(&self) -> &str {
        "local"
    }

    async fn list_objects(&self, bucket: &str) -> Result<Vec<ObjectEntry>> {
        let dir = self.bucket_dir(bucket)?;
        let metadata = tokio::fs::metadata(&dir)
            .await
            .with_context(|| format!("Bucket not found: {}", bucket))?;
        if !metadata.is_dir() {
            return Err(anyhow!("Bucket is not a directory: {:?}", dir));
        }

        let mut result = Vec::new();
        // (directory, bucket-relative prefix)
        let mut pending = vec![(dir, String::new())];

        while let Some((current, prefix)) = pending.pop() {
            let mut entries = tokio::fs::read_dir(&current)
                .await
                .with_context(|| format!("Failed to read directory {:?}", current))?;

            while let Some(entry) = entries.next_entry().await? {
                let name = match entry.file_name().into_string() {
                    Ok(file_name) => format!("{}{}", prefix, file_name),
                    Err(raw) => {
                        tracing::warn!("Skipping non-UTF-8 file name in {:?}: {:?}", current, raw);
                        continue;
                    }
                };

                // Only real directories are walked, so symlink loops cannot recurse
                let file_type = entry.file_type().await?;
                if file_type.is_dir() {
                    pending.push((entry.path(), format!("{}/", name)));
                    continue;
                }

                // Follows symlinks; a symlink to a file is listed as that file
                let metadata = match tokio::fs::metadata(entry.path()).await {
                    Ok(metadata) => metadata,
                    Err(e) => {
                        tracing::warn!("Skipping unreadable entry {}: {}", name, e);
                        continue;
                    }
                };
                if metadata.is_file() {
                    result.push(ObjectEntry::new(name).size(metadata.len()));
                }
            }
        }

        // Lexicographic, like cloud listings
        result.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(result)
    }

    async fn open_reader(
        &self,
        bucket: &str,
        object: &str,
    ) -> Result<Box<dyn AsyncRead + Unpin + Send>> {
        let full_path = self.object_path(bucket, object)?;
        let file = tokio::fs::File::open(&full_path)
            .await
            .with_context(|| format!("Failed to open {}/{}", bucket, object))?;
        Ok(Box::new(file))
    }
}
