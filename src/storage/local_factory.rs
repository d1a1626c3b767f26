use anyhow::{anyhow, Result};
use std::path::PathBuf;

use super::{StorageDriver, DriverFactory};
use crate::config::StorageConfig;
use crate::drivers::local;

pub struct LocalDriverFactory;

impl DriverFactory for LocalDriverFactory {
    fn driver_type(&self) -> &'static str {
        "local"
    }

    fn create_driver(&self, config: &StorageConfig) -> Result<Box<dyn StorageDriver>> {
        let root_path = config.local.root.trim();
        if root_path.is_empty() {
            return Err(anyhow!("缺少 root 配置 (LOCAL_ROOT)"));
        }

        let root = PathBuf::from(root_path);
        if !root.is_dir() {
            return Err(anyhow!("Local root is not a directory: {:?}", root));
        }
        let canonical_root = root.canonicalize()?;

        let driver = local::LocalDriver::new(canonical_root);
        tracing::info!("Local driver initialized, root: {:?}", driver.root());
        Ok(Box::new(driver))
    }
}
