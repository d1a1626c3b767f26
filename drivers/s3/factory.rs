//! S3驱动工厂

use anyhow::Result;

use crate::config::StorageConfig;
use crate::storage::{DriverFactory, StorageDriver};
use super::driver::S3Driver;

/// S3驱动工厂
pub struct S3DriverFactory;

impl DriverFactory for S3DriverFactory {
    fn driver_type(&self) -> &'static str {
        "s3"
    }

    fn create_driver(&self, config: &StorageConfig) -> Result<Box<dyn StorageDriver>> {
        let driver = S3Driver::new(config.s3.clone())?;
        tracing::info!(
            "S3 driver initialized, endpoint: {}, path style: {}",
            driver.endpoint(),
            config.s3.force_path_style
        );
        Ok(Box::new(driver))
    }
}
