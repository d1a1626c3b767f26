//! GCS驱动工厂

use anyhow::Result;

use crate::config::StorageConfig;
use crate::storage::{DriverFactory, StorageDriver};
use super::auth::TokenSource;
use super::driver::GcsDriver;

/// GCS驱动工厂
pub struct GcsDriverFactory;

impl DriverFactory for GcsDriverFactory {
    fn driver_type(&self) -> &'static str {
        "gcs"
    }

    fn create_driver(&self, config: &StorageConfig) -> Result<Box<dyn StorageDriver>> {
        let driver = GcsDriver::new(config.gcs.clone())?;
        let auth = match driver.token_source() {
            TokenSource::Anonymous => "anonymous",
            TokenSource::Static(_) => "static token",
            TokenSource::AuthorizedUser { .. } => "authorized_user credentials",
            TokenSource::ServiceAccount { .. } => "service_account credentials",
            TokenSource::MetadataServer { .. } => "metadata server",
        };
        tracing::info!("GCS driver initialized, endpoint: {}, auth: {}", driver.endpoint(), auth);
        Ok(Box::new(driver))
    }
}
