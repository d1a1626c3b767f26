// Driver package / 驱动包
pub mod gcs;
pub mod local;
pub mod s3;

use crate::storage::DriverFactory;

/// All driver factories, in registration order / 所有驱动工厂
pub fn factories() -> Vec<Box<dyn DriverFactory>> {
    vec![
        // Register Google Cloud Storage driver / 注册GCS驱动
        Box::new(gcs::GcsDriverFactory),
        // Register S3 driver / 注册S3对象存储驱动
        Box::new(s3::S3DriverFactory),
        // Register local driver (factory lives in the storage module) / 注册本地驱动
        Box::new(crate::storage::LocalDriverFactory),
    ]
}
