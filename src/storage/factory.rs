use std::sync::Arc;
use anyhow::{anyhow, Result};

use super::StorageDriver;
use crate::config::StorageConfig;

pub type DriverBox = Arc<dyn StorageDriver>;

/// Driver factory trait / 驱动工厂 trait
pub trait DriverFactory: Send + Sync {
    /// Driver type name, matched against `storage.driver` / 驱动类型名称
    fn driver_type(&self) -> &'static str;

    /// 创建驱动实例
    fn create_driver(&self, config: &StorageConfig) -> Result<Box<dyn StorageDriver>>;
}

/// Create the configured driver from the registered factories / 创建驱动实例
pub fn create_driver(
    factories: &[Box<dyn DriverFactory>],
    config: &StorageConfig,
) -> Result<DriverBox> {
    let factory = factories
        .iter()
        .find(|f| f.driver_type() == config.driver)
        .ok_or_else(|| {
            let known: Vec<&str> = factories.iter().map(|f| f.driver_type()).collect();
            anyhow!("Driver type not found: {} (available: {})", config.driver, known.join(", "))
        })?;

    match factory.create_driver(config) {
        Ok(driver) => {
            tracing::info!("Storage driver created: {} ({})", factory.driver_type(), driver.name());
            Ok(Arc::from(driver))
        }
        Err(e) => {
            tracing::error!("Driver creation failed: {} - {}", factory.driver_type(), e);
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::MemoryDriver;

    struct MemoryFactory;

    impl DriverFactory for MemoryFactory {
        fn driver_type(&self) -> &'static str {
            "memory"
        }

        fn create_driver(&self, _config: &StorageConfig) -> Result<Box<dyn StorageDriver>> {
            Ok(Box::new(MemoryDriver::new()))
        }
    }

    #[test]
    fn test_create_known_driver() {
        let factories: Vec<Box<dyn DriverFactory>> = vec![Box::new(MemoryFactory)];
        let config = StorageConfig { driver: "memory".to_string(), ..Default::default() };
        let driver = create_driver(&factories, &config).unwrap();
        assert_eq!(driver.name(), "memory");
    }

    #[test]
    fn test_unknown_driver_lists_available() {
        let factories: Vec<Box<dyn DriverFactory>> = vec![Box::new(MemoryFactory)];
        let config = StorageConfig { driver: "ftp".to_string(), ..Default::default() };
        let err = create_driver(&factories, &config).err().unwrap().to_string();
        assert!(err.contains("ftp"));
        assert!(err.contains("memory"));
    }
}
