pub mod config;
pub mod error;
pub mod index;
pub mod server;
pub mod storage;
pub mod utils;

// Driver modules (point to project root drivers via path attribute) / 驱动模块
#[path = "../drivers/mod.rs"]
pub mod drivers;

/// Create the configured storage driver from the registered factories / 创建存储驱动
pub fn create_storage_driver(config: &config::StorageConfig) -> anyhow::Result<storage::DriverBox> {
    storage::factory::create_driver(&drivers::factories(), config)
}
