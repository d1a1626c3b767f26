//! Application configuration module / 应用配置模块
//!
//! Configuration is built once at startup from an optional `config.json`
//! followed by environment overrides, then passed by value to the driver
//! factory and the dispatcher. Nothing reads the environment after this.

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};

use crate::drivers::gcs::GcsConfig;
use crate::drivers::local::LocalConfig;
use crate::drivers::s3::S3Config;

/// Environment lookup (injectable for tests) / 环境变量查询
pub type EnvLookup<'a> = &'a dyn Fn(&str) -> Option<String>;

/// Application configuration / 应用配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Server configuration / 服务器配置
    pub server: ServerConfig,
    /// Buckets to serve, in display order / 要提供服务的存储桶
    pub buckets: Vec<String>,
    /// Storage driver configuration / 存储驱动配置
    pub storage: StorageConfig,
}

/// Server configuration / 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server host address / 服务器监听地址
    pub host: String,
    /// Server port, required / 服务器端口
    pub port: Option<u16>,
}

/// Storage configuration / 存储配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Driver type: `gcs`, `s3` or `local` / 驱动类型
    pub driver: String,
    pub gcs: GcsConfig,
    pub s3: S3Config,
    pub local: LocalConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: None,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            driver: "gcs".to_string(),
            gcs: GcsConfig::default(),
            s3: S3Config::default(),
            local: LocalConfig::default(),
        }
    }
}

impl AppConfig {
    /// Apply environment overrides / 应用环境变量覆盖
    pub fn apply_env(&mut self, env: EnvLookup<'_>) -> Result<()> {
        if let Some(raw) = env("BUCKET") {
            self.buckets = parse_bucket_list(&raw);
        }
        if let Some(host) = env("HOST") {
            self.server.host = host;
        }
        if let Some(port) = env("PORT") {
            let port = port.trim();
            self.server.port = Some(
                port.parse::<u16>()
                    .map_err(|e| anyhow!("Invalid PORT {:?}: {}", port, e))?,
            );
        }
        if let Some(driver) = env("STORAGE_DRIVER") {
            self.storage.driver = driver.trim().to_lowercase();
        }
        self.storage.gcs.apply_env(env);
        self.storage.s3.apply_env(env);
        self.storage.local.apply_env(env);
        Ok(())
    }

    /// Check bucket names and required values / 校验配置
    pub fn validate(&self) -> Result<()> {
        if self.server.port.is_none() {
            bail!("PORT is not set");
        }
        let mut seen = HashSet::new();
        for bucket in &self.buckets {
            if bucket.is_empty() {
                bail!("Bucket name must not be empty");
            }
            if bucket.contains('/') {
                bail!("Bucket name must not contain '/': {}", bucket);
            }
            if !seen.insert(bucket.as_str()) {
                bail!("Bucket configured more than once: {}", bucket);
            }
        }
        Ok(())
    }

    /// Get the server bind address / 获取服务器绑定地址
    pub fn get_bind_address(&self) -> Result<String> {
        let port = self.server.port.ok_or_else(|| anyhow!("PORT is not set"))?;
        Ok(format!("{}:{}", self.server.host, port))
    }
}

/// Split a comma-separated bucket list, dropping blank entries / 解析存储桶列表
pub fn parse_bucket_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse a boolean environment value / 解析布尔值
pub fn parse_bool(raw: &str) -> bool {
    matches!(raw.trim().to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

/// Get the default config file path / 获取配置文件路径
fn get_config_path() -> PathBuf {
    std::env::current_dir()
        .unwrap_or_else(|_| PathBuf::from("."))
        .join("config.json")
}

fn read_config_file(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {:?}", path))?;
    let config: AppConfig = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse config file {:?}", path))?;
    tracing::info!("Loaded configuration from {:?}", path);
    Ok(config)
}

/// Load configuration from the process environment / 加载配置
pub fn load_config() -> Result<AppConfig> {
    load_config_with(&|key| std::env::var(key).ok())
}

/// Load configuration using the given environment lookup
pub fn load_config_with(env: EnvLookup<'_>) -> Result<AppConfig> {
    let mut config = match env("CONFIG_FILE") {
        Some(path) => read_config_file(Path::new(&path))?,
        None => {
            let path = get_config_path();
            if path.exists() {
                read_config_file(&path)?
            } else {
                AppConfig::default()
            }
        }
    };

    config.apply_env(env)?;
    config.validate()?;
    Ok(config)
}
