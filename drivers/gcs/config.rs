use serde::{Deserialize, Serialize};

use crate::config::{parse_bool, EnvLookup};

/// GCS 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GcsConfig {
    /// API endpoint / 端点地址
    pub endpoint: String,
    /// Static OAuth access token / 访问令牌
    pub access_token: String,
    /// Path to an authorized_user credential file / 凭证文件路径
    pub credentials_file: String,
    /// Send unauthenticated requests (public buckets, emulator) / 匿名访问
    pub anonymous: bool,
    /// GCE metadata server host / 元数据服务器地址
    pub metadata_host: String,
}

pub const DEFAULT_ENDPOINT: &str = "https://storage.googleapis.com";
pub const DEFAULT_METADATA_HOST: &str = "metadata.google.internal";

impl Default for GcsConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            access_token: String::new(),
            credentials_file: String::new(),
            anonymous: false,
            metadata_host: DEFAULT_METADATA_HOST.to_string(),
        }
    }
}

impl GcsConfig {
    pub fn apply_env(&mut self, env: EnvLookup<'_>) {
        if let Some(endpoint) = env("GCS_ENDPOINT") {
            self.endpoint = endpoint;
        }
        if let Some(token) = env("GCS_ACCESS_TOKEN") {
            self.access_token = token;
        }
        if let Some(path) = env("GOOGLE_APPLICATION_CREDENTIALS") {
            self.credentials_file = path;
        }
        if let Some(anonymous) = env("GCS_ANONYMOUS") {
            self.anonymous = parse_bool(&anonymous);
        }
        if let Some(host) = env("GCE_METADATA_HOST") {
            self.metadata_host = host;
        }
        // The emulator takes precedence and never needs credentials
        if let Some(host) = env("STORAGE_EMULATOR_HOST").filter(|h| !h.trim().is_empty()) {
            self.endpoint = emulator_endpoint(host.trim());
            self.anonymous = true;
        }
    }
}

/// `localhost:4443` -> `http://localhost:4443`
fn emulator_endpoint(host: &str) -> String {
    if host.starts_with("http://") || host.starts_with("https://") {
        host.trim_end_matches('/').to_string()
    } else {
        format!("http://{}", host.trim_end_matches('/'))
    }
}
