//! S3驱动配置

use serde::{Deserialize, Serialize};

use crate::config::{parse_bool, EnvLookup};

/// S3配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct S3Config {
    /// S3端点地址
    /// AWS: https://s3.{region}.amazonaws.com
    /// MinIO: http://localhost:9000
    pub endpoint: String,
    /// 区域
    pub region: String,
    /// Access Key ID (empty means anonymous access)
    pub access_key_id: String,
    /// Secret Access Key
    pub secret_access_key: String,
    /// Session Token（用于临时凭证）
    pub session_token: String,
    /// 强制使用路径风格（而非虚拟主机风格）
    /// MinIO等需要设置为true
    pub force_path_style: bool,
}

fn default_region() -> String {
    "us-east-1".to_string()
}

impl Default for S3Config {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            region: default_region(),
            access_key_id: String::new(),
            secret_access_key: String::new(),
            session_token: String::new(),
            force_path_style: false,
        }
    }
}

impl S3Config {
    pub fn apply_env(&mut self, env: EnvLookup<'_>) {
        if let Some(endpoint) = env("S3_ENDPOINT") {
            self.endpoint = endpoint;
        }
        if let Some(region) = env("S3_REGION").or_else(|| env("AWS_REGION")) {
            self.region = region;
        }
        if let Some(key) = env("AWS_ACCESS_KEY_ID") {
            self.access_key_id = key;
        }
        if let Some(secret) = env("AWS_SECRET_ACCESS_KEY") {
            self.secret_access_key = secret;
        }
        if let Some(token) = env("AWS_SESSION_TOKEN") {
            self.session_token = token;
        }
        if let Some(path_style) = env("S3_FORCE_PATH_STYLE") {
            self.force_path_style = parse_bool(&path_style);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_env() {
        let env = |key: &str| match key {
            "S3_ENDPOINT" => Some("http://localhost:9000".to_string()),
            "AWS_REGION" => Some("eu-west-1".to_string()),
            "AWS_ACCESS_KEY_ID" => Some("minio".to_string()),
            "S3_FORCE_PATH_STYLE" => Some("true".to_string()),
            _ => None,
        };
        let mut config = S3Config::default();
        config.apply_env(&env);
        assert_eq!(config.endpoint, "http://localhost:9000");
        assert_eq!(config.region, "eu-west-1");
        assert_eq!(config.access_key_id, "minio");
        assert!(config.force_path_style);
        assert!(config.session_token.is_empty());
    }

    #[test]
    fn test_s3_region_wins_over_aws_region() {
        let env = |key: &str| match key {
            "S3_REGION" => Some("auto".to_string()),
            "AWS_REGION" => Some("eu-west-1".to_string()),
            _ => None,
        };
        let mut config = S3Config::default();
        config.apply_env(&env);
        assert_eq!(config.region, "auto");
    }
}
