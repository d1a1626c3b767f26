//! Local directory driver: each bucket is a sub-directory of `root`.

mod driver;

use serde::{Deserialize, Serialize};

use crate::config::EnvLookup;

pub use driver::LocalDriver;

/// Local driver configuration / 本地驱动配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalConfig {
    /// Directory holding one sub-directory per bucket / 根目录
    pub root: String,
}

impl LocalConfig {
    pub fn apply_env(&mut self, env: EnvLookup<'_>) {
        if let Some(root) = env("LOCAL_ROOT") {
            self.root = root;
        }
    }
}
