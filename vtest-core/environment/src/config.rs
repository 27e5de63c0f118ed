//! 环境准备配置

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 环境部署/连接配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionConfig {
    /// 轮询环境状态的间隔（毫秒）
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// 部署超时（秒）
    #[serde(default = "default_deploy_timeout")]
    pub deploy_timeout: u64,

    /// 连接超时（秒）
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: u64,
}

impl Default for ProvisionConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            deploy_timeout: default_deploy_timeout(),
            connect_timeout: default_connect_timeout(),
        }
    }
}

impl ProvisionConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn deploy_timeout(&self) -> Duration {
        Duration::from_secs(self.deploy_timeout)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout)
    }
}

// 默认值函数
fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_deploy_timeout() -> u64 {
    1800
}

fn default_connect_timeout() -> u64 {
    300
}
