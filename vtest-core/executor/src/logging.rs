//! 日志初始化
//!
//! 控制台输出受 `RUST_LOG` 或配置的级别控制；配置了日志目录时，
//! 每次运行另外在 `<log_dir>/<run_id>/vtest.log` 写一份 DEBUG 级别的完整日志。

use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use crate::{ExecutorError, Result};

/// 日志配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// 控制台日志级别 (trace/debug/info/warn/error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// 日志目录，为空时只输出到控制台
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            log_dir: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl LoggingConfig {
    /// 控制台过滤器，`RUST_LOG` 优先
    pub fn console_filter(&self) -> Result<EnvFilter> {
        EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(&self.level))
            .map_err(|e| ExecutorError::LoggingError(format!("无效的日志级别 {}: {}", self.level, e)))
    }

    /// 本次运行的日志文件路径
    pub fn log_file(&self, run_id: &str) -> Option<PathBuf> {
        self.log_dir
            .as_ref()
            .map(|dir| dir.join(run_id).join("vtest.log"))
    }
}

/// 初始化全局日志，返回日志文件路径 (若有)
///
/// 全局订阅者只能设置一次，重复调用返回 `LoggingError`。
pub fn init_logging(config: &LoggingConfig, run_id: &str) -> Result<Option<PathBuf>> {
    let console = fmt::layer()
        .with_target(false)
        .with_filter(config.console_filter()?);

    let log_file = config.log_file(run_id);
    let file_layer = match &log_file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            let file = File::create(path)?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_writer(Arc::new(file))
                    .with_filter(LevelFilter::DEBUG),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(console)
        .with(file_layer)
        .try_init()
        .map_err(|e| ExecutorError::LoggingError(format!("日志初始化失败: {}", e)))?;

    if let Some(path) = &log_file {
        tracing::info!("运行 {} 的日志写入 {}", run_id, path.display());
    }

    Ok(log_file)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_file_path() {
        let config = LoggingConfig::default();
        assert!(config.log_file("run-1").is_none());

        let config = LoggingConfig {
            log_dir: Some(PathBuf::from("/var/log/vtest")),
            ..Default::default()
        };
        assert_eq!(
            config.log_file("run-1"),
            Some(PathBuf::from("/var/log/vtest/run-1/vtest.log"))
        );
    }

    #[test]
    fn test_deserialize_defaults() {
        let config: LoggingConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, LoggingConfig::default());
    }
}
