//! vtest 环境层
//!
//! 负责环境 (节点集合) 的建模、环境池的绑定所有权管理，
//! 以及通过抽象的环境提供者完成部署、连接与回收。

pub mod config;
pub mod environment;
pub mod manager;
pub mod node;
pub mod pool;
pub mod provider;
pub mod wait;

pub use config::ProvisionConfig;
pub use environment::{Environment, EnvironmentSpec};
pub use manager::EnvironmentManager;
pub use node::{Node, NodeAddress, NodeSpec};
pub use pool::{EnvironmentCandidate, EnvironmentLease, EnvironmentPool};
pub use provider::{EnvironmentProvider, LocalProvider};
pub use wait::poll_until;

pub use vtest_common::EnvironmentStatus;

use thiserror::Error;

/// 环境层错误
#[derive(Error, Debug)]
pub enum EnvironmentError {
    #[error("部署环境失败: {0}")]
    DeployFailed(String),

    #[error("连接环境失败: {0}")]
    ConnectFailed(String),

    #[error("环境 {0} 不存在")]
    NotFound(String),

    #[error("环境 {0} 已存在")]
    AlreadyExists(String),

    #[error("环境 {0} 不可用")]
    Unusable(String),

    #[error("等待超时: {0}")]
    Timeout(String),

    #[error("平台错误: {0}")]
    Provider(String),

    #[error("配置错误: {0}")]
    ConfigError(String),

    #[error("IO 错误: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, EnvironmentError>;
