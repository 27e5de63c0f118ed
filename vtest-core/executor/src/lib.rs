//! vtest 执行器
//!
//! 需求匹配与用例生命周期执行引擎

pub mod classifier;
pub mod expect;
pub mod logging;
pub mod matcher;
pub mod metadata;
pub mod registry;
pub mod report;
pub mod requirement;
pub mod run_config;
pub mod runner;
pub mod selector;
pub mod suite;
pub mod tool;

pub use classifier::classify;
pub use expect::{assert_that, Expectation};
pub use logging::{init_logging, LoggingConfig};
pub use matcher::{match_requirement, NoMatch, RequirementMatcher, Unmet};
pub use metadata::{CaseMetadata, SuiteCategory, SuiteMetadata};
pub use registry::{RegisteredSuite, RegistryBuilder, SuiteFactory, SuiteRegistry};
pub use report::{CaseEvent, CaseReport, RunReport, RunSummary, SuiteReport};
pub use requirement::{NodeShape, Requirement};
pub use run_config::{RunConfig, RunSection};
pub use runner::{LifecycleState, RunOptions, TestRunner};
pub use selector::{select_cases, CaseSelector, SelectMode, SelectedSuite};
pub use suite::{CaseContext, SuiteContext, TestSuite};
pub use tool::{CommandOptions, CommandOutput, LocalShell, Tool, ToolError};

use std::time::Duration;
use thiserror::Error;
use vtest_environment::EnvironmentError;

/// 执行器错误 (注册、配置、报告等框架层面的错误)
#[derive(Error, Debug)]
pub enum ExecutorError {
    #[error("套件注册失败: {0}")]
    RegistryError(String),

    #[error("套件注册表已安装")]
    RegistryInstalled,

    #[error("特性错误: {0}")]
    FeatureError(#[from] vtest_common::FeatureError),

    #[error("配置错误: {0}")]
    ConfigError(String),

    #[error("环境错误: {0}")]
    EnvironmentError(#[from] EnvironmentError),

    #[error("日志初始化失败: {0}")]
    LoggingError(String),

    #[error("IO 错误: {0}")]
    IoError(#[from] std::io::Error),

    #[error("序列化错误: {0}")]
    SerdeError(String),
}

pub type Result<T> = std::result::Result<T, ExecutorError>;

/// 用例执行过程中抛出的失败
///
/// 由分类器转换为最终结果，见 [`classify`]。
#[derive(Error, Debug)]
pub enum CaseError {
    /// 环境不可用，结果为跳过
    #[error("环境不可用: {0}")]
    EnvironmentUnavailable(String),

    /// 套件或用例准备阶段失败
    #[error("准备阶段失败: {0}")]
    Setup(String),

    #[error("断言失败: {0}")]
    Assertion(String),

    #[error("连接中断: {0}")]
    Connectivity(String),

    #[error("运行被取消: {0}")]
    Cancelled(String),

    #[error("执行超时 ({0:?})")]
    Timeout(Duration),

    #[error("工具执行失败: {0}")]
    Tool(String),

    /// 用例主动跳过
    #[error("{0}")]
    Skipped(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl CaseError {
    /// 是否应当按重试次数再次尝试
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            Self::Skipped(_)
                | Self::EnvironmentUnavailable(_)
                | Self::Cancelled(_)
                | Self::Timeout(_)
        )
    }

    /// 是否归类为跳过
    pub fn is_skip(&self) -> bool {
        matches!(self, Self::Skipped(_) | Self::EnvironmentUnavailable(_))
    }
}

impl From<EnvironmentError> for CaseError {
    fn from(e: EnvironmentError) -> Self {
        match e {
            EnvironmentError::Unusable(_) | EnvironmentError::NotFound(_) => {
                Self::EnvironmentUnavailable(e.to_string())
            }
            EnvironmentError::ConnectFailed(_) => Self::Connectivity(e.to_string()),
            other => Self::Other(anyhow::Error::new(other)),
        }
    }
}

impl From<ToolError> for CaseError {
    fn from(e: ToolError) -> Self {
        match e {
            ToolError::Unreachable(_) => Self::Connectivity(e.to_string()),
            other => Self::Tool(other.to_string()),
        }
    }
}

pub type CaseResult<T> = std::result::Result<T, CaseError>;
