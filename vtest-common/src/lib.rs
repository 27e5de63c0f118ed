//! vtest 通用类型定义
//!
//! 此 crate 包含环境层与执行层之间共享的词汇:
//! - 特性 (Feature) 及其进程级注册表
//! - 环境就绪状态 (EnvironmentStatus) 及其就绪度比较
//! - 测试用例的最终结果 (Outcome)

pub mod feature;
pub mod outcome;
pub mod status;

pub use feature::{Feature, FeatureError, FeatureRegistry};
pub use outcome::{Outcome, TestStatus};
pub use status::EnvironmentStatus;
