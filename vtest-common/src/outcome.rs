//! 测试用例结果

use serde::{Deserialize, Serialize};

/// 用例的最终结果
///
/// 每次用例执行恰好产生一个结果，产生后不可修改。
/// 除 `Passed` 以外的每个结果都带有一行可独立阅读的说明。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    /// 通过
    Passed,

    /// 通过，但有值得注意的可恢复问题
    PassedWithWarning { message: String },

    /// 失败 (`cause` 保留原始错误文本)
    Failed { message: String, cause: String },

    /// 跳过
    Skipped { message: String },
}

impl Outcome {
    pub fn warning(message: impl Into<String>) -> Self {
        Self::PassedWithWarning {
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>, cause: impl Into<String>) -> Self {
        Self::Failed {
            message: message.into(),
            cause: cause.into(),
        }
    }

    pub fn skipped(message: impl Into<String>) -> Self {
        Self::Skipped {
            message: message.into(),
        }
    }

    /// 对应的状态
    pub fn status(&self) -> TestStatus {
        match self {
            Self::Passed => TestStatus::Passed,
            Self::PassedWithWarning { .. } => TestStatus::PassedWithWarning,
            Self::Failed { .. } => TestStatus::Failed,
            Self::Skipped { .. } => TestStatus::Skipped,
        }
    }

    /// 说明文字 (`Passed` 没有)
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::Passed => None,
            Self::PassedWithWarning { message }
            | Self::Failed { message, .. }
            | Self::Skipped { message } => Some(message),
        }
    }

    /// 是否通过 (包括带警告的通过)
    pub fn is_passed(&self) -> bool {
        matches!(self, Self::Passed | Self::PassedWithWarning { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped { .. })
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.message() {
            Some(message) => write!(f, "{}: {}", self.status(), message),
            None => write!(f, "{}", self.status()),
        }
    }
}

/// 用例状态 (用于事件通知，包含执行中的中间状态)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestStatus {
    NotRun,
    Running,
    Passed,
    PassedWithWarning,
    Failed,
    Skipped,
}

impl TestStatus {
    /// 是否为终止状态
    pub fn is_final(&self) -> bool {
        !matches!(self, Self::NotRun | Self::Running)
    }

    /// 获取中文显示名称
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::NotRun => "未运行",
            Self::Running => "运行中",
            Self::Passed => "通过",
            Self::PassedWithWarning => "通过 (有警告)",
            Self::Failed => "失败",
            Self::Skipped => "跳过",
        }
    }
}

impl std::fmt::Display for TestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::NotRun => "NOTRUN",
            Self::Running => "RUNNING",
            Self::Passed => "PASSED",
            Self::PassedWithWarning => "PASSED_WITH_WARNING",
            Self::Failed => "FAILED",
            Self::Skipped => "SKIPPED",
        };
        write!(f, "{}", name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_outcome_accessors() {
        assert_eq!(Outcome::Passed.message(), None);
        assert!(Outcome::Passed.is_passed());

        let warning = Outcome::warning("SSH 短暂断开");
        assert!(warning.is_passed());
        assert_eq!(warning.status(), TestStatus::PassedWithWarning);
        assert_eq!(warning.message(), Some("SSH 短暂断开"));

        let failed = Outcome::failed("断言失败", "expected 0, got 1");
        assert!(failed.is_failed());
        assert!(!failed.is_passed());

        assert!(Outcome::skipped("没有可用环境").is_skipped());
    }

    #[test]
    fn test_outcome_serialization() {
        let json = serde_json::to_string(&Outcome::skipped("no env")).unwrap();
        assert_eq!(json, r#"{"status":"skipped","message":"no env"}"#);

        let back: Outcome = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Outcome::skipped("no env"));
    }

    #[test]
    fn test_status_is_final() {
        assert!(!TestStatus::Running.is_final());
        assert!(TestStatus::Skipped.is_final());
        assert_eq!(TestStatus::Failed.to_string(), "FAILED");
    }
}
