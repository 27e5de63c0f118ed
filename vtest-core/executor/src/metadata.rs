//! 套件与用例元数据

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::Requirement;

/// 套件类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuiteCategory {
    Functional,
    Performance,
    Stress,
    Community,
}

impl SuiteCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Functional => "functional",
            Self::Performance => "performance",
            Self::Stress => "stress",
            Self::Community => "community",
        }
    }
}

impl std::fmt::Display for SuiteCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for SuiteCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "functional" => Ok(Self::Functional),
            "performance" => Ok(Self::Performance),
            "stress" => Ok(Self::Stress),
            "community" => Ok(Self::Community),
            other => Err(format!("未知的套件类别: {}", other)),
        }
    }
}

/// 用例元数据
#[derive(Debug, Clone)]
pub struct CaseMetadata {
    /// 用例名称 (套件内唯一)
    pub name: String,

    pub description: String,

    /// 优先级，数值越小越重要
    pub priority: u8,

    /// 用例级需求，缺省时继承套件需求
    pub requirement: Option<Requirement>,

    /// 要求一个未被任何套件使用过的环境
    pub use_new_environment: bool,

    /// 覆盖运行配置中的用例超时
    pub timeout: Option<Duration>,

    /// 重复执行次数，每次执行单独产生结果
    pub times: u32,

    /// 覆盖运行配置中的重试次数
    pub retry: Option<u32>,

    /// 失败不计入运行结果，记为带警告通过
    pub ignore_failure: bool,
}

/// 默认优先级
pub const DEFAULT_PRIORITY: u8 = 2;

impl CaseMetadata {
    pub fn new(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            priority: DEFAULT_PRIORITY,
            requirement: None,
            use_new_environment: false,
            timeout: None,
            times: 1,
            retry: None,
            ignore_failure: false,
        }
    }

    pub fn with_priority(mut self, priority: u8) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_requirement(mut self, requirement: Requirement) -> Self {
        self.requirement = Some(requirement);
        self
    }

    pub fn use_new_environment(mut self) -> Self {
        self.use_new_environment = true;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_times(mut self, times: u32) -> Self {
        self.times = times.max(1);
        self
    }

    pub fn with_retry(mut self, retry: u32) -> Self {
        self.retry = Some(retry);
        self
    }

    pub fn ignore_failure(mut self) -> Self {
        self.ignore_failure = true;
        self
    }
}

/// 套件元数据
///
/// 注册后不再修改。
#[derive(Debug, Clone)]
pub struct SuiteMetadata {
    /// 名称覆盖，缺省时使用套件类型名
    pub name: Option<String>,

    pub area: String,
    pub category: SuiteCategory,
    pub description: String,
    pub tags: Vec<String>,

    /// 套件级默认需求
    pub requirement: Option<Requirement>,

    /// 用例，按注册顺序
    pub cases: Vec<CaseMetadata>,
}

impl SuiteMetadata {
    pub fn new(area: &str, category: SuiteCategory, description: &str) -> Self {
        Self {
            name: None,
            area: area.to_string(),
            category,
            description: description.to_string(),
            tags: Vec::new(),
            requirement: None,
            cases: Vec::new(),
        }
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    pub fn with_tag(mut self, tag: &str) -> Self {
        self.tags.push(tag.to_string());
        self
    }

    pub fn with_requirement(mut self, requirement: Requirement) -> Self {
        self.requirement = Some(requirement);
        self
    }

    pub fn with_case(mut self, case: CaseMetadata) -> Self {
        self.cases.push(case);
        self
    }

    pub fn case(&self, name: &str) -> Option<&CaseMetadata> {
        self.cases.iter().find(|c| c.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_case_defaults() {
        let case = CaseMetadata::new("smoke", "冒烟测试");
        assert_eq!(case.priority, 2);
        assert!(case.requirement.is_none());
        assert!(!case.use_new_environment);
        assert!(case.timeout.is_none());
        assert_eq!(case.times, 1);
        assert!(case.retry.is_none());
        assert!(!case.ignore_failure);
    }

    #[test]
    fn test_times_at_least_once() {
        assert_eq!(CaseMetadata::new("loop", "").with_times(0).times, 1);
        assert_eq!(CaseMetadata::new("loop", "").with_times(3).times, 3);
    }

    #[test]
    fn test_category_parse() {
        assert_eq!("Stress".parse::<SuiteCategory>(), Ok(SuiteCategory::Stress));
        assert!("unknown".parse::<SuiteCategory>().is_err());
        assert_eq!(SuiteCategory::Community.to_string(), "community");
    }

    #[test]
    fn test_suite_builder() {
        let suite = SuiteMetadata::new("provisioning", SuiteCategory::Functional, "部署验证")
            .with_name("Provisioning")
            .with_tag("smoke")
            .with_case(CaseMetadata::new("boot", "启动").with_priority(0))
            .with_case(CaseMetadata::new("reboot", "重启").use_new_environment());

        assert_eq!(suite.cases.len(), 2);
        assert_eq!(suite.case("boot").map(|c| c.priority), Some(0));
        assert!(suite.case("reboot").map(|c| c.use_new_environment).unwrap_or(false));
        assert!(suite.case("missing").is_none());
    }
}
