//! 运行报告与用例事件

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use vtest_common::{Outcome, TestStatus};

use crate::{CaseMetadata, SuiteMetadata};

/// 用例状态变化事件
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseEvent {
    pub run_id: String,
    pub suite: String,
    pub case: String,
    pub status: TestStatus,

    /// 终止状态时的结果
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<Outcome>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,

    pub timestamp: DateTime<Utc>,
}

/// 用例报告
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseReport {
    pub suite: String,
    pub name: String,
    pub description: String,
    pub priority: u8,

    /// 第几次执行 (用例设置了重复次数时从 1 递增)
    #[serde(default = "default_iteration")]
    pub iteration: u32,

    /// 最终结果
    pub outcome: Outcome,

    /// 运行用例的环境，未绑定环境时为空
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,

    /// 用例清理失败信息 (不影响结果)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cleanup_error: Option<String>,

    /// 主体执行次数
    pub attempts: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,

    /// 耗时（毫秒）
    pub duration_ms: u64,
}

impl CaseReport {
    /// 未执行就确定结果的用例 (跳过或随套件准备失败)
    pub fn not_run(suite: &str, case: &CaseMetadata, outcome: Outcome) -> Self {
        Self {
            suite: suite.to_string(),
            name: case.name.clone(),
            description: case.description.clone(),
            priority: case.priority,
            iteration: 1,
            outcome,
            environment: None,
            cleanup_error: None,
            attempts: 0,
            started_at: None,
            duration_ms: 0,
        }
    }

    pub fn with_iteration(mut self, iteration: u32) -> Self {
        self.iteration = iteration;
        self
    }

    pub fn with_environment(mut self, environment: &str) -> Self {
        self.environment = Some(environment.to_string());
        self
    }

    pub fn status(&self) -> TestStatus {
        self.outcome.status()
    }

    /// 说明文字
    pub fn message(&self) -> Option<&str> {
        self.outcome.message()
    }
}

fn default_iteration() -> u32 {
    1
}

/// 套件报告
///
/// 一个套件在每个绑定的环境上各有一份报告；没有绑定到环境的用例单独成一份，
/// `environment` 为空。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuiteReport {
    pub name: String,
    pub area: String,
    pub category: String,
    pub description: String,
    pub tags: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,

    /// 环境信息
    #[serde(default, skip_serializing_if = "std::collections::BTreeMap::is_empty")]
    pub environment_info: std::collections::BTreeMap<String, String>,

    /// 套件准备失败信息
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub setup_error: Option<String>,

    /// 套件清理失败信息
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cleanup_error: Option<String>,

    /// 耗时（毫秒）
    pub duration_ms: u64,

    pub cases: Vec<CaseReport>,
}

impl SuiteReport {
    pub fn new(name: &str, metadata: &SuiteMetadata, environment: Option<&str>) -> Self {
        Self {
            name: name.to_string(),
            area: metadata.area.clone(),
            category: metadata.category.to_string(),
            description: metadata.description.clone(),
            tags: metadata.tags.clone(),
            environment: environment.map(str::to_string),
            environment_info: Default::default(),
            setup_error: None,
            cleanup_error: None,
            duration_ms: 0,
            cases: Vec::new(),
        }
    }

    pub fn add_case(&mut self, case: CaseReport) {
        self.cases.push(case);
    }

    pub fn case(&self, name: &str) -> Option<&CaseReport> {
        self.cases.iter().find(|c| c.name == name)
    }
}

/// 结果统计
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub total: usize,
    pub passed: usize,
    pub passed_with_warning: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl RunSummary {
    fn count(&mut self, outcome: &Outcome) {
        self.total += 1;
        match outcome {
            Outcome::Passed => self.passed += 1,
            Outcome::PassedWithWarning { .. } => self.passed_with_warning += 1,
            Outcome::Failed { .. } => self.failed += 1,
            Outcome::Skipped { .. } => self.skipped += 1,
        }
    }
}

/// 运行报告
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: String,

    /// 环境提供者的平台类型
    pub platform: String,

    pub started_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,

    /// 总耗时（毫秒）
    pub duration_ms: u64,

    pub summary: RunSummary,

    pub suites: Vec<SuiteReport>,
}

impl RunReport {
    pub fn new(run_id: &str, platform: &str) -> Self {
        Self {
            run_id: run_id.to_string(),
            platform: platform.to_string(),
            started_at: Utc::now(),
            finished_at: None,
            duration_ms: 0,
            summary: RunSummary::default(),
            suites: Vec::new(),
        }
    }

    pub fn add_suite(&mut self, suite: SuiteReport) {
        for case in &suite.cases {
            self.summary.count(&case.outcome);
        }
        self.suites.push(suite);
    }

    /// 结束运行，记录结束时间
    pub fn finish(&mut self) {
        let finished_at = Utc::now();
        self.duration_ms = (finished_at - self.started_at)
            .num_milliseconds()
            .max(0) as u64;
        self.finished_at = Some(finished_at);
    }

    /// 没有失败的用例
    pub fn all_passed(&self) -> bool {
        self.summary.failed == 0
    }

    /// 按执行顺序遍历所有用例
    pub fn cases(&self) -> impl Iterator<Item = &CaseReport> {
        self.suites.iter().flat_map(|s| s.cases.iter())
    }

    /// 查找用例报告
    pub fn case(&self, suite: &str, name: &str) -> Option<&CaseReport> {
        self.cases().find(|c| c.suite == suite && c.name == name)
    }

    /// 导出为 JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// 导出为 YAML
    pub fn to_yaml(&self) -> serde_yaml::Result<String> {
        serde_yaml::to_string(self)
    }
}
