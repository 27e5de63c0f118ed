//! 用例选择
//!
//! 选择器按顺序应用：包含选择器加入匹配的用例，排除选择器移除匹配的用例。
//! 第一个选择器是排除选择器时，从全部用例开始；否则从空集开始。
//! 没有任何选择器时选中全部用例。
//!
//! 包含选择器还可以给选中的用例设置运行参数 (重复次数、重试次数、新环境、忽略失败)，
//! 后匹配的选择器覆盖先匹配的。

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::{CaseMetadata, ExecutorError, RegisteredSuite, Result, SuiteCategory, SuiteRegistry};

/// 选择模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectMode {
    #[default]
    Include,
    Exclude,
}

/// 用例选择器
///
/// 所有设置了的条件都满足时才算匹配。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CaseSelector {
    #[serde(default)]
    pub mode: SelectMode,

    /// 名称通配符，匹配 `套件.用例` 或单独的用例名
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// 名称正则表达式，匹配 `套件.用例`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regex: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<SuiteCategory>,

    /// 允许的优先级
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Vec<u8>>,

    /// 套件需带有其中任一标签
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,

    /// 选中用例的重复执行次数
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub times: Option<u32>,

    /// 选中用例的重试次数
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_new_environment: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ignore_failure: Option<bool>,
}

/// 编译后的匹配条件
struct Compiled {
    name: Option<Regex>,
    regex: Option<Regex>,
}

impl CaseSelector {
    /// 按名称通配符包含
    pub fn name(pattern: &str) -> Self {
        Self {
            name: Some(pattern.to_string()),
            ..Default::default()
        }
    }

    /// 按正则表达式包含
    pub fn regex(pattern: &str) -> Self {
        Self {
            regex: Some(pattern.to_string()),
            ..Default::default()
        }
    }

    pub fn area(area: &str) -> Self {
        Self {
            area: Some(area.to_string()),
            ..Default::default()
        }
    }

    pub fn category(category: SuiteCategory) -> Self {
        Self {
            category: Some(category),
            ..Default::default()
        }
    }

    pub fn priority(priorities: Vec<u8>) -> Self {
        Self {
            priority: Some(priorities),
            ..Default::default()
        }
    }

    /// 转为排除选择器
    pub fn exclude(mut self) -> Self {
        self.mode = SelectMode::Exclude;
        self
    }

    pub fn with_times(mut self, times: u32) -> Self {
        self.times = Some(times);
        self
    }

    pub fn with_retry(mut self, retry: u32) -> Self {
        self.retry = Some(retry);
        self
    }

    pub fn with_new_environment(mut self) -> Self {
        self.use_new_environment = Some(true);
        self
    }

    pub fn ignore_failure(mut self) -> Self {
        self.ignore_failure = Some(true);
        self
    }

    /// 校验通配符与正则表达式
    pub fn validate(&self) -> Result<()> {
        self.compile().map(|_| ())
    }

    fn compile(&self) -> Result<Compiled> {
        let name = self.name.as_deref().map(glob_regex).transpose()?;
        let regex = self
            .regex
            .as_deref()
            .map(|pattern| {
                Regex::new(pattern).map_err(|e| {
                    ExecutorError::ConfigError(format!("无效的选择器正则 {}: {}", pattern, e))
                })
            })
            .transpose()?;
        Ok(Compiled { name, regex })
    }

    /// 把运行参数写到选中的用例上
    fn apply(&self, case: &mut CaseMetadata) {
        if let Some(times) = self.times {
            case.times = times.max(1);
        }
        if let Some(retry) = self.retry {
            case.retry = Some(retry);
        }
        if let Some(fresh) = self.use_new_environment {
            case.use_new_environment = fresh;
        }
        if let Some(ignore) = self.ignore_failure {
            case.ignore_failure = ignore;
        }
    }

    fn matches(&self, compiled: &Compiled, suite: &RegisteredSuite, case: &CaseMetadata) -> bool {
        let full_name = format!("{}.{}", suite.name(), case.name);
        let metadata = suite.metadata();

        if let Some(glob) = &compiled.name {
            if !glob.is_match(&full_name) && !glob.is_match(&case.name) {
                return false;
            }
        }
        if let Some(regex) = &compiled.regex {
            if !regex.is_match(&full_name) {
                return false;
            }
        }
        if let Some(area) = &self.area {
            if !area.eq_ignore_ascii_case(&metadata.area) {
                return false;
            }
        }
        if let Some(category) = self.category {
            if category != metadata.category {
                return false;
            }
        }
        if let Some(priorities) = &self.priority {
            if !priorities.contains(&case.priority) {
                return false;
            }
        }
        if let Some(tags) = &self.tags {
            if !tags.iter().any(|t| metadata.tags.contains(t)) {
                return false;
            }
        }
        true
    }
}

/// 一个套件中被选中的用例
#[derive(Debug, Clone)]
pub struct SelectedSuite {
    pub suite: Arc<RegisteredSuite>,

    /// 按注册顺序，已带上选择器设置的运行参数
    pub cases: Vec<CaseMetadata>,
}

/// 从注册表中选择用例，保持注册顺序，没有选中用例的套件不出现
pub fn select_cases(registry: &SuiteRegistry, selectors: &[CaseSelector]) -> Result<Vec<SelectedSuite>> {
    let compiled = selectors
        .iter()
        .map(|s| s.compile())
        .collect::<Result<Vec<_>>>()?;

    let start_with_all = selectors
        .first()
        .map(|s| s.mode == SelectMode::Exclude)
        .unwrap_or(true);

    let mut selected = Vec::new();
    for suite in registry.suites() {
        let cases: Vec<CaseMetadata> = suite
            .cases()
            .iter()
            .filter_map(|case| {
                let initial = start_with_all.then(|| case.clone());
                selectors
                    .iter()
                    .zip(&compiled)
                    .fold(initial, |chosen, (selector, compiled)| {
                        if !selector.matches(compiled, suite, case) {
                            return chosen;
                        }
                        match selector.mode {
                            SelectMode::Include => {
                                let mut chosen = chosen.unwrap_or_else(|| case.clone());
                                selector.apply(&mut chosen);
                                Some(chosen)
                            }
                            SelectMode::Exclude => None,
                        }
                    })
            })
            .collect();

        if !cases.is_empty() {
            selected.push(SelectedSuite {
                suite: Arc::clone(suite),
                cases,
            });
        }
    }

    Ok(selected)
}

/// 把通配符转换为整串匹配的正则: `*` 匹配任意个字符，`?` 匹配单个字符
pub fn glob_regex(pattern: &str) -> Result<Regex> {
    let mut translated = String::with_capacity(pattern.len() + 8);
    translated.push('^');
    for c in pattern.chars() {
        match c {
            '*' => translated.push_str(".*"),
            '?' => translated.push('.'),
            other => translated.push_str(&regex::escape(other.encode_utf8(&mut [0; 4]))),
        }
    }
    translated.push('$');

    Regex::new(&translated)
        .map_err(|e| ExecutorError::ConfigError(format!("无效的选择器通配符 {}: {}", pattern, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CaseContext, CaseResult, RegistryBuilder, SuiteMetadata, TestSuite};
    use async_trait::async_trait;

    #[derive(Default)]
    struct Noop;

    #[async_trait]
    impl TestSuite for Noop {
        async fn run_case(&mut self, _case: &str, _ctx: &mut CaseContext<'_>) -> CaseResult<()> {
            Ok(())
        }
    }

    fn registry() -> SuiteRegistry {
        RegistryBuilder::new()
            .suite::<Noop>(
                SuiteMetadata::new("network", SuiteCategory::Functional, "")
                    .with_name("Network")
                    .with_tag("smoke")
                    .with_case(CaseMetadata::new("ping", "").with_priority(0))
                    .with_case(CaseMetadata::new("sriov_ping", "").with_priority(1))
                    .with_case(CaseMetadata::new("iperf", "").with_priority(3)),
            )
            .unwrap()
            .suite::<Noop>(
                SuiteMetadata::new("storage", SuiteCategory::Stress, "")
                    .with_name("Storage")
                    .with_case(CaseMetadata::new("fio", ""))
                    .with_case(CaseMetadata::new("ping_disk", "")),
            )
            .unwrap()
            .build()
    }

    fn names(selected: &[SelectedSuite]) -> Vec<String> {
        selected
            .iter()
            .flat_map(|s| s.cases.iter().map(move |c| format!("{}.{}", s.suite.name(), c.name)))
            .collect()
    }

    #[test]
    fn test_no_selector_selects_all() {
        let selected = select_cases(&registry(), &[]).unwrap();
        assert_eq!(names(&selected).len(), 5);
    }

    #[test]
    fn test_name_glob() {
        let selected = select_cases(&registry(), &[CaseSelector::name("*ping*")]).unwrap();
        assert_eq!(
            names(&selected),
            vec!["Network.ping", "Network.sriov_ping", "Storage.ping_disk"]
        );

        let selected = select_cases(&registry(), &[CaseSelector::name("Storage.*")]).unwrap();
        assert_eq!(names(&selected), vec!["Storage.fio", "Storage.ping_disk"]);
    }

    #[test]
    fn test_area_category_priority() {
        let selected = select_cases(&registry(), &[CaseSelector::area("NETWORK")]).unwrap();
        assert_eq!(names(&selected).len(), 3);

        let selected =
            select_cases(&registry(), &[CaseSelector::category(SuiteCategory::Stress)]).unwrap();
        assert_eq!(names(&selected), vec!["Storage.fio", "Storage.ping_disk"]);

        let selected = select_cases(&registry(), &[CaseSelector::priority(vec![0, 1])]).unwrap();
        assert_eq!(names(&selected), vec!["Network.ping", "Network.sriov_ping"]);
    }

    #[test]
    fn test_exclude_first_starts_from_all() {
        let selected =
            select_cases(&registry(), &[CaseSelector::name("Network.*").exclude()]).unwrap();
        assert_eq!(names(&selected), vec!["Storage.fio", "Storage.ping_disk"]);
    }

    #[test]
    fn test_include_then_exclude() {
        let selectors = vec![
            CaseSelector::area("network"),
            CaseSelector::regex(r"sriov").exclude(),
        ];
        let selected = select_cases(&registry(), &selectors).unwrap();
        assert_eq!(names(&selected), vec!["Network.ping", "Network.iperf"]);
    }

    #[test]
    fn test_tags() {
        let selector = CaseSelector {
            tags: Some(vec!["smoke".to_string()]),
            ..Default::default()
        };
        let selected = select_cases(&registry(), &[selector]).unwrap();
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].suite.name(), "Network");
    }

    #[test]
    fn test_invalid_regex() {
        let result = select_cases(&registry(), &[CaseSelector::regex("(")]);
        assert!(matches!(result, Err(ExecutorError::ConfigError(_))));
    }

    #[test]
    fn test_glob_regex() {
        let matches = |pattern: &str, text: &str| glob_regex(pattern).unwrap().is_match(text);
        assert!(matches("*", ""));
        assert!(matches("a*c", "abbbc"));
        assert!(matches("a?c", "abc"));
        assert!(!matches("a?c", "ac"));
        assert!(matches("*.ping", "Network.ping"));
        assert!(!matches("*.ping", "Network.ping_disk"));
        assert!(!matches("*.ping", "Network_ping"));
        assert!(matches("**x", "abx"));
        assert!(matches("a+(b)", "a+(b)"));
    }

    #[test]
    fn test_include_sets_runtime_settings() {
        let selectors = vec![
            CaseSelector::area("network").with_retry(1),
            CaseSelector::name("Network.iperf")
                .with_times(3)
                .with_retry(2)
                .ignore_failure(),
            CaseSelector::name("Storage.fio").with_new_environment(),
        ];
        let selected = select_cases(&registry(), &selectors).unwrap();

        let case = |suite: &str, name: &str| {
            selected
                .iter()
                .filter(|s| s.suite.name() == suite)
                .flat_map(|s| s.cases.iter())
                .find(|c| c.name == name)
                .cloned()
                .unwrap()
        };

        let ping = case("Network", "ping");
        assert_eq!(ping.retry, Some(1));
        assert_eq!(ping.times, 1);
        assert!(!ping.ignore_failure);

        let iperf = case("Network", "iperf");
        assert_eq!(iperf.times, 3);
        assert_eq!(iperf.retry, Some(2));
        assert!(iperf.ignore_failure);

        assert!(case("Storage", "fio").use_new_environment);
    }

    #[test]
    fn test_runtime_settings_from_config() {
        let selector: CaseSelector =
            serde_json::from_str(r#"{"name": "*.fio", "times": 2, "ignore_failure": true}"#)
                .unwrap();
        let selected = select_cases(&registry(), &[selector]).unwrap();
        assert_eq!(names(&selected), vec!["Storage.fio"]);
        assert_eq!(selected[0].cases[0].times, 2);
        assert!(selected[0].cases[0].ignore_failure);
    }
}
