//! 套件注册表
//!
//! 通过 [`RegistryBuilder`] 显式注册套件，构建出不可变的 [`SuiteRegistry`]。
//! 需要进程级访问时调用 [`SuiteRegistry::install`]。

use std::collections::HashSet;
use std::sync::{Arc, OnceLock};
use tracing::debug;
use vtest_common::FeatureRegistry;

use crate::{CaseMetadata, ExecutorError, Requirement, Result, SuiteMetadata, TestSuite};

/// 套件实例工厂
pub type SuiteFactory = Arc<dyn Fn() -> Box<dyn TestSuite> + Send + Sync>;

static GLOBAL_REGISTRY: OnceLock<SuiteRegistry> = OnceLock::new();

/// 已注册的套件
pub struct RegisteredSuite {
    name: String,
    metadata: SuiteMetadata,
    factory: SuiteFactory,
}

impl RegisteredSuite {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn metadata(&self) -> &SuiteMetadata {
        &self.metadata
    }

    pub fn cases(&self) -> &[CaseMetadata] {
        &self.metadata.cases
    }

    /// 创建一个新的套件实例
    pub fn create(&self) -> Box<dyn TestSuite> {
        (self.factory)()
    }

    /// 用例的有效需求
    pub fn effective_requirement(&self, case: &CaseMetadata, default: &Requirement) -> Requirement {
        Requirement::resolve(
            case.requirement.as_ref(),
            self.metadata.requirement.as_ref(),
            default,
        )
    }
}

impl std::fmt::Debug for RegisteredSuite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredSuite")
            .field("name", &self.name)
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}

/// 注册表构建器
pub struct RegistryBuilder {
    suites: Vec<RegisteredSuite>,
    features: &'static FeatureRegistry,
}

impl RegistryBuilder {
    /// 使用进程级特性注册表校验需求
    pub fn new() -> Self {
        Self {
            suites: Vec::new(),
            features: FeatureRegistry::global(),
        }
    }

    /// 指定校验需求所用的特性注册表
    pub fn with_features(mut self, features: &'static FeatureRegistry) -> Self {
        self.features = features;
        self
    }

    /// 注册套件，名称缺省取类型名
    pub fn suite<S>(self, metadata: SuiteMetadata) -> Result<Self>
    where
        S: TestSuite + Default + 'static,
    {
        let name = metadata
            .name
            .clone()
            .unwrap_or_else(|| short_type_name::<S>().to_string());
        self.suite_with(
            &name,
            metadata,
            Arc::new(|| Box::new(S::default()) as Box<dyn TestSuite>),
        )
    }

    /// 以自定义工厂注册套件
    pub fn suite_with(
        mut self,
        name: &str,
        metadata: SuiteMetadata,
        factory: SuiteFactory,
    ) -> Result<Self> {
        let name = metadata.name.clone().unwrap_or_else(|| name.to_string());

        if name.is_empty() {
            return Err(ExecutorError::RegistryError("套件名称不能为空".to_string()));
        }
        if self.suites.iter().any(|s| s.name == name) {
            return Err(ExecutorError::RegistryError(format!(
                "套件 {} 重复注册",
                name
            )));
        }

        let mut seen = HashSet::new();
        for case in &metadata.cases {
            if !seen.insert(case.name.as_str()) {
                return Err(ExecutorError::RegistryError(format!(
                    "套件 {} 中用例 {} 重复",
                    name, case.name
                )));
            }
        }

        let requirements = metadata
            .requirement
            .iter()
            .chain(metadata.cases.iter().filter_map(|c| c.requirement.as_ref()));
        for requirement in requirements {
            requirement.validate_features(self.features)?;
        }

        debug!("注册套件: {} ({} 个用例)", name, metadata.cases.len());
        self.suites.push(RegisteredSuite {
            name,
            metadata,
            factory,
        });
        Ok(self)
    }

    pub fn build(self) -> SuiteRegistry {
        SuiteRegistry {
            suites: self.suites.into_iter().map(Arc::new).collect(),
        }
    }
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// 不可变的套件注册表
#[derive(Debug, Default)]
pub struct SuiteRegistry {
    suites: Vec<Arc<RegisteredSuite>>,
}

impl SuiteRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// 所有套件，按注册顺序
    pub fn suites(&self) -> &[Arc<RegisteredSuite>] {
        &self.suites
    }

    pub fn get(&self, name: &str) -> Option<&Arc<RegisteredSuite>> {
        self.suites.iter().find(|s| s.name == name)
    }

    pub fn len(&self) -> usize {
        self.suites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.suites.is_empty()
    }

    /// 用例总数
    pub fn case_count(&self) -> usize {
        self.suites.iter().map(|s| s.cases().len()).sum()
    }

    /// 安装为进程级注册表
    pub fn install(self) -> Result<&'static SuiteRegistry> {
        GLOBAL_REGISTRY
            .set(self)
            .map_err(|_| ExecutorError::RegistryInstalled)?;
        GLOBAL_REGISTRY.get().ok_or(ExecutorError::RegistryInstalled)
    }

    /// 获取进程级注册表
    pub fn global() -> Option<&'static SuiteRegistry> {
        GLOBAL_REGISTRY.get()
    }
}

fn short_type_name<T>() -> &'static str {
    let full = std::any::type_name::<T>();
    full.rsplit("::").next().unwrap_or(full)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{CaseContext, CaseResult, SuiteCategory};
    use async_trait::async_trait;

    #[derive(Default)]
    struct Smoke;

    #[async_trait]
    impl TestSuite for Smoke {
        async fn run_case(&mut self, _case: &str, _ctx: &mut CaseContext<'_>) -> CaseResult<()> {
            Ok(())
        }
    }

    fn metadata() -> SuiteMetadata {
        SuiteMetadata::new("core", SuiteCategory::Functional, "冒烟")
            .with_case(CaseMetadata::new("a", ""))
            .with_case(CaseMetadata::new("b", ""))
    }

    #[test]
    fn test_register_with_type_name() {
        let registry = RegistryBuilder::new()
            .suite::<Smoke>(metadata())
            .unwrap()
            .build();

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.case_count(), 2);
        assert!(registry.get("Smoke").is_some());
    }

    #[test]
    fn test_name_override() {
        let registry = RegistryBuilder::new()
            .suite::<Smoke>(metadata().with_name("SmokeTests"))
            .unwrap()
            .build();
        assert!(registry.get("SmokeTests").is_some());
        assert!(registry.get("Smoke").is_none());
    }

    #[test]
    fn test_duplicate_suite_rejected() {
        let result = RegistryBuilder::new()
            .suite::<Smoke>(metadata())
            .and_then(|b| b.suite::<Smoke>(metadata()));
        assert!(matches!(result, Err(ExecutorError::RegistryError(_))));
    }

    #[test]
    fn test_duplicate_case_rejected() {
        let result = RegistryBuilder::new()
            .suite::<Smoke>(metadata().with_case(CaseMetadata::new("a", "again")));
        assert!(matches!(result, Err(ExecutorError::RegistryError(_))));
    }

    #[test]
    fn test_unknown_feature_rejected() {
        let metadata = metadata().with_case(
            CaseMetadata::new("c", "").with_requirement(Requirement::new().with_feature("Warp")),
        );
        let result = RegistryBuilder::new().suite::<Smoke>(metadata);
        assert!(matches!(result, Err(ExecutorError::FeatureError(_))));
    }

    #[test]
    fn test_effective_requirement() {
        let suite_req = Requirement::new().with_feature("Gpu");
        let registry = RegistryBuilder::new()
            .suite::<Smoke>(
                metadata()
                    .with_requirement(suite_req.clone())
                    .with_case(CaseMetadata::new("c", "").with_requirement(Requirement::new())),
            )
            .unwrap()
            .build();

        let suite = registry.get("Smoke").unwrap();
        let default = Requirement::default();
        let a = suite.metadata().case("a").unwrap();
        let c = suite.metadata().case("c").unwrap();
        assert_eq!(suite.effective_requirement(a, &default), suite_req);
        assert_eq!(suite.effective_requirement(c, &default), Requirement::new());
    }
}
