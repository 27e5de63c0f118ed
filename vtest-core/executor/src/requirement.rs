//! 环境需求
//!
//! 需求可以声明在套件或用例上。用例级覆盖套件级，两者都没有时使用进程级默认值
//! (`Connected`、无特性、一个节点)。

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use vtest_common::{EnvironmentStatus, FeatureError, FeatureRegistry};
use vtest_environment::{EnvironmentSpec, NodeSpec};

/// 节点资源下限
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeShape {
    /// 最少节点数
    #[serde(default = "default_min_node_count")]
    pub min_node_count: usize,

    /// 每个节点最少 CPU 核数
    #[serde(default = "default_min_core_count")]
    pub min_core_count: u32,

    /// 每个节点最少内存 (MB)
    #[serde(default)]
    pub min_memory_mb: u64,

    /// 每个节点最少网卡数
    #[serde(default = "default_min_nic_count")]
    pub min_nic_count: u32,
}

fn default_min_node_count() -> usize {
    1
}

fn default_min_core_count() -> u32 {
    1
}

fn default_min_nic_count() -> u32 {
    1
}

impl Default for NodeShape {
    fn default() -> Self {
        Self {
            min_node_count: default_min_node_count(),
            min_core_count: default_min_core_count(),
            min_memory_mb: 0,
            min_nic_count: default_min_nic_count(),
        }
    }
}

/// 环境需求 (不可变值)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Requirement {
    /// 最低就绪状态
    #[serde(default = "default_min_status")]
    pub min_status: EnvironmentStatus,

    /// 每个节点都必须具备的特性
    #[serde(default)]
    pub features: BTreeSet<String>,

    /// 节点不能具备的特性
    #[serde(default)]
    pub excluded_features: BTreeSet<String>,

    /// 支持的平台类型，`None` 表示任意平台
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platforms: Option<Vec<String>>,

    /// 资源下限
    #[serde(default)]
    pub shape: NodeShape,
}

fn default_min_status() -> EnvironmentStatus {
    EnvironmentStatus::Connected
}

impl Default for Requirement {
    fn default() -> Self {
        Self {
            min_status: default_min_status(),
            features: BTreeSet::new(),
            excluded_features: BTreeSet::new(),
            platforms: None,
            shape: NodeShape::default(),
        }
    }
}

impl Requirement {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_min_status(mut self, status: EnvironmentStatus) -> Self {
        self.min_status = status;
        self
    }

    pub fn with_feature(mut self, name: &str) -> Self {
        self.features.insert(name.to_string());
        self
    }

    pub fn with_features<'a, I>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        self.features.extend(names.into_iter().map(str::to_string));
        self
    }

    pub fn excluding(mut self, name: &str) -> Self {
        self.excluded_features.insert(name.to_string());
        self
    }

    pub fn on_platforms<'a, I>(mut self, platforms: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        self.platforms = Some(platforms.into_iter().map(str::to_string).collect());
        self
    }

    pub fn with_shape(mut self, shape: NodeShape) -> Self {
        self.shape = shape;
        self
    }

    pub fn with_min_node_count(mut self, count: usize) -> Self {
        self.shape.min_node_count = count;
        self
    }

    /// 计算用例的有效需求：用例级 > 套件级 > 默认值
    pub fn resolve(
        case: Option<&Requirement>,
        suite: Option<&Requirement>,
        default: &Requirement,
    ) -> Requirement {
        case.or(suite).unwrap_or(default).clone()
    }

    /// 是否支持给定平台
    pub fn supports_platform(&self, platform: &str) -> bool {
        match &self.platforms {
            Some(platforms) => platforms.iter().any(|p| p.eq_ignore_ascii_case(platform)),
            None => true,
        }
    }

    /// 检查引用的特性都已在注册表中登记
    pub fn validate_features(&self, registry: &FeatureRegistry) -> Result<(), FeatureError> {
        registry.validate(
            self.features
                .iter()
                .chain(self.excluded_features.iter())
                .map(String::as_str),
        )
    }

    /// 按需求生成用于部署的环境规格
    pub fn to_spec(&self, name: &str) -> EnvironmentSpec {
        let node = NodeSpec {
            features: self.features.clone(),
            core_count: self.shape.min_core_count,
            memory_mb: self.shape.min_memory_mb,
            nic_count: self.shape.min_nic_count,
        };

        (0..self.shape.min_node_count.max(1))
            .fold(EnvironmentSpec::new(name), |spec, _| spec.with_node(node.clone()))
    }
}

impl std::fmt::Display for Requirement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "状态>={}", self.min_status)?;
        if !self.features.is_empty() {
            write!(f, ", 特性={:?}", self.features)?;
        }
        if !self.excluded_features.is_empty() {
            write!(f, ", 排除={:?}", self.excluded_features)?;
        }
        if let Some(platforms) = &self.platforms {
            write!(f, ", 平台={:?}", platforms)?;
        }
        if self.shape.min_node_count > 1 {
            write!(f, ", 节点>={}", self.shape.min_node_count)?;
        }
        Ok(())
    }
}
