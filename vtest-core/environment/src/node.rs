//! 节点

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use vtest_common::EnvironmentStatus;

/// 节点连接地址 (对核心层不透明，仅供工具使用)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeAddress {
    pub host: String,
    pub port: u16,
}

impl NodeAddress {
    pub fn new(host: &str, port: u16) -> Self {
        Self {
            host: host.to_string(),
            port,
        }
    }
}

impl std::fmt::Display for NodeAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// 节点规格 (部署时使用)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeSpec {
    /// 需要的特性
    #[serde(default)]
    pub features: BTreeSet<String>,

    /// CPU 核数
    #[serde(default = "default_core_count")]
    pub core_count: u32,

    /// 内存大小 (MB)
    #[serde(default)]
    pub memory_mb: u64,

    /// 网卡数量
    #[serde(default = "default_nic_count")]
    pub nic_count: u32,
}

fn default_core_count() -> u32 {
    1
}

fn default_nic_count() -> u32 {
    1
}

impl Default for NodeSpec {
    fn default() -> Self {
        Self {
            features: BTreeSet::new(),
            core_count: default_core_count(),
            memory_mb: 0,
            nic_count: default_nic_count(),
        }
    }
}

/// 节点
///
/// 属于且只属于一个环境。
#[derive(Debug, Clone)]
pub struct Node {
    /// 节点名称
    pub name: String,

    /// 就绪状态
    pub status: EnvironmentStatus,

    /// 支持的特性
    pub features: BTreeSet<String>,

    /// CPU 核数
    pub core_count: u32,

    /// 内存大小 (MB)
    pub memory_mb: u64,

    /// 网卡数量
    pub nic_count: u32,

    /// 连接地址
    pub address: Option<NodeAddress>,

    /// 元数据
    pub metadata: HashMap<String, String>,
}

impl Node {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            status: EnvironmentStatus::NotDeployed,
            features: BTreeSet::new(),
            core_count: default_core_count(),
            memory_mb: 0,
            nic_count: default_nic_count(),
            address: None,
            metadata: HashMap::new(),
        }
    }

    /// 按规格创建节点 (特性、资源照抄规格)
    pub fn from_spec(name: &str, spec: &NodeSpec) -> Self {
        Self::new(name)
            .with_features(spec.features.iter().map(String::as_str))
            .with_resources(spec.core_count, spec.memory_mb, spec.nic_count)
    }

    pub fn with_status(mut self, status: EnvironmentStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_features<'a, I>(mut self, features: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        self.features.extend(features.into_iter().map(str::to_string));
        self
    }

    pub fn with_resources(mut self, core_count: u32, memory_mb: u64, nic_count: u32) -> Self {
        self.core_count = core_count;
        self.memory_mb = memory_mb;
        self.nic_count = nic_count;
        self
    }

    pub fn with_address(mut self, address: NodeAddress) -> Self {
        self.address = Some(address);
        self
    }

    pub fn with_metadata(mut self, key: &str, value: &str) -> Self {
        self.metadata.insert(key.to_string(), value.to_string());
        self
    }

    /// 是否支持某个特性
    pub fn has_feature(&self, name: &str) -> bool {
        self.features.contains(name)
    }
}
