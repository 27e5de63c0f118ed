//! 环境提供者接口
//!
//! 具体平台 (云平台、虚拟化平台等) 通过实现 [`EnvironmentProvider`] 接入执行器。

use async_trait::async_trait;
use tracing::{debug, info};
use vtest_common::EnvironmentStatus;

use crate::{Environment, EnvironmentSpec, Node, NodeAddress, Result};

/// 环境提供者
#[async_trait]
pub trait EnvironmentProvider: Send + Sync {
    /// 平台类型名称，用于匹配需求中的平台限制
    fn platform_type(&self) -> &str;

    /// 按规格部署环境，返回至少处于 `Deployed` 状态的环境 (可能长时间挂起)
    async fn deploy(&self, spec: &EnvironmentSpec) -> Result<Environment>;

    /// 建立到各节点的连接，使环境进入 `Connected`
    async fn connect(&self, environment: &mut Environment) -> Result<()>;

    /// 查询环境当前状态
    async fn status(&self, environment: &Environment) -> Result<EnvironmentStatus>;

    /// 回收环境
    async fn teardown(&self, environment: &Environment) -> Result<()>;
}

/// 本机提供者
///
/// 每个节点都是控制机本身，部署即返回 localhost，回收不做任何事。
pub struct LocalProvider {
    features: Vec<String>,
}

impl LocalProvider {
    pub fn new() -> Self {
        Self {
            features: Vec::new(),
        }
    }

    /// 声明本机节点支持的特性
    pub fn with_features<'a, I>(mut self, features: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        self.features.extend(features.into_iter().map(str::to_string));
        self
    }
}

impl Default for LocalProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EnvironmentProvider for LocalProvider {
    fn platform_type(&self) -> &str {
        "local"
    }

    async fn deploy(&self, spec: &EnvironmentSpec) -> Result<Environment> {
        info!("部署本机环境: {}", spec.name);

        let core_count = std::thread::available_parallelism()
            .map(|n| n.get() as u32)
            .unwrap_or(1);

        let node_count = spec.nodes.len().max(1);
        let nodes = (0..node_count)
            .map(|index| {
                let memory_mb = spec.nodes.get(index).map(|n| n.memory_mb).unwrap_or(0);
                Node::new(&format!("localhost-{}", index))
                    .with_status(EnvironmentStatus::Deployed)
                    .with_features(self.features.iter().map(String::as_str))
                    .with_resources(core_count, memory_mb, 1)
                    .with_address(NodeAddress::new("127.0.0.1", 22))
            })
            .collect();

        let mut environment = Environment::from_spec(spec.clone());
        environment.replace_nodes(nodes);
        Ok(environment)
    }

    async fn connect(&self, environment: &mut Environment) -> Result<()> {
        debug!("本机环境无需建立连接: {}", environment.name);
        environment.set_status(EnvironmentStatus::Connected);
        Ok(())
    }

    async fn status(&self, environment: &Environment) -> Result<EnvironmentStatus> {
        Ok(environment.status())
    }

    async fn teardown(&self, environment: &Environment) -> Result<()> {
        debug!("本机环境无需回收: {}", environment.name);
        Ok(())
    }
}
