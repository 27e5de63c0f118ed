//! 环境管理器
//!
//! 组合环境池与环境提供者，负责把绑定的环境推进到需要的就绪状态，
//! 并在运行结束时回收自动生成的环境。

use std::sync::Arc;
use tokio::time::timeout;
use tracing::{debug, error, info};
use vtest_common::EnvironmentStatus;

use crate::{
    poll_until, Environment, EnvironmentError, EnvironmentLease, EnvironmentPool,
    EnvironmentProvider, EnvironmentSpec, ProvisionConfig, Result,
};

/// 环境管理器
pub struct EnvironmentManager {
    /// 环境池
    pool: Arc<EnvironmentPool>,

    /// 环境提供者
    provider: Arc<dyn EnvironmentProvider>,

    /// 配置
    config: ProvisionConfig,
}

impl EnvironmentManager {
    /// 创建新的环境管理器
    pub fn new(provider: Arc<dyn EnvironmentProvider>, config: ProvisionConfig) -> Self {
        Self {
            pool: Arc::new(EnvironmentPool::new()),
            provider,
            config,
        }
    }

    /// 获取环境池
    pub fn pool(&self) -> &Arc<EnvironmentPool> {
        &self.pool
    }

    /// 获取环境提供者
    pub fn provider(&self) -> &Arc<dyn EnvironmentProvider> {
        &self.provider
    }

    /// 获取配置
    pub fn config(&self) -> &ProvisionConfig {
        &self.config
    }

    /// 平台类型
    pub fn platform_type(&self) -> &str {
        self.provider.platform_type()
    }

    /// 添加预定义环境
    pub async fn add_predefined(&self, spec: EnvironmentSpec) -> Result<()> {
        let environment = Environment::from_spec(spec).predefined();
        self.pool.add(environment).await
    }

    /// 添加一个按需求生成、尚未部署的环境
    pub async fn add_generated(&self, spec: EnvironmentSpec) -> Result<()> {
        self.pool.add(Environment::from_spec(spec)).await
    }

    /// 把已绑定的环境推进到 `min_status`
    ///
    /// 未部署则部署，需要连接则连接，然后轮询平台状态直到满足要求或超时。
    pub async fn ensure_ready(
        &self,
        lease: &mut EnvironmentLease,
        min_status: EnvironmentStatus,
    ) -> Result<()> {
        let current = lease.status();
        if current == EnvironmentStatus::Unusable {
            return Err(EnvironmentError::Unusable(lease.name.clone()));
        }
        if current.satisfies(min_status) {
            debug!("环境 {} 已处于 {}，无需准备", lease.name, current);
            return Ok(());
        }

        if current == EnvironmentStatus::NotDeployed {
            info!("部署环境: {}", lease.name);
            let spec = lease.spec.clone();
            let deployed = timeout(self.config.deploy_timeout(), self.provider.deploy(&spec))
                .await
                .map_err(|_| {
                    EnvironmentError::Timeout(format!(
                        "部署环境 {} 超过 {} 秒",
                        spec.name, self.config.deploy_timeout
                    ))
                })??;

            lease.replace_nodes(deployed.nodes().to_vec());
            lease.cost = deployed.cost;
            lease.publish();
        }

        if min_status == EnvironmentStatus::Connected
            && lease.status() == EnvironmentStatus::Deployed
        {
            info!("连接环境: {}", lease.name);
            let name = lease.name.clone();
            let environment: &mut Environment = lease;
            timeout(self.config.connect_timeout(), self.provider.connect(environment))
                .await
                .map_err(|_| {
                    EnvironmentError::Timeout(format!(
                        "连接环境 {} 超过 {} 秒",
                        name, self.config.connect_timeout
                    ))
                })??;
        }

        let wait_timeout = if min_status == EnvironmentStatus::Connected {
            self.config.connect_timeout()
        } else {
            self.config.deploy_timeout()
        };

        let status = {
            let environment: &Environment = lease;
            let provider = &self.provider;
            poll_until(
                &format!("环境 {} 达到 {}", environment.name, min_status),
                wait_timeout,
                self.config.poll_interval(),
                || async move {
                    let status = provider.status(environment).await?;
                    if status == EnvironmentStatus::Unusable {
                        return Err(EnvironmentError::Unusable(environment.name.clone()));
                    }
                    Ok(status.satisfies(min_status).then_some(status))
                },
            )
            .await?
        };

        // 平台报告的状态只会比节点记录的更新
        if lease.status().readiness_cmp(status) == Some(std::cmp::Ordering::Less) {
            lease.set_status(status);
        }
        lease.publish();
        info!("环境 {} 已就绪: {}", lease.name, lease.status());

        Ok(())
    }

    /// 回收所有自动生成且已部署的环境，返回回收数量
    pub async fn teardown_generated(&self) -> usize {
        let mut count = 0;

        for name in self.pool.names().await {
            let mut lease = match self.pool.acquire(&name).await {
                Ok(lease) => lease,
                Err(e) => {
                    debug!("跳过回收 {}: {}", name, e);
                    continue;
                }
            };

            if lease.is_predefined || lease.status() == EnvironmentStatus::NotDeployed {
                continue;
            }

            info!("回收环境: {}", name);
            match self.provider.teardown(&lease).await {
                Ok(()) => {
                    lease.set_status(EnvironmentStatus::NotDeployed);
                    count += 1;
                }
                Err(e) => {
                    error!("回收环境 {} 失败: {}", name, e);
                }
            }
        }

        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{LocalProvider, NodeSpec};

    fn manager() -> EnvironmentManager {
        let config = ProvisionConfig {
            poll_interval_ms: 10,
            ..Default::default()
        };
        EnvironmentManager::new(Arc::new(LocalProvider::new()), config)
    }

    #[tokio::test]
    async fn test_ensure_ready_deploys_and_connects() {
        let manager = manager();
        manager
            .add_generated(EnvironmentSpec::new("gen").with_node(NodeSpec::default()))
            .await
            .unwrap();

        let mut lease = manager.pool().acquire("gen").await.unwrap();
        assert_eq!(lease.status(), EnvironmentStatus::NotDeployed);

        manager
            .ensure_ready(&mut lease, EnvironmentStatus::Connected)
            .await
            .unwrap();
        assert_eq!(lease.status(), EnvironmentStatus::Connected);
    }

    #[tokio::test]
    async fn test_ensure_ready_deployed_only() {
        let manager = manager();
        manager
            .add_generated(EnvironmentSpec::new("gen").with_node(NodeSpec::default()))
            .await
            .unwrap();

        let mut lease = manager.pool().acquire("gen").await.unwrap();
        manager
            .ensure_ready(&mut lease, EnvironmentStatus::Deployed)
            .await
            .unwrap();
        assert_eq!(lease.status(), EnvironmentStatus::Deployed);
    }

    #[tokio::test]
    async fn test_teardown_skips_predefined() {
        let manager = manager();
        manager
            .add_predefined(EnvironmentSpec::new("pre").with_node(NodeSpec::default()))
            .await
            .unwrap();
        manager
            .add_generated(EnvironmentSpec::new("gen").with_node(NodeSpec::default()))
            .await
            .unwrap();

        for name in ["pre", "gen"] {
            let mut lease = manager.pool().acquire(name).await.unwrap();
            manager
                .ensure_ready(&mut lease, EnvironmentStatus::Connected)
                .await
                .unwrap();
        }

        assert_eq!(manager.teardown_generated().await, 1);

        let candidates = manager.pool().candidates().await;
        let pre = candidates.iter().find(|c| c.environment.name == "pre").unwrap();
        let gen = candidates.iter().find(|c| c.environment.name == "gen").unwrap();
        assert_eq!(pre.environment.status(), EnvironmentStatus::Connected);
        assert_eq!(gen.environment.status(), EnvironmentStatus::NotDeployed);
    }
}
