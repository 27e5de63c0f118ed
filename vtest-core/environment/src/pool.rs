//! 环境池管理
//!
//! 每个环境各自持有一把锁，绑定即取得该锁的所有权 ([`EnvironmentLease`])，
//! 同一环境同一时刻只能被一个用例使用。池本身不持有全局锁。

use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use tracing::{debug, info};

use crate::{Environment, EnvironmentError, Result};

/// 池中的一个环境槽位
struct Slot {
    name: String,

    /// 环境本体，绑定时取得所有权
    environment: Arc<Mutex<Environment>>,

    /// 最近一次释放时的环境快照，供匹配时读取
    snapshot: StdMutex<Environment>,

    /// 正在使用或等待使用的数量
    in_use: AtomicUsize,
}

impl Slot {
    fn snapshot(&self) -> Environment {
        self.snapshot
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn update_snapshot(&self, environment: &Environment) {
        let mut snapshot = self
            .snapshot
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *snapshot = environment.clone();
    }
}

/// 匹配候选 (某一时刻的环境快照)
#[derive(Debug, Clone)]
pub struct EnvironmentCandidate {
    /// 环境快照
    pub environment: Environment,

    /// 当前使用数
    pub in_use: usize,
}

/// 在用计数守卫，等待被取消时也能正确归还计数
struct InUseGuard {
    slot: Arc<Slot>,
}

impl InUseGuard {
    fn new(slot: Arc<Slot>) -> Self {
        slot.in_use.fetch_add(1, Ordering::SeqCst);
        Self { slot }
    }
}

impl Drop for InUseGuard {
    fn drop(&mut self) {
        self.slot.in_use.fetch_sub(1, Ordering::SeqCst);
    }
}

/// 环境绑定
///
/// 持有期间独占环境；释放时刷新池中的快照。
pub struct EnvironmentLease {
    guard: OwnedMutexGuard<Environment>,
    in_use: InUseGuard,
}

impl EnvironmentLease {
    /// 立即把当前环境状态同步到池快照
    pub fn publish(&self) {
        self.in_use.slot.update_snapshot(&self.guard);
    }
}

impl Deref for EnvironmentLease {
    type Target = Environment;

    fn deref(&self) -> &Environment {
        &self.guard
    }
}

impl DerefMut for EnvironmentLease {
    fn deref_mut(&mut self) -> &mut Environment {
        &mut self.guard
    }
}

impl Drop for EnvironmentLease {
    fn drop(&mut self) {
        self.in_use.slot.update_snapshot(&self.guard);
        debug!("释放环境: {}", self.guard.name);
    }
}

/// 环境池
pub struct EnvironmentPool {
    slots: RwLock<Vec<Arc<Slot>>>,
}

impl EnvironmentPool {
    pub fn new() -> Self {
        Self {
            slots: RwLock::new(Vec::new()),
        }
    }

    /// 添加环境
    pub async fn add(&self, environment: Environment) -> Result<()> {
        let mut slots = self.slots.write().await;

        // 检查环境是否已存在
        if slots.iter().any(|s| s.name == environment.name) {
            return Err(EnvironmentError::AlreadyExists(environment.name));
        }

        info!("添加环境到环境池: {}", environment.name);
        slots.push(Arc::new(Slot {
            name: environment.name.clone(),
            snapshot: StdMutex::new(environment.clone()),
            environment: Arc::new(Mutex::new(environment)),
            in_use: AtomicUsize::new(0),
        }));

        Ok(())
    }

    /// 移除环境 (环境正被使用时等待其释放)
    pub async fn remove(&self, name: &str) -> Result<Environment> {
        let slot = {
            let mut slots = self.slots.write().await;
            let index = slots
                .iter()
                .position(|s| s.name == name)
                .ok_or_else(|| EnvironmentError::NotFound(name.to_string()))?;
            slots.remove(index)
        };

        info!("从环境池移除环境: {}", name);
        let environment = slot.environment.lock().await.clone();
        Ok(environment)
    }

    /// 绑定环境，若被占用则挂起直到释放
    pub async fn acquire(&self, name: &str) -> Result<EnvironmentLease> {
        let slot = self.slot(name).await?;
        let in_use = InUseGuard::new(Arc::clone(&slot));

        debug!("等待绑定环境: {}", name);
        let guard = Arc::clone(&slot.environment).lock_owned().await;
        debug!("已绑定环境: {}", name);

        Ok(EnvironmentLease { guard, in_use })
    }

    /// 尝试立即绑定环境，被占用时返回 `None`
    pub async fn try_acquire(&self, name: &str) -> Result<Option<EnvironmentLease>> {
        let slot = self.slot(name).await?;
        let in_use = InUseGuard::new(Arc::clone(&slot));

        match Arc::clone(&slot.environment).try_lock_owned() {
            Ok(guard) => Ok(Some(EnvironmentLease { guard, in_use })),
            Err(_) => Ok(None),
        }
    }

    /// 获取所有环境的快照，按添加顺序
    pub async fn candidates(&self) -> Vec<EnvironmentCandidate> {
        let slots = self.slots.read().await;
        slots
            .iter()
            .map(|slot| EnvironmentCandidate {
                environment: slot.snapshot(),
                in_use: slot.in_use.load(Ordering::SeqCst),
            })
            .collect()
    }

    /// 获取所有环境名称
    pub async fn names(&self) -> Vec<String> {
        let slots = self.slots.read().await;
        slots.iter().map(|s| s.name.clone()).collect()
    }

    pub async fn len(&self) -> usize {
        self.slots.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.slots.read().await.is_empty()
    }

    /// 获取环境当前使用数
    pub async fn in_use(&self, name: &str) -> Result<usize> {
        let slot = self.slot(name).await?;
        Ok(slot.in_use.load(Ordering::SeqCst))
    }

    async fn slot(&self, name: &str) -> Result<Arc<Slot>> {
        let slots = self.slots.read().await;
        slots
            .iter()
            .find(|s| s.name == name)
            .cloned()
            .ok_or_else(|| EnvironmentError::NotFound(name.to_string()))
    }
}

impl Default for EnvironmentPool {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Node;
    use vtest_common::EnvironmentStatus;

    fn env(name: &str) -> Environment {
        Environment::new(name).with_node(Node::new("n").with_status(EnvironmentStatus::Deployed))
    }

    #[tokio::test]
    async fn test_add_rejects_duplicate() {
        let pool = EnvironmentPool::new();
        pool.add(env("a")).await.unwrap();
        assert!(matches!(
            pool.add(env("a")).await,
            Err(EnvironmentError::AlreadyExists(_))
        ));
        assert_eq!(pool.len().await, 1);
    }

    #[tokio::test]
    async fn test_lease_is_exclusive() {
        let pool = EnvironmentPool::new();
        pool.add(env("a")).await.unwrap();

        let lease = pool.acquire("a").await.unwrap();
        assert_eq!(pool.in_use("a").await.unwrap(), 1);
        assert!(pool.try_acquire("a").await.unwrap().is_none());
        // try_acquire 失败后计数已归还
        assert_eq!(pool.in_use("a").await.unwrap(), 1);

        drop(lease);
        assert_eq!(pool.in_use("a").await.unwrap(), 0);
        assert!(pool.try_acquire("a").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_snapshot_refreshed_on_release() {
        let pool = EnvironmentPool::new();
        pool.add(env("a")).await.unwrap();

        {
            let mut lease = pool.acquire("a").await.unwrap();
            lease.set_status(EnvironmentStatus::Connected);
            lease.is_new = false;
        }

        let candidates = pool.candidates().await;
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].environment.status(), EnvironmentStatus::Connected);
        assert!(!candidates[0].environment.is_new);
        assert_eq!(candidates[0].in_use, 0);
    }

    #[tokio::test]
    async fn test_unknown_environment() {
        let pool = EnvironmentPool::new();
        assert!(matches!(
            pool.acquire("missing").await,
            Err(EnvironmentError::NotFound(_))
        ));
        assert!(pool.remove("missing").await.is_err());
    }

    #[tokio::test]
    async fn test_remove_returns_environment() {
        let pool = EnvironmentPool::new();
        pool.add(env("a")).await.unwrap();
        pool.add(env("b")).await.unwrap();

        let removed = pool.remove("a").await.unwrap();
        assert_eq!(removed.name, "a");
        assert_eq!(pool.names().await, vec!["b".to_string()]);
    }
}
