//! 特性 (能力标签) 与进程级特性注册表
//!
//! 特性只是一个名称加一段能力说明，没有状态。注册表在程序启动时构建，
//! 通过 [`FeatureRegistry::install`] 安装到进程级位置后只读。

use std::collections::BTreeMap;
use std::sync::OnceLock;
use thiserror::Error;

/// 特性注册错误
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FeatureError {
    #[error("特性 {0} 重复注册")]
    Duplicate(String),

    #[error("未知特性: {0}")]
    Unknown(String),

    #[error("特性注册表已安装，不能再次安装")]
    AlreadyInstalled,
}

/// 特性
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Feature {
    name: &'static str,
    description: &'static str,
}

impl Feature {
    pub const fn new(name: &'static str, description: &'static str) -> Self {
        Self { name, description }
    }

    /// 特性名称 (节点与需求中引用的标识)
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// 能力说明
    pub fn description(&self) -> &'static str {
        self.description
    }
}

impl std::fmt::Display for Feature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

// ============================================
// 内置特性
// ============================================

pub const SERIAL_CONSOLE: Feature = Feature::new("SerialConsole", "可读取节点串口控制台日志");
pub const START_STOP: Feature = Feature::new("StartStop", "可启动、停止、重启节点");
pub const SRIOV: Feature = Feature::new("Sriov", "支持 SR-IOV 加速网络");
pub const GPU: Feature = Feature::new("Gpu", "节点带有 GPU 设备");
pub const NVME: Feature = Feature::new("Nvme", "节点带有 NVMe 磁盘");
pub const HIBERNATION: Feature = Feature::new("Hibernation", "支持休眠到磁盘");

const BUILTIN_FEATURES: [Feature; 6] = [SERIAL_CONSOLE, START_STOP, SRIOV, GPU, NVME, HIBERNATION];

static GLOBAL_REGISTRY: OnceLock<FeatureRegistry> = OnceLock::new();

/// 特性注册表
#[derive(Debug, Clone, Default)]
pub struct FeatureRegistry {
    features: BTreeMap<&'static str, Feature>,
}

impl FeatureRegistry {
    /// 创建空注册表
    pub fn empty() -> Self {
        Self::default()
    }

    /// 创建包含所有内置特性的注册表
    pub fn builtin() -> Self {
        let features = BUILTIN_FEATURES.iter().map(|f| (f.name, *f)).collect();
        Self { features }
    }

    /// 注册一个特性
    pub fn with_feature(mut self, feature: Feature) -> Result<Self, FeatureError> {
        if self.features.contains_key(feature.name) {
            return Err(FeatureError::Duplicate(feature.name.to_string()));
        }
        self.features.insert(feature.name, feature);
        Ok(self)
    }

    /// 按名称查找特性
    pub fn get(&self, name: &str) -> Option<&Feature> {
        self.features.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.features.contains_key(name)
    }

    /// 所有已注册特性名称 (按字典序)
    pub fn names(&self) -> Vec<&'static str> {
        self.features.keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// 检查一组特性名称是否都已注册
    pub fn validate<'a, I>(&self, names: I) -> Result<(), FeatureError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        for name in names {
            if !self.contains(name) {
                return Err(FeatureError::Unknown(name.to_string()));
            }
        }
        Ok(())
    }

    /// 安装为进程级注册表，之后只读
    pub fn install(self) -> Result<&'static FeatureRegistry, FeatureError> {
        GLOBAL_REGISTRY
            .set(self)
            .map_err(|_| FeatureError::AlreadyInstalled)?;
        Ok(Self::global())
    }

    /// 获取进程级注册表；未安装时使用内置特性
    pub fn global() -> &'static FeatureRegistry {
        GLOBAL_REGISTRY.get_or_init(Self::builtin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_registry() {
        let registry = FeatureRegistry::builtin();
        assert_eq!(registry.len(), 6);
        assert!(registry.contains("SerialConsole"));
        assert_eq!(registry.get("Gpu"), Some(&GPU));
        assert!(registry.get("Infiniband").is_none());
    }

    #[test]
    fn test_with_feature_rejects_duplicate() {
        let custom = Feature::new("Infiniband", "RDMA 网络");
        let registry = FeatureRegistry::builtin().with_feature(custom).unwrap();
        assert!(registry.contains("Infiniband"));

        let err = registry.with_feature(custom).unwrap_err();
        assert_eq!(err, FeatureError::Duplicate("Infiniband".to_string()));
    }

    #[test]
    fn test_validate_unknown_feature() {
        let registry = FeatureRegistry::builtin();
        assert!(registry.validate(["SerialConsole", "Sriov"]).is_ok());
        assert_eq!(
            registry.validate(["SerialConsole", "Tpm"]),
            Err(FeatureError::Unknown("Tpm".to_string()))
        );
    }

    #[test]
    fn test_names_sorted() {
        let names = FeatureRegistry::builtin().names();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
    }
}
