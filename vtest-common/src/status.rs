//! 环境就绪状态

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// 节点/环境的就绪状态
///
/// 前三个值按就绪度全序排列: `NotDeployed < Deployed < Connected`。
/// `Unusable` 是终止状态，与任何状态都不可比较，处于该状态的节点或环境不参与匹配。
///
/// 没有派生 `PartialOrd`，比较请使用 [`EnvironmentStatus::readiness_cmp`]
/// 或 [`EnvironmentStatus::satisfies`]。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EnvironmentStatus {
    /// 未部署
    NotDeployed,
    /// 已部署 (资源已创建，尚未建立连接)
    Deployed,
    /// 已连接
    Connected,
    /// 不可用
    Unusable,
}

impl EnvironmentStatus {
    fn rank(self) -> Option<u8> {
        match self {
            Self::NotDeployed => Some(0),
            Self::Deployed => Some(1),
            Self::Connected => Some(2),
            Self::Unusable => None,
        }
    }

    /// 按就绪度比较，任意一方为 `Unusable` 时返回 `None`
    pub fn readiness_cmp(self, other: Self) -> Option<Ordering> {
        match (self.rank(), other.rank()) {
            (Some(a), Some(b)) => Some(a.cmp(&b)),
            _ => None,
        }
    }

    /// 当前状态是否达到 `min` 要求的就绪度
    pub fn satisfies(self, min: Self) -> bool {
        matches!(
            self.readiness_cmp(min),
            Some(Ordering::Greater | Ordering::Equal)
        )
    }

    /// 是否可用 (非 `Unusable`)
    pub fn is_usable(self) -> bool {
        self != Self::Unusable
    }

    /// 计算一组状态中就绪度最低的状态
    ///
    /// 任意一个为 `Unusable` 则结果为 `Unusable`；空集合返回 `None`。
    pub fn least_ready<I>(statuses: I) -> Option<Self>
    where
        I: IntoIterator<Item = Self>,
    {
        let mut least: Option<Self> = None;
        for status in statuses {
            if status == Self::Unusable {
                return Some(Self::Unusable);
            }
            least = match least {
                Some(current) if current.readiness_cmp(status) == Some(Ordering::Less) => {
                    Some(current)
                }
                _ => Some(status),
            };
        }
        least
    }

    /// 获取中文显示名称
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::NotDeployed => "未部署",
            Self::Deployed => "已部署",
            Self::Connected => "已连接",
            Self::Unusable => "不可用",
        }
    }
}

impl std::fmt::Display for EnvironmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::NotDeployed => "NotDeployed",
            Self::Deployed => "Deployed",
            Self::Connected => "Connected",
            Self::Unusable => "Unusable",
        };
        write!(f, "{}", name)
    }
}
