//! 需求匹配
//!
//! 在一组候选环境中为需求挑选环境，纯函数，不修改任何状态。
//!
//! 特性与资源按节点逐个判断：环境中至少要有 `min_node_count` 个节点，
//! 每个节点各自可用、具备全部所需特性、不具备任何排除特性、并满足资源下限。
//! 特性不在节点之间合并计算。
//!
//! 多个候选都满足时的优先顺序：
//! 1. 就绪状态更高
//! 2. 当前使用数更少
//! 3. 预定义环境优先于生成的环境
//! 4. 成本更低
//! 5. 候选顺序靠前

use std::cmp::Ordering;
use vtest_common::EnvironmentStatus;
use vtest_environment::{Environment, EnvironmentCandidate, Node};

use crate::Requirement;

/// 未满足的需求项
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Unmet {
    /// 环境处于不可用状态
    Unusable,

    /// 就绪状态不足
    Status {
        required: EnvironmentStatus,
        actual: EnvironmentStatus,
    },

    /// 环境已被其他套件使用过
    NotNew,

    /// 可用节点数不足
    NodeCount { required: usize, actual: usize },

    /// 具备这些特性的节点不足
    MissingFeatures(Vec<String>),

    /// 不具备这些排除特性的节点不足
    ExcludedFeatures(Vec<String>),

    CoreCount {
        min: u32,
        qualified: usize,
        required: usize,
    },

    MemoryMb {
        min: u64,
        qualified: usize,
        required: usize,
    },

    NicCount {
        min: u32,
        qualified: usize,
        required: usize,
    },

    /// 各项单独都满足，但同时满足全部条件的节点不足
    NoSingleNode { qualified: usize, required: usize },
}

impl std::fmt::Display for Unmet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unusable => write!(f, "环境不可用"),
            Self::Status { required, actual } => {
                write!(f, "状态 {} 未达到要求的 {}", actual, required)
            }
            Self::NotNew => write!(f, "环境已被使用过，用例要求新环境"),
            Self::NodeCount { required, actual } => {
                write!(f, "可用节点 {} 个，需要 {} 个", actual, required)
            }
            Self::MissingFeatures(features) => write!(f, "缺少特性 [{}]", features.join(", ")),
            Self::ExcludedFeatures(features) => {
                write!(f, "具有排除的特性 [{}]", features.join(", "))
            }
            Self::CoreCount {
                min,
                qualified,
                required,
            } => write!(
                f,
                "核数 >= {} 的节点 {} 个，需要 {} 个",
                min, qualified, required
            ),
            Self::MemoryMb {
                min,
                qualified,
                required,
            } => write!(
                f,
                "内存 >= {} MB 的节点 {} 个，需要 {} 个",
                min, qualified, required
            ),
            Self::NicCount {
                min,
                qualified,
                required,
            } => write!(
                f,
                "网卡 >= {} 的节点 {} 个，需要 {} 个",
                min, qualified, required
            ),
            Self::NoSingleNode {
                qualified,
                required,
            } => write!(
                f,
                "同时满足全部条件的节点 {} 个，需要 {} 个",
                qualified, required
            ),
        }
    }
}

/// 没有匹配的环境
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoMatch {
    /// 最接近的候选 (未满足项最少)
    pub closest: Option<String>,

    /// 最接近的候选未满足的全部需求项
    pub unmet: Vec<Unmet>,
}

impl std::fmt::Display for NoMatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.closest {
            None => write!(f, "没有可用的环境"),
            Some(name) => {
                let unmet: Vec<String> = self.unmet.iter().map(ToString::to_string).collect();
                write!(
                    f,
                    "没有满足需求的环境，最接近的环境 {} 不满足: {}",
                    name,
                    unmet.join("; ")
                )
            }
        }
    }
}

impl std::error::Error for NoMatch {}

/// 需求匹配器
#[derive(Debug, Clone, Copy)]
pub struct RequirementMatcher<'r> {
    requirement: &'r Requirement,
    require_new: bool,
    relax_status: bool,
}

impl<'r> RequirementMatcher<'r> {
    pub fn new(requirement: &'r Requirement) -> Self {
        Self {
            requirement,
            require_new: false,
            relax_status: false,
        }
    }

    /// 只接受从未被使用过的环境
    pub fn require_new(mut self, require_new: bool) -> Self {
        self.require_new = require_new;
        self
    }

    /// 忽略就绪状态不足 (仍排除不可用的环境)，用于挑选可以继续部署/连接的环境
    pub fn relax_status(mut self) -> Self {
        self.relax_status = true;
        self
    }

    /// 列出环境未满足的全部需求项，空表示满足
    pub fn evaluate(&self, environment: &Environment) -> Vec<Unmet> {
        let requirement = self.requirement;
        let shape = &requirement.shape;
        let mut unmet = Vec::new();

        let status = environment.status();
        if !status.is_usable() {
            unmet.push(Unmet::Unusable);
            return unmet;
        }
        if !self.relax_status && !status.satisfies(requirement.min_status) {
            unmet.push(Unmet::Status {
                required: requirement.min_status,
                actual: status,
            });
        }
        if self.require_new && !environment.is_new {
            unmet.push(Unmet::NotNew);
        }

        let nodes: Vec<&Node> = environment
            .nodes()
            .iter()
            .filter(|n| n.status.is_usable())
            .collect();
        let needed = shape.min_node_count.max(1);
        if nodes.len() < needed {
            unmet.push(Unmet::NodeCount {
                required: needed,
                actual: nodes.len(),
            });
        }

        // 节点总数不足时只按现有节点判断各项，避免重复报告
        let threshold = needed.min(nodes.len());
        let count = |predicate: &dyn Fn(&Node) -> bool| {
            nodes.iter().filter(|n| predicate(n)).count()
        };
        let mut field_unmet = false;

        let missing: Vec<String> = requirement
            .features
            .iter()
            .filter(|f| count(&|n: &Node| n.has_feature(f)) < threshold)
            .cloned()
            .collect();
        if !missing.is_empty() {
            unmet.push(Unmet::MissingFeatures(missing));
            field_unmet = true;
        }

        let excluded: Vec<String> = requirement
            .excluded_features
            .iter()
            .filter(|f| count(&|n: &Node| !n.has_feature(f)) < threshold)
            .cloned()
            .collect();
        if !excluded.is_empty() {
            unmet.push(Unmet::ExcludedFeatures(excluded));
            field_unmet = true;
        }

        let qualified = count(&|n: &Node| n.core_count >= shape.min_core_count);
        if qualified < threshold {
            unmet.push(Unmet::CoreCount {
                min: shape.min_core_count,
                qualified,
                required: needed,
            });
            field_unmet = true;
        }

        let qualified = count(&|n: &Node| n.memory_mb >= shape.min_memory_mb);
        if qualified < threshold {
            unmet.push(Unmet::MemoryMb {
                min: shape.min_memory_mb,
                qualified,
                required: needed,
            });
            field_unmet = true;
        }

        let qualified = count(&|n: &Node| n.nic_count >= shape.min_nic_count);
        if qualified < threshold {
            unmet.push(Unmet::NicCount {
                min: shape.min_nic_count,
                qualified,
                required: needed,
            });
            field_unmet = true;
        }

        if !field_unmet && nodes.len() >= needed {
            let qualified = count(&|n: &Node| self.node_qualifies(n));
            if qualified < needed {
                unmet.push(Unmet::NoSingleNode {
                    qualified,
                    required: needed,
                });
            }
        }

        unmet
    }

    /// 单个节点是否满足全部特性与资源条件
    fn node_qualifies(&self, node: &Node) -> bool {
        let requirement = self.requirement;
        let shape = &requirement.shape;
        node.status.is_usable()
            && requirement.features.iter().all(|f| node.has_feature(f))
            && !requirement.excluded_features.iter().any(|f| node.has_feature(f))
            && node.core_count >= shape.min_core_count
            && node.memory_mb >= shape.min_memory_mb
            && node.nic_count >= shape.min_nic_count
    }

    /// 在候选中挑选环境
    pub fn find<'a>(
        &self,
        candidates: &'a [EnvironmentCandidate],
    ) -> Result<&'a EnvironmentCandidate, NoMatch> {
        let evaluated: Vec<(&EnvironmentCandidate, Vec<Unmet>)> = candidates
            .iter()
            .map(|c| (c, self.evaluate(&c.environment)))
            .collect();

        let best = evaluated
            .iter()
            .filter(|(_, unmet)| unmet.is_empty())
            .map(|(c, _)| *c)
            .min_by(|a, b| rank(a, b));

        if let Some(candidate) = best {
            return Ok(candidate);
        }

        // min_by_key 在并列时返回第一个
        let closest = evaluated.into_iter().min_by_key(|(_, unmet)| unmet.len());
        Err(match closest {
            Some((candidate, unmet)) => NoMatch {
                closest: Some(candidate.environment.name.clone()),
                unmet,
            },
            None => NoMatch {
                closest: None,
                unmet: Vec::new(),
            },
        })
    }
}

/// 满足需求的候选之间的优先顺序，越小越优先
fn rank(a: &EnvironmentCandidate, b: &EnvironmentCandidate) -> Ordering {
    let (ea, eb) = (&a.environment, &b.environment);
    eb.status()
        .readiness_cmp(ea.status())
        .unwrap_or(Ordering::Equal)
        .then(a.in_use.cmp(&b.in_use))
        .then(eb.is_predefined.cmp(&ea.is_predefined))
        .then(ea.cost.cmp(&eb.cost))
}

/// 为需求挑选环境
pub fn match_requirement<'a>(
    requirement: &Requirement,
    candidates: &'a [EnvironmentCandidate],
) -> Result<&'a EnvironmentCandidate, NoMatch> {
    RequirementMatcher::new(requirement).find(candidates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use EnvironmentStatus::*;

    fn candidate(environment: Environment, in_use: usize) -> EnvironmentCandidate {
        EnvironmentCandidate {
            environment,
            in_use,
        }
    }

    fn env(name: &str, status: EnvironmentStatus, features: &[&str]) -> Environment {
        Environment::new(name).with_node(
            Node::new(&format!("{}-0", name))
                .with_status(status)
                .with_features(features.iter().copied()),
        )
    }

    #[test]
    fn test_missing_serial_console_is_reported() {
        let candidates = vec![candidate(env("only", Deployed, &[]), 0)];
        let req = Requirement::new()
            .with_min_status(Deployed)
            .with_feature("SerialConsole");

        let err = match_requirement(&req, &candidates).unwrap_err();
        assert_eq!(err.closest.as_deref(), Some("only"));
        assert_eq!(
            err.unmet,
            vec![Unmet::MissingFeatures(vec!["SerialConsole".to_string()])]
        );
        assert!(err.to_string().contains("SerialConsole"));
    }

    #[test]
    fn test_status_filter() {
        let candidates = vec![candidate(env("a", Deployed, &[]), 0)];
        let req = Requirement::new().with_min_status(Connected);

        let err = match_requirement(&req, &candidates).unwrap_err();
        assert_eq!(
            err.unmet,
            vec![Unmet::Status {
                required: Connected,
                actual: Deployed
            }]
        );

        // 放宽状态后可以选中，用于后续部署/连接
        assert!(RequirementMatcher::new(&req)
            .relax_status()
            .find(&candidates)
            .is_ok());
    }

    #[test]
    fn test_unusable_never_matches() {
        let candidates = vec![candidate(env("bad", Unusable, &["Gpu"]), 0)];
        let req = Requirement::new().with_min_status(NotDeployed);

        let err = RequirementMatcher::new(&req)
            .relax_status()
            .find(&candidates)
            .unwrap_err();
        assert_eq!(err.unmet, vec![Unmet::Unusable]);
    }

    #[test]
    fn test_features_not_pooled_across_nodes() {
        let environment = Environment::new("split")
            .with_node(Node::new("a").with_status(Connected).with_features(["Gpu"]))
            .with_node(Node::new("b").with_status(Connected).with_features(["Nvme"]));
        let candidates = vec![candidate(environment, 0)];
        let req = Requirement::new().with_features(["Gpu", "Nvme"]);

        let err = match_requirement(&req, &candidates).unwrap_err();
        assert_eq!(
            err.unmet,
            vec![Unmet::NoSingleNode {
                qualified: 0,
                required: 1
            }]
        );
    }

    #[test]
    fn test_excluded_feature_and_node_count() {
        let environment = Environment::new("gpu")
            .with_node(Node::new("a").with_status(Connected).with_features(["Gpu"]));
        let candidates = vec![candidate(environment, 0)];

        let req = Requirement::new().excluding("Gpu").with_min_node_count(2);
        let err = match_requirement(&req, &candidates).unwrap_err();
        assert_eq!(
            err.unmet,
            vec![
                Unmet::NodeCount {
                    required: 2,
                    actual: 1
                },
                Unmet::ExcludedFeatures(vec!["Gpu".to_string()]),
            ]
        );
    }

    #[test]
    fn test_prefers_higher_status_then_lower_in_use() {
        let candidates = vec![
            candidate(env("deployed", Deployed, &[]), 0),
            candidate(env("busy", Connected, &[]), 2),
            candidate(env("idle", Connected, &[]), 0),
        ];
        let req = Requirement::new().with_min_status(Deployed);

        let chosen = match_requirement(&req, &candidates).unwrap();
        assert_eq!(chosen.environment.name, "idle");
    }

    #[test]
    fn test_prefers_predefined_then_cost_then_order() {
        let candidates = vec![
            candidate(env("gen", Connected, &[]), 0),
            candidate(env("expensive", Connected, &[]).predefined().with_cost(5), 0),
            candidate(env("cheap", Connected, &[]).predefined().with_cost(1), 0),
            candidate(env("cheap-2", Connected, &[]).predefined().with_cost(1), 0),
        ];

        let chosen = match_requirement(&Requirement::default(), &candidates).unwrap();
        assert_eq!(chosen.environment.name, "cheap");
    }

    #[test]
    fn test_closest_candidate_has_fewest_unmet() {
        let candidates = vec![
            candidate(env("far", NotDeployed, &[]), 0),
            candidate(env("near", Connected, &[]), 0),
        ];
        let req = Requirement::new().with_feature("Sriov");

        let err = match_requirement(&req, &candidates).unwrap_err();
        assert_eq!(err.closest.as_deref(), Some("near"));
    }

    #[test]
    fn test_no_candidates() {
        let err = match_requirement(&Requirement::default(), &[]).unwrap_err();
        assert_eq!(err.closest, None);
        assert_eq!(err.to_string(), "没有可用的环境");
    }

    #[test]
    fn test_require_new() {
        let mut used = env("used", Connected, &[]);
        used.is_new = false;
        let candidates = vec![candidate(used, 0)];

        let req = Requirement::default();
        assert!(match_requirement(&req, &candidates).is_ok());

        let err = RequirementMatcher::new(&req)
            .require_new(true)
            .find(&candidates)
            .unwrap_err();
        assert_eq!(err.unmet, vec![Unmet::NotNew]);
    }

    #[test]
    fn test_shape_minimums() {
        let environment = Environment::new("small").with_node(
            Node::new("a")
                .with_status(Connected)
                .with_resources(2, 2048, 1),
        );
        let candidates = vec![candidate(environment, 0)];
        let mut req = Requirement::default();
        req.shape.min_core_count = 4;
        req.shape.min_memory_mb = 1024;

        let err = match_requirement(&req, &candidates).unwrap_err();
        assert_eq!(
            err.unmet,
            vec![Unmet::CoreCount {
                min: 4,
                qualified: 0,
                required: 1
            }]
        );
    }
}
