//! 环境

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use vtest_common::EnvironmentStatus;

use crate::node::{Node, NodeSpec};

/// 环境规格
///
/// 预定义环境来自配置文件；其余环境由执行器根据用例需求生成。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentSpec {
    /// 环境名称
    pub name: String,

    /// 节点规格列表
    #[serde(default)]
    pub nodes: Vec<NodeSpec>,
}

impl EnvironmentSpec {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            nodes: Vec::new(),
        }
    }

    pub fn with_node(mut self, node: NodeSpec) -> Self {
        self.nodes.push(node);
        self
    }
}

/// 环境
///
/// 拥有 1..N 个节点。状态不单独存储，始终取自就绪度最低的节点。
#[derive(Debug, Clone)]
pub struct Environment {
    /// 环境名称 (在环境池中唯一)
    pub name: String,

    /// 创建此环境所用的规格
    pub spec: EnvironmentSpec,

    /// 是否由配置预定义 (预定义环境不会被自动回收)
    pub is_predefined: bool,

    /// 是否尚未被任何套件使用过
    pub is_new: bool,

    /// 平台给出的相对成本
    pub cost: u32,

    nodes: Vec<Node>,
}

impl Environment {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            spec: EnvironmentSpec::new(name),
            is_predefined: false,
            is_new: true,
            cost: 0,
            nodes: Vec::new(),
        }
    }

    /// 按规格创建未部署的环境
    pub fn from_spec(spec: EnvironmentSpec) -> Self {
        let nodes = spec
            .nodes
            .iter()
            .enumerate()
            .map(|(index, node_spec)| Node::from_spec(&format!("{}-{}", spec.name, index), node_spec))
            .collect();
        Self {
            name: spec.name.clone(),
            spec,
            is_predefined: false,
            is_new: true,
            cost: 0,
            nodes,
        }
    }

    pub fn with_node(mut self, node: Node) -> Self {
        self.nodes.push(node);
        self
    }

    pub fn predefined(mut self) -> Self {
        self.is_predefined = true;
        self
    }

    pub fn with_cost(mut self, cost: u32) -> Self {
        self.cost = cost;
        self
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn nodes_mut(&mut self) -> &mut [Node] {
        &mut self.nodes
    }

    /// 替换全部节点 (部署完成后由提供者调用)
    pub fn replace_nodes(&mut self, nodes: Vec<Node>) {
        self.nodes = nodes;
    }

    /// 默认节点 (第一个节点)
    pub fn default_node(&self) -> Option<&Node> {
        self.nodes.first()
    }

    pub fn node(&self, name: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.name == name)
    }

    /// 环境状态：就绪度最低的节点状态；没有节点时视为未部署
    pub fn status(&self) -> EnvironmentStatus {
        EnvironmentStatus::least_ready(self.nodes.iter().map(|n| n.status))
            .unwrap_or(EnvironmentStatus::NotDeployed)
    }

    /// 将所有节点设为同一状态
    pub fn set_status(&mut self, status: EnvironmentStatus) {
        for node in &mut self.nodes {
            node.status = status;
        }
    }

    /// 所有节点特性的并集 (仅用于展示)
    pub fn features(&self) -> BTreeSet<&str> {
        self.nodes
            .iter()
            .flat_map(|n| n.features.iter().map(String::as_str))
            .collect()
    }

    /// 报告中附带的环境信息
    pub fn information(&self) -> BTreeMap<String, String> {
        let mut info = BTreeMap::new();
        info.insert("environment".to_string(), self.name.clone());
        info.insert("status".to_string(), self.status().to_string());
        info.insert("node_count".to_string(), self.nodes.len().to_string());
        if let Some(node) = self.default_node() {
            if let Some(address) = &node.address {
                info.insert("default_node".to_string(), address.to_string());
            }
            for (key, value) in &node.metadata {
                info.insert(key.clone(), value.clone());
            }
        }
        info
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use EnvironmentStatus::*;

    #[test]
    fn test_status_mirrors_least_ready_node() {
        let env = Environment::new("env")
            .with_node(Node::new("a").with_status(Connected))
            .with_node(Node::new("b").with_status(Deployed));
        assert_eq!(env.status(), Deployed);

        let env = env.with_node(Node::new("c").with_status(Unusable));
        assert_eq!(env.status(), Unusable);
    }

    #[test]
    fn test_empty_environment_is_not_deployed() {
        assert_eq!(Environment::new("empty").status(), NotDeployed);
    }

    #[test]
    fn test_from_spec() {
        let spec = EnvironmentSpec::new("generated")
            .with_node(NodeSpec::default())
            .with_node(NodeSpec {
                core_count: 4,
                ..Default::default()
            });
        let env = Environment::from_spec(spec);

        assert_eq!(env.nodes().len(), 2);
        assert_eq!(env.nodes()[0].name, "generated-0");
        assert_eq!(env.nodes()[1].core_count, 4);
        assert!(env.is_new);
        assert!(!env.is_predefined);
        assert_eq!(env.status(), NotDeployed);
    }

    #[test]
    fn test_set_status_and_information() {
        let mut env = Environment::new("env")
            .with_node(Node::new("a").with_metadata("image", "ubuntu"))
            .predefined();
        env.set_status(Connected);

        assert_eq!(env.status(), Connected);
        let info = env.information();
        assert_eq!(info.get("status").map(String::as_str), Some("Connected"));
        assert_eq!(info.get("image").map(String::as_str), Some("ubuntu"));
        assert!(env.is_predefined);
    }
}
