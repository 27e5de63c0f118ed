//! 运行配置
//!
//! 加载顺序 (后者覆盖前者):
//! - 默认值
//! - 配置文件 (TOML/YAML/JSON)
//! - 环境变量
//!
//! 配置文件搜索路径 (按优先级):
//! 1. `VTEST_CONFIG` 环境变量指定的路径
//! 2. `./vtest.toml`、`./vtest.yaml`、`./vtest.json`
//! 3. `~/.config/vtest/vtest.toml`、`~/.config/vtest/vtest.yaml`
//! 4. `/etc/vtest/vtest.toml`

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use vtest_environment::{EnvironmentSpec, ProvisionConfig};

use crate::{CaseSelector, LoggingConfig};

/// 运行配置 (顶层)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunConfig {
    /// 执行行为
    #[serde(default)]
    pub run: RunSection,

    /// 环境部署与连接
    #[serde(default)]
    pub provision: ProvisionConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// 用例选择器，按顺序应用
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub selection: Vec<CaseSelector>,

    /// 预定义环境
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub environments: Vec<EnvironmentSpec>,
}

/// 执行行为配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSection {
    /// 各生命周期阶段失败后的重试次数
    #[serde(default)]
    pub retry: u32,

    /// 同时执行的套件数
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// 单个用例超时 (秒)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub case_timeout: Option<u64>,

    /// 单个套件超时 (秒)，超时后剩余用例跳过
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suite_timeout: Option<u64>,

    /// 运行结束后保留自动生成的环境
    #[serde(default)]
    pub keep_environment: bool,

    /// 没有合适的环境时按需求生成
    #[serde(default)]
    pub generate_environments: bool,
}

fn default_max_concurrency() -> usize {
    1
}

impl Default for RunSection {
    fn default() -> Self {
        Self {
            retry: 0,
            max_concurrency: default_max_concurrency(),
            case_timeout: None,
            suite_timeout: None,
            keep_environment: false,
            generate_environments: false,
        }
    }
}

impl RunSection {
    pub fn case_timeout(&self) -> Option<Duration> {
        self.case_timeout.map(Duration::from_secs)
    }

    pub fn suite_timeout(&self) -> Option<Duration> {
        self.suite_timeout.map(Duration::from_secs)
    }
}

/// 配置文件格式
fn format_of(path: &Path) -> Option<&'static str> {
    match path.extension().and_then(|s| s.to_str()) {
        Some("toml") => Some("toml"),
        Some("yaml") | Some("yml") => Some("yaml"),
        Some("json") => Some("json"),
        _ => None,
    }
}

impl RunConfig {
    /// 从多个源加载配置 (优先级: 环境变量 > 配置文件 > 默认值)
    pub fn load() -> Result<Self> {
        let mut config = match Self::find_config_file() {
            Some(path) => {
                tracing::debug!("加载配置文件: {}", path.display());
                Self::load_from_file(&path)?
            }
            None => {
                tracing::debug!("未找到配置文件，使用默认配置");
                Self::default()
            }
        };

        config.apply_overrides(|key| env::var(key).ok())?;
        config.validate()?;

        Ok(config)
    }

    /// 从指定文件加载配置
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("读取配置文件失败: {}", path.display()))?;

        let config = match format_of(path) {
            Some("toml") => toml::from_str(&content)
                .with_context(|| format!("解析 TOML 配置失败: {}", path.display()))?,
            Some("yaml") => serde_yaml::from_str(&content)
                .with_context(|| format!("解析 YAML 配置失败: {}", path.display()))?,
            Some("json") => serde_json::from_str(&content)
                .with_context(|| format!("解析 JSON 配置失败: {}", path.display()))?,
            _ => anyhow::bail!("不支持的配置文件格式: {}", path.display()),
        };

        Ok(config)
    }

    /// 从指定路径字符串加载配置
    pub fn load_from_path(path: &str) -> Result<Self> {
        Self::load_from_file(Path::new(path))
    }

    /// 查找配置文件 (按优先级搜索)
    fn find_config_file() -> Option<PathBuf> {
        if let Ok(path) = env::var("VTEST_CONFIG") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
            tracing::warn!("VTEST_CONFIG 指定的配置文件不存在: {}", path.display());
        }

        let mut paths = vec![
            PathBuf::from("./vtest.toml"),
            PathBuf::from("./vtest.yaml"),
            PathBuf::from("./vtest.json"),
        ];

        if let Some(config_dir) = dirs::home_dir().map(|home| home.join(".config/vtest")) {
            paths.push(config_dir.join("vtest.toml"));
            paths.push(config_dir.join("vtest.yaml"));
        }

        #[cfg(target_os = "linux")]
        paths.push(PathBuf::from("/etc/vtest/vtest.toml"));

        paths.into_iter().find(|path| path.exists())
    }

    /// 用环境变量覆盖配置
    ///
    /// `lookup` 按名称取值，通常是 `std::env::var`。
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(retry) = lookup("VTEST_RETRY") {
            self.run.retry = retry.parse().context("无效的 VTEST_RETRY")?;
        }
        if let Some(concurrency) = lookup("VTEST_MAX_CONCURRENCY") {
            self.run.max_concurrency = concurrency
                .parse()
                .context("无效的 VTEST_MAX_CONCURRENCY")?;
        }
        if let Some(timeout) = lookup("VTEST_CASE_TIMEOUT") {
            self.run.case_timeout = Some(timeout.parse().context("无效的 VTEST_CASE_TIMEOUT")?);
        }
        if let Some(timeout) = lookup("VTEST_SUITE_TIMEOUT") {
            self.run.suite_timeout = Some(timeout.parse().context("无效的 VTEST_SUITE_TIMEOUT")?);
        }
        if let Some(keep) = lookup("VTEST_KEEP_ENVIRONMENT") {
            self.run.keep_environment = keep
                .parse()
                .context("无效的 VTEST_KEEP_ENVIRONMENT")?;
        }
        if let Some(level) = lookup("VTEST_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(dir) = lookup("VTEST_LOG_DIR") {
            self.logging.log_dir = Some(PathBuf::from(dir));
        }

        Ok(())
    }

    /// 验证配置
    pub fn validate(&self) -> Result<()> {
        if self.run.max_concurrency == 0 {
            anyhow::bail!("max_concurrency 至少为 1");
        }
        if self.provision.poll_interval_ms == 0 {
            anyhow::bail!("poll_interval_ms 必须大于 0");
        }

        tracing_subscriber::EnvFilter::try_new(&self.logging.level)
            .with_context(|| format!("无效的日志级别: {}", self.logging.level))?;

        for selector in &self.selection {
            selector.validate()?;
        }

        let mut names = HashSet::new();
        for spec in &self.environments {
            if spec.name.is_empty() {
                anyhow::bail!("环境名称不能为空");
            }
            if !names.insert(spec.name.as_str()) {
                anyhow::bail!("环境名称重复: {}", spec.name);
            }
        }

        Ok(())
    }

    /// 保存配置到文件
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("创建目录失败: {}", parent.display()))?;
        }

        let content = match format_of(path) {
            Some("toml") => toml::to_string_pretty(self).context("序列化为 TOML 失败")?,
            Some("yaml") => serde_yaml::to_string(self).context("序列化为 YAML 失败")?,
            Some("json") => serde_json::to_string_pretty(self).context("序列化为 JSON 失败")?,
            _ => anyhow::bail!("不支持的配置文件格式: {}", path.display()),
        };

        fs::write(path, content)
            .with_context(|| format!("写入配置文件失败: {}", path.display()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use vtest_environment::NodeSpec;

    fn temp_path(ext: &str) -> PathBuf {
        env::temp_dir()
            .join(format!("vtest-config-{}", uuid::Uuid::new_v4()))
            .join(format!("vtest.{}", ext))
    }

    #[test]
    fn test_default_config() {
        let config = RunConfig::default();
        assert_eq!(config.run.retry, 0);
        assert_eq!(config.run.max_concurrency, 1);
        assert!(config.run.case_timeout().is_none());
        assert!(!config.run.generate_environments);
        assert_eq!(config.logging.level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_toml() {
        let content = r#"
            [run]
            retry = 2
            max_concurrency = 4
            case_timeout = 600

            [provision]
            deploy_timeout = 60

            [[selection]]
            area = "network"

            [[selection]]
            mode = "exclude"
            name = "*sriov*"

            [[environments]]
            name = "lab-1"

            [[environments.nodes]]
            features = ["SerialConsole"]
            core_count = 8
        "#;
        let config: RunConfig = toml::from_str(content).unwrap();

        assert_eq!(config.run.retry, 2);
        assert_eq!(config.run.case_timeout(), Some(Duration::from_secs(600)));
        assert_eq!(config.provision.deploy_timeout, 60);
        assert_eq!(config.provision.poll_interval_ms, 1000);
        assert_eq!(config.selection.len(), 2);
        assert_eq!(config.selection[1].mode, crate::SelectMode::Exclude);
        assert_eq!(config.environments[0].nodes[0].core_count, 8);
        assert_eq!(config.environments[0].nodes[0].nic_count, 1);
    }

    #[test]
    fn test_overrides() {
        let vars: HashMap<&str, &str> = [
            ("VTEST_RETRY", "3"),
            ("VTEST_CASE_TIMEOUT", "30"),
            ("VTEST_LOG_LEVEL", "debug"),
            ("VTEST_LOG_DIR", "/tmp/vtest-logs"),
        ]
        .into_iter()
        .collect();

        let mut config = RunConfig::default();
        config
            .apply_overrides(|key| vars.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.run.retry, 3);
        assert_eq!(config.run.case_timeout, Some(30));
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.log_dir, Some(PathBuf::from("/tmp/vtest-logs")));

        let result = config.apply_overrides(|key| {
            (key == "VTEST_MAX_CONCURRENCY").then(|| "many".to_string())
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_validation() {
        let mut config = RunConfig::default();
        config.run.max_concurrency = 0;
        assert!(config.validate().is_err());

        let mut config = RunConfig::default();
        config.selection.push(CaseSelector::regex("("));
        assert!(config.validate().is_err());

        let mut config = RunConfig::default();
        config.environments.push(EnvironmentSpec::new("lab"));
        config.environments.push(EnvironmentSpec::new("lab"));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_and_load() {
        let mut config = RunConfig::default();
        config.run.retry = 1;
        config.run.suite_timeout = Some(120);
        config
            .environments
            .push(EnvironmentSpec::new("lab-1").with_node(NodeSpec::default()));

        for ext in ["toml", "yaml", "json"] {
            let path = temp_path(ext);
            config.save_to_file(&path).unwrap();

            let loaded = RunConfig::load_from_file(&path).unwrap();
            assert_eq!(loaded.run, config.run);
            assert_eq!(loaded.environments, config.environments);

            let _ = fs::remove_dir_all(path.parent().unwrap());
        }
    }

    #[test]
    fn test_unsupported_format() {
        let path = temp_path("ini");
        assert!(RunConfig::default().save_to_file(&path).is_err());
        assert!(RunConfig::load_from_file(&path).is_err());
        let _ = fs::remove_dir_all(path.parent().unwrap());
    }
}
