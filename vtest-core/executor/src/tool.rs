//! 工具接口
//!
//! 用例通过工具在节点上执行命令。节点只在一次调用期间借给工具。

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use thiserror::Error;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;
use vtest_environment::Node;

/// 工具错误
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("工具未安装: {0}")]
    NotInstalled(String),

    #[error("命令执行失败: {0}")]
    ExecutionError(String),

    #[error("命令执行超时: {0}")]
    TimeoutError(String),

    #[error("节点不可达: {0}")]
    Unreachable(String),
}

/// 命令输出
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandOutput {
    /// 标准输出
    pub stdout: String,
    /// 标准错误
    pub stderr: String,
    /// 退出码 (被信号终止时没有)
    pub exit_code: Option<i32>,
}

impl CommandOutput {
    pub fn is_success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// 获取合并的输出（stdout + stderr）
    pub fn combined_output(&self) -> String {
        if self.stderr.is_empty() {
            self.stdout.clone()
        } else if self.stdout.is_empty() {
            self.stderr.clone()
        } else {
            format!("{}\n{}", self.stdout, self.stderr)
        }
    }
}

/// 命令选项
#[derive(Debug, Clone, Default)]
pub struct CommandOptions {
    pub timeout: Option<Duration>,
    pub envs: Vec<(String, String)>,
    pub cwd: Option<PathBuf>,
}

impl CommandOptions {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_env(mut self, key: &str, value: &str) -> Self {
        self.envs.push((key.to_string(), value.to_string()));
        self
    }

    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }
}

/// 在节点上执行命令的工具
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;

    /// 执行命令；非零退出码不算错误
    async fn run(
        &self,
        node: &Node,
        command: &str,
        options: &CommandOptions,
    ) -> Result<CommandOutput, ToolError>;

    /// 执行命令并要求退出码为 0
    async fn run_checked(
        &self,
        node: &Node,
        command: &str,
        options: &CommandOptions,
    ) -> Result<CommandOutput, ToolError> {
        let output = self.run(node, command, options).await?;
        if !output.is_success() {
            return Err(ToolError::ExecutionError(format!(
                "{} 在 {} 上退出码 {:?}: {}",
                command,
                node.name,
                output.exit_code,
                if output.stderr.is_empty() {
                    &output.stdout
                } else {
                    &output.stderr
                }
            )));
        }
        Ok(output)
    }
}

/// 在控制机本机执行命令的工具，只接受本机节点
pub struct LocalShell {
    shell: String,
}

impl LocalShell {
    pub fn new() -> Self {
        Self {
            shell: "sh".to_string(),
        }
    }

    pub fn with_shell(mut self, shell: &str) -> Self {
        self.shell = shell.to_string();
        self
    }

    fn is_local(node: &Node) -> bool {
        match &node.address {
            None => true,
            Some(address) => matches!(address.host.as_str(), "localhost" | "127.0.0.1" | "::1"),
        }
    }
}

impl Default for LocalShell {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Tool for LocalShell {
    fn name(&self) -> &str {
        &self.shell
    }

    async fn run(
        &self,
        node: &Node,
        command: &str,
        options: &CommandOptions,
    ) -> Result<CommandOutput, ToolError> {
        if !Self::is_local(node) {
            return Err(ToolError::Unreachable(format!(
                "{} 不是本机节点",
                node.name
            )));
        }

        debug!("执行命令: {} (节点 {})", command, node.name);

        let mut cmd = Command::new(&self.shell);
        cmd.arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        for (key, value) in &options.envs {
            cmd.env(key, value);
        }
        if let Some(cwd) = &options.cwd {
            cmd.current_dir(cwd);
        }

        let child = cmd.spawn().map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ToolError::NotInstalled(self.shell.clone()),
            _ => ToolError::ExecutionError(format!("启动 {} 失败: {}", self.shell, e)),
        })?;

        let wait = child.wait_with_output();
        let output = match options.timeout {
            Some(limit) => timeout(limit, wait)
                .await
                .map_err(|_| ToolError::TimeoutError(command.to_string()))?,
            None => wait.await,
        }
        .map_err(|e| ToolError::ExecutionError(format!("等待进程失败: {}", e)))?;

        let result = CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).trim().to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            exit_code: output.status.code(),
        };

        debug!(
            "命令执行完成, 退出码: {:?}, stdout 长度: {}, stderr 长度: {}",
            result.exit_code,
            result.stdout.len(),
            result.stderr.len()
        );

        Ok(result)
    }
}
