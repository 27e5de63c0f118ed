//! 示例测试套件

use async_trait::async_trait;
use vtest_environment::Node;
use vtest_executor::{
    assert_that, CaseContext, CaseError, CaseMetadata, CaseResult, CommandOptions, LocalShell,
    Requirement, RegistryBuilder, SuiteCategory, SuiteContext, SuiteMetadata, SuiteRegistry,
    TestSuite, Tool,
};

/// 注册所有示例套件
pub fn registry() -> vtest_executor::Result<SuiteRegistry> {
    Ok(RegistryBuilder::new()
        .suite::<HostBasics>(
            SuiteMetadata::new("host", SuiteCategory::Functional, "节点基础命令")
                .with_tag("smoke")
                .with_case(CaseMetadata::new("echo", "命令输出回显").with_priority(0))
                .with_case(CaseMetadata::new("write_file", "在工作目录中读写文件").with_priority(1))
                .with_case(CaseMetadata::new("kernel_release", "读取内核版本"))
                .with_case(
                    CaseMetadata::new("serial_console", "通过串口读取启动日志")
                        .with_priority(3)
                        .with_requirement(Requirement::new().with_feature("SerialConsole")),
                ),
        )?
        .suite::<CpuTopology>(
            SuiteMetadata::new("host", SuiteCategory::Performance, "CPU 拓扑")
                .with_case(CaseMetadata::new("core_count", "节点记录的核数不超过在线核数")),
        )?
        .build())
}

/// 节点基础命令
#[derive(Default)]
pub struct HostBasics {
    shell: LocalShell,
    workdir: Option<String>,
}

impl HostBasics {
    async fn echo(&self, node: &Node) -> CaseResult<()> {
        let output = self
            .shell
            .run_checked(node, "echo hello", &CommandOptions::default())
            .await?;
        assert_that(output.stdout).described_as("echo 输出").is_equal_to("hello")
    }

    async fn write_file(&self, node: &Node) -> CaseResult<()> {
        let workdir = self
            .workdir
            .as_deref()
            .ok_or_else(|| CaseError::Setup("工作目录未创建".to_string()))?;
        let options = CommandOptions::default().with_cwd(workdir);

        self.shell
            .run_checked(node, "printf 'vtest' > marker.txt", &options)
            .await?;
        let output = self.shell.run_checked(node, "cat marker.txt", &options).await?;
        assert_that(output.stdout).is_equal_to("vtest")
    }

    async fn kernel_release(&self, node: &Node, ctx: &mut CaseContext<'_>) -> CaseResult<()> {
        let output = self
            .shell
            .run_checked(node, "uname -r", &CommandOptions::default())
            .await?;
        assert_that(output.stdout.as_str())
            .described_as("内核版本")
            .satisfies("非空", |release| !release.is_empty())?;

        let machine = self
            .shell
            .run(node, "uname -m", &CommandOptions::default())
            .await?;
        if machine.stdout != "x86_64" && machine.stdout != "aarch64" {
            ctx.warn(format!("未验证过的架构: {}", machine.stdout));
        }
        Ok(())
    }

    async fn serial_console(&self, node: &Node) -> CaseResult<()> {
        let output = self
            .shell
            .run(node, "dmesg | head -n 1", &CommandOptions::default())
            .await?;
        assert_that(output.combined_output().as_str()).satisfies("有输出", |s| !s.is_empty())
    }
}

#[async_trait]
impl TestSuite for HostBasics {
    async fn before_suite(&mut self, ctx: &mut SuiteContext<'_>) -> CaseResult<()> {
        let node = ctx.node()?;
        let output = self
            .shell
            .run_checked(node, "mktemp -d", &CommandOptions::default())
            .await?;
        self.workdir = Some(output.stdout);
        Ok(())
    }

    async fn after_suite(&mut self, ctx: &mut SuiteContext<'_>) -> CaseResult<()> {
        if let Some(workdir) = self.workdir.take() {
            let node = ctx.node()?;
            self.shell
                .run_checked(node, &format!("rm -rf '{}'", workdir), &CommandOptions::default())
                .await?;
        }
        Ok(())
    }

    async fn run_case(&mut self, case: &str, ctx: &mut CaseContext<'_>) -> CaseResult<()> {
        let node = ctx.node()?.clone();
        match case {
            "echo" => self.echo(&node).await,
            "write_file" => self.write_file(&node).await,
            "kernel_release" => self.kernel_release(&node, ctx).await,
            "serial_console" => self.serial_console(&node).await,
            other => Err(ctx.skip(format!("未实现的用例: {}", other))),
        }
    }
}

/// CPU 拓扑
#[derive(Default)]
pub struct CpuTopology {
    shell: LocalShell,
}

#[async_trait]
impl TestSuite for CpuTopology {
    async fn run_case(&mut self, _case: &str, ctx: &mut CaseContext<'_>) -> CaseResult<()> {
        let node = ctx.node()?;
        let output = self
            .shell
            .run_checked(node, "nproc", &CommandOptions::default())
            .await?;
        let online: u32 = output
            .stdout
            .parse()
            .map_err(|e| CaseError::Tool(format!("无法解析 nproc 输出 {:?}: {}", output.stdout, e)))?;

        // 容器内可用核数受配额限制，可能少于在线核数
        assert_that(online)
            .described_as("在线 CPU 数")
            .satisfies("不少于节点记录的核数", |n| *n >= node.core_count)
    }
}
