//! 测试套件接口与执行上下文

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use vtest_environment::{Environment, Node};

use crate::{CaseError, CaseMetadata, CaseResult};

/// 测试套件
///
/// 每次在一个环境上运行套件生命周期时，执行器都会通过注册时的工厂创建一个新实例，
/// 所以实例字段可以在 `before_suite`、各用例与 `after_suite` 之间传递状态。
///
/// 用例主体通过 [`TestSuite::run_case`] 按名称分派。
#[async_trait]
pub trait TestSuite: Send + Sync {
    /// 套件准备，失败时该环境上的所有用例都失败
    async fn before_suite(&mut self, _ctx: &mut SuiteContext<'_>) -> CaseResult<()> {
        Ok(())
    }

    /// 套件清理，只要套件准备执行过就会执行
    async fn after_suite(&mut self, _ctx: &mut SuiteContext<'_>) -> CaseResult<()> {
        Ok(())
    }

    /// 用例准备
    async fn before_case(&mut self, _case: &str, _ctx: &mut CaseContext<'_>) -> CaseResult<()> {
        Ok(())
    }

    /// 用例清理，只要用例准备执行过就会执行
    async fn after_case(&mut self, _case: &str, _ctx: &mut CaseContext<'_>) -> CaseResult<()> {
        Ok(())
    }

    /// 用例主体
    async fn run_case(&mut self, case: &str, ctx: &mut CaseContext<'_>) -> CaseResult<()>;
}

/// 套件级上下文
pub struct SuiteContext<'a> {
    suite: &'a str,
    environment: &'a Environment,
    cancellation: CancellationToken,
}

impl<'a> SuiteContext<'a> {
    pub fn new(suite: &'a str, environment: &'a Environment, cancellation: CancellationToken) -> Self {
        Self {
            suite,
            environment,
            cancellation,
        }
    }

    pub fn suite_name(&self) -> &str {
        self.suite
    }

    pub fn environment(&self) -> &Environment {
        self.environment
    }

    /// 默认节点，环境没有节点时返回环境不可用
    pub fn node(&self) -> CaseResult<&Node> {
        default_node(self.environment)
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }
}

/// 用例级上下文
///
/// 用例主体可以在这里记录警告而不是失败，结果为 `PassedWithWarning`。
pub struct CaseContext<'a> {
    suite: &'a str,
    case: &'a CaseMetadata,
    environment: &'a Environment,
    cancellation: CancellationToken,
    warnings: Vec<String>,
}

impl<'a> CaseContext<'a> {
    pub fn new(
        suite: &'a str,
        case: &'a CaseMetadata,
        environment: &'a Environment,
        cancellation: CancellationToken,
    ) -> Self {
        Self {
            suite,
            case,
            environment,
            cancellation,
            warnings: Vec::new(),
        }
    }

    pub fn suite_name(&self) -> &str {
        self.suite
    }

    pub fn case(&self) -> &CaseMetadata {
        self.case
    }

    pub fn environment(&self) -> &Environment {
        self.environment
    }

    pub fn node(&self) -> CaseResult<&Node> {
        default_node(self.environment)
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancellation
    }

    /// 记录一条可恢复问题
    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// 构造一个主动跳过的错误
    pub fn skip(&self, reason: impl Into<String>) -> CaseError {
        CaseError::Skipped(reason.into())
    }
}

fn default_node(environment: &Environment) -> CaseResult<&Node> {
    environment.default_node().ok_or_else(|| {
        CaseError::EnvironmentUnavailable(format!("环境 {} 没有节点", environment.name))
    })
}
