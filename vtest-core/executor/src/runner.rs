//! 用例执行器
//!
//! 执行流程:
//! 1. 按选择器从注册表中选出用例
//! 2. 每个套件一个任务，受 `max_concurrency` 限制并发
//! 3. 套件内按优先级排序，为第一个待执行用例绑定环境，
//!    同一环境能满足的其他用例一起在该环境上执行一次套件生命周期
//! 4. 结束后回收自动生成的环境
//!
//! 生命周期: 套件准备 → (用例准备 → 用例主体 → 用例清理)* → 套件清理。
//! 准备执行过，清理就一定执行；每个用例只产生一个结果。
//! 套件钩子中的 panic 按普通失败处理。

use chrono::Utc;
use futures_util::FutureExt;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Semaphore};
use tokio::time::{timeout, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use vtest_common::{EnvironmentStatus, Outcome, TestStatus};
use vtest_environment::{EnvironmentLease, EnvironmentManager};

use crate::{
    classify, select_cases, CaseContext, CaseError, CaseEvent, CaseMetadata, CaseReport,
    CaseResult, CaseSelector, NoMatch, RegisteredSuite, Requirement, RequirementMatcher, Result,
    RunConfig, RunReport, SelectedSuite, SuiteContext, SuiteRegistry, SuiteReport, TestSuite,
};

/// 运行被取消时的说明
const CANCELLED_MESSAGE: &str = "运行已取消";

/// 失败被忽略的用例的说明标签
const IGNORED_TAG: &str = "[ignored]";

/// 绑定环境时最多重新挑选的次数
const BIND_ATTEMPTS: usize = 3;

/// 失败后按重试次数再次调用，`$attempts` 累计调用次数
macro_rules! retry_call {
    ($retry:expr, $attempts:ident, $what:expr, $call:expr) => {{
        loop {
            $attempts += 1;
            match guarded($call).await {
                Ok(value) => break Ok(value),
                Err(e) if e.is_retryable() && $attempts <= $retry => {
                    debug!("{} 第 {} 次失败，重试: {}", $what, $attempts, e);
                }
                Err(e) => break Err(e),
            }
        }
    }};
}

/// 计划中的一次用例执行
#[derive(Debug, Clone)]
struct Planned {
    case: CaseMetadata,
    requirement: Requirement,

    /// 第几次执行，从 1 开始
    iteration: u32,
}

/// 执行套件钩子，钩子中的 panic 转为失败
async fn guarded<T>(call: impl Future<Output = CaseResult<T>>) -> CaseResult<T> {
    match AssertUnwindSafe(call).catch_unwind().await {
        Ok(result) => result,
        Err(payload) => Err(CaseError::Other(anyhow::anyhow!(
            "套件代码 panic: {}",
            panic_message(payload.as_ref())
        ))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "未知原因".to_string()
    }
}

/// 套件生命周期状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Registered,
    EnvironmentBinding,
    SuiteSetup,
    CaseSetup,
    Running,
    CaseCleanup,
    SuiteCleanup,
    Done,
}

impl LifecycleState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Registered => "已注册",
            Self::EnvironmentBinding => "绑定环境",
            Self::SuiteSetup => "套件准备",
            Self::CaseSetup => "用例准备",
            Self::Running => "执行用例",
            Self::CaseCleanup => "用例清理",
            Self::SuiteCleanup => "套件清理",
            Self::Done => "完成",
        }
    }
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 运行选项
#[derive(Debug, Clone)]
pub struct RunOptions {
    /// 运行 ID
    pub run_id: String,

    /// 各生命周期阶段失败后的重试次数
    pub retry: u32,

    /// 同时执行的套件数
    pub max_concurrency: usize,

    /// 用例超时 (用例自身声明的超时优先)
    pub case_timeout: Option<Duration>,

    /// 套件超时，超时后剩余用例跳过
    pub suite_timeout: Option<Duration>,

    /// 运行结束后保留自动生成的环境
    pub keep_environment: bool,

    /// 没有合适的环境时按需求生成
    pub generate_environments: bool,

    /// 用例选择器
    pub selectors: Vec<CaseSelector>,

    /// 套件和用例都没有声明需求时使用的需求
    pub default_requirement: Requirement,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            run_id: uuid::Uuid::new_v4().to_string(),
            retry: 0,
            max_concurrency: 1,
            case_timeout: None,
            suite_timeout: None,
            keep_environment: false,
            generate_environments: false,
            selectors: Vec::new(),
            default_requirement: Requirement::new(),
        }
    }
}

impl RunOptions {
    /// 从运行配置创建，生成新的运行 ID
    pub fn from_config(config: &RunConfig) -> Self {
        Self {
            retry: config.run.retry,
            max_concurrency: config.run.max_concurrency.max(1),
            case_timeout: config.run.case_timeout(),
            suite_timeout: config.run.suite_timeout(),
            keep_environment: config.run.keep_environment,
            generate_environments: config.run.generate_environments,
            selectors: config.selection.clone(),
            ..Default::default()
        }
    }

    pub fn with_run_id(mut self, run_id: &str) -> Self {
        self.run_id = run_id.to_string();
        self
    }

    pub fn with_retry(mut self, retry: u32) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    pub fn with_case_timeout(mut self, timeout: Duration) -> Self {
        self.case_timeout = Some(timeout);
        self
    }

    pub fn with_suite_timeout(mut self, timeout: Duration) -> Self {
        self.suite_timeout = Some(timeout);
        self
    }

    pub fn keep_environment(mut self, keep: bool) -> Self {
        self.keep_environment = keep;
        self
    }

    pub fn generate_environments(mut self, generate: bool) -> Self {
        self.generate_environments = generate;
        self
    }

    pub fn with_selector(mut self, selector: CaseSelector) -> Self {
        self.selectors.push(selector);
        self
    }

    pub fn with_default_requirement(mut self, requirement: Requirement) -> Self {
        self.default_requirement = requirement;
        self
    }
}

/// 用例执行器
#[derive(Clone)]
pub struct TestRunner {
    manager: Arc<EnvironmentManager>,
    options: Arc<RunOptions>,
    events: Option<mpsc::UnboundedSender<CaseEvent>>,
    cancel: CancellationToken,

    /// 已生成环境的计数，用于命名
    generated: Arc<AtomicUsize>,
}

impl TestRunner {
    pub fn new(manager: Arc<EnvironmentManager>) -> Self {
        Self {
            manager,
            options: Arc::new(RunOptions::default()),
            events: None,
            cancel: CancellationToken::new(),
            generated: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_options(mut self, options: RunOptions) -> Self {
        self.options = Arc::new(options);
        self
    }

    /// 订阅用例状态变化事件
    pub fn with_events(mut self, events: mpsc::UnboundedSender<CaseEvent>) -> Self {
        self.events = Some(events);
        self
    }

    /// 使用外部的取消令牌
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// 取消令牌，取消后未开始的用例跳过，正在执行的用例以取消失败结束
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn options(&self) -> &RunOptions {
        &self.options
    }

    /// 执行注册表中被选中的用例
    pub async fn run(&self, registry: &SuiteRegistry) -> Result<RunReport> {
        let plan = select_cases(registry, &self.options.selectors)?;
        let mut report = RunReport::new(&self.options.run_id, self.manager.platform_type());

        info!(
            "运行 {} 开始: {} 个套件, {} 个用例, 平台 {}",
            self.options.run_id,
            plan.len(),
            plan.iter().map(|s| s.cases.len()).sum::<usize>(),
            self.manager.platform_type()
        );

        let semaphore = Arc::new(Semaphore::new(self.options.max_concurrency.max(1)));
        let mut handles = Vec::with_capacity(plan.len());
        for selected in plan {
            let runner = self.clone();
            let semaphore = Arc::clone(&semaphore);
            let planned = selected.clone();
            let handle = tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await;
                runner.run_suite(selected).await
            });
            handles.push((planned, handle));
        }

        // 报告按计划顺序汇总，与完成顺序无关
        for (planned, handle) in handles {
            match handle.await {
                Ok(suites) => {
                    for suite in suites {
                        report.add_suite(suite);
                    }
                }
                Err(e) => {
                    error!("套件 {} 的任务异常退出: {}", planned.suite.name(), e);
                    report.add_suite(crashed_suite(&planned, &e.to_string()));
                }
            }
        }

        if self.options.keep_environment {
            info!("保留自动生成的环境");
        } else {
            let count = self.manager.teardown_generated().await;
            if count > 0 {
                info!("已回收 {} 个自动生成的环境", count);
            }
        }

        report.finish();
        let summary = &report.summary;
        info!(
            "运行 {} 结束: 共 {}, 通过 {}, 警告 {}, 失败 {}, 跳过 {}, 耗时 {} ms",
            report.run_id,
            summary.total,
            summary.passed,
            summary.passed_with_warning,
            summary.failed,
            summary.skipped,
            report.duration_ms
        );

        Ok(report)
    }

    /// 执行一个套件中被选中的用例，每次环境绑定产生一份套件报告
    async fn run_suite(&self, selected: SelectedSuite) -> Vec<SuiteReport> {
        let registered = selected.suite;
        let name = registered.name().to_string();
        let platform = self.manager.platform_type().to_string();
        let deadline = self.options.suite_timeout.map(|limit| Instant::now() + limit);

        self.transition(&name, None, LifecycleState::Registered);

        let mut reports = Vec::new();
        // 没有绑定到环境的用例
        let mut unbound = SuiteReport::new(&name, registered.metadata(), None);

        let mut pending: Vec<Planned> = selected
            .cases
            .into_iter()
            .flat_map(|case| {
                let requirement =
                    registered.effective_requirement(&case, &self.options.default_requirement);
                (1..=case.times.max(1)).map(move |iteration| Planned {
                    case: case.clone(),
                    requirement: requirement.clone(),
                    iteration,
                })
            })
            .collect();
        // 稳定排序，同优先级保持注册顺序
        pending.sort_by_key(|planned| planned.case.priority);

        let (supported, unsupported): (Vec<_>, Vec<_>) = pending
            .into_iter()
            .partition(|planned| planned.requirement.supports_platform(&platform));
        for planned in unsupported {
            let reason = format!(
                "平台 {} 不在支持列表 [{}] 中",
                platform,
                planned.requirement.platforms.clone().unwrap_or_default().join(", ")
            );
            self.finish_unrun(&mut unbound, &planned, Outcome::skipped(reason));
        }
        let mut pending = supported;

        while !pending.is_empty() {
            if let Some(outcome) = self.stop_reason(&name, deadline) {
                for planned in pending.drain(..) {
                    self.finish_unrun(&mut unbound, &planned, outcome.clone());
                }
                break;
            }

            let requirement = pending[0].requirement.clone();
            let fresh = pending[0].case.use_new_environment;

            self.transition(&name, None, LifecycleState::EnvironmentBinding);
            let bound = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => continue,
                bound = self.bind(&requirement, fresh) => bound,
            };

            match bound {
                Err(reason) => {
                    info!("套件 {} 无法绑定环境 ({}): {}", name, requirement, reason);
                    let outcome = classify(Some(&CaseError::EnvironmentUnavailable(reason)), &[]);
                    let (skipped, rest): (Vec<_>, Vec<_>) =
                        pending.into_iter().partition(|planned| {
                            planned.requirement == requirement
                                && planned.case.use_new_environment == fresh
                        });
                    pending = rest;
                    for planned in skipped {
                        self.finish_unrun(&mut unbound, &planned, outcome.clone());
                    }
                }
                Ok(mut lease) => {
                    let mut group = Vec::new();
                    let mut rest = Vec::new();
                    for (index, planned) in pending.into_iter().enumerate() {
                        let joins = index == 0
                            || (!fresh
                                && !planned.case.use_new_environment
                                && RequirementMatcher::new(&planned.requirement)
                                    .evaluate(&lease)
                                    .is_empty());
                        if joins {
                            group.push(planned);
                        } else {
                            rest.push(planned);
                        }
                    }
                    pending = rest;

                    reports.push(
                        self.run_lifecycle(&registered, &mut lease, group, deadline)
                            .await,
                    );
                }
            }
        }

        if !unbound.cases.is_empty() {
            reports.push(unbound);
        }
        reports
    }

    /// 为需求绑定一个环境并推进到需要的就绪状态
    ///
    /// 优先选择已满足状态的环境，其次选择可以继续部署/连接的环境，
    /// 都没有时按需生成。失败时返回不可用的原因。
    async fn bind(
        &self,
        requirement: &Requirement,
        fresh: bool,
    ) -> std::result::Result<EnvironmentLease, String> {
        let pool = self.manager.pool();
        let strict = RequirementMatcher::new(requirement).require_new(fresh);
        let relaxed = strict.relax_status();
        let mut last_error = None;

        for _ in 0..BIND_ATTEMPTS {
            let candidates = pool.candidates().await;
            let chosen = match strict.find(&candidates) {
                Ok(candidate) => candidate.environment.name.clone(),
                Err(no_match) => match relaxed.find(&candidates) {
                    Ok(candidate) => candidate.environment.name.clone(),
                    Err(_) if self.options.generate_environments => {
                        let index = self.generated.fetch_add(1, Ordering::SeqCst);
                        let name = format!("generated-{}", index);
                        info!("按需求 {} 生成环境 {}", requirement, name);
                        self.manager
                            .add_generated(requirement.to_spec(&name))
                            .await
                            .map_err(|e| e.to_string())?;
                        name
                    }
                    Err(_) => return Err(no_match.to_string()),
                },
            };

            let mut lease = pool.acquire(&chosen).await.map_err(|e| e.to_string())?;

            // 等待期间环境可能已被其他用例改变
            let unmet = relaxed.evaluate(&lease);
            if !unmet.is_empty() {
                let no_match = NoMatch {
                    closest: Some(chosen),
                    unmet,
                };
                info!("环境在等待期间发生变化，重新挑选: {}", no_match);
                last_error = Some(no_match.to_string());
                continue;
            }

            if let Err(e) = self
                .manager
                .ensure_ready(&mut lease, requirement.min_status)
                .await
            {
                info!("环境 {} 准备失败: {}", chosen, e);
                if !lease.is_predefined {
                    lease.set_status(EnvironmentStatus::Unusable);
                    lease.publish();
                }
                return Err(format!("环境 {} 准备失败: {}", chosen, e));
            }

            let unmet = strict.evaluate(&lease);
            if unmet.is_empty() {
                info!("绑定环境 {} ({})", chosen, requirement);
                return Ok(lease);
            }
            return Err(NoMatch {
                closest: Some(chosen),
                unmet,
            }
            .to_string());
        }

        Err(last_error.unwrap_or_else(|| "没有可用的环境".to_string()))
    }

    /// 在已绑定的环境上执行一次套件生命周期
    async fn run_lifecycle(
        &self,
        registered: &RegisteredSuite,
        lease: &mut EnvironmentLease,
        cases: Vec<Planned>,
        deadline: Option<Instant>,
    ) -> SuiteReport {
        let name = registered.name();
        let mut report = SuiteReport::new(name, registered.metadata(), Some(lease.name.as_str()));

        // 等待绑定期间可能已取消或超时，此时不再准备套件
        if let Some(outcome) = self.stop_reason(name, deadline) {
            for planned in &cases {
                self.finish_unrun(&mut report, planned, outcome.clone());
            }
            return report;
        }

        lease.is_new = false;
        lease.publish();

        let lease: &EnvironmentLease = lease;
        let environment = &**lease;
        let env_name = environment.name.as_str();
        let retry = self.options.retry;
        let started = Instant::now();
        report.environment_info = environment.information();

        let mut suite = registered.create();

        self.transition(name, Some(env_name), LifecycleState::SuiteSetup);
        let mut ctx = SuiteContext::new(name, environment, self.cancel.clone());
        let mut setup_attempts = 0u32;
        let setup = self
            .cancellable(async {
                retry_call!(
                    retry,
                    setup_attempts,
                    format!("套件 {} 准备", name),
                    suite.before_suite(&mut ctx)
                )
            })
            .await;

        match setup {
            Err(e) => {
                let outcome = if e.is_skip() {
                    info!("套件 {} 在环境 {} 上跳过: {}", name, env_name, e);
                    classify(Some(&e), &[])
                } else if matches!(e, CaseError::Cancelled(_)) {
                    Outcome::skipped(CANCELLED_MESSAGE)
                } else {
                    error!("套件 {} 在环境 {} 上准备失败: {}", name, env_name, e);
                    report.setup_error = Some(e.to_string());
                    let failure = CaseError::Setup(format!("套件 {} 准备失败: {}", name, e));
                    classify(Some(&failure), &[])
                };
                for planned in &cases {
                    self.finish_unrun(&mut report, planned, outcome.clone());
                }
            }
            Ok(()) => {
                for planned in &cases {
                    if let Some(outcome) = self.stop_reason(name, deadline) {
                        self.finish_unrun(&mut report, planned, outcome);
                        continue;
                    }

                    let case_report = self
                        .run_case(name, suite.as_mut(), planned, lease)
                        .await;
                    report.add_case(case_report);
                }
            }
        }

        self.transition(name, Some(env_name), LifecycleState::SuiteCleanup);
        let mut cleanup_attempts = 0u32;
        let cleanup = retry_call!(
            retry,
            cleanup_attempts,
            format!("套件 {} 清理", name),
            suite.after_suite(&mut ctx)
        );
        if let Err(e) = cleanup {
            error!("套件 {} 在环境 {} 上清理失败: {}", name, env_name, e);
            report.cleanup_error = Some(e.to_string());
        }

        report.duration_ms = started.elapsed().as_millis() as u64;
        self.transition(name, Some(env_name), LifecycleState::Done);
        report
    }

    /// 执行单个用例: 准备、主体、清理，返回唯一的结果
    async fn run_case(
        &self,
        suite_name: &str,
        suite: &mut dyn TestSuite,
        planned: &Planned,
        lease: &EnvironmentLease,
    ) -> CaseReport {
        let case = &planned.case;
        let environment = &**lease;
        let env_name = environment.name.as_str();
        let retry = case.retry.unwrap_or(self.options.retry);
        let started_at = Utc::now();
        let started = Instant::now();

        self.emit(suite_name, &case.name, TestStatus::Running, None, Some(env_name));

        let mut ctx = CaseContext::new(suite_name, case, environment, self.cancel.clone());
        let what = if case.times > 1 {
            format!("用例 {}.{} (第 {}/{} 次)", suite_name, case.name, planned.iteration, case.times)
        } else {
            format!("用例 {}.{}", suite_name, case.name)
        };

        self.transition(suite_name, Some(env_name), LifecycleState::CaseSetup);
        let mut setup_attempts = 0u32;
        let setup = self
            .cancellable(async {
                retry_call!(
                    retry,
                    setup_attempts,
                    format!("{} 准备", what),
                    suite.before_case(&case.name, &mut ctx)
                )
            })
            .await;

        let mut attempts = 0u32;
        let failure = match setup {
            Err(e) if e.is_skip() || matches!(e, CaseError::Cancelled(_)) => Some(e),
            Err(e) => Some(CaseError::Setup(e.to_string())),
            Ok(()) => {
                self.transition(suite_name, Some(env_name), LifecycleState::Running);
                let body = self.cancellable(async {
                    retry_call!(
                        retry,
                        attempts,
                        what.as_str(),
                        suite.run_case(&case.name, &mut ctx)
                    )
                });
                let result = match case.timeout.or(self.options.case_timeout) {
                    Some(limit) => timeout(limit, body)
                        .await
                        .unwrap_or_else(|_| Err(CaseError::Timeout(limit))),
                    None => body.await,
                };
                debug!("{} 主体执行 {} 次", what, attempts);
                result.err()
            }
        };

        self.transition(suite_name, Some(env_name), LifecycleState::CaseCleanup);
        let mut cleanup_attempts = 0u32;
        let cleanup = retry_call!(
            retry,
            cleanup_attempts,
            format!("{} 清理", what),
            suite.after_case(&case.name, &mut ctx)
        );
        let cleanup_error = match cleanup {
            Ok(()) => None,
            Err(e) => {
                error!("{} 清理失败: {}", what, e);
                Some(e.to_string())
            }
        };

        let mut outcome = classify(failure.as_ref(), ctx.warnings());
        if case.ignore_failure && outcome.is_failed() {
            let message = outcome.message().unwrap_or_default().to_string();
            outcome = Outcome::warning(format!("{} {}", IGNORED_TAG, message));
        }
        match &outcome {
            Outcome::Failed { message, .. } => error!("{} 失败: {}", what, message),
            Outcome::Skipped { message } => info!("{} 跳过: {}", what, message),
            Outcome::PassedWithWarning { message } => info!("{} 通过但有警告: {}", what, message),
            Outcome::Passed => info!("{} 通过", what),
        }

        self.emit(
            suite_name,
            &case.name,
            outcome.status(),
            Some(outcome.clone()),
            Some(env_name),
        );

        CaseReport {
            suite: suite_name.to_string(),
            name: case.name.clone(),
            description: case.description.clone(),
            priority: case.priority,
            iteration: planned.iteration,
            outcome,
            environment: Some(env_name.to_string()),
            cleanup_error,
            attempts,
            started_at: Some(started_at),
            duration_ms: started.elapsed().as_millis() as u64,
        }
    }

    /// 未执行就确定结果的用例
    fn finish_unrun(&self, report: &mut SuiteReport, planned: &Planned, outcome: Outcome) {
        let case = &planned.case;
        match &outcome {
            Outcome::Failed { message, .. } => {
                error!("用例 {}.{} 失败: {}", report.name, case.name, message)
            }
            other => info!(
                "用例 {}.{} 未执行: {}",
                report.name,
                case.name,
                other.message().unwrap_or_default()
            ),
        }

        self.emit(
            &report.name,
            &case.name,
            outcome.status(),
            Some(outcome.clone()),
            report.environment.as_deref(),
        );

        let mut case_report =
            CaseReport::not_run(&report.name, case, outcome).with_iteration(planned.iteration);
        case_report.environment = report.environment.clone();
        report.add_case(case_report);
    }

    /// 运行已取消或套件已超时时，尚未开始的用例的结果
    fn stop_reason(&self, suite: &str, deadline: Option<Instant>) -> Option<Outcome> {
        if self.cancel.is_cancelled() {
            return Some(Outcome::skipped(CANCELLED_MESSAGE));
        }
        if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            return Some(Outcome::skipped(suite_expired(suite, self.options.suite_timeout)));
        }
        None
    }

    /// 与取消令牌竞争，取消时返回取消失败
    async fn cancellable<T>(&self, call: impl Future<Output = CaseResult<T>>) -> CaseResult<T> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(CaseError::Cancelled(CANCELLED_MESSAGE.to_string())),
            result = call => result,
        }
    }

    fn emit(
        &self,
        suite: &str,
        case: &str,
        status: TestStatus,
        outcome: Option<Outcome>,
        environment: Option<&str>,
    ) {
        if let Some(events) = &self.events {
            // 接收端关闭后不再关心事件
            let _ = events.send(CaseEvent {
                run_id: self.options.run_id.clone(),
                suite: suite.to_string(),
                case: case.to_string(),
                status,
                outcome,
                environment: environment.map(str::to_string),
                timestamp: Utc::now(),
            });
        }
    }

    fn transition(&self, suite: &str, environment: Option<&str>, state: LifecycleState) {
        match environment {
            Some(environment) => info!("套件 {} @ {}: {}", suite, environment, state),
            None => info!("套件 {}: {}", suite, state),
        }
    }
}

fn suite_expired(suite: &str, limit: Option<Duration>) -> String {
    format!(
        "套件 {} 超过运行时限 {} 秒，剩余用例跳过",
        suite,
        limit.map(|l| l.as_secs()).unwrap_or_default()
    )
}

/// 执行器自身异常导致套件任务退出时，所有计划中的用例都记为失败
fn crashed_suite(planned: &SelectedSuite, reason: &str) -> SuiteReport {
    let name = planned.suite.name();
    let mut report = SuiteReport::new(name, planned.suite.metadata(), None);
    let failure = CaseError::Other(anyhow::anyhow!("套件任务异常退出: {}", reason));
    let outcome = classify(Some(&failure), &[]);
    for case in &planned.cases {
        report.add_case(CaseReport::not_run(name, case, outcome.clone()));
    }
    report
}
