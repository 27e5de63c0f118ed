//! vtest 演示程序
//!
//! 在本机环境上运行示例套件：按需求匹配 (或生成) 环境，执行用例生命周期并输出报告。

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use vtest_environment::{EnvironmentManager, LocalProvider};
use vtest_executor::{init_logging, CaseSelector, RunConfig, RunOptions, TestRunner};

mod output;
mod suites;

use output::OutputFormat;

#[derive(Parser)]
#[command(name = "vtest")]
#[command(about = "vtest - 按需求匹配环境并执行测试套件", long_about = None)]
#[command(version)]
struct Cli {
    /// 配置文件路径 (缺省按搜索路径查找)
    #[arg(short, long)]
    config: Option<String>,

    /// 日志级别 (覆盖配置文件)
    #[arg(short, long)]
    log_level: Option<String>,

    /// 只执行名称匹配的用例 (通配符，可多次指定)
    #[arg(short, long)]
    select: Vec<String>,

    /// 排除名称匹配的用例 (通配符，可多次指定)
    #[arg(short = 'x', long)]
    exclude: Vec<String>,

    /// 本机节点声明的特性 (可多次指定)
    #[arg(long = "feature")]
    features: Vec<String>,

    /// 各阶段失败后的重试次数 (覆盖配置文件)
    #[arg(short, long)]
    retry: Option<u32>,

    /// 报告格式
    #[arg(short, long, value_enum, default_value = "text")]
    format: OutputFormat,

    /// 报告输出文件
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// 只列出被选中的用例
    #[arg(long)]
    list: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => RunConfig::load_from_path(path)?,
        None => RunConfig::load()?,
    };
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    if let Some(retry) = cli.retry {
        config.run.retry = retry;
    }
    config
        .selection
        .extend(cli.select.iter().map(|pattern| CaseSelector::name(pattern)));
    config
        .selection
        .extend(cli.exclude.iter().map(|pattern| CaseSelector::name(pattern).exclude()));
    config.validate()?;

    let registry = suites::registry()?;
    if cli.list {
        return output::print_cases(&registry, &config.selection);
    }

    let mut options = RunOptions::from_config(&config);
    let log_file = init_logging(&config.logging, &options.run_id)?;
    info!("vtest 启动, 运行 ID: {}", options.run_id);

    let provider = LocalProvider::new().with_features(cli.features.iter().map(String::as_str));
    let manager = Arc::new(EnvironmentManager::new(
        Arc::new(provider),
        config.provision.clone(),
    ));
    for spec in &config.environments {
        manager.add_predefined(spec.clone()).await?;
    }
    if config.environments.is_empty() {
        info!("未配置预定义环境，按用例需求生成本机环境");
        options = options.generate_environments(true);
    }

    let runner = TestRunner::new(manager).with_options(options);
    let cancel = runner.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("收到中断信号，停止运行");
            cancel.cancel();
        }
    });

    let report = runner.run(&registry).await?;
    output::write_report(&report, cli.format, cli.output.as_deref())?;
    if let Some(path) = log_file {
        info!("完整日志: {}", path.display());
    }

    if !report.all_passed() {
        std::process::exit(1);
    }
    Ok(())
}
