//! 报告输出

use anyhow::{Context, Result};
use chrono::Local;
use clap::ValueEnum;
use colored::Colorize;
use std::fs;
use std::path::Path;
use vtest_common::Outcome;
use vtest_executor::{select_cases, CaseSelector, RunReport, SuiteRegistry};

/// 报告格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Yaml,
}

/// 列出被选中的用例
pub fn print_cases(registry: &SuiteRegistry, selectors: &[CaseSelector]) -> Result<()> {
    let selected = select_cases(registry, selectors)?;
    if selected.is_empty() {
        println!("{} 没有选中任何用例", "ℹ".yellow());
        return Ok(());
    }

    println!(
        "{:<32} {:<12} {:<12} {:<6} {}",
        "用例".bold(),
        "领域".bold(),
        "类别".bold(),
        "优先级".bold(),
        "说明".bold()
    );
    println!("{}", "-".repeat(90));

    for suite in &selected {
        let metadata = suite.suite.metadata();
        for case in &suite.cases {
            println!(
                "{:<32} {:<12} {:<12} {:<6} {}",
                format!("{}.{}", suite.suite.name(), case.name),
                metadata.area,
                metadata.category,
                case.priority,
                case.description
            );
        }
    }

    Ok(())
}

/// 按格式输出报告，指定文件时写入文件
pub fn write_report(report: &RunReport, format: OutputFormat, output: Option<&Path>) -> Result<()> {
    let content = match format {
        OutputFormat::Text => {
            print_summary(report);
            return match output {
                Some(path) => write_file(path, &report.to_json()?),
                None => Ok(()),
            };
        }
        OutputFormat::Json => report.to_json()?,
        OutputFormat::Yaml => report.to_yaml()?,
    };

    match output {
        Some(path) => write_file(path, &content),
        None => {
            println!("{}", content);
            Ok(())
        }
    }
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("创建目录失败: {}", path.display()))?;
    }
    fs::write(path, content).with_context(|| format!("写入报告失败: {}", path.display()))?;
    println!("{} 报告已写入 {}", "✓".green(), path.display());
    Ok(())
}

fn print_summary(report: &RunReport) {
    let started = report.started_at.with_timezone(&Local);
    println!(
        "\n运行 {} ({}, 平台 {})\n",
        report.run_id.cyan(),
        started.format("%Y-%m-%d %H:%M:%S"),
        report.platform
    );

    for suite in &report.suites {
        let environment = suite.environment.as_deref().unwrap_or("-");
        println!("{} @ {}", suite.name.bold(), environment);
        if let Some(error) = &suite.setup_error {
            println!("  {} 套件准备失败: {}", "✗".red(), error);
        }

        for case in &suite.cases {
            let (mark, status) = match &case.outcome {
                Outcome::Passed => ("✓".green(), "通过".green()),
                Outcome::PassedWithWarning { .. } => ("✓".yellow(), "警告".yellow()),
                Outcome::Failed { .. } => ("✗".red(), "失败".red()),
                Outcome::Skipped { .. } => ("-".dimmed(), "跳过".dimmed()),
            };
            println!(
                "  {} {:<28} {:<6} {:>6} ms",
                mark, case.name, status, case.duration_ms
            );
            if let Some(message) = case.message() {
                println!("      {}", message.dimmed());
            }
            if let Some(error) = &case.cleanup_error {
                println!("      {} 清理失败: {}", "!".yellow(), error);
            }
        }

        if let Some(error) = &suite.cleanup_error {
            println!("  {} 套件清理失败: {}", "!".yellow(), error);
        }
    }

    let summary = &report.summary;
    let verdict = if report.all_passed() {
        "通过".green().bold()
    } else {
        "失败".red().bold()
    };
    println!(
        "\n{}: 共 {}, 通过 {}, 警告 {}, 失败 {}, 跳过 {}, 耗时 {} ms",
        verdict,
        summary.total,
        summary.passed.to_string().green(),
        summary.passed_with_warning.to_string().yellow(),
        summary.failed.to_string().red(),
        summary.skipped,
        report.duration_ms
    );
}
