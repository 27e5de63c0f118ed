//! 结果分类
//!
//! 把用例执行中抛出的失败与记录的警告转换为唯一的最终结果。
//! 失败说明是一行文字：发生了什么、能推断出的处理建议、原始错误文本。

use regex::Regex;
use std::sync::OnceLock;
use vtest_common::Outcome;

use crate::CaseError;

/// 取消类失败的说明标签
pub const CANCELLED_TAG: &str = "[cancelled]";

/// 从原始错误文本推断处理建议
fn hint_rules() -> &'static [(Regex, &'static str)] {
    static RULES: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
    RULES.get_or_init(|| {
        [
            (r"(?i)permission denied|authentication failed", "检查节点登录凭据与权限"),
            (r"(?i)command not found|no such file or directory|未安装", "检查所需工具是否已安装"),
            (
                r"(?i)connection (refused|reset|closed)|broken pipe|no route to host|不可达|连接",
                "检查节点网络与 SSH 服务是否正常",
            ),
            (r"(?i)timed? ?out|超时", "考虑调大超时时间或检查节点负载"),
            (r"(?i)no space left", "清理节点磁盘空间"),
        ]
        .into_iter()
        .filter_map(|(pattern, hint)| Regex::new(pattern).ok().map(|re| (re, hint)))
        .collect()
    })
}

fn derive_hint(raw: &str) -> Option<&'static str> {
    hint_rules()
        .iter()
        .find(|(re, _)| re.is_match(raw))
        .map(|(_, hint)| *hint)
}

/// 把多行文本压成一行
pub fn flatten(text: &str) -> String {
    text.split(['\r', '\n'])
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" | ")
}

/// 失败的概述
fn summary(failure: &CaseError) -> String {
    match failure {
        CaseError::Setup(_) => "准备阶段失败".to_string(),
        CaseError::Assertion(_) => "断言失败".to_string(),
        CaseError::Connectivity(_) => "与节点的连接中断".to_string(),
        CaseError::Cancelled(_) => format!("{} 运行被取消", CANCELLED_TAG),
        CaseError::Timeout(limit) => {
            format!("{} 用例执行超过 {} 秒被中止", CANCELLED_TAG, limit.as_secs())
        }
        CaseError::Tool(_) => "工具执行失败".to_string(),
        CaseError::Other(_) => "用例执行出错".to_string(),
        CaseError::EnvironmentUnavailable(_) => "环境不可用".to_string(),
        CaseError::Skipped(_) => "用例主动跳过".to_string(),
    }
}

/// 不依赖原始文本的固定建议
fn default_hint(failure: &CaseError) -> Option<&'static str> {
    match failure {
        CaseError::Assertion(_) => Some("检查被测功能的行为是否符合预期"),
        CaseError::Timeout(_) => Some("考虑调大 case_timeout"),
        CaseError::Connectivity(_) => Some("检查节点网络与 SSH 服务是否正常"),
        _ => None,
    }
}

/// 原始错误文本，去掉变体自带的前缀
fn raw_text(failure: &CaseError) -> String {
    match failure {
        CaseError::EnvironmentUnavailable(raw)
        | CaseError::Setup(raw)
        | CaseError::Assertion(raw)
        | CaseError::Connectivity(raw)
        | CaseError::Cancelled(raw)
        | CaseError::Tool(raw)
        | CaseError::Skipped(raw) => raw.clone(),
        CaseError::Timeout(_) => failure.to_string(),
        CaseError::Other(e) => format!("{:#}", e),
    }
}

/// 分类
///
/// - 没有失败也没有警告: `Passed`
/// - 只有警告: `PassedWithWarning`
/// - 环境不可用或主动跳过: `Skipped`
/// - 其他失败: `Failed`
pub fn classify(failure: Option<&CaseError>, warnings: &[String]) -> Outcome {
    let failure = match failure {
        None if warnings.is_empty() => return Outcome::Passed,
        None => return Outcome::warning(flatten(&warnings.join("; "))),
        Some(failure) => failure,
    };

    let raw = flatten(&raw_text(failure));

    match failure {
        CaseError::Skipped(_) => Outcome::skipped(raw),
        CaseError::EnvironmentUnavailable(_) => {
            Outcome::skipped(format!("{}: {}", summary(failure), raw))
        }
        _ => {
            let mut message = summary(failure);
            if let Some(hint) = derive_hint(&raw).or_else(|| default_hint(failure)) {
                message.push_str(&format!("，建议: {}", hint));
            }
            message.push_str(&format!("。原始错误: {}", raw));
            Outcome::failed(message, raw)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use vtest_common::TestStatus;

    #[test]
    fn test_passed_and_warning() {
        assert_eq!(classify(None, &[]), Outcome::Passed);

        let outcome = classify(None, &["SSH 连接抖动\n已重连".to_string()]);
        assert_eq!(outcome, Outcome::warning("SSH 连接抖动 | 已重连"));
    }

    #[test]
    fn test_failure_overrides_warning() {
        let outcome = classify(
            Some(&CaseError::Assertion("期望 1 等于 2".to_string())),
            &["忽略".to_string()],
        );
        assert_eq!(outcome.status(), TestStatus::Failed);
        let message = outcome.message().unwrap();
        assert!(message.starts_with("断言失败"));
        assert!(message.contains("期望 1 等于 2"));
    }

    #[test]
    fn test_skips() {
        let outcome = classify(Some(&CaseError::Skipped("内核版本过低".to_string())), &[]);
        assert_eq!(outcome, Outcome::skipped("内核版本过低"));

        let outcome = classify(
            Some(&CaseError::EnvironmentUnavailable("缺少特性 [SerialConsole]".to_string())),
            &[],
        );
        assert!(outcome.is_skipped());
        assert!(outcome.message().unwrap().contains("SerialConsole"));
    }

    #[test]
    fn test_message_is_single_line_with_hint() {
        let failure = CaseError::Tool("ssh: connect to host 10.0.0.4 port 22:\nConnection refused".to_string());
        let outcome = classify(Some(&failure), &[]);

        let message = outcome.message().unwrap();
        assert!(!message.contains('\n'));
        assert!(message.contains("检查节点网络"));
        assert!(message.contains("Connection refused"));
        match outcome {
            Outcome::Failed { cause, .. } => assert!(cause.contains("port 22: | Connection refused")),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_cancel_and_timeout_tagged() {
        let outcome = classify(Some(&CaseError::Cancelled("收到停止信号".to_string())), &[]);
        assert!(outcome.message().unwrap().starts_with(CANCELLED_TAG));

        let outcome = classify(Some(&CaseError::Timeout(Duration::from_secs(30))), &[]);
        let message = outcome.message().unwrap();
        assert!(message.starts_with(CANCELLED_TAG));
        assert!(message.contains("30 秒"));
    }

    #[test]
    fn test_other_error_keeps_context() {
        let error = anyhow::anyhow!("磁盘只读").context("写入测试文件");
        let outcome = classify(Some(&CaseError::Other(error)), &[]);
        let message = outcome.message().unwrap();
        assert!(message.contains("写入测试文件"));
        assert!(message.contains("磁盘只读"));
    }
}
