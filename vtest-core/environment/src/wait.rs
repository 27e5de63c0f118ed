//! 轮询等待
//!
//! "等待某个条件成立" 一律使用有界轮询：检查、休眠、再检查，直到超时。

use std::future::Future;
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::debug;

use crate::{EnvironmentError, Result};

/// 轮询直到 `check` 返回 `Some`，或超过 `timeout`
///
/// `check` 返回错误时立即结束。超时返回 [`EnvironmentError::Timeout`]，
/// 错误信息中带上 `what` 与已等待时长。
pub async fn poll_until<T, F, Fut>(
    what: &str,
    timeout: Duration,
    interval: Duration,
    mut check: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>>>,
{
    let start = Instant::now();
    let deadline = start + timeout;
    let mut attempts: u32 = 0;

    loop {
        attempts += 1;
        if let Some(value) = check().await? {
            debug!("{} 条件满足 (第 {} 次检查)", what, attempts);
            return Ok(value);
        }

        let now = Instant::now();
        if now >= deadline {
            return Err(EnvironmentError::Timeout(format!(
                "{} 在 {:?} 内未就绪 (检查 {} 次)",
                what,
                start.elapsed(),
                attempts
            )));
        }

        // 最后一次休眠不超过截止时间
        sleep(interval.min(deadline - now)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_poll_until_ready() {
        let mut count = 0;
        let value = poll_until("计数", Duration::from_secs(10), Duration::from_secs(1), || {
            count += 1;
            let current = count;
            async move { Ok(if current >= 3 { Some(current) } else { None }) }
        })
        .await
        .unwrap();
        assert_eq!(value, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_until_timeout() {
        let result: Result<()> = poll_until(
            "永不就绪",
            Duration::from_secs(5),
            Duration::from_secs(1),
            || async { Ok(None) },
        )
        .await;

        match result {
            Err(EnvironmentError::Timeout(message)) => assert!(message.contains("永不就绪")),
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_until_propagates_error() {
        let result: Result<()> = poll_until(
            "出错",
            Duration::from_secs(5),
            Duration::from_secs(1),
            || async { Err(EnvironmentError::Unusable("env".to_string())) },
        )
        .await;
        assert!(matches!(result, Err(EnvironmentError::Unusable(_))));
    }
}
