//! 断言
//!
//! `assert_that(actual)` 返回一个 [`Expectation`]，检查不通过时返回
//! [`CaseError::Assertion`]，用例主体用 `?` 直接向上传递即可。

use std::fmt::Debug;

use crate::{CaseError, CaseResult};

/// 对实际值的期望
pub struct Expectation<T> {
    actual: T,
    description: Option<String>,
}

pub fn assert_that<T>(actual: T) -> Expectation<T> {
    Expectation {
        actual,
        description: None,
    }
}

impl<T> Expectation<T> {
    /// 为断言附加说明，出现在失败信息开头
    pub fn described_as(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    fn fail(&self, message: String) -> CaseError {
        match &self.description {
            Some(description) => CaseError::Assertion(format!("[{}] {}", description, message)),
            None => CaseError::Assertion(message),
        }
    }
}

impl<T: Debug> Expectation<T> {
    pub fn is_equal_to<U>(&self, expected: U) -> CaseResult<()>
    where
        T: PartialEq<U>,
        U: Debug,
    {
        if self.actual == expected {
            Ok(())
        } else {
            Err(self.fail(format!("期望 {:?} 等于 {:?}", self.actual, expected)))
        }
    }

    pub fn is_not_equal_to<U>(&self, unexpected: U) -> CaseResult<()>
    where
        T: PartialEq<U>,
        U: Debug,
    {
        if self.actual != unexpected {
            Ok(())
        } else {
            Err(self.fail(format!("期望 {:?} 不等于 {:?}", self.actual, unexpected)))
        }
    }

    /// 自定义条件，`what` 描述条件本身
    pub fn satisfies(&self, what: &str, predicate: impl FnOnce(&T) -> bool) -> CaseResult<()> {
        if predicate(&self.actual) {
            Ok(())
        } else {
            Err(self.fail(format!("期望 {:?} 满足: {}", self.actual, what)))
        }
    }
}

impl<T: PartialOrd + Debug> Expectation<T> {
    pub fn is_greater_than(&self, other: T) -> CaseResult<()> {
        if self.actual > other {
            Ok(())
        } else {
            Err(self.fail(format!("期望 {:?} 大于 {:?}", self.actual, other)))
        }
    }

    pub fn is_less_than(&self, other: T) -> CaseResult<()> {
        if self.actual < other {
            Ok(())
        } else {
            Err(self.fail(format!("期望 {:?} 小于 {:?}", self.actual, other)))
        }
    }
}

impl Expectation<bool> {
    pub fn is_true(&self) -> CaseResult<()> {
        if self.actual {
            Ok(())
        } else {
            Err(self.fail("期望为 true".to_string()))
        }
    }

    pub fn is_false(&self) -> CaseResult<()> {
        if !self.actual {
            Ok(())
        } else {
            Err(self.fail("期望为 false".to_string()))
        }
    }
}

impl<T: Debug> Expectation<Option<T>> {
    pub fn is_some(&self) -> CaseResult<()> {
        match &self.actual {
            Some(_) => Ok(()),
            None => Err(self.fail("期望有值，实际为 None".to_string())),
        }
    }

    pub fn is_none(&self) -> CaseResult<()> {
        match &self.actual {
            None => Ok(()),
            Some(value) => Err(self.fail(format!("期望为 None，实际为 {:?}", value))),
        }
    }
}

impl<T: AsRef<str>> Expectation<T> {
    pub fn contains(&self, needle: &str) -> CaseResult<()> {
        let actual = self.actual.as_ref();
        if actual.contains(needle) {
            Ok(())
        } else {
            Err(self.fail(format!("期望 {:?} 包含 {:?}", actual, needle)))
        }
    }

    pub fn starts_with(&self, prefix: &str) -> CaseResult<()> {
        let actual = self.actual.as_ref();
        if actual.starts_with(prefix) {
            Ok(())
        } else {
            Err(self.fail(format!("期望 {:?} 以 {:?} 开头", actual, prefix)))
        }
    }

    pub fn is_empty_str(&self) -> CaseResult<()> {
        let actual = self.actual.as_ref();
        if actual.is_empty() {
            Ok(())
        } else {
            Err(self.fail(format!("期望为空，实际为 {:?}", actual)))
        }
    }
}

impl<E: PartialEq + Debug> Expectation<Vec<E>> {
    pub fn has_len(&self, len: usize) -> CaseResult<()> {
        if self.actual.len() == len {
            Ok(())
        } else {
            Err(self.fail(format!(
                "期望长度为 {}，实际为 {}: {:?}",
                len,
                self.actual.len(),
                self.actual
            )))
        }
    }

    pub fn contains_item(&self, item: &E) -> CaseResult<()> {
        if self.actual.contains(item) {
            Ok(())
        } else {
            Err(self.fail(format!("期望 {:?} 包含 {:?}", self.actual, item)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equality() {
        assert!(assert_that(3).is_equal_to(3).is_ok());
        assert!(assert_that("a".to_string()).is_equal_to("a").is_ok());
        assert!(assert_that(3).is_not_equal_to(4).is_ok());

        match assert_that(3).described_as("退出码").is_equal_to(0) {
            Err(CaseError::Assertion(message)) => {
                assert_eq!(message, "[退出码] 期望 3 等于 0");
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_strings() {
        assert!(assert_that("hello world").contains("world").is_ok());
        assert!(assert_that(String::from("hello")).starts_with("he").is_ok());
        assert!(assert_that("").is_empty_str().is_ok());
        assert!(assert_that("x").contains("y").is_err());
    }

    #[test]
    fn test_ordering_and_bool() {
        assert!(assert_that(5).is_greater_than(1).is_ok());
        assert!(assert_that(5).is_less_than(1).is_err());
        assert!(assert_that(true).is_true().is_ok());
        assert!(assert_that(true).is_false().is_err());
    }

    #[test]
    fn test_option_and_vec() {
        assert!(assert_that(Some(1)).is_some().is_ok());
        assert!(assert_that(None::<u8>).is_none().is_ok());
        assert!(assert_that(vec![1, 2]).has_len(2).is_ok());
        assert!(assert_that(vec![1, 2]).contains_item(&3).is_err());
    }

    #[test]
    fn test_satisfies() {
        assert!(assert_that(10).satisfies("偶数", |v| v % 2 == 0).is_ok());
        assert!(assert_that(11).satisfies("偶数", |v| v % 2 == 0).is_err());
    }
}
