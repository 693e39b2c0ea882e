//! # 校验结果模块
//!
//! 沙箱校验的输出类型：分级消息与违规列表。
//!
//! ## 设计原则
//!
//! - 每次校验产生新的结果，无共享状态
//! - 消息分级：Error（违规，表达式不可用）、Warning（建议检查）、Info（信息提示）
//! - `is_valid` 与违规列表保持一致：只有 Error 会产生违规

use serde::{Deserialize, Serialize};

/// 消息级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    /// 信息提示
    Info,
    /// 警告（不影响有效性）
    Warning,
    /// 错误（违规）
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "INFO"),
            Self::Warning => write!(f, "WARN"),
            Self::Error => write!(f, "ERROR"),
        }
    }
}

/// 校验消息
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationMessage {
    /// 消息级别
    pub severity: Severity,
    /// 消息代码（如 `FORBIDDEN_API`）
    pub code: String,
    /// 面向用户的消息文本
    pub text: String,
    /// 命中位置（表达式中的字节偏移）
    pub location: Option<usize>,
}

impl ValidationMessage {
    /// 创建错误消息
    pub fn error(code: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(Severity::Error, code, text)
    }

    /// 创建警告消息
    pub fn warning(code: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(Severity::Warning, code, text)
    }

    /// 创建信息消息
    pub fn info(code: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(Severity::Info, code, text)
    }

    fn new(severity: Severity, code: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            severity,
            code: code.into(),
            text: text.into(),
            location: None,
        }
    }

    /// 设置命中位置
    pub fn with_location(mut self, location: usize) -> Self {
        self.location = Some(location);
        self
    }
}

impl std::fmt::Display for ValidationMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}: {}", self.severity, self.code, self.text)?;
        if let Some(location) = self.location {
            write!(f, " (@{})", location)?;
        }
        Ok(())
    }
}

/// 校验结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationResult {
    /// 是否通过（无违规）
    pub is_valid: bool,
    /// 所有消息（按发现顺序）
    pub messages: Vec<ValidationMessage>,
    /// 违规描述（仅 `is_valid` 为 false 时非空）
    pub violations: Vec<String>,
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self {
            is_valid: true,
            messages: Vec::new(),
            violations: Vec::new(),
        }
    }
}

impl ValidationResult {
    /// 创建空结果（有效）
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加消息；Error 级别同时记录为违规
    pub fn push(&mut self, message: ValidationMessage) {
        if message.severity == Severity::Error {
            self.violations.push(message.text.clone());
            self.is_valid = false;
        }
        self.messages.push(message);
    }

    /// 合并另一个结果
    pub fn merge(&mut self, other: ValidationResult) {
        for message in other.messages {
            self.push(message);
        }
    }

    /// 获取错误数量
    pub fn error_count(&self) -> usize {
        self.count(Severity::Error)
    }

    /// 获取警告数量
    pub fn warning_count(&self) -> usize {
        self.count(Severity::Warning)
    }

    /// 是否有错误
    pub fn has_errors(&self) -> bool {
        self.error_count() > 0
    }

    /// 按级别过滤
    pub fn filter_by_severity(&self, min: Severity) -> Vec<&ValidationMessage> {
        self.messages.iter().filter(|m| m.severity >= min).collect()
    }

    /// 查找指定代码的消息
    pub fn messages_with_code<'a>(
        &'a self,
        code: &'a str,
    ) -> impl Iterator<Item = &'a ValidationMessage> + 'a {
        self.messages.iter().filter(move |m| m.code == code)
    }

    fn count(&self, severity: Severity) -> usize {
        self.messages
            .iter()
            .filter(|m| m.severity == severity)
            .count()
    }
}

impl std::fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.messages.is_empty() {
            return write!(f, "校验通过");
        }
        for (i, message) in self.messages.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", message)?;
        }
        Ok(())
    }
}
