//! # Error 模块
//!
//! 定义 fieldcode-core 中使用的错误类型。

use thiserror::Error;

/// 编译错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompileError {
    /// MERGEFIELD 无法解析出字段名
    #[error("域 '{id}'：MERGEFIELD 缺少字段名 - '{raw_code}'")]
    MissingFieldName { id: String, raw_code: String },

    /// 表达式违反沙箱规则
    ///
    /// 只由 `validate_or_err` 产生，携带完整的违规列表。
    #[error("表达式 '{expression}' 违反沙箱规则: {}", .violations.join("; "))]
    SandboxViolation {
        expression: String,
        violations: Vec<String>,
    },
}

impl CompileError {
    /// 获取沙箱违规列表（其他错误返回空切片）
    pub fn violations(&self) -> &[String] {
        match self {
            Self::SandboxViolation { violations, .. } => violations,
            _ => &[],
        }
    }
}

/// 配置错误
#[derive(Error, Debug)]
pub enum ConfigError {
    /// IO 错误
    #[error("配置 IO 错误: {0}")]
    Io(#[from] std::io::Error),

    /// JSON 解析或序列化失败
    #[error("配置 JSON 错误: {0}")]
    Json(#[from] serde_json::Error),

    /// 无法编译的禁止模式
    #[error("禁止模式 '{pattern}' 无效: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Result 类型别名
pub type CompileResult<T> = Result<T, CompileError>;
