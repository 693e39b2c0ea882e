//! # Config 模块
//!
//! 编译器配置，集中管理所有可调项。
//!
//! ## 配置优先级
//!
//! 1. 配置文件 (JSON)
//! 2. 默认值（最低）
//!
//! 沙箱的内置允许/禁止列表只能通过配置**扩展**，不能删减。

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

use crate::error::ConfigError;

/// 编译器配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompilerConfig {
    /// DATE 域未指定 `\@` 时使用的格式
    #[serde(default = "default_date_format")]
    pub default_date_format: String,

    /// TIME 域未指定 `\@` 时使用的格式
    #[serde(default = "default_time_format")]
    pub default_time_format: String,

    /// 沙箱配置
    #[serde(default)]
    pub sandbox: SandboxConfig,
}

/// 沙箱配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SandboxConfig {
    /// 额外允许的函数名
    #[serde(default)]
    pub extra_allowed_functions: Vec<String>,

    /// 额外允许的命名空间前缀（如 `System.Globalization`）
    #[serde(default)]
    pub extra_allowed_namespaces: Vec<String>,

    /// 额外的禁止模式（正则文本，大小写不敏感）
    #[serde(default)]
    pub extra_denied_patterns: Vec<String>,
}

fn default_date_format() -> String {
    "yyyy-MM-dd".to_string()
}

fn default_time_format() -> String {
    "HH:mm:ss".to_string()
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            default_date_format: default_date_format(),
            default_time_format: default_time_format(),
            sandbox: SandboxConfig::default(),
        }
    }
}

impl CompilerConfig {
    /// 从 JSON 文本解析配置
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    /// 加载配置文件
    ///
    /// 文件不存在时返回默认配置；读取或解析失败返回错误。
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            warn!(path = %path.display(), "配置文件不存在，使用默认配置");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        let config = Self::from_json_str(&content)?;
        debug!(path = %path.display(), "配置文件加载成功");
        Ok(config)
    }

    /// 保存配置到文件
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }
}
