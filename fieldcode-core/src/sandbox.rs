//! # 沙箱校验模块
//!
//! 对表达式文本做静态的模式/白名单检查，决定其能否交给报表引擎执行。
//! 不执行、不做类型检查；与表达式是否由 AST 生成无关。
//!
//! ## 检查步骤（全部执行，不短路）
//!
//! 1. 禁止列表：任一禁止模式命中 → Error + 违规
//! 2. 未知函数：调用的函数名不在白名单 → Warning（不影响有效性）
//! 3. 命名空间：`Xxx.Yyy` 形式的访问路径不在允许的命名空间内 → Error + 违规
//!
//! 第 2、3 步在屏蔽双引号字符串字面量后扫描；第 1 步始终扫描原文。
//! 第 2 步对 `.` 之后的成员调用同样检查方法名，只跳过紧跟 `!` 的集合访问。

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::config::SandboxConfig;
use crate::error::{CompileError, CompileResult, ConfigError};
use crate::validation::{ValidationMessage, ValidationResult};

/// 禁止列表命中
pub const CODE_FORBIDDEN_API: &str = "FORBIDDEN_API";
/// 未知函数
pub const CODE_UNKNOWN_FUNCTION: &str = "UNKNOWN_FUNCTION";
/// 不允许的命名空间访问
pub const CODE_FORBIDDEN_NAMESPACE: &str = "FORBIDDEN_NAMESPACE";

/// 禁止访问的 API（字面文本，大小写不敏感）
pub const DENIED_PATTERNS: &[&str] = &[
    "System.IO.",
    "System.Net.",
    "System.Reflection.",
    "System.Diagnostics.",
    "System.Threading.",
    "System.Security.",
    "Process.",
    "File.",
    "Directory.",
    "Assembly.",
    "AppDomain.",
    "Activator.",
    "Type.GetType",
    "Invoke(",
    "CreateObject(",
    "GetObject(",
    "Shell(",
    "Environ(",
];

/// 允许调用的内置函数
pub const ALLOWED_FUNCTIONS: &[&str] = &[
    // 条件
    "IIf", "If", "Switch", "Choose",
    // 类型检查
    "IsNothing", "IsNumeric", "IsDate", "IsArray",
    // 类型转换
    "CStr", "CInt", "CLng", "CDbl", "CDec", "CBool", "CDate", "CByte", "CShort", "Val", "Str",
    // 字符串
    "Len", "Left", "Right", "Mid", "Trim", "LTrim", "RTrim", "UCase", "LCase", "StrComp",
    "InStr", "InStrRev", "Replace", "Split", "Join", "Space", "String", "Asc", "Chr", "Format",
    // 数学
    "Abs", "Int", "Fix", "Round", "Sgn", "Sqr", "Log", "Exp", "Sin", "Cos", "Tan", "Atn", "Rnd",
    "Randomize",
    // 日期/时间
    "Now", "Today", "Year", "Month", "Day", "Hour", "Minute", "Second", "Weekday", "WeekdayName",
    "DateAdd", "DateDiff", "DatePart", "DateSerial", "DateValue", "TimeSerial", "TimeValue",
    "Timer", "MonthName", "FormatDateTime",
    // 聚合
    "Sum", "Avg", "Count", "CountDistinct", "CountRows", "Max", "Min", "First", "Last",
    "Previous", "RunningValue", "RowNumber", "Aggregate", "StDev", "StDevP", "Var", "VarP",
    // 数组
    "Array", "UBound", "LBound",
    // 工具
    "Lookup", "LookupSet", "MultiLookup",
];

/// 允许访问的命名空间前缀
pub const ALLOWED_NAMESPACES: &[&str] = &[
    "System.Convert",
    "System.Math",
    "System.String",
    "System.DateTime",
    "System.TimeSpan",
    "Microsoft.VisualBasic.Strings",
    "Microsoft.VisualBasic.DateAndTime",
    "Microsoft.VisualBasic.Conversion",
    "Microsoft.VisualBasic.Financial",
    "Microsoft.VisualBasic.Information",
    "Microsoft.VisualBasic.Interaction",
];

/// 报表内置集合前缀
pub const BUILTIN_COLLECTIONS: &[&str] = &[
    "Fields.",
    "Parameters.",
    "Globals.",
    "User.",
    "Code.",
    "ReportItems.",
];

static CALL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\w+)\s*\(").expect("call pattern"));

static NAMESPACE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[A-Z]\w*(?:\.[A-Z]\w*)+").expect("namespace pattern"));

static FIELD_PROPERTY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\w+\.(?:Value|IsMissing)$").expect("field property pattern"));

static DEFAULT_VALIDATOR: Lazy<SandboxValidator> = Lazy::new(SandboxValidator::default);

/// 编译后的禁止模式
#[derive(Debug, Clone)]
struct DeniedPattern {
    label: String,
    regex: Regex,
}

impl DeniedPattern {
    /// 字面文本：以单词字符开头时在单词边界处匹配
    fn literal(text: &str) -> Self {
        let boundary = if text.starts_with(|c: char| c.is_alphanumeric() || c == '_') {
            r"\b"
        } else {
            ""
        };
        let pattern = format!("(?i){}{}", boundary, regex::escape(text));
        Self {
            label: text.to_string(),
            regex: Regex::new(&pattern).expect("escaped literal pattern"),
        }
    }

    /// 配置中的正则文本
    fn configured(text: &str) -> Result<Self, ConfigError> {
        let regex =
            Regex::new(&format!("(?i){}", text)).map_err(|source| ConfigError::InvalidPattern {
                pattern: text.to_string(),
                source,
            })?;
        Ok(Self {
            label: text.to_string(),
            regex,
        })
    }
}

/// 沙箱校验器
///
/// 内置列表是只读常量；配置只能在其基础上扩展。
#[derive(Debug, Clone)]
pub struct SandboxValidator {
    denied: Vec<DeniedPattern>,
    /// 小写函数名
    allowed_functions: HashSet<String>,
    allowed_namespaces: Vec<String>,
}

impl Default for SandboxValidator {
    fn default() -> Self {
        Self {
            denied: DENIED_PATTERNS
                .iter()
                .map(|p| DeniedPattern::literal(p))
                .collect(),
            allowed_functions: ALLOWED_FUNCTIONS
                .iter()
                .map(|f| f.to_lowercase())
                .collect(),
            allowed_namespaces: ALLOWED_NAMESPACES.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl SandboxValidator {
    /// 按配置创建校验器
    pub fn new(config: &SandboxConfig) -> Result<Self, ConfigError> {
        let mut validator = Self::default();
        for pattern in &config.extra_denied_patterns {
            validator.denied.push(DeniedPattern::configured(pattern)?);
        }
        validator.allowed_functions.extend(
            config
                .extra_allowed_functions
                .iter()
                .map(|f| f.to_lowercase()),
        );
        validator
            .allowed_namespaces
            .extend(config.extra_allowed_namespaces.iter().cloned());
        Ok(validator)
    }

    /// 校验表达式，永不失败；所有发现都累积在结果中
    pub fn validate(&self, expression: &str) -> ValidationResult {
        let mut result = ValidationResult::new();
        self.check_denied(expression, &mut result);

        let masked = mask_string_literals(expression);
        self.check_functions(&masked, &mut result);
        self.check_namespaces(&masked, &mut result);

        for message in &result.messages {
            debug!(code = %message.code, severity = %message.severity, "沙箱校验发现");
        }
        result
    }

    /// 校验表达式，有违规时返回携带完整违规列表的错误
    pub fn validate_or_err(&self, expression: &str) -> CompileResult<ValidationResult> {
        let result = self.validate(expression);
        if result.is_valid {
            Ok(result)
        } else {
            Err(CompileError::SandboxViolation {
                expression: expression.to_string(),
                violations: result.violations,
            })
        }
    }

    /// 函数名是否在白名单中（大小写不敏感）
    pub fn is_allowed_function(&self, name: &str) -> bool {
        self.allowed_functions.contains(&name.to_lowercase())
    }

    /// 访问路径是否位于允许的命名空间内
    pub fn is_allowed_namespace(&self, path: &str) -> bool {
        self.allowed_namespaces.iter().any(|ns| {
            path.strip_prefix(ns.as_str())
                .is_some_and(|rest| rest.is_empty() || rest.starts_with('.'))
        })
    }

    fn check_denied(&self, expression: &str, result: &mut ValidationResult) {
        for denied in &self.denied {
            if let Some(m) = denied.regex.find(expression) {
                result.push(
                    ValidationMessage::error(
                        CODE_FORBIDDEN_API,
                        format!("禁止的 API 访问: '{}'", denied.label),
                    )
                    .with_location(m.start()),
                );
            }
        }
    }

    fn check_functions(&self, masked: &str, result: &mut ValidationResult) {
        let mut reported = HashSet::new();
        for caps in CALL_RE.captures_iter(masked) {
            let Some(name) = caps.get(1) else { continue };
            if is_collection_access(masked, name.start()) {
                continue;
            }
            let name_str = name.as_str();
            if name_str.starts_with(|c: char| c.is_ascii_digit())
                || is_builtin_collection(name_str)
                || self.is_allowed_function(name_str)
            {
                continue;
            }
            if reported.insert(name_str.to_lowercase()) {
                result.push(
                    ValidationMessage::warning(
                        CODE_UNKNOWN_FUNCTION,
                        format!("未知函数: '{}'", name_str),
                    )
                    .with_location(name.start()),
                );
            }
        }
    }

    fn check_namespaces(&self, masked: &str, result: &mut ValidationResult) {
        for m in NAMESPACE_RE.find_iter(masked) {
            let path = m.as_str();
            if BUILTIN_COLLECTIONS.iter().any(|p| path.starts_with(p))
                || FIELD_PROPERTY_RE.is_match(path)
                || self.is_allowed_namespace(path)
            {
                continue;
            }
            result.push(
                ValidationMessage::error(
                    CODE_FORBIDDEN_NAMESPACE,
                    format!("不允许的命名空间访问: '{}'", path),
                )
                .with_location(m.start()),
            );
        }
    }
}

/// 使用内置列表校验表达式
pub fn validate(expression: &str) -> ValidationResult {
    DEFAULT_VALIDATOR.validate(expression)
}

/// 使用内置列表校验表达式，有违规时返回错误
pub fn validate_or_err(expression: &str) -> CompileResult<ValidationResult> {
    DEFAULT_VALIDATOR.validate_or_err(expression)
}

/// 名称前紧挨 `!`：`Fields!`/`Parameters!`/`Globals!` 等集合的访问路径，不是函数调用
///
/// `.` 之后的成员调用（如 `Code.Foo(`）仍按函数名检查。
fn is_collection_access(text: &str, start: usize) -> bool {
    text[..start].ends_with('!')
}

fn is_builtin_collection(name: &str) -> bool {
    BUILTIN_COLLECTIONS
        .iter()
        .any(|p| p.trim_end_matches('.').eq_ignore_ascii_case(name))
}

/// 把双引号字符串字面量的内容替换为空格（保持字节偏移不变）
///
/// 字面量内的 `""` 视为转义的引号。
fn mask_string_literals(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_string = false;
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '"' {
            if in_string && chars.peek() == Some(&'"') {
                chars.next();
                out.push_str("  ");
                continue;
            }
            in_string = !in_string;
            out.push('"');
        } else if in_string {
            out.extend(std::iter::repeat_n(' ', c.len_utf8()));
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggregate_over_field_is_valid() {
        let result = validate("Sum(Fields!Amount.Value)");
        assert!(result.is_valid);
        assert!(result.violations.is_empty());
        assert!(result.messages.is_empty());
    }

    #[test]
    fn test_file_access_is_rejected() {
        let result = validate("System.IO.File.ReadAllText(\"x\")");
        assert!(!result.is_valid);
        assert!(!result.violations.is_empty());
        assert!(result.error_count() >= 1);
        assert!(result.messages_with_code(CODE_FORBIDDEN_API).count() >= 2);
        assert_eq!(
            result.messages_with_code(CODE_FORBIDDEN_NAMESPACE).count(),
            1
        );
    }

    #[test]
    fn test_unknown_function_is_warning_only() {
        let result = validate("Foo(Fields!X.Value)");
        assert!(result.is_valid);
        assert!(result.violations.is_empty());
        assert_eq!(result.warning_count(), 1);
        assert_eq!(result.messages.len(), 1);
        assert_eq!(result.messages[0].code, CODE_UNKNOWN_FUNCTION);
        assert_eq!(result.messages[0].location, Some(0));
    }

    #[test]
    fn test_unknown_function_reported_once_per_name() {
        let result = validate("=Foo(1) + foo(2) + Bar(3)");
        assert_eq!(result.warning_count(), 2);
    }

    #[test]
    fn test_member_calls_are_checked() {
        let result = validate("=Code.Evil(1) & System.Math.Bogus(2)");
        assert!(result.is_valid);
        let names: Vec<_> = result
            .messages_with_code(CODE_UNKNOWN_FUNCTION)
            .map(|m| m.text.as_str())
            .collect();
        assert_eq!(names.len(), 2);
        assert!(names[0].contains("Evil"));
        assert!(names[1].contains("Bogus"));
        assert_eq!(result.messages[0].location, Some(6));
    }

    #[test]
    fn test_lowercase_registry_call_is_reported() {
        let result =
            validate(r#"=microsoft.win32.registry.getvalue("HKEY_LOCAL_MACHINE\x","y","")"#);
        let unknown: Vec<_> = result.messages_with_code(CODE_UNKNOWN_FUNCTION).collect();
        assert_eq!(unknown.len(), 1);
        assert!(unknown[0].text.contains("getvalue"));
    }

    #[test]
    fn test_allowed_member_calls_stay_quiet() {
        assert!(validate("=System.Math.Round(Fields!X.Value, 2)").messages.is_empty());
        assert!(
            validate("=Microsoft.VisualBasic.Strings.Left(Fields!X.Value, 2)")
                .messages
                .is_empty()
        );
    }

    #[test]
    fn test_all_findings_accumulated() {
        let result = validate("=Shell(\"cmd\") & Environ(\"PATH\") & Mystery(1)");
        assert!(!result.is_valid);
        assert_eq!(result.violations.len(), 2);
        // Shell、Environ 不在白名单中，同样产生警告
        assert_eq!(result.warning_count(), 3);
    }

    #[test]
    fn test_deny_list_is_case_insensitive() {
        assert!(!validate("=createobject(\"WScript.Shell\")").is_valid);
        assert!(!validate("=system.io.path.GetTempPath()").is_valid);
    }

    #[test]
    fn test_deny_list_respects_word_boundary() {
        let result = validate("=Fields!Profile.Value");
        assert!(result.is_valid, "{}", result);
    }

    #[test]
    fn test_allowed_namespaces() {
        assert!(validate("=System.Math.Round(Fields!X.Value, 2)").is_valid);
        assert!(validate("=Microsoft.VisualBasic.Strings.Left(Fields!X.Value, 2)").is_valid);
        assert!(validate("=System.Convert.ToInt32(Parameters!P.Value)").is_valid);
    }

    #[test]
    fn test_namespace_prefix_needs_segment_boundary() {
        let result = validate("=System.Mathematics.Evil()");
        assert!(!result.is_valid);
        assert_eq!(
            result.messages_with_code(CODE_FORBIDDEN_NAMESPACE).count(),
            1
        );
    }

    #[test]
    fn test_builtin_collections_and_field_properties() {
        assert!(validate("=Code.ToUpper(Fields!Name.Value)").is_valid);
        assert!(validate("=ReportItems.Textbox1.Value").is_valid);
        assert!(validate("=IIf(Fields!Name.IsMissing, \"-\", Fields!Name.Value)").is_valid);
        assert!(validate("=User.UserID").is_valid);
    }

    #[test]
    fn test_string_literals_are_not_scanned_for_calls() {
        let result = validate("=\"Call Foo(now). Mr.Smith\" & Fields!A.Value");
        assert!(result.is_valid);
        assert!(result.messages.is_empty());
    }

    #[test]
    fn test_deny_list_scans_string_literals() {
        assert!(!validate("=\"System.IO.\"").is_valid);
    }

    #[test]
    fn test_validate_or_err() {
        let ok = validate_or_err("=Foo(1)").unwrap();
        assert_eq!(ok.warning_count(), 1);

        let err = validate_or_err("=Shell(\"x\") & Process.Start(\"y\")").unwrap_err();
        match err {
            CompileError::SandboxViolation { violations, .. } => {
                assert!(violations.len() >= 2);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_config_extends_lists() {
        let config = SandboxConfig {
            extra_allowed_functions: vec!["StrConv".to_string()],
            extra_allowed_namespaces: vec!["System.Globalization".to_string()],
            extra_denied_patterns: vec![r"Now\s*\(".to_string()],
        };
        let validator = SandboxValidator::new(&config).unwrap();

        assert!(validator.validate("=StrConv(Fields!A.Value, 3)").messages.is_empty());
        assert!(
            validator
                .validate("=System.Globalization.CultureInfo.CurrentCulture")
                .is_valid
        );
        assert!(!validator.validate("=now()").is_valid);
        // 内置列表仍然生效
        assert!(!validator.validate("=Shell(\"x\")").is_valid);
    }

    #[test]
    fn test_invalid_configured_pattern() {
        let config = SandboxConfig {
            extra_denied_patterns: vec!["(".to_string()],
            ..SandboxConfig::default()
        };
        assert!(matches!(
            SandboxValidator::new(&config),
            Err(ConfigError::InvalidPattern { .. })
        ));
    }

    #[test]
    fn test_mask_string_literals_preserves_offsets() {
        let text = "a(\"x\"\"(\") & b";
        let masked = mask_string_literals(text);
        assert_eq!(masked.len(), text.len());
        assert_eq!(masked, "a(\"    \") & b");
    }
}
