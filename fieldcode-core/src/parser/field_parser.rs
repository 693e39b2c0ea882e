//! # 域代码解析器
//!
//! 按域类型构建 AST，子表达式的值由 [`parse_value`] 识别。
//!
//! | 域类型 | AST |
//! |---|---|
//! | MergeField | `FieldReference(name)`（带格式开关时包装为函数调用） |
//! | If | `Conditional(condition, true, false?)` |
//! | Date / Time | `Format(Globals!ExecutionTime, fmt)` |
//! | Page / NumPages | `Globals!PageNumber` / `Globals!TotalPages` |
//! | Formula | 去掉 `=` 后的字面量 |
//! | 其他 | 原始文本字面量 |

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

use super::helpers::{starts_with_ignore_case, strip_double_quotes};
use crate::ast::{Ast, parse_number};
use crate::config::CompilerConfig;
use crate::error::{CompileError, CompileResult};
use crate::field_code::{FieldCode, FieldCodeType};

/// 分支值：引号包围的花括号 | 花括号（至多一层嵌套）| 引号字符串 | 裸词
const VALUE_PATTERN: &str =
    r#""\{[^{}]*(?:\{[^{}]*\}[^{}]*)*\}"|\{[^{}]*(?:\{[^{}]*\}[^{}]*)*\}|"[^"]*"|\S+"#;

/// IF 比较运算符（顺序即匹配优先级）
const COMPARISON_PATTERN: &str = "=|<>|!=|>=|<=|>|<";

/// 条件优先按 `left op value` 匹配，失败时退回惰性的任意文本
static IF_RE: Lazy<Regex> = Lazy::new(|| {
    let pattern = format!(
        r"(?is)^\s*IF\s+(?P<condition>.+?\s*(?:{op})\s*(?:{v})|.+?)\s+(?P<true>{v})(?:\s+(?P<false>{v}))?\s*$",
        op = COMPARISON_PATTERN,
        v = VALUE_PATTERN
    );
    Regex::new(&pattern).expect("IF pattern")
});

static CONDITION_RE: Lazy<Regex> = Lazy::new(|| {
    let pattern = format!(
        r"(?s)^(?P<left>.+?)\s*(?P<op>{op})\s*(?P<right>.+)$",
        op = COMPARISON_PATTERN
    );
    Regex::new(&pattern).expect("condition pattern")
});

static MERGEFIELD_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)MERGEFIELD\s+(\w+)").expect("mergefield pattern"));

static EMBEDDED_MERGEFIELD_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)\{\s*MERGEFIELD\s+"?(\w+)"?[^}]*\}"#).expect("embedded mergefield pattern")
});

static TRAILING_FORMAT_SWITCHES_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:\s+\\\*\s*\S+)+\s*$").expect("format switch pattern"));

/// 已解析的域：域代码及其 AST
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedField {
    pub code: FieldCode,
    pub ast: Ast,
}

/// 域代码解析器
#[derive(Debug, Clone, Default)]
pub struct FieldCodeParser {
    config: CompilerConfig,
}

impl FieldCodeParser {
    /// 使用默认配置创建解析器
    pub fn new() -> Self {
        Self::default()
    }

    /// 使用指定配置创建解析器
    pub fn with_config(config: CompilerConfig) -> Self {
        Self { config }
    }

    /// 解析单个域代码
    ///
    /// 只有缺少字段名的 MERGEFIELD 会返回错误；无法识别的 IF 降级为字面量。
    pub fn parse(&self, code: &FieldCode) -> CompileResult<Ast> {
        let ast = match code.field_type {
            FieldCodeType::MergeField => self.parse_merge_field(code)?,
            FieldCodeType::If => parse_if(&code.raw_code),
            FieldCodeType::Date => execution_time_format(code, &self.config.default_date_format),
            FieldCodeType::Time => execution_time_format(code, &self.config.default_time_format),
            FieldCodeType::Page => Ast::global("PageNumber"),
            FieldCodeType::NumPages => Ast::global("TotalPages"),
            FieldCodeType::Formula => parse_formula(&code.raw_code),
            FieldCodeType::Unknown
            | FieldCodeType::Sequence
            | FieldCodeType::TableOfContents
            | FieldCodeType::Hyperlink => Ast::string(code.raw_code.clone()),
        };
        Ok(ast)
    }

    /// 解析多个域代码，遇到第一个错误即返回
    pub fn parse_all(&self, codes: &[FieldCode]) -> CompileResult<Vec<ParsedField>> {
        codes
            .iter()
            .map(|code| {
                Ok(ParsedField {
                    ast: self.parse(code)?,
                    code: code.clone(),
                })
            })
            .collect()
    }

    fn parse_merge_field(&self, code: &FieldCode) -> CompileResult<Ast> {
        let name = code
            .field_name
            .clone()
            .or_else(|| {
                MERGEFIELD_NAME_RE
                    .captures(&code.raw_code)
                    .map(|caps| caps[1].to_string())
            })
            .ok_or_else(|| CompileError::MissingFieldName {
                id: code.id.clone(),
                raw_code: code.raw_code.clone(),
            })?;

        let reference = Ast::field(name);

        if let Some(format) = code.switch('#').or_else(|| code.switch('@')) {
            return Ok(Ast::call("Format", vec![reference, Ast::string(format)]));
        }
        let ast = match code.switch('*') {
            Some(s) if s.eq_ignore_ascii_case("Upper") => Ast::call("UCase", vec![reference]),
            Some(s) if s.eq_ignore_ascii_case("Lower") => Ast::call("LCase", vec![reference]),
            _ => reference,
        };
        Ok(ast)
    }
}

/// DATE / TIME：`Format(Globals!ExecutionTime, fmt)`
fn execution_time_format(code: &FieldCode, default_format: &str) -> Ast {
    let format = code.switch('@').unwrap_or(default_format);
    Ast::call(
        "Format",
        vec![Ast::global("ExecutionTime"), Ast::string(format)],
    )
}

/// 公式体不再分解，去掉前导 `=` 与空白后作为字面量
fn parse_formula(raw: &str) -> Ast {
    let body = raw
        .trim_start_matches(|c: char| c == '=' || c.is_whitespace())
        .trim_end();
    Ast::string(body)
}

/// 解析 IF 指令
///
/// 格式: `IF <condition> <true> [<false>]`
///
/// 无法匹配时记录警告并返回原始文本字面量。
pub fn parse_if(raw: &str) -> Ast {
    let text = TRAILING_FORMAT_SWITCHES_RE.replace(raw, "");
    let Some(caps) = IF_RE.captures(&text) else {
        warn!(instruction = %raw, "IF 指令无法解析，保留为字面量");
        return Ast::string(raw);
    };

    let condition = parse_condition(&caps["condition"]);
    let when_true = parse_value(&caps["true"]);
    let when_false = caps.name("false").map(|m| parse_value(m.as_str()));
    Ast::conditional(condition, when_true, when_false)
}

/// 解析 IF 条件：`left op right`，`!=` 规范化为 `<>`
///
/// 没有比较运算符时整个条件按 [`parse_value`] 处理。
pub fn parse_condition(text: &str) -> Ast {
    let Some(caps) = CONDITION_RE.captures(text.trim()) else {
        return parse_value(text);
    };
    let op = match &caps["op"] {
        "!=" => "<>",
        other => other,
    };
    Ast::binary(op, parse_value(&caps["left"]), parse_value(&caps["right"]))
}

/// 识别 IF 条件与分支中的值
///
/// 依次尝试：
/// - 花括号包围的嵌套 IF（可带引号）→ 递归解析为条件节点
/// - 内嵌的 `{ MERGEFIELD Name ... }` → 字段引用
/// - 双引号字符串 → 字符串字面量
/// - 数字 → 数字字面量
/// - 其他 → 原文字符串字面量
///
/// 注意：裸字段名（非 `{ MERGEFIELD }` 形式）得到的是字符串字面量。
pub fn parse_value(text: &str) -> Ast {
    let text = text.trim();

    let unquoted = strip_double_quotes(text).unwrap_or(text).trim();
    if let Some(inner) = unquoted
        .strip_prefix('{')
        .and_then(|s| s.strip_suffix('}'))
        .map(str::trim)
        && starts_with_ignore_case(inner, "IF ")
    {
        return parse_if(inner);
    }

    if let Some(caps) = EMBEDDED_MERGEFIELD_RE.captures(text) {
        return Ast::field(&caps[1]);
    }

    if let Some(inner) = strip_double_quotes(text) {
        return Ast::string(inner);
    }

    if let Ok(n) = text.parse::<i64>() {
        return Ast::int(n);
    }
    if let Some(n) = parse_number(text) {
        return Ast::number(n);
    }

    Ast::string(text)
}
