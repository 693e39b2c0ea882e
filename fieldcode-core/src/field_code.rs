//! # FieldCode 模块
//!
//! 源文档中嵌入指令（域代码）的数据模型，以及指令分类与开关提取。
//!
//! ## 分类规则
//!
//! 指令去除左侧空白并转为大写后，按以下优先级匹配前缀：
//!
//! ```text
//! MERGEFIELD → MergeField    IF → If          DATE → Date
//! TIME       → Time          PAGE → Page      NUMPAGES → NumPages
//! = / FORMULA → Formula      SEQ → Sequence   TOC → TableOfContents
//! HYPERLINK  → Hyperlink     其他 → Unknown
//! ```

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 域代码类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldCodeType {
    Unknown,
    MergeField,
    If,
    Date,
    Page,
    NumPages,
    Time,
    Formula,
    Sequence,
    TableOfContents,
    Hyperlink,
}

impl std::fmt::Display for FieldCodeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Unknown => "Unknown",
            Self::MergeField => "MergeField",
            Self::If => "If",
            Self::Date => "Date",
            Self::Page => "Page",
            Self::NumPages => "NumPages",
            Self::Time => "Time",
            Self::Formula => "Formula",
            Self::Sequence => "Sequence",
            Self::TableOfContents => "TableOfContents",
            Self::Hyperlink => "Hyperlink",
        };
        write!(f, "{}", name)
    }
}

/// 前缀优先级表（顺序即优先级）
const PREFIXES: &[(&str, FieldCodeType)] = &[
    ("MERGEFIELD", FieldCodeType::MergeField),
    ("IF", FieldCodeType::If),
    ("DATE", FieldCodeType::Date),
    ("TIME", FieldCodeType::Time),
    ("PAGE", FieldCodeType::Page),
    ("NUMPAGES", FieldCodeType::NumPages),
    ("=", FieldCodeType::Formula),
    ("FORMULA", FieldCodeType::Formula),
    ("SEQ", FieldCodeType::Sequence),
    ("TOC", FieldCodeType::TableOfContents),
    ("HYPERLINK", FieldCodeType::Hyperlink),
];

/// 开关：`\` + `# @ * !`，后跟可选的引号字符串或裸词
static SWITCH_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"\\([#@*!])(?:\s*(?:"([^"]*)"|([^\s\\]+)))?"#).expect("switch pattern")
});

/// 源文档中的一个域代码
///
/// 在分解阶段创建一次，之后不可变。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldCode {
    /// 稳定 id
    pub id: String,
    /// 域类型
    #[serde(rename = "type")]
    pub field_type: FieldCodeType,
    /// 原始指令文本
    pub raw_code: String,
    /// 字段名（仅 MergeField 有意义）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_name: Option<String>,
    /// 开关（键为开关字符，如 `@`）
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub switches: BTreeMap<String, String>,
    /// 嵌套在本域指令中的子域（按出现顺序）
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nested_fields: Vec<FieldCode>,
}

impl FieldCode {
    /// 从原始指令文本创建域代码（分类、提取字段名与开关）
    pub fn new(id: impl Into<String>, raw_code: impl Into<String>) -> Self {
        let raw_code = raw_code.into();
        let field_type = determine_field_type(&raw_code);
        let field_name = match field_type {
            FieldCodeType::MergeField => extract_field_name(&raw_code),
            _ => None,
        };
        Self {
            id: id.into(),
            field_type,
            field_name,
            switches: extract_switches(&raw_code),
            raw_code,
            nested_fields: Vec::new(),
        }
    }

    /// 附加嵌套子域
    pub fn with_nested(mut self, nested: Vec<FieldCode>) -> Self {
        self.nested_fields = nested;
        self
    }

    /// 获取开关值
    pub fn switch(&self, key: char) -> Option<&str> {
        let mut buf = [0u8; 4];
        self.switches
            .get(key.encode_utf8(&mut buf) as &str)
            .map(String::as_str)
    }

    /// 深度优先遍历自身及所有嵌套子域
    pub fn walk(&self) -> Vec<&FieldCode> {
        let mut out = Vec::new();
        let mut stack = vec![self];
        while let Some(code) = stack.pop() {
            out.push(code);
            stack.extend(code.nested_fields.iter().rev());
        }
        out
    }
}

/// 根据指令前缀判断域类型
pub fn determine_field_type(instruction: &str) -> FieldCodeType {
    let upper = instruction.trim_start().to_uppercase();
    PREFIXES
        .iter()
        .find(|(prefix, _)| upper.starts_with(prefix))
        .map(|(_, ty)| *ty)
        .unwrap_or(FieldCodeType::Unknown)
}

/// 提取 MERGEFIELD 的字段名（按空白切分后的第二个词）
pub fn extract_field_name(instruction: &str) -> Option<String> {
    let token = instruction.split_whitespace().nth(1)?;
    let name = token.trim_matches('"');
    if name.is_empty() || name.starts_with('\\') {
        return None;
    }
    Some(name.to_string())
}

/// 提取 `\X "value"` 形式的开关
///
/// 同一开关出现多次时保留第一次的值；无值的开关记为空字符串。
pub fn extract_switches(instruction: &str) -> BTreeMap<String, String> {
    let mut switches = BTreeMap::new();
    for caps in SWITCH_RE.captures_iter(instruction) {
        let key = caps[1].to_string();
        let value = caps
            .get(2)
            .or_else(|| caps.get(3))
            .map(|m| m.as_str().to_string())
            .unwrap_or_default();
        switches.entry(key).or_insert(value);
    }
    switches
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_determine_field_type_prefixes() {
        let cases = [
            ("MERGEFIELD Name", FieldCodeType::MergeField),
            ("IF a = 1 \"x\" \"y\"", FieldCodeType::If),
            ("DATE \\@ \"yyyy\"", FieldCodeType::Date),
            ("TIME", FieldCodeType::Time),
            ("PAGE", FieldCodeType::Page),
            ("NUMPAGES", FieldCodeType::NumPages),
            ("= 1 + 2", FieldCodeType::Formula),
            ("FORMULA 1+2", FieldCodeType::Formula),
            ("SEQ Table", FieldCodeType::Sequence),
            ("TOC \\o", FieldCodeType::TableOfContents),
            ("HYPERLINK \"http://x\"", FieldCodeType::Hyperlink),
        ];
        for (text, expected) in cases {
            assert_eq!(determine_field_type(text), expected, "{}", text);
            assert_eq!(
                determine_field_type(&format!("  {}  ", text.to_lowercase())),
                expected,
                "{}",
                text
            );
        }
    }

    #[test]
    fn test_determine_field_type_unknown() {
        assert_eq!(determine_field_type("AUTHOR"), FieldCodeType::Unknown);
        assert_eq!(determine_field_type(""), FieldCodeType::Unknown);
        assert_eq!(determine_field_type("   "), FieldCodeType::Unknown);
    }

    #[test]
    fn test_extract_field_name() {
        assert_eq!(
            extract_field_name(" MERGEFIELD  CustomerName \\* MERGEFORMAT"),
            Some("CustomerName".to_string())
        );
        assert_eq!(
            extract_field_name("MERGEFIELD \"Customer\""),
            Some("Customer".to_string())
        );
        assert_eq!(extract_field_name("MERGEFIELD"), None);
        assert_eq!(extract_field_name("MERGEFIELD \\* MERGEFORMAT"), None);
    }

    #[test]
    fn test_extract_switches() {
        let switches = extract_switches(r#"DATE \@ "dd MMMM yyyy" \* MERGEFORMAT \!"#);
        assert_eq!(switches.get("@").map(String::as_str), Some("dd MMMM yyyy"));
        assert_eq!(switches.get("*").map(String::as_str), Some("MERGEFORMAT"));
        assert_eq!(switches.get("!").map(String::as_str), Some(""));
        assert!(!switches.contains_key("#"));
    }

    #[test]
    fn test_extract_switches_keeps_first() {
        let switches = extract_switches(r"MERGEFIELD Name \* Upper \* MERGEFORMAT");
        assert_eq!(switches.get("*").map(String::as_str), Some("Upper"));
    }

    #[test]
    fn test_unmatched_switch_is_absent() {
        assert!(extract_switches(r"MERGEFIELD Name \b \f").is_empty());
    }

    #[test]
    fn test_field_code_new() {
        let code = FieldCode::new("field_1", r##"MERGEFIELD Amount \# "#,##0.00""##);
        assert_eq!(code.field_type, FieldCodeType::MergeField);
        assert_eq!(code.field_name.as_deref(), Some("Amount"));
        assert_eq!(code.switch('#'), Some("#,##0.00"));

        let date = FieldCode::new("field_2", "DATE");
        assert_eq!(date.field_name, None);
        assert!(date.switches.is_empty());
    }

    #[test]
    fn test_walk_visits_nested_in_order() {
        let inner = FieldCode::new("c", "MERGEFIELD B");
        let mid = FieldCode::new("b", "IF x = 1 \"y\"").with_nested(vec![inner]);
        let root = FieldCode::new("a", "IF q = 1 \"r\"")
            .with_nested(vec![mid, FieldCode::new("d", "PAGE")]);

        let ids: Vec<&str> = root.walk().iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c", "d"]);
    }
}
