//! # 表达式 AST 构建器
//!
//! 把通用表达式文本（裸表达式或由域代码派生的表达式）解析为 AST。
//!
//! ## 判定顺序（首个命中即返回，不回溯）
//!
//! 1. `Fields!` 前缀 → 字段引用
//! 2. `Parameters!` 前缀 → 参数引用
//! 3. `Globals!` 前缀 → 全局变量引用
//! 4. 函数调用形态 `name(args)` → 函数调用，参数递归构建
//! 5. 按固定顺序扫描二元运算符 → 二元运算，两侧递归构建
//! 6. 其余 → 字面量
//!
//! 第 5 步是**单次、固定顺序**的文本扫描，不是优先级解析：
//! `A+B*C` 会在 `+` 处切分，只因为 `+` 在列表中排在 `*` 之前。
//!
//! 递归深度达到 [`MAX_BUILD_DEPTH`] 时，剩余文本整体作为字符串字面量，
//! 超长的运算符链或括号嵌套不会耗尽调用栈。

use super::helpers::{
    find_matching_paren, is_identifier, split_top_level_args, starts_with_ignore_case,
    strip_double_quotes,
};
use crate::ast::{Ast, LiteralValue};

/// 二元运算符扫描顺序
pub const BINARY_OPERATORS: &[&str] = &[
    " And ", " Or ", ">=", "<=", "<>", "=", ">", "<", "+", "-", "*", "/",
];

/// 最大递归深度，超出后剩余文本整体作为字符串字面量
pub const MAX_BUILD_DEPTH: usize = 256;

/// 解析表达式文本
///
/// 全函数：任何输入都会得到一个 AST；空文本得到空字符串字面量。
pub fn build_ast(text: &str) -> Ast {
    build_at_depth(text, 0)
}

fn build_at_depth(text: &str, depth: usize) -> Ast {
    let text = text.trim();
    if text.is_empty() {
        return Ast::string("");
    }
    if depth >= MAX_BUILD_DEPTH {
        return Ast::string(text);
    }

    if starts_with_ignore_case(text, "Fields!") {
        return Ast::field(reference_name(text, &['!', '.']));
    }
    if starts_with_ignore_case(text, "Parameters!") {
        return Ast::parameter(reference_name(text, &['!', '.']));
    }
    if starts_with_ignore_case(text, "Globals!") {
        return Ast::global(reference_name(text, &['!']));
    }

    if let Some(call) = build_function_call(text, depth) {
        return call;
    }

    if let Some(binary) = build_binary_operation(text, depth) {
        return binary;
    }

    build_literal(text)
}

/// 按分隔符切分后取第二段作为引用名
fn reference_name(text: &str, separators: &[char]) -> String {
    text.split(|c| separators.contains(&c))
        .nth(1)
        .unwrap_or_default()
        .trim()
        .to_string()
}

/// 函数调用：存在 `(`，其前为非空标识符，且与之匹配的 `)` 是最后一个字符
fn build_function_call(text: &str, depth: usize) -> Option<Ast> {
    let open = text.find('(')?;
    if !text.ends_with(')') {
        return None;
    }
    let name = text[..open].trim_end();
    if !is_identifier(name) {
        return None;
    }
    if find_matching_paren(text, open)? != text.len() - 1 {
        return None;
    }

    let args = split_top_level_args(&text[open + 1..text.len() - 1])
        .into_iter()
        .map(|arg| build_at_depth(arg, depth + 1))
        .collect();
    Some(Ast::call(name, args))
}

/// 取列表中**第一个**在文本内部（不在开头、不触及结尾）出现的运算符切分
fn build_binary_operation(text: &str, depth: usize) -> Option<Ast> {
    BINARY_OPERATORS.iter().find_map(|op| {
        let idx = text.find(op)?;
        if idx == 0 || idx + op.len() >= text.len() {
            return None;
        }
        let left = build_at_depth(&text[..idx], depth + 1);
        let right = build_at_depth(&text[idx + op.len()..], depth + 1);
        Some(Ast::binary(op.trim(), left, right))
    })
}

fn build_literal(text: &str) -> Ast {
    match strip_double_quotes(text) {
        Some(inner) => Ast::string(inner.replace("\"\"", "\"")),
        None => Ast::Literal(LiteralValue::infer(text)),
    }
}
