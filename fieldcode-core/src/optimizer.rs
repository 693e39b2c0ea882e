//! # 表达式优化
//!
//! 文本层面的窥孔化简，按固定顺序各执行一次：
//!
//! 1. 去掉一层重复括号：`((x))` → `(x)`（不递归，更深的嵌套需要外部重复调用）
//! 2. 常量折叠：`IIf(True, A, B)` → `A`，`IIf(False, A, B)` → `B`
//!
//! 第 2 步只识别紧跟在 `IIf(` 之后、大小写完全一致的 `True`/`False`，
//! 其他写法（多余空格、小写）保持原样。
//!
//! 双引号字符串字面量内的文本两步都不改写。

use crate::parser::{find_matching_paren, split_top_level_args};

/// 优化表达式文本
pub fn optimize(expression: &str) -> String {
    let collapsed = collapse_double_parens(expression);
    fold_constant_iif(&collapsed)
}

/// 去掉一层 `((x))` 形式的重复括号
///
/// 每对被去掉的外层括号不会与结果中的括号再次组合；双引号字符串内的文本保持原样。
pub fn collapse_double_parens(expression: &str) -> String {
    let mut text = expression.to_string();
    let mut in_string = false;
    let mut i = 0;
    while let Some(c) = text[i..].chars().next() {
        if c == '"' {
            in_string = !in_string;
        } else if !in_string
            && text[i..].starts_with("((")
            && let Some(inner_close) = find_matching_paren(&text, i + 1)
            && text[inner_close + 1..].starts_with(')')
        {
            text.remove(inner_close + 1);
            text.remove(i);
        }
        i += text[i..].chars().next().map_or(1, char::len_utf8);
    }
    text
}

/// 折叠条件为字面量 `True`/`False` 的 `IIf`
pub fn fold_constant_iif(expression: &str) -> String {
    let mut text = expression.to_string();
    let mut search_from = 0;
    while let Some(offset) = text[search_from..].find("IIf(") {
        let start = search_from + offset;
        let open = start + "IIf".len();
        match fold_at(&text, start, open) {
            Some((end, replacement)) => {
                // 替换结果可能以另一个可折叠的 IIf 开头，从原位置继续
                text.replace_range(start..=end, &replacement);
                search_from = start;
            }
            None => search_from = open + 1,
        }
    }
    text
}

/// 尝试折叠 `start` 处的 `IIf(...)`，返回右括号位置与替换文本
fn fold_at(text: &str, start: usize, open: usize) -> Option<(usize, String)> {
    let body = &text[open + 1..];
    let branch = if body.starts_with("True") {
        0
    } else if body.starts_with("False") {
        1
    } else {
        return None;
    };

    // 前一个字符是标识符字符时，这不是 IIf 调用（如 `MyIIf(`）
    if text[..start]
        .chars()
        .next_back()
        .is_some_and(|c| c.is_alphanumeric() || c == '_')
    {
        return None;
    }

    // 位于字符串字面量内
    if text[..start].matches('"').count() % 2 == 1 {
        return None;
    }

    let close = find_matching_paren(text, open)?;
    let args = split_top_level_args(&text[open + 1..close]);
    if args.len() < 2 || (args[0] != "True" && args[0] != "False") {
        return None;
    }

    let replacement = match branch {
        0 => args[1].to_string(),
        _ => args.get(2).map_or("Nothing", |s| *s).to_string(),
    };
    Some((close, replacement))
}
