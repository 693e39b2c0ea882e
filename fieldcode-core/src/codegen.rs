//! # 表达式代码生成
//!
//! 把 AST 渲染为目标表达式文本。纯函数，没有失败路径；
//! 生成结果是否安全由沙箱校验单独负责。
//!
//! 只有最外层调用（[`generate`]）带 `=` 前缀，嵌套渲染不带。

use std::fmt::Write;

use crate::ast::{Ast, LiteralValue};
use crate::conditional::ConditionalBranch;

/// 生成完整表达式（带 `=` 前缀）
pub fn generate(ast: &Ast) -> String {
    let mut out = String::from("=");
    write_ast(&mut out, ast);
    out
}

/// 渲染 AST（不带 `=` 前缀）
pub fn render(ast: &Ast) -> String {
    let mut out = String::new();
    write_ast(&mut out, ast);
    out
}

/// 把条件分支生成为完整的 `=IIf(...)` 表达式
pub fn generate_branch(branch: &ConditionalBranch) -> String {
    let mut out = String::from("=");
    write_iif(
        &mut out,
        &branch.condition,
        &branch.true_value,
        branch.false_value.as_ref(),
    );
    out
}

/// 渲染字面量
pub fn render_literal(value: &LiteralValue) -> String {
    match value {
        LiteralValue::String(s) => format!("\"{}\"", s.replace('"', "\"\"")),
        LiteralValue::Integer(n) => n.to_string(),
        LiteralValue::Number(n) => n.to_string(),
        LiteralValue::Boolean(true) => "True".to_string(),
        LiteralValue::Boolean(false) => "False".to_string(),
    }
}

fn write_ast(out: &mut String, ast: &Ast) {
    match ast {
        Ast::Literal(value) => out.push_str(&render_literal(value)),
        Ast::FieldReference(name) => {
            let _ = write!(out, "Fields!{}.Value", name);
        }
        Ast::ParameterReference(name) => {
            let _ = write!(out, "Parameters!{}.Value", name);
        }
        Ast::GlobalReference(name) => {
            let _ = write!(out, "Globals!{}", name);
        }
        Ast::BinaryOperation { op, left, right } => {
            write_ast(out, left);
            let _ = write!(out, " {} ", op);
            write_ast(out, right);
        }
        Ast::UnaryOperation { op, operand } => {
            out.push_str(op);
            if op.chars().all(char::is_alphabetic) {
                out.push(' ');
            }
            write_ast(out, operand);
        }
        Ast::FunctionCall { name, args } => write_call(out, name, args),
        Ast::Aggregate { function, args } => write_call(out, function, args),
        Ast::Conditional {
            condition,
            when_true,
            when_false,
        } => write_iif(out, condition, when_true, when_false.as_deref()),
    }
}

fn write_call(out: &mut String, name: &str, args: &[Ast]) {
    out.push_str(name);
    out.push('(');
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        write_ast(out, arg);
    }
    out.push(')');
}

fn write_iif(out: &mut String, condition: &Ast, when_true: &Ast, when_false: Option<&Ast>) {
    out.push_str(Ast::CONDITIONAL_TAG);
    out.push('(');
    write_ast(out, condition);
    out.push_str(", ");
    write_ast(out, when_true);
    out.push_str(", ");
    match when_false {
        Some(f) => write_ast(out, f),
        None => out.push_str("Nothing"),
    }
    out.push(')');
}
