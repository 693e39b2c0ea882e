//! # Parser 模块
//!
//! 域代码与表达式的解析实现。
//!
//! ## 架构
//!
//! ```text
//! run 标记流 → [复杂域组装] → Vec<FieldCode> → [域代码解析] → Ast
//!                                                  │
//!                                                  └─ 表达式文本 → [AST 构建] → Ast
//! ```
//!
//! ## 模块结构
//!
//! - `helpers`: 辅助扫描函数
//! - `ast_builder`: 通用表达式 → AST
//! - `field_parser`: 按域类型构建 AST
//! - `complex_field`: Begin/Separate/End 状态机

mod ast_builder;
mod complex_field;
mod field_parser;
mod helpers;

#[cfg(test)]
mod tests;

pub use ast_builder::{BINARY_OPERATORS, MAX_BUILD_DEPTH, build_ast};
pub use complex_field::{ComplexFieldAssembler, Run, RunElement, assemble_fields};
pub use field_parser::{FieldCodeParser, ParsedField, parse_condition, parse_if, parse_value};
pub use helpers::{split_top_level_args, starts_with_ignore_case};
pub(crate) use helpers::find_matching_paren;
