//! # Fieldcode Core
//!
//! 域代码逻辑编译器：把文档模板中的域指令编译为报表表达式。
//!
//! ## 架构概述
//!
//! `fieldcode-core` 是纯逻辑核心，编译路径上没有任何 IO。
//!
//! ```text
//! run 标记流 ──► [复杂域组装] ──► FieldCode ──► [域代码解析] ──► Ast
//!                                                                  │
//!        ValidationResult ◄── [沙箱校验] ◄── [优化] ◄── [代码生成] ◄┘
//! ```
//!
//! 条件分析（[`conditional`]）从 IF 域的 AST 中提取分支，
//! 供代码生成单独渲染。
//!
//! ## 核心类型
//!
//! - [`FieldCode`]：文档中提取的一条域指令
//! - [`Ast`]：表达式语法树
//! - [`ConditionalBranch`]：条件分支
//! - [`ValidationResult`]：沙箱校验结果
//!
//! ## 使用示例
//!
//! ```ignore
//! use fieldcode_core::{FieldCode, FieldCodeParser, generate, optimize, validate};
//!
//! let code = FieldCode::new("f1", r#"IF Amount > 1000 "High" "Low""#);
//! let ast = FieldCodeParser::new().parse(&code)?;
//! let expression = optimize(&generate(&ast));
//! assert!(validate(&expression).is_valid);
//! ```
//!
//! ## 模块结构
//!
//! - [`field_code`]：域类型识别与开关提取
//! - [`ast`]：AST 定义
//! - [`parser`]：表达式/域代码解析与复杂域组装
//! - [`conditional`]：条件分析
//! - [`codegen`]：代码生成
//! - [`optimizer`]：表达式优化
//! - [`sandbox`]：沙箱校验
//! - [`validation`]：校验结果类型
//! - [`config`]：编译器配置
//! - [`error`]：错误类型定义
//! - [`id`]：id 生成

pub mod ast;
pub mod codegen;
pub mod conditional;
pub mod config;
pub mod error;
pub mod field_code;
pub mod id;
pub mod optimizer;
pub mod parser;
pub mod sandbox;
pub mod validation;

// 重导出核心类型
pub use ast::{Ast, DataType, LiteralValue, NodeType};
pub use codegen::{generate, generate_branch, render};
pub use conditional::{
    ConditionalBranch, analyze_conditions, dedup_branches, flatten_nested_conditions,
    nested_branches,
};
pub use config::{CompilerConfig, SandboxConfig};
pub use error::{CompileError, CompileResult, ConfigError};
pub use field_code::{FieldCode, FieldCodeType, determine_field_type, extract_switches};
pub use id::IdGenerator;
pub use optimizer::optimize;
pub use parser::{
    ComplexFieldAssembler, FieldCodeParser, ParsedField, Run, RunElement, assemble_fields,
    build_ast,
};
pub use sandbox::{SandboxValidator, validate, validate_or_err};
pub use validation::{Severity, ValidationMessage, ValidationResult};
