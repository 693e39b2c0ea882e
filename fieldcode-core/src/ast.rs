//! # AST 模块
//!
//! 域代码与表达式的抽象语法树。
//!
//! ## 设计原则
//!
//! - 封闭的枚举类型，生成器与分析器对节点种类做穷尽匹配
//! - 子节点数量由类型保证：叶子节点无子节点，二元运算恰好 2 个，
//!   一元运算恰好 1 个，条件节点 2 或 3 个
//! - 自顶向下构建，构建后不可变

use serde::{Deserialize, Serialize};

/// 节点种类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeType {
    Literal,
    FieldReference,
    ParameterReference,
    GlobalReference,
    BinaryOperation,
    UnaryOperation,
    FunctionCall,
    Conditional,
    Aggregate,
}

/// 推断的数据类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataType {
    Integer,
    Number,
    Boolean,
    String,
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Integer => write!(f, "Integer"),
            Self::Number => write!(f, "Number"),
            Self::Boolean => write!(f, "Boolean"),
            Self::String => write!(f, "String"),
        }
    }
}

/// 字面量值
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum LiteralValue {
    String(String),
    Integer(i64),
    Number(f64),
    Boolean(bool),
}

impl LiteralValue {
    /// 字面量的数据类型
    pub fn data_type(&self) -> DataType {
        match self {
            Self::String(_) => DataType::String,
            Self::Integer(_) => DataType::Integer,
            Self::Number(_) => DataType::Number,
            Self::Boolean(_) => DataType::Boolean,
        }
    }

    /// 按文本内容推断字面量（整数 → 浮点 → 布尔 → 字符串）
    pub fn infer(text: &str) -> Self {
        if let Ok(n) = text.parse::<i64>() {
            return Self::Integer(n);
        }
        if let Some(n) = parse_number(text) {
            return Self::Number(n);
        }
        if text.eq_ignore_ascii_case("true") {
            return Self::Boolean(true);
        }
        if text.eq_ignore_ascii_case("false") {
            return Self::Boolean(false);
        }
        Self::String(text.to_string())
    }
}

/// 解析有限浮点数（拒绝 `inf`/`NaN` 这类文本）
pub(crate) fn parse_number(text: &str) -> Option<f64> {
    if !text.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }
    text.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// 比较与逻辑运算符，结果为布尔
const BOOLEAN_OPERATORS: &[&str] = &["=", "<>", "<", ">", "<=", ">=", "And", "Or"];

/// 返回字符串的函数
const STRING_FUNCTIONS: &[&str] = &[
    "Format", "UCase", "LCase", "Trim", "LTrim", "RTrim", "Left", "Right", "Mid", "CStr",
];

/// AST 节点
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Ast {
    /// 字面量
    Literal(LiteralValue),

    /// 数据集字段引用 `Fields!<name>.Value`
    FieldReference(String),

    /// 报表参数引用 `Parameters!<name>.Value`
    ParameterReference(String),

    /// 全局变量引用 `Globals!<name>`
    GlobalReference(String),

    /// 二元运算
    BinaryOperation {
        op: String,
        left: Box<Ast>,
        right: Box<Ast>,
    },

    /// 一元运算
    UnaryOperation { op: String, operand: Box<Ast> },

    /// 函数调用，参数按调用顺序
    FunctionCall { name: String, args: Vec<Ast> },

    /// 条件（`IIf`）
    Conditional {
        condition: Box<Ast>,
        when_true: Box<Ast>,
        when_false: Option<Box<Ast>>,
    },

    /// 聚合函数（如 `Sum`）
    Aggregate { function: String, args: Vec<Ast> },
}

impl Ast {
    /// 条件节点在目标语法中的标签
    pub const CONDITIONAL_TAG: &'static str = "IIf";

    /// 创建字符串字面量
    pub fn string(s: impl Into<String>) -> Self {
        Self::Literal(LiteralValue::String(s.into()))
    }

    /// 创建整数字面量
    pub fn int(n: i64) -> Self {
        Self::Literal(LiteralValue::Integer(n))
    }

    /// 创建浮点字面量
    pub fn number(n: f64) -> Self {
        Self::Literal(LiteralValue::Number(n))
    }

    /// 创建布尔字面量
    pub fn bool(b: bool) -> Self {
        Self::Literal(LiteralValue::Boolean(b))
    }

    /// 创建字段引用
    pub fn field(name: impl Into<String>) -> Self {
        Self::FieldReference(name.into())
    }

    /// 创建参数引用
    pub fn parameter(name: impl Into<String>) -> Self {
        Self::ParameterReference(name.into())
    }

    /// 创建全局变量引用
    pub fn global(name: impl Into<String>) -> Self {
        Self::GlobalReference(name.into())
    }

    /// 创建二元运算
    pub fn binary(op: impl Into<String>, left: Ast, right: Ast) -> Self {
        Self::BinaryOperation {
            op: op.into(),
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    /// 创建一元运算
    pub fn unary(op: impl Into<String>, operand: Ast) -> Self {
        Self::UnaryOperation {
            op: op.into(),
            operand: Box::new(operand),
        }
    }

    /// 创建函数调用
    pub fn call(name: impl Into<String>, args: Vec<Ast>) -> Self {
        Self::FunctionCall {
            name: name.into(),
            args,
        }
    }

    /// 创建条件节点
    pub fn conditional(condition: Ast, when_true: Ast, when_false: Option<Ast>) -> Self {
        Self::Conditional {
            condition: Box::new(condition),
            when_true: Box::new(when_true),
            when_false: when_false.map(Box::new),
        }
    }

    /// 创建聚合节点
    pub fn aggregate(function: impl Into<String>, args: Vec<Ast>) -> Self {
        Self::Aggregate {
            function: function.into(),
            args,
        }
    }

    /// 节点种类
    pub fn node_type(&self) -> NodeType {
        match self {
            Self::Literal(_) => NodeType::Literal,
            Self::FieldReference(_) => NodeType::FieldReference,
            Self::ParameterReference(_) => NodeType::ParameterReference,
            Self::GlobalReference(_) => NodeType::GlobalReference,
            Self::BinaryOperation { .. } => NodeType::BinaryOperation,
            Self::UnaryOperation { .. } => NodeType::UnaryOperation,
            Self::FunctionCall { .. } => NodeType::FunctionCall,
            Self::Conditional { .. } => NodeType::Conditional,
            Self::Aggregate { .. } => NodeType::Aggregate,
        }
    }

    /// 子节点（按语义顺序）
    pub fn children(&self) -> Vec<&Ast> {
        match self {
            Self::Literal(_)
            | Self::FieldReference(_)
            | Self::ParameterReference(_)
            | Self::GlobalReference(_) => Vec::new(),
            Self::BinaryOperation { left, right, .. } => vec![left.as_ref(), right.as_ref()],
            Self::UnaryOperation { operand, .. } => vec![operand.as_ref()],
            Self::FunctionCall { args, .. } | Self::Aggregate { args, .. } => {
                args.iter().collect()
            }
            Self::Conditional {
                condition,
                when_true,
                when_false,
            } => {
                let mut children = vec![condition.as_ref(), when_true.as_ref()];
                if let Some(f) = when_false {
                    children.push(f.as_ref());
                }
                children
            }
        }
    }

    /// 是否为叶子节点
    pub fn is_leaf(&self) -> bool {
        matches!(
            self,
            Self::Literal(_)
                | Self::FieldReference(_)
                | Self::ParameterReference(_)
                | Self::GlobalReference(_)
        )
    }

    /// 推断的数据类型（引用类节点无法推断，返回 `None`）
    pub fn data_type(&self) -> Option<DataType> {
        match self {
            Self::Literal(value) => Some(value.data_type()),
            Self::FieldReference(_) | Self::ParameterReference(_) | Self::GlobalReference(_) => {
                None
            }
            Self::BinaryOperation { op, .. } => {
                if BOOLEAN_OPERATORS.contains(&op.as_str()) {
                    Some(DataType::Boolean)
                } else {
                    Some(DataType::Number)
                }
            }
            Self::UnaryOperation { op, operand } => {
                if op.eq_ignore_ascii_case("Not") {
                    Some(DataType::Boolean)
                } else {
                    operand.data_type()
                }
            }
            Self::FunctionCall { name, .. } => STRING_FUNCTIONS
                .iter()
                .any(|f| f.eq_ignore_ascii_case(name))
                .then_some(DataType::String),
            Self::Conditional { when_true, .. } => when_true.data_type(),
            Self::Aggregate { .. } => Some(DataType::Number),
        }
    }

    /// 符号名（引用、函数调用、聚合、条件标签）
    pub fn symbol(&self) -> Option<&str> {
        match self {
            Self::FieldReference(name)
            | Self::ParameterReference(name)
            | Self::GlobalReference(name)
            | Self::FunctionCall { name, .. } => Some(name.as_str()),
            Self::Aggregate { function, .. } => Some(function.as_str()),
            Self::Conditional { .. } => Some(Self::CONDITIONAL_TAG),
            _ => None,
        }
    }

    /// 运算符（仅二元/一元运算）
    pub fn operator_symbol(&self) -> Option<&str> {
        match self {
            Self::BinaryOperation { op, .. } | Self::UnaryOperation { op, .. } => Some(op.as_str()),
            _ => None,
        }
    }
}
