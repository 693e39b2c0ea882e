//! # Parser 测试
//!
//! 组装、域代码解析与表达式构建之间的联动。

use super::*;
use crate::ast::{Ast, DataType};
use crate::field_code::FieldCodeType;
use crate::id::IdGenerator;

fn instr(s: &str) -> RunElement {
    RunElement::Instruction(s.to_string())
}

fn text(s: &str) -> RunElement {
    RunElement::Text(s.to_string())
}

// -------------------------------------------------------------------------
// 组装 + 解析
// -------------------------------------------------------------------------

#[test]
fn test_split_merge_field_with_format_switch() {
    use RunElement::*;
    let ids = IdGenerator::new();
    let runs = vec![
        Run::new(vec![text("合计："), Begin, instr("MERGEFIELD ")]),
        Run::new(vec![instr(r#"Total \# "0.00""#), Separate]),
        Run::new(vec![text("12.00"), End]),
    ];

    let fields = assemble_fields(&runs, &ids);
    assert_eq!(fields.len(), 1);
    assert_eq!(fields[0].field_name.as_deref(), Some("Total"));
    assert_eq!(fields[0].switch('#'), Some("0.00"));

    let ast = FieldCodeParser::new().parse(&fields[0]).unwrap();
    assert_eq!(
        ast,
        Ast::call("Format", vec![Ast::field("Total"), Ast::string("0.00")])
    );
    assert_eq!(ast.data_type(), Some(DataType::String));
}

#[test]
fn test_nested_if_fields_become_nested_conditionals() {
    use RunElement::*;
    let ids = IdGenerator::new();
    let runs = vec![Run::new(vec![
        Begin,
        instr("IF a = 1 "),
        Begin,
        instr(r#"IF b = 2 "x" "y""#),
        Separate,
        text("y"),
        End,
        instr(r#" "z""#),
        Separate,
        text("z"),
        End,
    ])];

    let fields = assemble_fields(&runs, &ids);
    assert_eq!(fields.len(), 1);
    assert_eq!(fields[0].raw_code, r#"IF a = 1 { IF b = 2 "x" "y" } "z""#);
    assert_eq!(fields[0].nested_fields[0].field_type, FieldCodeType::If);

    let parsed = FieldCodeParser::new().parse_all(&fields).unwrap();
    let inner = Ast::conditional(
        Ast::binary("=", Ast::string("b"), Ast::int(2)),
        Ast::string("x"),
        Some(Ast::string("y")),
    );
    assert_eq!(
        parsed[0].ast,
        Ast::conditional(
            Ast::binary("=", Ast::string("a"), Ast::int(1)),
            inner,
            Some(Ast::string("z"))
        )
    );
}

#[test]
fn test_if_referencing_nested_merge_field() {
    use RunElement::*;
    let ids = IdGenerator::new();
    let runs = vec![Run::new(vec![
        Begin,
        instr("IF "),
        SimpleField("MERGEFIELD Score".to_string()),
        instr(r#" >= 60 "Pass" "Fail""#),
        End,
    ])];

    let fields = assemble_fields(&runs, &ids);
    let ast = FieldCodeParser::new().parse(&fields[0]).unwrap();
    assert_eq!(
        ast,
        Ast::conditional(
            Ast::binary(">=", Ast::field("Score"), Ast::int(60)),
            Ast::string("Pass"),
            Some(Ast::string("Fail"))
        )
    );
}

#[test]
fn test_page_fields_in_text() {
    use RunElement::*;
    let ids = IdGenerator::new();
    let runs = vec![Run::new(vec![
        text("第 "),
        SimpleField(" PAGE ".to_string()),
        text(" 页，共 "),
        Begin,
        instr("NUMPAGES"),
        Separate,
        text("3"),
        End,
        text(" 页"),
    ])];

    let fields = assemble_fields(&runs, &ids);
    let parsed = FieldCodeParser::new().parse_all(&fields).unwrap();
    let asts: Vec<_> = parsed.into_iter().map(|p| p.ast).collect();
    assert_eq!(
        asts,
        vec![Ast::global("PageNumber"), Ast::global("TotalPages")]
    );
}

// -------------------------------------------------------------------------
// 表达式构建
// -------------------------------------------------------------------------

#[test]
fn test_call_arguments_keep_quoted_commas() {
    assert_eq!(
        build_ast(r##"Format(Fields!Price.Value, "#,##0")"##),
        Ast::call("Format", vec![Ast::field("Price"), Ast::string("#,##0")])
    );
}

#[test]
fn test_nested_calls() {
    assert_eq!(
        build_ast("Round(Sum(Fields!Amount.Value), 2)"),
        Ast::call(
            "Round",
            vec![Ast::call("Sum", vec![Ast::field("Amount")]), Ast::int(2)]
        )
    );
}

#[test]
fn test_binary_split_with_reference_operands() {
    assert_eq!(
        build_ast("Len(Fields!A.Value) > 3"),
        Ast::binary(">", Ast::call("Len", vec![Ast::field("A")]), Ast::int(3))
    );
}

#[test]
fn test_operator_list_starts_with_logical_keywords() {
    assert_eq!(BINARY_OPERATORS[0], " And ");
    assert!(starts_with_ignore_case("MERGEFIELD x", "mergefield"));
    assert_eq!(
        split_top_level_args("a, (b, c), \"d, e\""),
        vec!["a", "(b, c)", "\"d, e\""]
    );
}
