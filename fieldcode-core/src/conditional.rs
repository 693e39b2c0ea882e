//! # 条件分析模块
//!
//! 把 IF 域归组为条件分支，并展开 AST 中嵌套的条件节点。

use serde::{Deserialize, Serialize};

use crate::ast::Ast;
use crate::field_code::FieldCodeType;
use crate::parser::ParsedField;

/// 条件分支
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionalBranch {
    pub id: String,
    pub condition: Ast,
    pub true_value: Ast,
    pub false_value: Option<Ast>,
    /// 来源域代码 id
    pub source_location: String,
}

impl ConditionalBranch {
    /// 条件/真值/假值是否与另一分支相同（忽略 id 与来源）
    pub fn same_logic(&self, other: &ConditionalBranch) -> bool {
        self.condition == other.condition
            && self.true_value == other.true_value
            && self.false_value == other.false_value
    }

    /// 分支的子 AST（条件、真值、假值）
    fn parts(&self) -> impl Iterator<Item = &Ast> {
        [Some(&self.condition), Some(&self.true_value), self.false_value.as_ref()]
            .into_iter()
            .flatten()
    }
}

/// 从已解析的域中提取条件分支
///
/// 只处理已解析为条件节点的 IF 域；降级为字面量的 IF 被跳过。
pub fn analyze_conditions(fields: &[ParsedField]) -> Vec<ConditionalBranch> {
    fields
        .iter()
        .filter(|field| field.code.field_type == FieldCodeType::If)
        .filter_map(|field| match &field.ast {
            Ast::Conditional {
                condition,
                when_true,
                when_false,
            } => Some(ConditionalBranch {
                id: format!("{}_branch", field.code.id),
                condition: condition.as_ref().clone(),
                true_value: when_true.as_ref().clone(),
                false_value: when_false.as_deref().cloned(),
                source_location: field.code.id.clone(),
            }),
            _ => None,
        })
        .collect()
}

/// 展开单个分支中嵌套的条件节点
///
/// 依次遍历条件、真值、假值；每遇到一个条件节点就合成一个新分支，
/// 并继续遍历该新分支自身的子节点。返回值不包含输入分支本身。
pub fn nested_branches(branch: &ConditionalBranch) -> Vec<ConditionalBranch> {
    let mut out = Vec::new();
    let mut counter = 0usize;
    for part in branch.parts() {
        collect_nested(part, branch, &mut counter, &mut out);
    }
    out
}

fn collect_nested(
    node: &Ast,
    origin: &ConditionalBranch,
    counter: &mut usize,
    out: &mut Vec<ConditionalBranch>,
) {
    if let Ast::Conditional {
        condition,
        when_true,
        when_false,
    } = node
    {
        *counter += 1;
        let synthesized = ConditionalBranch {
            id: format!("{}_{}", origin.id, counter),
            condition: condition.as_ref().clone(),
            true_value: when_true.as_ref().clone(),
            false_value: when_false.as_deref().cloned(),
            source_location: origin.source_location.clone(),
        };
        let children: Vec<Ast> = synthesized.parts().cloned().collect();
        out.push(synthesized);
        for child in &children {
            collect_nested(child, origin, counter, out);
        }
        return;
    }

    for child in node.children() {
        collect_nested(child, origin, counter, out);
    }
}

/// 展开一组分支：原分支在前，随后是所有嵌套分支，按逻辑去重
///
/// 对已展开的结果再次调用不会产生新分支。
pub fn flatten_nested_conditions(branches: &[ConditionalBranch]) -> Vec<ConditionalBranch> {
    let mut all = branches.to_vec();
    for branch in branches {
        all.extend(nested_branches(branch));
    }
    dedup_branches(all)
}

/// 按条件/真值/假值结构去重，保留首次出现的分支
pub fn dedup_branches(branches: Vec<ConditionalBranch>) -> Vec<ConditionalBranch> {
    let mut unique: Vec<ConditionalBranch> = Vec::with_capacity(branches.len());
    for branch in branches {
        if !unique.iter().any(|kept| kept.same_logic(&branch)) {
            unique.push(branch);
        }
    }
    unique
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field_code::FieldCode;
    use crate::parser::{FieldCodeParser, parse_if};

    fn parsed(id: &str, raw: &str) -> ParsedField {
        let code = FieldCode::new(id, raw);
        let ast = FieldCodeParser::new().parse(&code).unwrap();
        ParsedField { code, ast }
    }

    fn branch(id: &str, ast: Ast) -> ConditionalBranch {
        let Ast::Conditional {
            condition,
            when_true,
            when_false,
        } = ast
        else {
            panic!("not a conditional");
        };
        ConditionalBranch {
            id: id.to_string(),
            condition: *condition,
            true_value: *when_true,
            false_value: when_false.map(|b| *b),
            source_location: id.to_string(),
        }
    }

    #[test]
    fn test_analyze_conditions_filters_if_fields() {
        let fields = vec![
            parsed("f1", r#"IF { MERGEFIELD Amount } > 1000 "High" "Low""#),
            parsed("f2", "MERGEFIELD Name"),
            parsed("f3", "IF"),
            parsed("f4", r#"IF x = 1 "Yes""#),
        ];

        let branches = analyze_conditions(&fields);
        assert_eq!(branches.len(), 2);

        assert_eq!(branches[0].id, "f1_branch");
        assert_eq!(branches[0].source_location, "f1");
        assert_eq!(
            branches[0].condition,
            Ast::binary(">", Ast::field("Amount"), Ast::int(1000))
        );
        assert_eq!(branches[0].true_value, Ast::string("High"));
        assert_eq!(branches[0].false_value, Some(Ast::string("Low")));

        assert_eq!(branches[1].source_location, "f4");
        assert_eq!(branches[1].false_value, None);
    }

    #[test]
    fn test_nested_branches() {
        let outer = branch(
            "b",
            parse_if(r#"IF a = 1 { IF b = 2 { IF c = 3 "p" "q" } "y" } "z""#),
        );

        let nested = nested_branches(&outer);
        assert_eq!(nested.len(), 2);
        assert_eq!(nested[0].id, "b_1");
        assert_eq!(
            nested[0].condition,
            Ast::binary("=", Ast::string("b"), Ast::int(2))
        );
        assert_eq!(nested[1].id, "b_2");
        assert_eq!(
            nested[1].condition,
            Ast::binary("=", Ast::string("c"), Ast::int(3))
        );
        assert!(nested.iter().all(|b| b.source_location == "b"));
    }

    #[test]
    fn test_nested_inside_function_call() {
        let outer = ConditionalBranch {
            id: "b".to_string(),
            condition: Ast::bool(true),
            true_value: Ast::call(
                "UCase",
                vec![Ast::conditional(
                    Ast::bool(false),
                    Ast::string("x"),
                    None,
                )],
            ),
            false_value: None,
            source_location: "f".to_string(),
        };
        assert_eq!(nested_branches(&outer).len(), 1);
    }

    #[test]
    fn test_flatten_is_idempotent_without_nesting() {
        let fields = vec![
            parsed("f1", r#"IF a = 1 "x" "y""#),
            parsed("f2", r#"IF b = 2 "x""#),
        ];
        let branches = analyze_conditions(&fields);
        assert_eq!(flatten_nested_conditions(&branches), branches);
    }

    #[test]
    fn test_flatten_appends_nested_and_is_stable() {
        let fields = vec![parsed("f1", r#"IF a = 1 { IF b = 2 "x" "y" } "z""#)];
        let branches = analyze_conditions(&fields);

        let flat = flatten_nested_conditions(&branches);
        assert_eq!(flat.len(), 2);
        assert_eq!(flat[1].id, "f1_branch_1");

        let again = flatten_nested_conditions(&flat);
        assert_eq!(again, flat);
    }

    #[test]
    fn test_dedup_branches_by_logic() {
        let a = branch("a", parse_if(r#"IF a = 1 "x" "y""#));
        let b = branch("b", parse_if(r#"IF a = 1 "x" "y""#));
        let c = branch("c", parse_if(r#"IF a = 1 "x""#));

        let unique = dedup_branches(vec![a.clone(), b, c.clone()]);
        assert_eq!(unique, vec![a, c]);
    }
}
