//! # 复杂域组装器
//!
//! 从文档 run 中的 Begin/Separate/End 标记流重建完整的域指令文本。
//!
//! ## 状态转换
//!
//! ```text
//! NotInField --Begin--> InField            开始新的指令缓冲
//! InField    --Begin--> InField            当前缓冲入栈，为嵌套域开始新缓冲
//! InField    --Separate--> InField         之后是缓存的结果文本，不再收集指令
//! InField    --End-->   InField/NotInField 完成当前域；栈非空则恢复父缓冲
//! ```
//!
//! 嵌套使用显式栈而非递归，任意深度的畸形输入都不会耗尽调用栈。
//! 嵌套域完成后以 `{ <指令> }` 的形式拼回父指令，并记录到父域的 `nested_fields`。
//! 流结束时仍未闭合的域被静默丢弃。

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::field_code::FieldCode;
use crate::id::IdGenerator;

/// run 中的元素
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunElement {
    /// 域开始标记
    Begin,
    /// 指令与结果的分隔标记
    Separate,
    /// 域结束标记
    End,
    /// 指令文本片段
    Instruction(String),
    /// 普通文本（域外正文或域的缓存结果）
    Text(String),
    /// 单 run 的简单域，直接携带完整指令
    SimpleField(String),
}

/// 文档 run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Run {
    pub elements: Vec<RunElement>,
}

impl Run {
    pub fn new(elements: Vec<RunElement>) -> Self {
        Self { elements }
    }
}

/// 正在构建的域指令
#[derive(Debug, Default)]
struct FieldBuffer {
    instruction: String,
    nested: Vec<FieldCode>,
    /// 已越过 Separate，后续内容属于缓存结果
    in_result: bool,
}

#[derive(Debug)]
enum AssemblerState {
    NotInField,
    InField(FieldBuffer),
}

/// 复杂域组装器
#[derive(Debug)]
pub struct ComplexFieldAssembler<'a> {
    ids: &'a IdGenerator,
    state: AssemblerState,
    /// 被嵌套域打断的父缓冲
    stack: Vec<FieldBuffer>,
    completed: Vec<FieldCode>,
}

impl<'a> ComplexFieldAssembler<'a> {
    pub fn new(ids: &'a IdGenerator) -> Self {
        Self {
            ids,
            state: AssemblerState::NotInField,
            stack: Vec::new(),
            completed: Vec::new(),
        }
    }

    /// 当前是否处于域内
    pub fn in_field(&self) -> bool {
        matches!(self.state, AssemblerState::InField(_))
    }

    /// 当前嵌套深度（域外为 0）
    pub fn depth(&self) -> usize {
        match self.state {
            AssemblerState::NotInField => 0,
            AssemblerState::InField(_) => self.stack.len() + 1,
        }
    }

    /// 输入一个 run
    pub fn feed_run(&mut self, run: &Run) {
        for element in &run.elements {
            self.feed(element);
        }
    }

    /// 输入一个元素
    pub fn feed(&mut self, element: &RunElement) {
        match element {
            RunElement::Begin => {
                let fresh = FieldBuffer::default();
                match std::mem::replace(&mut self.state, AssemblerState::InField(fresh)) {
                    AssemblerState::NotInField => {}
                    AssemblerState::InField(parent) => self.stack.push(parent),
                }
            }
            RunElement::Separate => {
                if let AssemblerState::InField(buffer) = &mut self.state {
                    buffer.in_result = true;
                }
            }
            RunElement::End => self.end_field(),
            RunElement::Instruction(text) => {
                if let AssemblerState::InField(buffer) = &mut self.state
                    && !buffer.in_result
                {
                    buffer.instruction.push_str(text);
                }
            }
            RunElement::Text(_) => {}
            RunElement::SimpleField(instruction) => {
                let instruction = instruction.trim();
                if !instruction.is_empty() {
                    let code = FieldCode::new(self.ids.next_id("field"), instruction);
                    self.attach(code);
                }
            }
        }
    }

    /// 结束输入，返回顶层域（嵌套域位于各自父域的 `nested_fields` 中）
    pub fn finish(self) -> Vec<FieldCode> {
        if let AssemblerState::InField(_) = self.state {
            debug!(dropped = self.stack.len() + 1, "丢弃未闭合的域");
        }
        self.completed
    }

    fn end_field(&mut self) {
        let buffer = match std::mem::replace(&mut self.state, AssemblerState::NotInField) {
            AssemblerState::NotInField => {
                debug!("忽略域外的 End 标记");
                return;
            }
            AssemblerState::InField(buffer) => buffer,
        };

        if let Some(parent) = self.stack.pop() {
            self.state = AssemblerState::InField(parent);
        }

        let instruction = buffer.instruction.trim();
        if instruction.is_empty() {
            debug!("丢弃空指令的域");
            return;
        }

        let code = FieldCode::new(self.ids.next_id("field"), instruction)
            .with_nested(buffer.nested);
        debug!(id = %code.id, field_type = %code.field_type, "域组装完成");
        self.attach(code);
    }

    /// 把完成的域交给父缓冲（嵌套）或输出列表（顶层）
    fn attach(&mut self, code: FieldCode) {
        match &mut self.state {
            AssemblerState::NotInField => self.completed.push(code),
            AssemblerState::InField(parent) if parent.in_result => {
                debug!(id = %code.id, "忽略缓存结果中的域");
            }
            AssemblerState::InField(parent) => {
                parent.instruction.push_str("{ ");
                parent.instruction.push_str(&code.raw_code);
                parent.instruction.push_str(" }");
                parent.nested.push(code);
            }
        }
    }
}

/// 组装一组 run 中的所有域
pub fn assemble_fields(runs: &[Run], ids: &IdGenerator) -> Vec<FieldCode> {
    let mut assembler = ComplexFieldAssembler::new(ids);
    for run in runs {
        assembler.feed_run(run);
    }
    assembler.finish()
}
