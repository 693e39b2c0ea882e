//! # Id 模块
//!
//! 单调递增的 id 生成器，用于合成 `FieldCode` 与条件分支的 id。
//!
//! 每个转换任务持有一个生成器；内部为原子计数器，可跨线程共享。

use std::sync::atomic::{AtomicU64, Ordering};

/// id 生成器
#[derive(Debug, Default)]
pub struct IdGenerator {
    counter: AtomicU64,
}

impl IdGenerator {
    /// 创建从 1 开始计数的生成器
    pub fn new() -> Self {
        Self::default()
    }

    /// 生成下一个 id，格式为 `<prefix>_<n>`
    pub fn next_id(&self, prefix: &str) -> String {
        let n = self.counter.fetch_add(1, Ordering::Relaxed) + 1;
        format!("{}_{}", prefix, n)
    }

    /// 已生成的 id 数量
    pub fn issued(&self) -> u64 {
        self.counter.load(Ordering::Relaxed)
    }
}
