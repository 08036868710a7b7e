use crate::representative::CornerTag;

/// 生成点编号：`{prefix}{counter}`，非中心角点追加 `_{角标}`。返回编号与下一个计数值。
///
/// 计数到 `u64::MAX` 后不再前进；调用方负责事先确认编号区间不会越界。
pub fn name(counter: u64, prefix: &str, corner: Option<CornerTag>) -> (String, u64) {
    let id = match corner {
        Some(tag) if tag != CornerTag::Center => format!("{prefix}{counter}_{}", tag.as_str()),
        _ => format!("{prefix}{counter}"),
    };
    (id, counter.saturating_add(1))
}

/// 一次提取内共享的计数器，实例与顶层两轮都从这里取号。
#[derive(Debug, Clone)]
pub struct Sequencer {
    prefix: String,
    next: u64,
}

impl Sequencer {
    pub fn new(prefix: impl Into<String>, start: u64) -> Self {
        Self {
            prefix: prefix.into(),
            next: start,
        }
    }

    pub fn next_id(&mut self, corner: Option<CornerTag>) -> String {
        let (id, next) = name(self.next, &self.prefix, corner);
        self.next = next;
        id
    }

    #[inline]
    pub fn peek(&self) -> u64 {
        self.next
    }
}
