//! 重复消息保护
//!
//! 对每个用户记住最近 `n + 1` 条回复，窗口填满且内容完全相同时不再发送。
//! 最多跟踪 `MAX_TRACKED_SENDERS` 个用户，超出时丢掉最久没有回复过的那个。

use std::collections::{HashMap, VecDeque};

pub const MAX_TRACKED_SENDERS: usize = 1000;

#[derive(Debug, Default)]
struct History {
    window: usize,
    replies: VecDeque<String>,
    last_seen: u64,
}

#[derive(Debug)]
pub struct RepeatGuard {
    history: HashMap<u64, History>,
    capacity: usize,
    clock: u64,
}

impl Default for RepeatGuard {
    fn default() -> Self {
        Self::with_capacity(MAX_TRACKED_SENDERS)
    }
}

impl RepeatGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            history: HashMap::new(),
            capacity: capacity.max(1),
            clock: 0,
        }
    }

    /// 记录一条将要发给 `sender` 的回复，返回 true 表示应当拦截。
    ///
    /// `protect_times` 为 0 时不做保护，也不记录。
    pub fn should_suppress(&mut self, sender: u64, reply: &str, protect_times: u32) -> bool {
        if protect_times == 0 {
            return false;
        }
        let window = protect_times as usize + 1;

        if !self.history.contains_key(&sender) && self.history.len() >= self.capacity {
            self.evict_idlest();
        }
        self.clock += 1;
        let history = self.history.entry(sender).or_default();
        history.last_seen = self.clock;
        if history.window != window {
            history.window = window;
            history.replies.clear();
        }

        history.replies.push_back(reply.to_string());
        while history.replies.len() > window {
            history.replies.pop_front();
        }

        if history.replies.len() < window {
            return false;
        }
        history.replies.iter().all(|r| r == reply)
    }

    /// 已跟踪的用户数
    pub fn tracked(&self) -> usize {
        self.history.len()
    }

    fn evict_idlest(&mut self) {
        let idlest = self
            .history
            .iter()
            .min_by_key(|(_, history)| history.last_seen)
            .map(|(sender, _)| *sender);
        if let Some(sender) = idlest {
            self.history.remove(&sender);
        }
    }
}
