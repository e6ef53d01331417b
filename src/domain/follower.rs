//! 粉丝模型与粉丝名单

use serde::{Deserialize, Serialize};

/// 启动时最多加载的粉丝数
pub const MAX_LOADED_FANS: u64 = 1000;

/// 单个粉丝
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Follower {
    /// 显示名称
    pub uname: String,
    /// 用户 mid
    pub mid: u64,
}

impl Follower {
    pub fn new(uname: impl Into<String>, mid: u64) -> Self {
        Self {
            uname: uname.into(),
            mid,
        }
    }

    /// 个人空间链接
    pub fn space_url(&self) -> String {
        format!("https://space.bilibili.com/{}", self.mid)
    }
}

/// 粉丝名单
///
/// `fans` 按关注时间倒序排列；`pending_new` 是尚未打过招呼的新粉丝，
/// 每个新粉丝只会被识别一次。
#[derive(Debug, Clone, Default)]
pub struct FollowerRoster {
    fans: Vec<Follower>,
    pending_new: Vec<Follower>,
}

impl FollowerRoster {
    pub fn new() -> Self {
        Self::default()
    }

    /// 全量替换粉丝列表
    pub fn replace_all(&mut self, fans: Vec<Follower>) {
        self.fans = fans;
    }

    /// 合并新关注的粉丝：插入列表头部并加入待欢迎队列
    pub fn merge_new(&mut self, new_fans: Vec<Follower>) {
        if new_fans.is_empty() {
            return;
        }
        self.fans
            .retain(|fan| !new_fans.iter().any(|new| new.mid == fan.mid));
        for fan in &new_fans {
            if !self.pending_new.iter().any(|p| p.mid == fan.mid) {
                self.pending_new.push(fan.clone());
            }
        }
        self.fans.splice(0..0, new_fans);
    }

    pub fn is_fan(&self, mid: u64) -> bool {
        self.fans.iter().any(|fan| fan.mid == mid)
    }

    /// 判断并消费新粉丝标记，仅生效一次
    pub fn take_new_fan(&mut self, mid: u64) -> bool {
        match self.pending_new.iter().position(|fan| fan.mid == mid) {
            Some(idx) => {
                self.pending_new.remove(idx);
                true
            }
            None => false,
        }
    }

    /// 待欢迎的新粉丝（按关注顺序）
    pub fn pending_new_fans(&self) -> &[Follower] {
        &self.pending_new
    }

    pub fn fans(&self) -> &[Follower] {
        &self.fans
    }

    pub fn len(&self) -> usize {
        self.fans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fans.is_empty()
    }
}
