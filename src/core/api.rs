//! B站接口抽象
//!
//! 引擎只依赖这个 trait，真实实现见 `infrastructure::bilibili`。

use std::collections::HashMap;

use async_trait::async_trait;
use serde::Deserialize;

use crate::domain::{Account, Follower, LoginPoll, QrLogin, Session, VideoStats};
use crate::errors::Result;

/// 新关注未读状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub struct NewFollowerStatus {
    /// 未读的新关注数
    #[serde(default)]
    pub count: u64,
    /// 上次查看粉丝列表的时间戳
    #[serde(default)]
    pub time: i64,
}

#[async_trait]
pub trait BiliApi: Send + Sync {
    /// 申请登录二维码
    async fn generate_login_qrcode(&self) -> Result<QrLogin>;

    /// 查询扫码状态
    async fn poll_login(&self, qrcode_key: &str) -> Result<LoginPoll>;

    /// 当前登录账号；未登录时返回错误
    async fn account_info(&self) -> Result<Account>;

    /// 粉丝总数
    async fn follower_count(&self, mid: u64) -> Result<u64>;

    /// 分页获取粉丝，页码从 1 开始
    async fn followers_page(&self, mid: u64, page: u64, size: u64) -> Result<Vec<Follower>>;

    async fn new_follower_status(&self) -> Result<NewFollowerStatus>;

    /// 获取最近 `count` 个新关注
    async fn new_followers(&self, mid: u64, count: u64, last_access_ts: i64) -> Result<Vec<Follower>>;

    /// 时间窗口内有更新的会话，时间戳单位为微秒
    async fn sessions_between(&self, begin_ts: i64, end_ts: i64) -> Result<Vec<Session>>;

    /// 用户昵称
    async fn user_name(&self, mid: u64) -> Result<String>;

    async fn video_stats(&self) -> Result<VideoStats>;

    /// 发送私信，正文末尾会附加自动回复标识
    async fn send_message(&self, receiver: u64, text: &str) -> Result<()>;

    /// 导出当前 cookies
    fn export_cookies(&self) -> HashMap<String, String>;

    /// 导入 cookies（覆盖同名项）
    fn import_cookies(&self, cookies: HashMap<String, String>);
}
