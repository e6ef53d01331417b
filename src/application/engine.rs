//! 自动回复引擎
//!
//! 三个独立循环共享同一份状态：
//! - 自动回复：新粉丝欢迎 + 私信回复，间隔取自设置
//! - 数据更新：每小时刷新创作中心数据
//! - 状态发布：每秒写出状态快照供面板读取
//!
//! 循环内出错时该循环暂停一段时间后自动恢复。

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, RwLock};
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::config::DataPaths;
use crate::core::api::BiliApi;
use crate::core::repeat::RepeatGuard;
use crate::core::reply::select_reply;
use crate::core::settings_store::SettingsStore;
use crate::core::status::{StatusBoard, StatusSnapshot};
use crate::domain::{
    Account, Audience, Follower, FollowerRoster, LoginPoll, LoginStatus, Settings, VideoStats,
    MAX_LOADED_FANS,
};
use crate::errors::{BiliMateError, Result};
use crate::infrastructure::cookies::{load_cookie_file, save_cookie_file};
use crate::infrastructure::qr;
use crate::logger::{cookie_names, Timer};

/// 粉丝列表分页大小
pub const FANS_PAGE_SIZE: u64 = 50;

/// 各循环的节奏
#[derive(Debug, Clone)]
pub struct EngineTimings {
    /// 扫码状态轮询间隔
    pub login_poll: Duration,
    /// 创作中心数据刷新间隔
    pub stats_interval: Duration,
    /// 循环出错后的暂停时长
    pub error_backoff: Duration,
    /// 状态快照发布间隔
    pub publish_interval: Duration,
}

impl Default for EngineTimings {
    fn default() -> Self {
        Self {
            login_poll: Duration::from_secs(1),
            stats_interval: Duration::from_secs(3600),
            error_backoff: Duration::from_secs(10 * 60),
            publish_interval: Duration::from_secs(1),
        }
    }
}

#[derive(Debug, Default)]
struct BotState {
    login_status: LoginStatus,
    login_url: String,
    login_time_cnt: u64,
    account: Option<Account>,
    roster: FollowerRoster,
    follower_total: u64,
    stats: VideoStats,
    stats_running: bool,
    reply_running: bool,
    /// 上一次成功查询会话的结束时间（微秒）
    last_session_ts: i64,
    /// 有过动静，待输出一次“持续监测中”
    notice_pending: bool,
    repeat: RepeatGuard,
}

pub struct BiliMateEngine {
    api: Arc<dyn BiliApi>,
    settings: SettingsStore,
    status: StatusBoard,
    cookies_path: PathBuf,
    timings: EngineTimings,
    state: RwLock<BotState>,
}

impl BiliMateEngine {
    pub fn new(api: Arc<dyn BiliApi>, paths: &DataPaths) -> Self {
        Self {
            api,
            settings: SettingsStore::new(paths.settings()),
            status: StatusBoard::new(paths.status()),
            cookies_path: paths.cookies(),
            timings: EngineTimings::default(),
            state: RwLock::new(BotState {
                notice_pending: true,
                ..Default::default()
            }),
        }
    }

    pub fn with_timings(mut self, timings: EngineTimings) -> Self {
        self.timings = timings;
        self
    }

    pub fn settings_store(&self) -> &SettingsStore {
        &self.settings
    }

    // ==================== 状态 ====================

    pub async fn login_status(&self) -> LoginStatus {
        self.state.read().await.login_status
    }

    pub async fn account(&self) -> Option<Account> {
        self.state.read().await.account.clone()
    }

    pub async fn fans(&self) -> Vec<Follower> {
        self.state.read().await.roster.fans().to_vec()
    }

    pub async fn pending_new_fans(&self) -> Vec<Follower> {
        self.state.read().await.roster.pending_new_fans().to_vec()
    }

    pub async fn stats(&self) -> VideoStats {
        self.state.read().await.stats
    }

    pub async fn snapshot(&self) -> StatusSnapshot {
        let state = self.state.read().await;
        StatusSnapshot {
            login_status: state.login_status,
            login_url: state.login_url.clone(),
            login_time_cnt: state.login_time_cnt,
            my_uname: state.account.as_ref().map(|a| a.uname.clone()).unwrap_or_default(),
            my_mid: state.account.as_ref().map(|a| a.mid).unwrap_or_default(),
            stats: state.stats,
            fans_list: state.roster.fans().to_vec(),
            state_info_status: state.stats_running,
            reply_info_status: state.reply_running,
            time_stamp: chrono::Utc::now().timestamp_millis(),
        }
    }

    pub async fn publish_status(&self) -> Result<()> {
        let snapshot = self.snapshot().await;
        self.status.publish(&snapshot).await
    }

    async fn my_mid(&self) -> Result<u64> {
        self.state
            .read()
            .await
            .account
            .as_ref()
            .map(|a| a.mid)
            .ok_or_else(|| BiliMateError::LoginError("not logged in".to_string()))
    }

    // ==================== 登录 ====================

    /// 登录：优先复用保存的 cookies，否则扫码
    pub async fn login(&self, attempts: u32, timeout_secs: u64) -> Result<Account> {
        self.login_inner(attempts, timeout_secs)
            .instrument(info_span!("login"))
            .await
    }

    async fn login_inner(&self, attempts: u32, timeout_secs: u64) -> Result<Account> {
        if let Some(account) = self.restore_session().await {
            return Ok(account);
        }
        info!("当前未登录");

        for attempt in 1..=attempts.max(1) {
            debug!("login attempt {}/{}", attempt, attempts);
            if let Some(account) = self.scan_login(timeout_secs).await? {
                return Ok(account);
            }
        }
        Err(BiliMateError::LoginError("超时未登录成功".to_string()))
    }

    async fn restore_session(&self) -> Option<Account> {
        if !self.cookies_path.exists() {
            return None;
        }
        let cookies = match load_cookie_file(&self.cookies_path).await {
            Ok(cookies) => cookies,
            Err(e) => {
                warn!("读取 cookies 失败: {}", e);
                return None;
            }
        };
        debug!("restoring cookies: {}", cookie_names(cookies.keys()));
        self.api.import_cookies(cookies);

        match self.api.account_info().await {
            Ok(account) => {
                info!("已恢复登录状态，欢迎您：{}", account.uname);
                self.mark_logged_in(&account).await;
                Some(account)
            }
            Err(e) => {
                info!("保存的登录状态已失效: {}", e);
                None
            }
        }
    }

    /// 生成一张二维码并等待扫码；二维码失效或超时返回 None
    async fn scan_login(&self, timeout_secs: u64) -> Result<Option<Account>> {
        let login = self.api.generate_login_qrcode().await?;
        {
            let mut state = self.state.write().await;
            state.login_url = login.url.clone();
            state.login_status = LoginStatus::NotLoggedIn;
            state.login_time_cnt = timeout_secs;
        }

        info!("请扫描下方二维码登录");
        match qr::render_terminal(&login.url) {
            Ok(art) => println!("{}", art),
            Err(e) => warn!("二维码渲染失败，请手动打开链接登录: {} ({})", login.url, e),
        }

        let poll_secs = self.timings.login_poll.as_secs().max(1);
        let mut remaining = timeout_secs;
        while remaining > 0 {
            tokio::time::sleep(self.timings.login_poll).await;
            remaining = remaining.saturating_sub(poll_secs);
            self.state.write().await.login_time_cnt = remaining;

            let poll = match self.api.poll_login(&login.qrcode_key).await {
                Ok(poll) => poll,
                Err(e) => {
                    warn!("查询扫码状态失败: {}", e);
                    continue;
                }
            };

            match poll {
                LoginPoll::Success => {
                    let account = self.api.account_info().await?;
                    info!("登录成功，欢迎您：{}", account.uname);
                    self.mark_logged_in(&account).await;
                    self.remember_login().await;
                    return Ok(Some(account));
                }
                LoginPoll::Scanned => self.set_login_status(LoginStatus::Scanned).await,
                LoginPoll::NotScanned => self.set_login_status(LoginStatus::NotLoggedIn).await,
                LoginPoll::Expired => {
                    self.set_login_status(LoginStatus::Expired).await;
                    return Ok(None);
                }
                LoginPoll::Unknown(code) => debug!("unknown qrcode poll code {}", code),
            }
        }

        self.set_login_status(LoginStatus::TimedOut).await;
        info!("超时未登录成功");
        Ok(None)
    }

    async fn set_login_status(&self, status: LoginStatus) {
        let mut state = self.state.write().await;
        if state.login_status != status {
            state.login_status = status;
            drop(state);
            info!("{}", status);
        }
    }

    async fn mark_logged_in(&self, account: &Account) {
        let mut state = self.state.write().await;
        state.login_status = LoginStatus::LoggedIn;
        state.account = Some(account.clone());
        state.login_time_cnt = 0;
    }

    async fn remember_login(&self) {
        let settings = self.settings.load().await;
        if !settings.login_remember {
            return;
        }
        let cookies = self.api.export_cookies();
        if cookies.is_empty() {
            return;
        }
        match save_cookie_file(&self.cookies_path, &cookies).await {
            Ok(()) => debug!("cookies saved: {}", cookie_names(cookies.keys())),
            Err(e) => warn!("保存登录状态失败: {}", e),
        }
    }

    // ==================== 粉丝 ====================

    /// 全量加载粉丝列表，最多加载前 1000 个
    pub async fn reload_fans(&self) -> Result<usize> {
        let mid = self.my_mid().await?;
        let total = self.api.follower_count(mid).await?;
        self.state.write().await.follower_total = total;

        let mut capped = total;
        if total > MAX_LOADED_FANS {
            warn!("您的粉丝数超过{}，目前仅加载前{}个粉丝", MAX_LOADED_FANS, MAX_LOADED_FANS);
            capped = MAX_LOADED_FANS;
        }

        let mut fans = Vec::with_capacity(capped as usize);
        if capped > 0 {
            let pages = (capped - 1) / FANS_PAGE_SIZE + 1;
            for page in 1..=pages {
                let list = self.api.followers_page(mid, page, FANS_PAGE_SIZE).await?;
                if list.is_empty() {
                    break;
                }
                fans.extend(list);
            }
        }
        fans.truncate(capped as usize);

        let loaded = fans.len();
        self.state.write().await.roster.replace_all(fans);
        info!("粉丝总数：{}，已加载粉丝数：{}", total, loaded);
        Ok(loaded)
    }

    /// 粉丝总数与已加载数量不一致（有人取关）时重新加载
    pub async fn reconcile_fans(&self) -> Result<bool> {
        let mid = self.my_mid().await?;
        let total = self.api.follower_count(mid).await?;
        let expected = total.min(MAX_LOADED_FANS) as usize;

        let loaded = {
            let mut state = self.state.write().await;
            state.follower_total = total;
            state.roster.len()
        };
        if loaded == expected {
            return Ok(false);
        }
        debug!("fans list out of sync: loaded {} expected {}", loaded, expected);
        self.reload_fans().await?;
        Ok(true)
    }

    /// 拉取新关注，合并进粉丝列表并加入待欢迎队列
    pub async fn fetch_new_fans(&self) -> Result<Vec<Follower>> {
        let status = self.api.new_follower_status().await?;
        if status.count == 0 {
            return Ok(Vec::new());
        }
        let mid = self.my_mid().await?;
        let new_fans = self.api.new_followers(mid, status.count, status.time).await?;
        self.state.write().await.roster.merge_new(new_fans.clone());
        Ok(new_fans)
    }

    // ==================== 回复 ====================

    /// 按身份选择回复并发送，返回是否真正发出
    pub async fn reply_to(&self, settings: &Settings, sender: u64, message: &str) -> Result<bool> {
        let audience = {
            let mut state = self.state.write().await;
            if state.roster.take_new_fan(sender) {
                Audience::NewFan
            } else if state.roster.is_fan(sender) {
                Audience::Fan
            } else {
                Audience::NonFan
            }
        };
        info!("用户身份：{}", audience);
        if audience != Audience::NewFan {
            info!("消息内容：\n{}", message);
        }

        let Some(choice) = select_reply(settings, audience, message) else {
            info!("无匹配消息回复");
            return Ok(false);
        };

        let suppressed = self.state.write().await.repeat.should_suppress(
            sender,
            &choice.text,
            settings.repeat_protect_times,
        );
        if suppressed {
            info!("连续重复回复，本次不发送");
            return Ok(false);
        }

        info!("消息回复（{}）：\n{}", choice.matched, choice.text);
        self.api.send_message(sender, &choice.text).await?;
        Ok(true)
    }

    /// 一轮自动回复
    pub async fn auto_reply_tick(&self, settings: &Settings) -> Result<()> {
        let _timer = Timer::new("auto_reply_tick");

        self.fetch_new_fans().await?;
        let pending = self.pending_new_fans().await;
        for fan in pending {
            self.state.write().await.notice_pending = true;
            info!("检测到新粉丝【{}】关注", fan.uname);
            self.reply_to(settings, fan.mid, "").await?;
        }

        self.reconcile_fans().await?;

        let my_mid = self.my_mid().await?;
        let begin_ts = self.state.read().await.last_session_ts;
        let end_ts = chrono::Utc::now().timestamp_micros();
        let sessions = self.api.sessions_between(begin_ts, end_ts).await?;
        self.state.write().await.last_session_ts = end_ts;

        for session in sessions.iter().filter(|s| s.needs_reply(my_mid)) {
            let Some(last_msg) = &session.last_msg else { continue };
            self.state.write().await.notice_pending = true;

            let sender = last_msg.sender_uid;
            let name = match self.api.user_name(sender).await {
                Ok(name) => name,
                Err(e) => {
                    debug!("user card lookup failed for {}: {}", sender, e);
                    sender.to_string()
                }
            };
            info!("检测到新消息");
            info!("消息用户：{}", name);
            self.reply_to(settings, sender, &last_msg.text()).await?;
        }

        let mut state = self.state.write().await;
        if state.notice_pending {
            state.notice_pending = false;
            drop(state);
            info!("当前无新消息，持续监测中...");
        }
        Ok(())
    }

    pub async fn refresh_stats(&self) -> Result<()> {
        let stats = self.api.video_stats().await?;
        self.state.write().await.stats = stats;
        debug!("video stats refreshed: fans={} click={}", stats.total_fans, stats.total_click);
        Ok(())
    }

    // ==================== 循环 ====================

    /// 自动回复循环，每轮开始前重新读取设置
    pub async fn run_auto_reply(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        self.state.write().await.reply_running = true;
        info!("[启动线程]-自动回复消息");

        loop {
            let settings = self.settings.load().await;
            let outcome = self
                .auto_reply_tick(&settings)
                .instrument(info_span!("auto_reply"))
                .await;

            let wait = match outcome {
                Ok(()) => Duration::from_secs(settings.interval_seconds),
                Err(e) => {
                    error!("自动回复消息异常：{}", e);
                    if !self.pause_loop("自动回复消息", &mut shutdown, |s, v| s.reply_running = v).await {
                        break;
                    }
                    continue;
                }
            };

            if wait_or_shutdown(wait, &mut shutdown).await {
                break;
            }
        }

        self.state.write().await.reply_running = false;
        info!("[停止线程]-自动回复消息");
    }

    /// 数据更新循环
    pub async fn run_stats_refresh(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        self.state.write().await.stats_running = true;
        info!("[启动线程]-更新视频数据");

        loop {
            if let Err(e) = self.refresh_stats().instrument(info_span!("video_stats")).await {
                error!("更新视频数据异常：{}", e);
                if !self.pause_loop("更新视频数据", &mut shutdown, |s, v| s.stats_running = v).await {
                    break;
                }
                continue;
            }
            if wait_or_shutdown(self.timings.stats_interval, &mut shutdown).await {
                break;
            }
        }

        self.state.write().await.stats_running = false;
        info!("[停止线程]-更新视频数据");
    }

    /// 状态发布循环
    pub async fn run_status_publisher(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        loop {
            if let Err(e) = self.publish_status().await {
                debug!("publish status failed: {}", e);
            }
            if wait_or_shutdown(self.timings.publish_interval, &mut shutdown).await {
                break;
            }
        }
        // 退出前再写一次，面板能看到循环已停止
        if let Err(e) = self.publish_status().await {
            debug!("publish status failed: {}", e);
        }
    }

    /// 暂停出错的循环，返回 false 表示期间收到了退出信号
    async fn pause_loop(
        &self,
        name: &str,
        shutdown: &mut watch::Receiver<bool>,
        set_running: impl Fn(&mut BotState, bool),
    ) -> bool {
        warn!("[暂停线程]-{}，将在{}分钟后自动重启运行", name, self.timings.error_backoff.as_secs() / 60);
        set_running(&mut *self.state.write().await, false);

        if wait_or_shutdown(self.timings.error_backoff, shutdown).await {
            return false;
        }

        set_running(&mut *self.state.write().await, true);
        info!("[恢复线程]-{}", name);
        true
    }
}

/// 等待一段时间；收到退出信号时提前返回 true
pub async fn wait_or_shutdown(duration: Duration, shutdown: &mut watch::Receiver<bool>) -> bool {
    if *shutdown.borrow() {
        return true;
    }
    tokio::select! {
        _ = tokio::time::sleep(duration) => false,
        changed = shutdown.changed() => changed.is_err() || *shutdown.borrow(),
    }
}
