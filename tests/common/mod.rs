//! 测试通用工具
//!
//! 提供测试日志初始化、按脚本返回结果的假 B站接口和测试服务器辅助函数

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, Once};

use async_trait::async_trait;
use axum::Router;

use bilimate::core::api::{BiliApi, NewFollowerStatus};
use bilimate::domain::session::LastMessage;
use bilimate::domain::{Account, Follower, LoginPoll, QrLogin, Session, VideoStats};
use bilimate::{BiliMateError, Result};

static INIT: Once = Once::new();

/// 初始化测试环境
pub fn setup() {
    INIT.call_once(|| {
        // 设置测试日志
        let _ = tracing_subscriber::fmt()
            .with_env_filter("debug")
            .with_test_writer()
            .try_init();
    });
}

/// 测试超时包装器（用于异步测试）
pub async fn with_timeout<F, T>(duration: std::time::Duration, f: F) -> T
where
    F: std::future::Future<Output = T>,
{
    tokio::time::timeout(duration, f)
        .await
        .expect("Test timed out")
}

/// 常用的测试超时时间
pub const TEST_TIMEOUT_SHORT: std::time::Duration = std::time::Duration::from_secs(5);

/// 在随机端口启动测试服务器
pub async fn serve(app: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    // 等待服务器启动
    tokio::time::sleep(std::time::Duration::from_millis(100)).await;
    addr
}

pub fn text_session(sender: u64, text: &str) -> Session {
    Session {
        talker_id: sender,
        unread_count: 1,
        last_msg: Some(LastMessage {
            sender_uid: sender,
            msg_type: 1,
            content: serde_json::json!({ "content": text }).to_string(),
        }),
    }
}

// ==================== 假 B站接口 ====================

#[derive(Default)]
pub struct FakeState {
    pub account: Option<Account>,
    /// 完整粉丝列表，最新关注在前
    pub fans: Vec<Follower>,
    pub new_follower_status: NewFollowerStatus,
    pub new_followers: Vec<Follower>,
    pub sessions: Vec<Session>,
    pub fail_sessions: bool,
    pub session_queries: Vec<(i64, i64)>,
    pub names: HashMap<u64, String>,
    pub stats: VideoStats,
    pub fail_stats: bool,
    pub stats_queries: u32,
    pub polls: VecDeque<LoginPoll>,
    pub qrcodes_generated: u32,
    pub cookies: HashMap<String, String>,
    pub sent: Vec<(u64, String)>,
}

#[derive(Default)]
pub struct FakeApi {
    pub state: Mutex<FakeState>,
}

impl FakeApi {
    pub fn new(account: Account, fans: Vec<Follower>) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(FakeState {
                account: Some(account),
                fans,
                ..Default::default()
            }),
        })
    }

    pub fn with<R>(&self, f: impl FnOnce(&mut FakeState) -> R) -> R {
        f(&mut self.state.lock().unwrap())
    }

    pub fn sent(&self) -> Vec<(u64, String)> {
        self.with(|s| s.sent.clone())
    }

    /// 模拟一个新粉丝关注
    pub fn add_new_fan(&self, fan: Follower) {
        self.with(|s| {
            s.fans.insert(0, fan.clone());
            s.new_followers.push(fan);
            s.new_follower_status = NewFollowerStatus {
                count: s.new_followers.len() as u64,
                time: 1_700_000_000,
            };
        });
    }

    pub fn push_session(&self, session: Session) {
        self.with(|s| s.sessions.push(session));
    }
}

#[async_trait]
impl BiliApi for FakeApi {
    async fn generate_login_qrcode(&self) -> Result<QrLogin> {
        Ok(self.with(|s| {
            s.qrcodes_generated += 1;
            let key = format!("key{}", s.qrcodes_generated);
            QrLogin {
                url: format!("https://passport.bilibili.com/h5-app/passport/login/scan?qrcode_key={}", key),
                qrcode_key: key,
            }
        }))
    }

    async fn poll_login(&self, _qrcode_key: &str) -> Result<LoginPoll> {
        Ok(self.with(|s| {
            let poll = s.polls.pop_front().unwrap_or(LoginPoll::NotScanned);
            if poll == LoginPoll::Success {
                s.cookies.insert("SESSDATA".into(), "fake-sessdata".into());
                s.cookies.insert("bili_jct".into(), "fake-csrf".into());
            }
            poll
        }))
    }

    async fn account_info(&self) -> Result<Account> {
        self.with(|s| s.account.clone())
            .ok_or_else(|| BiliMateError::api(-101, "账号未登录"))
    }

    async fn follower_count(&self, _mid: u64) -> Result<u64> {
        Ok(self.with(|s| s.fans.len() as u64))
    }

    async fn followers_page(&self, _mid: u64, page: u64, size: u64) -> Result<Vec<Follower>> {
        Ok(self.with(|s| {
            s.fans
                .iter()
                .skip(((page - 1) * size) as usize)
                .take(size as usize)
                .cloned()
                .collect()
        }))
    }

    async fn new_follower_status(&self) -> Result<NewFollowerStatus> {
        Ok(self.with(|s| std::mem::take(&mut s.new_follower_status)))
    }

    async fn new_followers(&self, _mid: u64, _count: u64, _last_access_ts: i64) -> Result<Vec<Follower>> {
        Ok(self.with(|s| std::mem::take(&mut s.new_followers)))
    }

    async fn sessions_between(&self, begin_ts: i64, end_ts: i64) -> Result<Vec<Session>> {
        self.with(|s| {
            s.session_queries.push((begin_ts, end_ts));
            if s.fail_sessions {
                return Err(BiliMateError::NetworkError("connection reset".into()));
            }
            Ok(std::mem::take(&mut s.sessions))
        })
    }

    async fn user_name(&self, mid: u64) -> Result<String> {
        self.with(|s| s.names.get(&mid).cloned())
            .ok_or_else(|| BiliMateError::api(-404, "啥都木有"))
    }

    async fn video_stats(&self) -> Result<VideoStats> {
        self.with(|s| {
            s.stats_queries += 1;
            if s.fail_stats {
                return Err(BiliMateError::NetworkError("timed out".into()));
            }
            Ok(s.stats)
        })
    }

    async fn send_message(&self, receiver: u64, text: &str) -> Result<()> {
        self.with(|s| s.sent.push((receiver, text.to_string())));
        Ok(())
    }

    fn export_cookies(&self) -> HashMap<String, String> {
        self.with(|s| s.cookies.clone())
    }

    fn import_cookies(&self, cookies: HashMap<String, String>) {
        self.with(|s| s.cookies.extend(cookies));
    }
}
