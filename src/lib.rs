//! BiliMate：B站小助手
//!
//! 扫码登录后轮询新粉丝与私信，按设置自动回复：
//! - 新粉丝欢迎语
//! - 粉丝 / 非粉丝分别按完全匹配、关键词、默认回复选择
//! - 连续重复回复保护
//! - 状态面板（axum）读取机器人发布的状态文件
//!
//! # 架构分层
//!
//! - `domain`: 领域模型
//! - `core`: 回复逻辑、B站接口抽象、设置与状态存储
//! - `infrastructure`: B站 HTTP 客户端、cookies、日志文件、二维码、Web 面板
//! - `application`: 自动回复引擎

pub mod config;
pub mod errors;
pub mod logger;

// 领域层
pub mod domain;

// 核心层
pub mod core;

// 基础设施层
pub mod infrastructure;

// 应用层
pub mod application;

pub mod bootstrap;

pub use application::{BiliMateEngine, EngineTimings};
pub use config::{AppConfig, Cli, Command, DataPaths};
pub use core::api::BiliApi;
pub use core::reply::{select_reply, MatchKind, ReplyChoice};
pub use core::settings_store::SettingsStore;
pub use core::status::{StatusBoard, StatusSnapshot};
pub use domain::{Audience, Follower, Settings};
pub use errors::{BiliMateError, Result};
pub use infrastructure::bilibili::{BiliClient, Endpoints};
pub use infrastructure::web::{create_router, start_web_server, AppState};

/// 版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
