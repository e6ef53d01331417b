//! 扫码登录相关模型

use serde::{Deserialize, Serialize};

/// 扫码登录状态，面板按此展示提示语
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LoginStatus {
    #[default]
    NotLoggedIn,
    Scanned,
    Expired,
    TimedOut,
    LoggedIn,
}

impl LoginStatus {
    pub fn is_logged_in(&self) -> bool {
        matches!(self, LoginStatus::LoggedIn)
    }
}

impl std::fmt::Display for LoginStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoginStatus::NotLoggedIn => write!(f, "未登录"),
            LoginStatus::Scanned => write!(f, "已扫码，请尽快确认"),
            LoginStatus::Expired => write!(f, "二维码已失效"),
            LoginStatus::TimedOut => write!(f, "超时未登录"),
            LoginStatus::LoggedIn => write!(f, "已登录"),
        }
    }
}

/// 登录二维码
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct QrLogin {
    pub url: String,
    pub qrcode_key: String,
}

/// 一次轮询扫码结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginPoll {
    Success,
    Scanned,
    Expired,
    NotScanned,
    Unknown(i64),
}

impl LoginPoll {
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => LoginPoll::Success,
            86090 => LoginPoll::Scanned,
            86038 => LoginPoll::Expired,
            86101 => LoginPoll::NotScanned,
            other => LoginPoll::Unknown(other),
        }
    }
}

/// 当前登录账号
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub mid: u64,
    pub uname: String,
}
