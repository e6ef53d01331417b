//! 标准化错误处理
//!
//! 定义项目专用的错误类型

use thiserror::Error;

/// 项目主要错误类型
#[derive(Error, Debug)]
pub enum BiliMateError {
    /// B站接口返回了非 0 的业务码
    #[error("Bilibili API error {code}: {message}")]
    ApiError { code: i64, message: String },

    /// 网络请求错误
    #[error("Network error: {0}")]
    NetworkError(String),

    /// 响应体无法解析
    #[error("Decode error: {0}")]
    DecodeError(String),

    /// 存储相关错误
    #[error("Storage error: {0}")]
    StorageError(String),

    /// 配置错误
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// 登录失败或登录态失效
    #[error("Login error: {0}")]
    LoginError(String),

    /// 面板口令 / 会话令牌错误
    #[error("Permission error: {0}")]
    PermissionError(String),
}

impl BiliMateError {
    pub fn api(code: i64, message: impl Into<String>) -> Self {
        BiliMateError::ApiError {
            code,
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for BiliMateError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            BiliMateError::DecodeError(err.to_string())
        } else {
            BiliMateError::NetworkError(err.to_string())
        }
    }
}

impl From<std::io::Error> for BiliMateError {
    fn from(err: std::io::Error) -> Self {
        BiliMateError::StorageError(err.to_string())
    }
}

impl From<serde_json::Error> for BiliMateError {
    fn from(err: serde_json::Error) -> Self {
        BiliMateError::DecodeError(err.to_string())
    }
}

impl From<jsonwebtoken::errors::Error> for BiliMateError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        BiliMateError::PermissionError(err.to_string())
    }
}

/// 项目结果类型别名
pub type Result<T> = std::result::Result<T, BiliMateError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_display() {
        let err = BiliMateError::api(-101, "账号未登录");
        assert_eq!(err.to_string(), "Bilibili API error -101: 账号未登录");
    }

    #[test]
    fn test_io_error_maps_to_storage() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        assert!(matches!(BiliMateError::from(io), BiliMateError::StorageError(_)));
    }
}
