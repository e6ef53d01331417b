//! 核心层：回复逻辑与存储抽象
//!
//! 包含回复选择、重复消息保护、B站接口抽象、设置存储和状态发布

pub mod api;
pub mod repeat;
pub mod reply;
pub mod settings_store;
pub mod status;
