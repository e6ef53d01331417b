//! 应用层：业务编排
//!
//! 登录、粉丝同步、自动回复与数据更新循环

pub mod engine;

pub use engine::{BiliMateEngine, EngineTimings};
