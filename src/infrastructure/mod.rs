//! 基础设施层：外部系统交互
//!
//! 提供与 B站接口、cookies 文件、日志文件、二维码渲染和 Web 面板的交互能力

pub mod auth;
pub mod bilibili;
pub mod cookies;
pub mod logger;
pub mod qr;
pub mod web;
