//! Domain Layer
//!
//! 粉丝、会话、设置、统计与登录状态等核心实体

pub mod follower;
pub mod login;
pub mod session;
pub mod settings;
pub mod stats;

pub use follower::{Follower, FollowerRoster, MAX_LOADED_FANS};
pub use login::{Account, LoginPoll, LoginStatus, QrLogin};
pub use session::{LastMessage, Session};
pub use settings::{Audience, ReplyDict, ReplyRules, Settings};
pub use stats::VideoStats;
