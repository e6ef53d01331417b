//! 创作中心数据概览

use serde::{Deserialize, Serialize};

/// 粉丝、播放、点赞、收藏的总量与增量
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VideoStats {
    #[serde(default)]
    pub total_fans: i64,
    #[serde(default, alias = "incr_fans")]
    pub inc_fans: i64,
    #[serde(default)]
    pub total_click: i64,
    #[serde(default, alias = "incr_click")]
    pub inc_click: i64,
    #[serde(default)]
    pub total_like: i64,
    #[serde(default, alias = "incr_like")]
    pub inc_like: i64,
    #[serde(default)]
    pub total_fav: i64,
    #[serde(default, alias = "incr_fav")]
    pub inc_fav: i64,
}
