//! 状态快照
//!
//! 机器人每秒把运行状态写入 `status.json`，面板进程只读这个文件。
//! 写入采用临时文件 + rename，读端不会看到写了一半的内容。

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::{Follower, LoginStatus, VideoStats};
use crate::errors::Result;

/// 快照超过这个时长未更新即认为服务异常
pub const STATUS_STALE_AFTER_MS: i64 = 5_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct StatusSnapshot {
    #[serde(default)]
    pub login_status: LoginStatus,
    #[serde(default)]
    pub login_url: String,
    /// 剩余扫码秒数
    #[serde(default)]
    pub login_time_cnt: u64,
    #[serde(default)]
    pub my_uname: String,
    #[serde(default)]
    pub my_mid: u64,
    #[serde(flatten)]
    pub stats: VideoStats,
    #[serde(default)]
    pub fans_list: Vec<Follower>,
    /// 数据更新循环是否在运行
    #[serde(default)]
    pub state_info_status: bool,
    /// 自动回复循环是否在运行
    #[serde(default)]
    pub reply_info_status: bool,
    /// 发布时间（毫秒）
    #[serde(default)]
    pub time_stamp: i64,
}

impl StatusSnapshot {
    pub fn is_fresh(&self, now_ms: i64) -> bool {
        now_ms - self.time_stamp <= STATUS_STALE_AFTER_MS
    }
}

#[derive(Debug, Clone)]
pub struct StatusBoard {
    path: PathBuf,
}

impl StatusBoard {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 发布快照，`time_stamp` 由调用方填写
    pub async fn publish(&self, snapshot: &StatusSnapshot) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let payload = serde_json::to_vec(snapshot)?;
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, payload).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    /// 读取最新快照；文件不存在时返回 None
    pub async fn read(&self) -> Result<Option<StatusSnapshot>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_publish_then_read() {
        let dir = tempfile::tempdir().unwrap();
        let board = StatusBoard::new(dir.path().join("status.json"));
        assert!(board.read().await.unwrap().is_none());

        let snapshot = StatusSnapshot {
            login_status: LoginStatus::LoggedIn,
            my_uname: "阿包".into(),
            my_mid: 42,
            stats: VideoStats {
                total_fans: 10,
                inc_fans: 1,
                ..Default::default()
            },
            fans_list: vec![Follower::new("a", 1)],
            time_stamp: 1_000,
            ..Default::default()
        };
        board.publish(&snapshot).await.unwrap();

        let loaded = board.read().await.unwrap().unwrap();
        assert_eq!(loaded, snapshot);
    }

    #[test]
    fn test_stats_are_flattened() {
        let snapshot = StatusSnapshot {
            stats: VideoStats {
                total_click: 7,
                ..Default::default()
            },
            ..Default::default()
        };
        let value = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(value["total_click"], 7);
        assert_eq!(value["login_status"], "not_logged_in");
    }

    #[test]
    fn test_freshness() {
        let snapshot = StatusSnapshot {
            time_stamp: 10_000,
            ..Default::default()
        };
        assert!(snapshot.is_fresh(14_000));
        assert!(!snapshot.is_fresh(16_000));
    }
}
