//! 设置文件读写
//!
//! 文件缺失或不是合法 JSON 时静默恢复默认设置并写回。

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::domain::Settings;
use crate::errors::Result;

#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 读取设置，失败时恢复默认
    pub async fn load(&self) -> Settings {
        let parsed = match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => serde_json::from_str::<Settings>(&text).map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };

        match parsed {
            Ok(settings) => settings.normalized(),
            Err(reason) => {
                warn!("加载设置参数失败，恢复默认参数: {}", reason);
                let settings = Settings::default();
                if let Err(e) = self.save(&settings).await {
                    warn!("写回默认设置失败: {}", e);
                }
                settings
            }
        }
    }

    /// 保存设置（UTF-8，缩进两格）
    ///
    /// 先写临时文件再改名，读取方不会看到写了一半的文件。
    pub async fn save(&self, settings: &Settings) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let text = serde_json::to_string_pretty(settings)?;
        let tmp = self
            .path
            .with_extension(format!("json.{}.tmp", uuid::Uuid::new_v4().simple()));
        tokio::fs::write(&tmp, text).await?;
        if let Err(e) = tokio::fs::rename(&tmp, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        debug!("settings saved to {}", self.path.display());
        Ok(())
    }

    /// 恢复默认设置
    pub async fn reset(&self) -> Result<Settings> {
        let settings = Settings::default();
        self.save(&settings).await?;
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_file_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path().join("settings.json"));

        let settings = store.load().await;
        assert_eq!(settings, Settings::default());
        assert!(store.path().exists());
    }

    #[tokio::test]
    async fn test_invalid_json_resets() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        std::fs::write(&path, "{not json").unwrap();

        let settings = SettingsStore::new(&path).load().await;
        assert_eq!(settings, Settings::default());

        let rewritten = std::fs::read_to_string(&path).unwrap();
        assert!(serde_json::from_str::<Settings>(&rewritten).is_ok());
    }

    #[tokio::test]
    async fn test_save_keeps_chinese_readable() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path().join("settings.json"));
        store.save(&Settings::default()).await.unwrap();

        let text = std::fs::read_to_string(store.path()).unwrap();
        assert!(text.contains("感谢关注"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_save_never_resets() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path().join("settings.json"));
        let custom = Settings {
            token_key: "mine".to_string(),
            ..Default::default()
        };
        store.save(&custom).await.unwrap();

        let writer = {
            let store = store.clone();
            let custom = custom.clone();
            tokio::spawn(async move {
                for _ in 0..300 {
                    store.save(&custom).await.unwrap();
                }
            })
        };

        let mut resets = 0;
        for _ in 0..600 {
            if store.load().await.token_key != "mine" {
                resets += 1;
            }
        }
        writer.await.unwrap();

        assert_eq!(resets, 0);
        assert_eq!(store.load().await.token_key, "mine");
        let leftovers = std::fs::read_dir(dir.path()).unwrap().count();
        assert_eq!(leftovers, 1);
    }
}
