//! 启动模块
//!
//! 按运行方式组装机器人与面板，并负责 ctrl+c 退出

use std::future::Future;
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::application::engine::BiliMateEngine;
use crate::config::{AppConfig, Command};
use crate::core::api::BiliApi;
use crate::core::settings_store::SettingsStore;
use crate::core::status::StatusBoard;
use crate::infrastructure::auth::JwtService;
use crate::infrastructure::bilibili::BiliClient;
use crate::infrastructure::web::{start_web_server, AppState};

pub struct Launcher {
    config: AppConfig,
    api: Option<Arc<dyn BiliApi>>,
}

impl Launcher {
    pub fn new(config: AppConfig) -> Self {
        Self { config, api: None }
    }

    /// 替换默认的 B站客户端
    pub fn with_api(mut self, api: Arc<dyn BiliApi>) -> Self {
        self.api = Some(api);
        self
    }

    /// 运行直到收到 ctrl+c
    pub async fn launch(&self, command: Command) -> Result<()> {
        self.launch_until(command, tokio::signal::ctrl_c()).await
    }

    /// 运行直到 `shutdown_signal` 完成，然后通知各循环退出并等待它们结束
    pub async fn launch_until(
        &self,
        command: Command,
        shutdown_signal: impl Future<Output = std::io::Result<()>>,
    ) -> Result<()> {
        info!("🚀 Launching BiliMate v{} ({:?})", crate::VERSION, command);
        tokio::pin!(shutdown_signal);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let dashboard = matches!(command, Command::Run | Command::Dashboard)
            .then(|| self.spawn_dashboard());

        let mut tasks: Vec<JoinHandle<()>> = Vec::new();
        let mut engine = None;
        let mut signalled = false;

        if matches!(command, Command::Run | Command::Bot) {
            let api = match &self.api {
                Some(api) => api.clone(),
                None => Arc::new(BiliClient::new()?) as Arc<dyn BiliApi>,
            };
            let bot = Arc::new(BiliMateEngine::new(api, &self.config.paths()));
            engine = Some(bot.clone());

            // 登录阶段也要能响应退出
            tokio::select! {
                started = self.start_bot(bot, shutdown_rx, &mut tasks) => started?,
                signal = &mut shutdown_signal => {
                    signal?;
                    signalled = true;
                }
            }
        }

        if !signalled {
            shutdown_signal.await?;
        }
        info!("🛑 Received shutdown signal");
        let _ = shutdown_tx.send(true);
        if let Some(dashboard) = dashboard {
            dashboard.abort();
        }

        for task in tasks {
            if let Err(e) = task.await {
                error!("task ended abnormally: {}", e);
            }
        }
        // 所有循环都已停下，面板看到的是最终状态
        if let Some(engine) = engine {
            if let Err(e) = engine.publish_status().await {
                error!("final status publish failed: {}", e);
            }
        }
        info!("👋 BiliMate stopped");
        Ok(())
    }

    fn spawn_dashboard(&self) -> JoinHandle<()> {
        let paths = self.config.paths();
        let state = Arc::new(AppState {
            board: StatusBoard::new(paths.status()),
            settings: SettingsStore::new(paths.settings()),
            log_path: paths.log(),
            jwt_service: JwtService::new(&self.config.jwt_secret()),
        });
        let bind = self.config.bind.clone();

        info!("🌐 Starting dashboard on {}", bind);
        tokio::spawn(async move {
            if let Err(e) = start_web_server(&bind, state).await {
                error!("Web server error: {}", e);
            }
        })
    }

    /// 登录、加载粉丝后启动各循环；状态发布先于登录启动，面板可显示二维码
    async fn start_bot(
        &self,
        engine: Arc<BiliMateEngine>,
        shutdown: watch::Receiver<bool>,
        tasks: &mut Vec<JoinHandle<()>>,
    ) -> Result<()> {
        // 初始化设置文件
        engine.settings_store().load().await;

        tasks.push(tokio::spawn(engine.clone().run_status_publisher(shutdown.clone())));

        engine
            .login(self.config.login_attempts, self.config.login_timeout_secs)
            .await?;
        engine.reload_fans().await?;

        tasks.push(tokio::spawn(engine.clone().run_stats_refresh(shutdown.clone())));
        tasks.push(tokio::spawn(engine.run_auto_reply(shutdown)));
        info!("✅ BiliMate is running");
        Ok(())
    }
}

/// 解析好命令行后的入口
pub async fn start_with_config(config: AppConfig, command: Command) -> Result<()> {
    Launcher::new(config).launch(command).await
}
