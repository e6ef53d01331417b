use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};

use crate::logger::LogFormat;

/// 运行方式
#[derive(Subcommand, Debug, Clone, Copy, PartialEq)]
pub enum Command {
    /// 机器人 + 面板（默认）
    Run,
    /// 只运行机器人
    Bot,
    /// 只运行面板，读取机器人写出的状态文件
    Dashboard,
}

#[derive(Parser, Debug, Clone)]
#[command(
    author,
    version,
    about = "B站小助手：新粉丝欢迎语、私信自动回复与状态面板"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    #[command(flatten)]
    pub config: AppConfig,
}

impl Cli {
    pub fn command(&self) -> Command {
        self.command.unwrap_or(Command::Run)
    }
}

#[derive(Args, Debug, Clone)]
pub struct AppConfig {
    /// 数据目录：settings.json、cookies.json、status.json 与日志文件
    #[arg(long, env = "BILIMATE_DATA_DIR", default_value = "data", global = true)]
    pub data_dir: PathBuf,

    /// 面板监听地址
    #[arg(long, env = "BILIMATE_BIND", default_value = "0.0.0.0:8181", global = true)]
    pub bind: String,

    /// 日志格式: pretty, compact, json
    #[arg(long, env = "LOG_FORMAT", default_value = "pretty", global = true)]
    pub log_format: LogFormat,

    /// 面板会话令牌的签名密钥，不设置时每次启动随机生成
    #[arg(long, env = "JWT_SECRET", global = true)]
    pub jwt_secret: Option<String>,

    /// 二维码失效或超时后最多重新生成的次数
    #[arg(long, env = "BILIMATE_LOGIN_ATTEMPTS", default_value_t = 3, global = true)]
    pub login_attempts: u32,

    /// 每张二维码等待扫码的秒数
    #[arg(long, env = "BILIMATE_LOGIN_TIMEOUT", default_value_t = 120, global = true)]
    pub login_timeout_secs: u64,
}

impl AppConfig {
    pub fn paths(&self) -> DataPaths {
        DataPaths::new(&self.data_dir)
    }

    pub fn jwt_secret(&self) -> String {
        self.jwt_secret
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
    }
}

/// 数据目录中的各个文件
#[derive(Debug, Clone)]
pub struct DataPaths {
    root: PathBuf,
}

impl DataPaths {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn settings(&self) -> PathBuf {
        self.root.join("settings.json")
    }

    pub fn cookies(&self) -> PathBuf {
        self.root.join("cookies.json")
    }

    pub fn status(&self) -> PathBuf {
        self.root.join("status.json")
    }

    pub fn log(&self) -> PathBuf {
        self.root.join("log_BiliMate.txt")
    }
}
