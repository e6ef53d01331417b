use anyhow::Result;
use clap::Parser;

use bilimate::config::{Cli, Command};
use bilimate::infrastructure::logger::LogFile;
use bilimate::logger::{self, LogConfig};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let command = cli.command();
    let paths = cli.config.paths();

    // 面板进程只读日志文件，不写入
    let log_file = match command {
        Command::Run | Command::Bot => Some(LogFile::new(paths.log())),
        Command::Dashboard => None,
    };
    logger::init(LogConfig {
        format: cli.config.log_format,
        log_file,
        ..Default::default()
    });

    bilimate::bootstrap::start_with_config(cli.config, command).await
}
