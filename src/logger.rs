//! 日志初始化
//!
//! 控制台按 `LOG_FORMAT` 输出，运行机器人时另挂一层写日志文件。
//! 日志文件每行固定为 `[时间] [级别] 消息`，面板原样展示。

use std::fmt;
use std::time::Instant;

use tracing::{field, Event, Level, Subscriber};
use tracing_subscriber::{
    fmt::{format::Writer, FmtContext, FormatEvent, FormatFields},
    layer::SubscriberExt,
    registry::LookupSpan,
    util::SubscriberInitExt,
    EnvFilter,
};

use crate::infrastructure::logger::LogFile;

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// 控制台日志格式
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LogFormat {
    /// 带颜色和 span 名称
    Pretty,
    Compact,
    /// 给日志收集系统
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "compact" => Ok(LogFormat::Compact),
            "json" => Ok(LogFormat::Json),
            _ => Err(format!("unknown log format: {}", s)),
        }
    }
}

impl std::fmt::Display for LogFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogFormat::Pretty => write!(f, "pretty"),
            LogFormat::Compact => write!(f, "compact"),
            LogFormat::Json => write!(f, "json"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub format: LogFormat,
    pub enable_color: bool,
    /// 控制台是否带模块路径
    pub show_target: bool,
    /// 面板读取的日志文件，None 表示只输出到控制台
    pub log_file: Option<LogFile>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Pretty,
            enable_color: true,
            show_target: false,
            log_file: None,
        }
    }
}

/// 初始化全局日志
///
/// `RUST_LOG` 控制级别，默认 `info`。
pub fn init(config: LogConfig) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = config.log_file.clone().map(|log_file| {
        tracing_subscriber::fmt::layer()
            .event_format(LineFormatter::file())
            .fmt_fields(MessageFields)
            .with_ansi(false)
            .with_writer(log_file)
    });

    let subscriber = tracing_subscriber::registry().with(env_filter).with(file_layer);

    match config.format {
        LogFormat::Pretty => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .event_format(LineFormatter::console(&config))
                .fmt_fields(MessageFields);
            subscriber.with(fmt_layer).init();
        }
        LogFormat::Compact => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .compact()
                .with_target(config.show_target)
                .with_ansi(config.enable_color);
            subscriber.with(fmt_layer).init();
        }
        LogFormat::Json => {
            let fmt_layer = tracing_subscriber::fmt::layer()
                .json()
                .with_target(config.show_target)
                .with_current_span(true);
            subscriber.with(fmt_layer).init();
        }
    }
}

/// 作用域结束时以 debug 级别记录耗时
pub struct Timer {
    name: &'static str,
    start: Instant,
}

impl Timer {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            start: Instant::now(),
        }
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        tracing::debug!(
            target: "bilimate::timing",
            "{} 耗时 {:.2}ms",
            self.name,
            self.start.elapsed().as_secs_f64() * 1000.0
        );
    }
}

/// 只输出 cookie 名称，值不进日志
pub fn cookie_names<'a>(names: impl Iterator<Item = &'a String>) -> String {
    let mut names: Vec<&str> = names.map(String::as_str).collect();
    names.sort_unstable();
    names.join(",")
}

/// 单行日志格式：`[时间] [级别] [目标] [span] 消息`，方括号外的部分可按需关闭
pub struct LineFormatter {
    color: bool,
    target: bool,
    span: bool,
}

impl LineFormatter {
    pub fn console(config: &LogConfig) -> Self {
        Self {
            color: config.enable_color,
            target: config.show_target,
            span: true,
        }
    }

    /// 日志文件只留时间、级别和消息
    pub fn file() -> Self {
        Self {
            color: false,
            target: false,
            span: false,
        }
    }
}

fn level_color(level: &Level) -> &'static str {
    match *level {
        Level::ERROR => "31",
        Level::WARN => "33",
        Level::INFO => "32",
        Level::DEBUG => "34",
        Level::TRACE => "35",
    }
}

impl<S, N> FormatEvent<S, N> for LineFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> std::fmt::Result {
        let meta = event.metadata();
        write!(writer, "[{}] ", chrono::Local::now().format(TIME_FORMAT))?;

        if self.color {
            write!(writer, "\x1b[{}m[{}]\x1b[0m ", level_color(meta.level()), meta.level())?;
        } else {
            write!(writer, "[{}] ", meta.level())?;
        }

        if self.target {
            write!(writer, "{} ", meta.target())?;
        }

        if self.span {
            if let Some(span) = ctx.lookup_current() {
                if self.color {
                    write!(writer, "\x1b[90m[{}]\x1b[0m ", span.name())?;
                } else {
                    write!(writer, "[{}] ", span.name())?;
                }
            }
        }

        ctx.format_fields(writer.by_ref(), event)?;
        writeln!(writer)
    }
}

/// 先写消息，其余字段以 ` name=value` 跟在后面
pub struct MessageFields;

impl FormatFields<'_> for MessageFields {
    fn format_fields<R: tracing_subscriber::field::RecordFields>(
        &self,
        writer: Writer<'_>,
        fields: R,
    ) -> std::fmt::Result {
        let mut visitor = FieldVisitor {
            writer,
            result: Ok(()),
        };
        fields.record(&mut visitor);
        visitor.result
    }
}

struct FieldVisitor<'a> {
    writer: Writer<'a>,
    result: std::fmt::Result,
}

impl field::Visit for FieldVisitor<'_> {
    fn record_debug(&mut self, field: &field::Field, value: &dyn fmt::Debug) {
        if self.result.is_err() {
            return;
        }
        self.result = if field.name() == "message" {
            write!(self.writer, "{:?}", value)
        } else {
            write!(self.writer, " {}={:?}", field.name(), value)
        };
    }

    fn record_str(&mut self, field: &field::Field, value: &str) {
        if self.result.is_err() {
            return;
        }
        self.result = if field.name() == "message" {
            write!(self.writer, "{}", value)
        } else {
            write!(self.writer, " {}={}", field.name(), value)
        };
    }
}
