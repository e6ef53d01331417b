//! 日志文件
//!
//! 面板展示的回复记录来自这个文件。文件达到上限时砍掉开头一段再继续追加。

use std::fs::OpenOptions;
use std::io::{self, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tracing_subscriber::fmt::MakeWriter;

use crate::errors::Result;

pub const MAX_LOG_SIZE: u64 = 100 * 1024 * 1024;
pub const CUT_SIZE: u64 = 10 * 1024 * 1024;

#[derive(Debug, Clone)]
pub struct LogFile {
    path: PathBuf,
    max_size: u64,
    cut_size: u64,
    lock: Arc<Mutex<()>>,
}

impl LogFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_limits(path, MAX_LOG_SIZE, CUT_SIZE)
    }

    pub fn with_limits(path: impl Into<PathBuf>, max_size: u64, cut_size: u64) -> Self {
        Self {
            path: path.into(),
            max_size,
            cut_size,
            lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 追加一段日志
    pub fn append(&self, buf: &[u8]) -> io::Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        self.trim_if_needed()?;
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        file.write_all(buf)
    }

    fn trim_if_needed(&self) -> io::Result<()> {
        let size = match std::fs::metadata(&self.path) {
            Ok(meta) => meta.len(),
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(e),
        };
        if size < self.max_size {
            return Ok(());
        }

        let data = std::fs::read(&self.path)?;
        let mut start = (self.cut_size as usize).min(data.len());
        // 从下一行开头保留，避免留下半行
        if let Some(offset) = data[start..].iter().position(|b| *b == b'\n') {
            start += offset + 1;
        }
        std::fs::write(&self.path, &data[start..])
    }
}

pub struct LogFileWriter<'a> {
    file: &'a LogFile,
}

impl Write for LogFileWriter<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.append(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogFile {
    type Writer = LogFileWriter<'a>;

    fn make_writer(&'a self) -> Self::Writer {
        LogFileWriter { file: self }
    }
}

/// 从文件末尾往前每次读取的字节数
const TAIL_CHUNK: u64 = 64 * 1024;

/// 读取日志文件最后 `n` 行；文件不存在时返回空
pub async fn tail_lines(path: &Path, n: usize) -> Result<Vec<String>> {
    tail_lines_chunked(path, n, TAIL_CHUNK).await
}

async fn tail_lines_chunked(path: &Path, n: usize, chunk: u64) -> Result<Vec<String>> {
    let mut file = match tokio::fs::File::open(path).await {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    // 按块往前读，凑够 n 个完整行或读到开头为止
    let mut start = file.metadata().await?.len();
    let mut tail: Vec<u8> = Vec::new();
    while start > 0 && tail.iter().filter(|b| **b == b'\n').count() <= n {
        let size = chunk.min(start);
        start -= size;
        file.seek(SeekFrom::Start(start)).await?;
        let mut block = vec![0u8; size as usize];
        file.read_exact(&mut block).await?;
        block.extend_from_slice(&tail);
        tail = block;
    }

    let text = String::from_utf8_lossy(&tail);
    let mut lines: Vec<&str> = text.lines().collect();
    if start > 0 && !lines.is_empty() {
        // 第一段可能是半行
        lines.remove(0);
    }
    let skip = lines.len().saturating_sub(n);
    Ok(lines[skip..].iter().map(|l| l.to_string()).collect())
}
