//! JSONL 检测日志: 每帧一行, 运行开始时截断

use anyhow::{Context, Result};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use super::FrameRecord;

pub struct DetectionLog {
    path: PathBuf,
    writer: BufWriter<File>,
    records: u64,
}

impl DetectionLog {
    /// 创建(截断)日志文件
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path)
            .with_context(|| format!("无法创建检测日志: {}", path.display()))?;
        Ok(Self {
            path,
            writer: BufWriter::new(file),
            records: 0,
        })
    }

    /// 追加一帧记录并立即落盘
    pub fn append(&mut self, record: &FrameRecord) -> Result<()> {
        serde_json::to_writer(&mut self.writer, record)?;
        self.writer.write_all(b"\n")?;
        self.writer
            .flush()
            .with_context(|| format!("写入检测日志失败: {}", self.path.display()))?;
        self.records += 1;
        Ok(())
    }

    pub fn records(&self) -> u64 {
        self.records
    }
}
