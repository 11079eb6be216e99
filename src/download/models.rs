//! 下载相关的数据模型定义。
//!
//! 包含章节/系列元数据、章节号、输出模式与下载结果统计。

use std::fmt;

/// 章节号：没有小数部分时按整数保存与显示。
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ChapterNumber {
    Whole(u64),
    Fractional(f64),
}

impl ChapterNumber {
    pub fn from_decimal(value: f64) -> Self {
        if value.fract() == 0.0 && value >= 0.0 && value <= u64::MAX as f64 {
            Self::Whole(value as u64)
        } else {
            Self::Fractional(value)
        }
    }

    /// 进度显示用：至少 3 位，左侧补 0（`7` → `007`，`12.5` 不变）。
    pub fn padded(&self) -> String {
        format!("{:0>3}", self.to_string())
    }
}

impl fmt::Display for ChapterNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Whole(n) => write!(f, "{n}"),
            Self::Fractional(n) => write!(f, "{n}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChapterMeta {
    /// 已清理过的系列名，可直接作为目录名
    pub title: String,
    pub number: ChapterNumber,
    /// 图片地址，顺序即阅读顺序
    pub images: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeriesMeta {
    pub name: String,
    /// 章节地址，按时间从旧到新
    pub chapters: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Directory,
    Archive,
}

impl OutputMode {
    pub fn from_cbz_flag(cbz: bool) -> Self {
        if cbz { Self::Archive } else { Self::Directory }
    }
}

/// 单章下载结果。
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ChapterOutcome {
    /// 实际下载并写入的图片数
    pub fetched: usize,
    /// 因已存在而跳过的图片数
    pub skipped: usize,
    /// 下载失败的图片数
    pub failed: usize,
    /// 压缩包已存在，整章跳过
    pub already_present: bool,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DownloadResult {
    pub success: u32,
    pub skipped: u32,
    pub failed: u32,
}

impl DownloadResult {
    pub fn record(&mut self, outcome: &ChapterOutcome) {
        if outcome.already_present {
            self.skipped += 1;
        } else {
            self.success += 1;
        }
    }
}
