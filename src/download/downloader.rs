//! 下载主流程编排：章节下载与系列下载。
//!
//! 全程单线程顺序执行：图片按阅读顺序逐张下载，章节按时间顺序逐章下载。

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};

use super::models::{ChapterMeta, ChapterOutcome, DownloadResult, OutputMode};
use super::progress::Progress;
use super::sink::{ArchiveSink, DirectorySink, OutputSink, SinkError};
use crate::base_system::context::{AssetFailurePolicy, Config};
use crate::base_system::manga_paths::{archive_path, asset_file_name, chapter_base_path};
use crate::book_parser::parser::{ParseError, SourceParser};
use crate::network_parser::network::{FetchError, FetchFailure, Fetched, PageSource};

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error("page unavailable: {0}")]
    PageUnavailable(FetchFailure),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("asset #{index} unavailable: {failure}")]
    AssetUnavailable { index: usize, failure: FetchFailure },
    #[error(transparent)]
    Sink(#[from] SinkError),
    #[error("io error at {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
}

impl DownloadError {
    /// 致命错误会中止整个系列；其余错误只影响当前章节。
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Fetch(_) | Self::Sink(_) | Self::Io { .. })
    }
}

fn fetch_page(source: &dyn PageSource, url: &str) -> Result<Vec<u8>, DownloadError> {
    match source.fetch(url)? {
        Fetched::Bytes(bytes) => Ok(bytes),
        Fetched::Failed(failure) => Err(DownloadError::PageUnavailable(failure)),
    }
}

pub struct ChapterDownloader<'a> {
    source: &'a dyn PageSource,
    parser: &'a dyn SourceParser,
    root: PathBuf,
    extension: String,
    policy: AssetFailurePolicy,
}

impl<'a> ChapterDownloader<'a> {
    pub fn new(
        source: &'a dyn PageSource,
        parser: &'a dyn SourceParser,
        root: &Path,
        config: &Config,
    ) -> Self {
        Self {
            source,
            parser,
            root: root.to_path_buf(),
            extension: config.image_extension.trim().to_string(),
            policy: config.asset_failure_policy,
        }
    }

    pub fn download_chapter(
        &self,
        url: &str,
        mode: OutputMode,
        progress: &mut dyn Progress,
    ) -> Result<ChapterOutcome, DownloadError> {
        let meta = {
            let page = fetch_page(self.source, url)?;
            self.parser.parse_chapter(&page)?
        };

        let series_dir = self.root.join(&meta.title);
        fs::create_dir_all(&series_dir).map_err(|source| DownloadError::Io {
            path: series_dir.clone(),
            source,
        })?;

        let base = chapter_base_path(&self.root, &meta.title, &meta.number);
        let mut sink: Box<dyn OutputSink> = match mode {
            OutputMode::Archive => {
                let path = archive_path(&base);
                // 已存在的 cbz 一律视为完整（进程被中断时留下的半成品也会被跳过）
                if path.exists() {
                    info!("已存在，跳过: {}", path.display());
                    return Ok(ChapterOutcome {
                        already_present: true,
                        ..ChapterOutcome::default()
                    });
                }
                Box::new(ArchiveSink::create(&path)?)
            }
            OutputMode::Directory => Box::new(DirectorySink::open(&base)?),
        };

        progress.chapter_started(&meta.number, meta.images.len());
        let outcome = match self.write_assets(&meta, sink.as_mut(), progress) {
            Ok(outcome) => outcome,
            Err(err) => {
                progress.chapter_failed(&meta.number);
                if let Err(e) = sink.discard() {
                    warn!("清理未完成的输出失败: {}", e);
                }
                return Err(err);
            }
        };
        if let Err(err) = sink.finish() {
            progress.chapter_failed(&meta.number);
            return Err(err.into());
        }

        progress.chapter_finished(&meta.number);
        info!(
            "Chapter {} 完成: 下载 {} 张, 跳过 {} 张, 失败 {} 张",
            meta.number, outcome.fetched, outcome.skipped, outcome.failed
        );
        Ok(outcome)
    }

    fn write_assets(
        &self,
        meta: &ChapterMeta,
        sink: &mut dyn OutputSink,
        progress: &mut dyn Progress,
    ) -> Result<ChapterOutcome, DownloadError> {
        let mut outcome = ChapterOutcome::default();

        for (i, image_url) in meta.images.iter().enumerate() {
            let index = i + 1;
            let name = asset_file_name(index, &self.extension);
            progress.asset(&meta.number, index);

            if sink.contains(&name) {
                debug!("已存在，跳过: {}", name);
                outcome.skipped += 1;
                continue;
            }

            match self.source.fetch(image_url)? {
                Fetched::Bytes(data) => {
                    sink.write(&name, &data)?;
                    outcome.fetched += 1;
                }
                Fetched::Failed(failure) => {
                    outcome.failed += 1;
                    match self.policy {
                        AssetFailurePolicy::KeepEmpty => {
                            warn!("图片 {} 下载失败，写入空文件: {}", name, failure.reason);
                            sink.write(&name, &[])?;
                        }
                        AssetFailurePolicy::Skip => {
                            warn!("图片 {} 下载失败，已跳过: {}", name, failure.reason);
                        }
                        AssetFailurePolicy::Abort => {
                            return Err(DownloadError::AssetUnavailable { index, failure });
                        }
                    }
                }
            }
        }

        Ok(outcome)
    }
}

pub struct SeriesDownloader<'a> {
    chapters: ChapterDownloader<'a>,
}

impl<'a> SeriesDownloader<'a> {
    pub fn new(chapters: ChapterDownloader<'a>) -> Self {
        Self { chapters }
    }

    pub fn download_series(
        &self,
        url: &str,
        mode: OutputMode,
        progress: &mut dyn Progress,
    ) -> Result<DownloadResult, DownloadError> {
        let meta = {
            let page = fetch_page(self.chapters.source, url)?;
            self.chapters.parser.parse_series(&page)?
        };
        debug!("Manga: {} ({} chapters)", meta.name, meta.chapters.len());
        progress.series_started(&meta.name, meta.chapters.len());

        let mut result = DownloadResult::default();
        for chapter_url in &meta.chapters {
            match self.chapters.download_chapter(chapter_url, mode, progress) {
                Ok(outcome) => result.record(&outcome),
                Err(err) if err.is_fatal() => return Err(err),
                Err(err) => {
                    warn!("章节下载失败 {}: {}", chapter_url, err);
                    result.failed += 1;
                }
            }
        }

        info!(
            "系列下载结束: 成功 {}, 跳过 {}, 失败 {}",
            result.success, result.skipped, result.failed
        );
        Ok(result)
    }
}
