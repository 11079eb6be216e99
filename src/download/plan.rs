//! 根据输入链接决定下载方式（整部系列或单章）。

use tracing::{info, warn};

use super::downloader::{ChapterDownloader, DownloadError, SeriesDownloader};
use super::models::{DownloadResult, OutputMode};
use super::progress::Progress;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UrlKind {
    Series,
    Chapter,
    Unknown,
}

impl UrlKind {
    /// `series` 优先于 `chapter`；非 bato.to 链接只给出警告，仍按关键字判断。
    pub fn classify(url: &str) -> Self {
        if !url.contains("bato.to") {
            warn!("Not a valid URL: {}", url);
        }
        if url.contains("series") {
            Self::Series
        } else if url.contains("chapter") {
            Self::Chapter
        } else {
            Self::Unknown
        }
    }
}

pub fn run(
    downloader: ChapterDownloader<'_>,
    url: &str,
    mode: OutputMode,
    progress: &mut dyn Progress,
) -> Result<DownloadResult, DownloadError> {
    match UrlKind::classify(url) {
        UrlKind::Series => {
            info!("Possibly a series URL");
            SeriesDownloader::new(downloader).download_series(url, mode, progress)
        }
        UrlKind::Chapter => {
            info!("Possibly a chapter URL");
            let outcome = downloader.download_chapter(url, mode, progress)?;
            let mut result = DownloadResult::default();
            result.record(&outcome);
            Ok(result)
        }
        UrlKind::Unknown => {
            warn!("无法识别的链接（需包含 series 或 chapter）: {}", url);
            Ok(DownloadResult::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_by_keyword() {
        assert_eq!(UrlKind::classify("https://bato.to/series/123"), UrlKind::Series);
        assert_eq!(UrlKind::classify("https://bato.to/chapter/456"), UrlKind::Chapter);
        assert_eq!(UrlKind::classify("https://bato.to/search?q=x"), UrlKind::Unknown);
    }

    #[test]
    fn series_wins_over_chapter() {
        assert_eq!(
            UrlKind::classify("https://bato.to/series/1/chapter-list"),
            UrlKind::Series
        );
    }

    #[test]
    fn foreign_host_is_still_classified() {
        assert_eq!(UrlKind::classify("https://example.com/chapter/1"), UrlKind::Chapter);
    }
}
