//! 进度上报与 CLI 进度条管理。
//!
//! 下载流程只通过 [`Progress`] 上报，不关心具体输出方式。

use std::time::Duration;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use super::models::ChapterNumber;

pub(crate) const PREFIX: &str = "[Batoto-dl]";

pub trait Progress {
    fn series_started(&mut self, _name: &str, _chapters: usize) {}
    fn chapter_started(&mut self, number: &ChapterNumber, assets: usize);
    fn asset(&mut self, number: &ChapterNumber, index: usize);
    fn chapter_finished(&mut self, number: &ChapterNumber);
    /// 章节中途失败；进度条需要在这里收尾。
    fn chapter_failed(&mut self, number: &ChapterNumber);
}

/// 不输出任何内容。
#[derive(Debug, Default)]
pub struct SilentProgress;

impl Progress for SilentProgress {
    fn chapter_started(&mut self, _number: &ChapterNumber, _assets: usize) {}
    fn asset(&mut self, _number: &ChapterNumber, _index: usize) {}
    fn chapter_finished(&mut self, _number: &ChapterNumber) {}
    fn chapter_failed(&mut self, _number: &ChapterNumber) {}
}

/// 单行刷新的终端进度条。
pub struct CliProgress {
    bar: Option<ProgressBar>,
}

impl CliProgress {
    pub fn new() -> Self {
        Self { bar: None }
    }

    fn style() -> ProgressStyle {
        ProgressStyle::with_template("{prefix} {msg} [{bar:30.cyan/blue}] {pos}/{len}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=>-")
    }
}

impl Default for CliProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl Progress for CliProgress {
    fn series_started(&mut self, name: &str, chapters: usize) {
        println!("{PREFIX} Manga: {name} ({chapters} chapters)");
    }

    fn chapter_started(&mut self, number: &ChapterNumber, assets: usize) {
        let bar = ProgressBar::with_draw_target(
            Some(assets as u64),
            ProgressDrawTarget::stderr_with_hz(10),
        );
        bar.set_style(Self::style());
        bar.set_prefix(PREFIX);
        bar.set_message(format!("Downloading chapter: {}", number.padded()));
        bar.enable_steady_tick(Duration::from_millis(200));
        if let Some(old) = self.bar.replace(bar) {
            old.finish_and_clear();
        }
    }

    fn asset(&mut self, number: &ChapterNumber, index: usize) {
        if let Some(bar) = self.bar.as_ref() {
            bar.set_message(format!(
                "Downloading chapter: {} | slide: {:02}",
                number.padded(),
                index
            ));
            bar.set_position(index as u64);
        }
    }

    fn chapter_finished(&mut self, number: &ChapterNumber) {
        if let Some(bar) = self.bar.take() {
            bar.finish_with_message(format!("Chapter {} done", number.padded()));
        }
    }

    fn chapter_failed(&mut self, number: &ChapterNumber) {
        if let Some(bar) = self.bar.take() {
            bar.abandon_with_message(format!("Chapter {} failed", number.padded()));
        }
    }
}
