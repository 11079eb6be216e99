//! 下载流程模块入口。
//!
//! 子模块：
//! - `models`      — 数据模型（ChapterMeta / SeriesMeta / ChapterNumber 等）
//! - `progress`    — 进度上报与 CLI 进度条
//! - `sink`        — 输出目标（目录 / cbz）
//! - `plan`        — 根据链接选择系列或单章下载
//! - `downloader`  — 下载主流程编排

pub mod downloader;
pub mod models;
pub mod plan;
pub mod progress;
pub mod sink;
