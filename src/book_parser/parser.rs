//! 页面解析：从章节页/系列页中取出标题、章节号、图片地址与章节链接。

use std::sync::OnceLock;

use regex::Regex;
use regex::bytes::Regex as BytesRegex;
use thiserror::Error;
use tracing::debug;

use super::html_utils::{anchor_hrefs, page_title};
use crate::base_system::context::Config;
use crate::base_system::manga_paths::sanitize_title;
use crate::download::models::{ChapterMeta, ChapterNumber, SeriesMeta};

#[derive(Debug, Error, PartialEq)]
pub enum ParseError {
    #[error("page has no <title>")]
    MissingTitle,
    #[error("no 'Ch.' marker in title '{0}'")]
    MissingChapterMarker(String),
    #[error("no chapter number after 'Ch.' in title '{0}'")]
    MissingChapterNumber(String),
    #[error("invalid chapter number '{0}'")]
    InvalidChapterNumber(String),
    #[error("invalid asset host pattern: {0}")]
    Pattern(String),
}

/// 一个站点的页面解析规则。编排逻辑只依赖该 trait。
pub trait SourceParser {
    fn parse_chapter(&self, page: &[u8]) -> Result<ChapterMeta, ParseError>;
    fn parse_series(&self, page: &[u8]) -> Result<SeriesMeta, ParseError>;
}

fn re_number() -> &'static Regex {
    static R: OnceLock<Regex> = OnceLock::new();
    R.get_or_init(|| Regex::new(r"[0-9.]+").unwrap())
}

/// bato.to 页面解析。
pub struct BatotoParser {
    site_base: String,
    asset_re: BytesRegex,
}

impl BatotoParser {
    pub fn new(site_base: &str, asset_host: &str) -> Result<Self, ParseError> {
        let pattern = format!(
            r"https://{}/images/[0-9a-zA-Z]+/[0-9a-zA-Z]+/[0-9a-zA-Z_]+\.[a-z]+",
            regex::escape(asset_host.trim())
        );
        let asset_re = BytesRegex::new(&pattern).map_err(|e| ParseError::Pattern(e.to_string()))?;
        Ok(Self {
            site_base: site_base.trim_end_matches('/').to_string(),
            asset_re,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self, ParseError> {
        Self::new(&config.site_base, &config.asset_host)
    }

    /// 图片地址，保持在页面中出现的顺序。
    pub fn image_urls(&self, page: &[u8]) -> Vec<String> {
        self.asset_re
            .find_iter(page)
            .map(|m| String::from_utf8_lossy(m.as_bytes()).into_owned())
            .collect()
    }

    /// 章节链接：包含 `chapter` 的 href，补全站点前缀后反转为从旧到新。
    pub fn chapter_urls(&self, html: &str) -> Vec<String> {
        let mut urls: Vec<String> = anchor_hrefs(html)
            .into_iter()
            .filter(|href| href.contains("chapter"))
            .map(|href| format!("{}{}", self.site_base, href))
            .collect();
        urls.reverse();
        urls
    }
}

impl SourceParser for BatotoParser {
    fn parse_chapter(&self, page: &[u8]) -> Result<ChapterMeta, ParseError> {
        let html = String::from_utf8_lossy(page);
        let full_title = page_title(&html).ok_or(ParseError::MissingTitle)?;

        let title = sanitize_title(series_title(&full_title));
        let number = chapter_number(&full_title)?;
        let images = self.image_urls(page);
        debug!(
            "解析章节页: title='{}' chapter={} images={}",
            title,
            number,
            images.len()
        );

        Ok(ChapterMeta {
            title,
            number,
            images,
        })
    }

    fn parse_series(&self, page: &[u8]) -> Result<SeriesMeta, ParseError> {
        let html = String::from_utf8_lossy(page);
        let full_title = page_title(&html).ok_or(ParseError::MissingTitle)?;
        let name = truncate_at(&full_title, "Manga").trim().to_string();
        let chapters = self.chapter_urls(&html);
        debug!("解析系列页: name='{}' chapters={}", name, chapters.len());
        Ok(SeriesMeta { name, chapters })
    }
}

fn truncate_at<'a>(s: &'a str, marker: &str) -> &'a str {
    match s.find(marker) {
        Some(idx) => &s[..idx],
        None => s,
    }
}

/// 章节页标题中的系列名：先截到 `Vol.`，再截到 `Ch.`。
pub fn series_title(full_title: &str) -> &str {
    truncate_at(truncate_at(full_title, "Vol."), "Ch.").trim()
}

/// `Ch.` 之后第一段由数字和 `.` 组成的文本。
pub fn chapter_number(full_title: &str) -> Result<ChapterNumber, ParseError> {
    let idx = full_title
        .find("Ch.")
        .ok_or_else(|| ParseError::MissingChapterMarker(full_title.to_string()))?;
    let rest = &full_title[idx + "Ch.".len()..];
    let raw = re_number()
        .find(rest)
        .ok_or_else(|| ParseError::MissingChapterNumber(full_title.to_string()))?
        .as_str();
    let value: f64 = raw
        .parse()
        .map_err(|_| ParseError::InvalidChapterNumber(raw.to_string()))?;
    Ok(ChapterNumber::from_decimal(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    const HOST: &str = "file-comic-2-2.anyacg.co";

    fn parser() -> BatotoParser {
        BatotoParser::new("https://bato.to", HOST).unwrap()
    }

    fn img(a: &str, b: &str, file: &str) -> String {
        format!("https://{HOST}/images/{a}/{b}/{file}")
    }

    fn chapter_page(title: &str, images: &[String]) -> Vec<u8> {
        let mut html = format!("<html><head><title>{title}</title></head><body>");
        for url in images {
            html.push_str(&format!("<img src=\"{url}\"/>\n"));
        }
        html.push_str("</body></html>");
        html.into_bytes()
    }

    #[test]
    fn chapter_page_yields_title_number_and_images() {
        let images = vec![
            img("ab12", "cd34", "p_001.jpg"),
            img("ab12", "cd34", "p_002.jpg"),
            img("ab12", "cd34", "p_003.png"),
        ];
        let page = chapter_page("Example Manga Vol.2 Ch.7 - Title", &images);
        let meta = parser().parse_chapter(&page).unwrap();

        assert_eq!(meta.title, "Example Manga");
        assert_eq!(meta.number, ChapterNumber::Whole(7));
        assert_eq!(meta.images, images);
    }

    #[test]
    fn extraction_is_deterministic() {
        let images = vec![img("a", "b", "1.jpg"), img("a", "b", "2.jpg")];
        let page = chapter_page("Demo: Test/One Ch.3", &images);
        let p = parser();
        let first = p.parse_chapter(&page).unwrap();
        let second = p.parse_chapter(&page).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.title, "Demo_ Test_One");
    }

    #[test]
    fn image_order_follows_source_order() {
        let images = vec![
            img("x", "y", "a.jpg"),
            img("x", "y", "b.jpg"),
            img("x", "y", "c.jpg"),
        ];
        let mut reversed = images.clone();
        reversed.reverse();

        let p = parser();
        let forward = p.image_urls(&chapter_page("T Ch.1", &images));
        let backward = p.image_urls(&chapter_page("T Ch.1", &reversed));
        assert_eq!(forward, images);
        assert_eq!(backward, reversed);
    }

    #[test]
    fn urls_from_other_hosts_are_ignored() {
        let page = format!(
            "<title>T Ch.1</title> https://cdn.example.com/images/a/b/c.jpg {}",
            img("a", "b", "c.jpg")
        );
        assert_eq!(parser().image_urls(page.as_bytes()), vec![img("a", "b", "c.jpg")]);
    }

    #[test]
    fn chapter_numbers_parse_as_whole_or_fractional() {
        assert_eq!(chapter_number("X Ch.12").unwrap(), ChapterNumber::Whole(12));
        assert_eq!(
            chapter_number("X Ch.12.5").unwrap(),
            ChapterNumber::Fractional(12.5)
        );
        assert_eq!(
            chapter_number("X Vol.3 Ch. 40 - Read").unwrap(),
            ChapterNumber::Whole(40)
        );
    }

    #[test]
    fn chapter_number_errors() {
        assert!(matches!(
            chapter_number("No marker here"),
            Err(ParseError::MissingChapterMarker(_))
        ));
        assert!(matches!(
            chapter_number("X Ch. extra"),
            Err(ParseError::MissingChapterNumber(_))
        ));
        assert!(matches!(
            chapter_number("X Ch.1.2.3"),
            Err(ParseError::InvalidChapterNumber(_))
        ));
    }

    #[test]
    fn series_title_truncates_at_volume_then_chapter() {
        assert_eq!(series_title("Example Manga Vol.2 Ch.7 - Title"), "Example Manga");
        assert_eq!(series_title("One Shot Ch.1"), "One Shot");
        assert_eq!(series_title("Plain"), "Plain");
    }

    #[test]
    fn page_without_title_is_an_error() {
        let err = parser().parse_chapter(b"<html></html>").unwrap_err();
        assert_eq!(err, ParseError::MissingTitle);
    }

    #[test]
    fn series_chapters_are_returned_oldest_first() {
        let mut html = String::from("<title>Example Manga - Read Online</title><a href=\"/series/1\">s</a>");
        for n in [5, 4, 3, 2, 1] {
            html.push_str(&format!("<a href=\"/chapter/{n}\">Ch.{n}</a>"));
        }
        html.push_str("<a href=\"/about\">about</a>");

        let meta = parser().parse_series(html.as_bytes()).unwrap();
        assert_eq!(meta.name, "Example");
        let expected: Vec<String> = (1..=5).map(|n| format!("https://bato.to/chapter/{n}")).collect();
        assert_eq!(meta.chapters, expected);
    }

    #[test]
    fn custom_site_base_is_used_for_links() {
        let p = BatotoParser::new("https://mirror.example/", HOST).unwrap();
        let urls = p.chapter_urls("<a href=\"/chapter/9\">x</a>");
        assert_eq!(urls, vec!["https://mirror.example/chapter/9"]);
    }
}
