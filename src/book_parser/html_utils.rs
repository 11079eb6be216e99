//! HTML 文本处理工具。
//!
//! 只覆盖页面解析所需的最小集合：`<title>` 文本、`<a href>` 属性、基础实体解码。
//! 不引入完整 HTML 解析库。

use regex::Regex;
use std::borrow::Cow;
use std::sync::OnceLock;

// 编译一次复用的正则缓存
fn re_title() -> &'static Regex {
    static R: OnceLock<Regex> = OnceLock::new();
    R.get_or_init(|| Regex::new(r"(?is)<title\b[^>]*>(.*?)</title\s*>").unwrap())
}

fn re_anchor_href() -> &'static Regex {
    static R: OnceLock<Regex> = OnceLock::new();
    R.get_or_init(|| {
        // 属性名前必须是空白，避免命中 data-href 之类的属性
        Regex::new(r#"(?is)<a\b[^>]*?\shref\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s>]+))"#).unwrap()
    })
}

// ── 实体解码 ────────────────────────────────────────────────────

pub(crate) fn unescape_basic_entities(s: &str) -> Cow<'_, str> {
    if !s.contains('&') {
        return Cow::Borrowed(s);
    }

    Cow::Owned(
        s.replace("&nbsp;", " ")
            .replace("&quot;", "\"")
            .replace("&#34;", "\"")
            .replace("&#x22;", "\"")
            .replace("&#39;", "'")
            .replace("&#x27;", "'")
            .replace("&lt;", "<")
            .replace("&gt;", ">")
            .replace("&amp;", "&"),
    )
}

// ── 提取 ────────────────────────────────────────────────────────

/// 第一个 `<title>` 的文本（实体已解码）。
pub(crate) fn page_title(html: &str) -> Option<String> {
    let cap = re_title().captures(html)?;
    let raw = cap.get(1)?.as_str();
    Some(unescape_basic_entities(raw).into_owned())
}

/// 按出现顺序返回所有 `<a>` 的 `href`。
pub(crate) fn anchor_hrefs(html: &str) -> Vec<String> {
    re_anchor_href()
        .captures_iter(html)
        .filter_map(|cap| cap.get(1).or_else(|| cap.get(2)).or_else(|| cap.get(3)))
        .map(|m| unescape_basic_entities(m.as_str()).into_owned())
        .collect()
}
