//! 页面解析模块入口。
//!
//! 从章节页/系列页的原始字节中提取元数据，站点规则通过 `SourceParser` 接入。

pub(crate) mod html_utils;
pub mod parser;
