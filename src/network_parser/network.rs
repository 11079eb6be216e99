use std::fmt;
use std::io::Read;
use std::time::Duration;

use flate2::read::GzDecoder;
use reqwest::blocking::{Client, ClientBuilder};
use reqwest::header::{ACCEPT, ACCEPT_ENCODING, CONTENT_ENCODING, HeaderMap, HeaderValue, USER_AGENT};
use thiserror::Error;
use tracing::{debug, warn};

use crate::base_system::context::Config;

/// 无法继续运行的网络层错误。
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("unsupported content-encoding '{encoding}' from {url}")]
    UnsupportedEncoding { url: String, encoding: String },
    #[error("failed to inflate gzip body from {url}: {source}")]
    Decode {
        url: String,
        source: std::io::Error,
    },
    #[error("http client init failed: {0}")]
    Client(#[from] reqwest::Error),
}

/// 单次请求失败的原因；调用方自行决定跳过、中止还是写空文件。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchFailure {
    pub url: String,
    pub status: Option<u16>,
    pub reason: String,
}

impl fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(code) => write!(f, "{} (HTTP {}): {}", self.url, code, self.reason),
            None => write!(f, "{}: {}", self.url, self.reason),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fetched {
    Bytes(Vec<u8>),
    Failed(FetchFailure),
}

/// 页面/图片的获取方式。
pub trait PageSource {
    fn fetch(&self, url: &str) -> Result<Fetched, FetchError>;
}

pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, FetchError> {
        let client = client_builder(user_agent, timeout).build()?;
        Ok(Self { client })
    }

    pub fn from_config(config: &Config) -> Result<Self, FetchError> {
        Self::new(&config.user_agent, config.request_timeout())
    }
}

fn client_builder(user_agent: &str, timeout: Duration) -> ClientBuilder {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
    // reqwest 未启用 gzip 特性，响应体原样返回，由 decode_body 处理
    headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("gzip"));
    headers.insert(
        USER_AGENT,
        HeaderValue::from_str(user_agent).unwrap_or(HeaderValue::from_static("Mozilla/5.0")),
    );

    Client::builder().default_headers(headers).timeout(timeout)
}

impl PageSource for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<Fetched, FetchError> {
        debug!("GET {}", url);
        let resp = match self.client.get(url).send() {
            Ok(resp) => resp,
            Err(e) => {
                warn!("请求失败({}): {}", url, e);
                return Ok(Fetched::Failed(FetchFailure {
                    url: url.to_string(),
                    status: e.status().map(|s| s.as_u16()),
                    reason: e.to_string(),
                }));
            }
        };

        let status = resp.status();
        if !status.is_success() {
            warn!("Webpage({}) not found, Error code: {}", url, status.as_u16());
            return Ok(Fetched::Failed(FetchFailure {
                url: url.to_string(),
                status: Some(status.as_u16()),
                reason: status.to_string(),
            }));
        }

        let encoding = resp
            .headers()
            .get(CONTENT_ENCODING)
            .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned());

        let body = match resp.bytes() {
            Ok(b) => b.to_vec(),
            Err(e) => {
                warn!("读取响应失败({}): {}", url, e);
                return Ok(Fetched::Failed(FetchFailure {
                    url: url.to_string(),
                    status: Some(status.as_u16()),
                    reason: e.to_string(),
                }));
            }
        };

        decode_body(url, encoding.as_deref(), body).map(Fetched::Bytes)
    }
}

/// 按 `Content-Encoding` 还原响应体：仅支持 gzip，其余编码视为致命错误。
pub fn decode_body(url: &str, encoding: Option<&str>, body: Vec<u8>) -> Result<Vec<u8>, FetchError> {
    let encoding = encoding.map(str::trim).unwrap_or("");
    if encoding.is_empty() || encoding.eq_ignore_ascii_case("identity") {
        return Ok(body);
    }
    if !(encoding.eq_ignore_ascii_case("gzip") || encoding.eq_ignore_ascii_case("x-gzip")) {
        return Err(FetchError::UnsupportedEncoding {
            url: url.to_string(),
            encoding: encoding.to_string(),
        });
    }

    let mut out = Vec::with_capacity(body.len() * 4);
    GzDecoder::new(body.as_slice())
        .read_to_end(&mut out)
        .map_err(|source| FetchError::Decode {
            url: url.to_string(),
            source,
        })?;
    Ok(out)
}
