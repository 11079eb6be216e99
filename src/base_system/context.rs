//! 全局配置结构（Config）与默认值。
//!
//! 该模块同时提供生成 `config.yml` 的字段元信息。

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::config::{ConfigError, ConfigSpec, FieldMeta};

/// 单张图片下载失败时的处理方式。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetFailurePolicy {
    /// 写入空文件后继续（旧版行为）
    KeepEmpty,
    /// 不写入任何内容，继续下一张；目录模式下次运行会重新下载
    Skip,
    /// 中止当前章节
    Abort,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // 路径配置
    #[serde(default)]
    pub save_path: String,

    // 网络配置
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,

    // 站点配置
    #[serde(default = "default_site_base")]
    pub site_base: String,
    #[serde(default = "default_asset_host")]
    pub asset_host: String,

    // 保存配置
    #[serde(default = "default_image_extension")]
    pub image_extension: String,
    #[serde(default = "default_asset_failure_policy")]
    pub asset_failure_policy: AssetFailurePolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            save_path: String::new(),
            user_agent: default_user_agent(),
            request_timeout: default_request_timeout(),
            site_base: default_site_base(),
            asset_host: default_asset_host(),
            image_extension: default_image_extension(),
            asset_failure_policy: default_asset_failure_policy(),
        }
    }
}

impl ConfigSpec for Config {
    const FILE_NAME: &'static str = "config.yml";

    fn fields() -> &'static [FieldMeta] {
        static FIELDS: [FieldMeta; 7] = [
            FieldMeta {
                name: "save_path",
                description: "保存路径（留空为当前目录）",
            },
            FieldMeta {
                name: "user_agent",
                description: "请求使用的 User-Agent（源站会拒绝无标识的请求）",
            },
            FieldMeta {
                name: "request_timeout",
                description: "请求超时时间（秒）",
            },
            FieldMeta {
                name: "site_base",
                description: "站点根地址，用于拼接章节链接",
            },
            FieldMeta {
                name: "asset_host",
                description: "图片 CDN 域名",
            },
            FieldMeta {
                name: "image_extension",
                description: "保存图片使用的扩展名",
            },
            FieldMeta {
                name: "asset_failure_policy",
                description: "图片下载失败时的处理方式, 可选: [skip, keep_empty, abort]",
            },
        ];
        &FIELDS
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.request_timeout == 0 {
            return Err(ConfigError::Validation(
                "request_timeout 必须大于 0".to_string(),
            ));
        }
        let ext = self.image_extension.trim();
        if ext.is_empty() || ext.contains(['/', '\\', '.']) {
            return Err(ConfigError::Validation(format!(
                "image_extension 无效: '{}'",
                self.image_extension
            )));
        }
        if self.asset_host.trim().is_empty() {
            return Err(ConfigError::Validation("asset_host 不能为空".to_string()));
        }
        Ok(())
    }
}

impl Config {
    pub fn default_save_dir(&self) -> PathBuf {
        if self.save_path.trim().is_empty() {
            std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
        } else {
            PathBuf::from(&self.save_path)
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }
}

fn default_user_agent() -> String {
    "Mozilla/5.0".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

fn default_site_base() -> String {
    "https://bato.to".to_string()
}

fn default_asset_host() -> String {
    "file-comic-2-2.anyacg.co".to_string()
}

fn default_image_extension() -> String {
    "jpg".to_string()
}

fn default_asset_failure_policy() -> AssetFailurePolicy {
    AssetFailurePolicy::Skip
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base_system::config::{ConfigSpec, generate_yaml_with_comments, load_or_create};

    #[test]
    fn missing_config_is_created_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yml");

        let config: Config = load_or_create(&path).unwrap();
        assert!(path.exists());
        assert_eq!(config.asset_failure_policy, AssetFailurePolicy::Skip);
        assert_eq!(config.image_extension, "jpg");

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("# 图片 CDN 域名"));
        assert!(raw.contains("asset_host: file-comic-2-2.anyacg.co"));
    }

    #[test]
    fn user_values_override_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yml");
        std::fs::write(
            &path,
            "asset_failure_policy: keep_empty\nrequest_timeout: 5\n",
        )
        .unwrap();

        let config: Config = load_or_create(&path).unwrap();
        assert_eq!(config.asset_failure_policy, AssetFailurePolicy::KeepEmpty);
        assert_eq!(config.request_timeout, 5);
        assert_eq!(config.site_base, "https://bato.to");

        // 缺失字段会被补写回文件
        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("site_base"));
    }

    #[test]
    fn validation_rejects_bad_values() {
        let mut config = Config::default();
        assert!(config.validate().is_ok());

        config.request_timeout = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.image_extension = "../jpg".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn every_field_has_a_comment() {
        let yaml = generate_yaml_with_comments(&Config::default()).unwrap();
        for field in Config::fields() {
            assert!(yaml.contains(&format!("{}:", field.name)), "{}", field.name);
        }
    }
}
