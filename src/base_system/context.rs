//! 运行配置（Config）与默认值。
//!
//! 同时提供生成 `config.yml` 的字段元信息，以及由数据目录推导出的各类路径。

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::config::{ConfigSpec, FieldMeta};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // 网络配置
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_wait_time")]
    pub retry_wait_time: u64,

    // 转封装配置
    #[serde(default)]
    pub ffmpeg_path: String,
    #[serde(default = "default_ffmpeg_loglevel")]
    pub ffmpeg_loglevel: String,

    // 路径配置
    #[serde(default)]
    pub output_path: String,
    #[serde(default)]
    pub temp_path: String,

    // 清理配置
    #[serde(default = "default_true")]
    pub delete_capture_on_success: bool,
    #[serde(default = "default_true")]
    pub auto_clear_temp: bool,

    /// 数据目录（config.yml 所在目录），不写入配置文件。
    #[serde(skip)]
    data_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_workers: default_max_workers(),
            request_timeout: default_request_timeout(),
            max_retries: default_max_retries(),
            retry_wait_time: default_retry_wait_time(),
            ffmpeg_path: String::new(),
            ffmpeg_loglevel: default_ffmpeg_loglevel(),
            output_path: String::new(),
            temp_path: String::new(),
            delete_capture_on_success: default_true(),
            auto_clear_temp: default_true(),
            data_dir: None,
        }
    }
}

impl ConfigSpec for Config {
    const FILE_NAME: &'static str = "config.yml";

    fn fields() -> &'static [FieldMeta] {
        static FIELDS: [FieldMeta; 10] = [
            FieldMeta {
                name: "max_workers",
                description: "最大并发下载数",
            },
            FieldMeta {
                name: "request_timeout",
                description: "单次请求超时时间（秒）",
            },
            FieldMeta {
                name: "max_retries",
                description: "每个分段的最大尝试次数",
            },
            FieldMeta {
                name: "retry_wait_time",
                description: "失败后重试前的等待时间, 单位ms",
            },
            FieldMeta {
                name: "ffmpeg_path",
                description: "ffmpeg 可执行文件路径（留空则使用 source/ffmpeg 或 PATH 中的 ffmpeg）",
            },
            FieldMeta {
                name: "ffmpeg_loglevel",
                description: "ffmpeg 日志级别",
            },
            FieldMeta {
                name: "output_path",
                description: "输出目录（留空为数据目录下的 output）",
            },
            FieldMeta {
                name: "temp_path",
                description: "临时目录（留空为数据目录下的 temp）",
            },
            FieldMeta {
                name: "delete_capture_on_success",
                description: "转换成功后是否删除 .har 文件",
            },
            FieldMeta {
                name: "auto_clear_temp",
                description: "转换成功后是否自动清理临时文件",
            },
        ];
        &FIELDS
    }

    fn validate(&self) -> Result<(), String> {
        if self.max_workers == 0 {
            return Err("max_workers 必须大于 0".to_string());
        }
        if self.max_retries == 0 {
            return Err("max_retries 必须大于 0".to_string());
        }
        if self.request_timeout == 0 {
            return Err("request_timeout 必须大于 0".to_string());
        }
        Ok(())
    }
}

impl Config {
    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(dir.into());
        self
    }

    pub fn data_dir(&self) -> PathBuf {
        self.data_dir
            .clone()
            .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
    }

    pub fn output_dir(&self) -> PathBuf {
        resolve_dir(&self.output_path, &self.data_dir(), "output")
    }

    pub fn temp_dir(&self) -> PathBuf {
        resolve_dir(&self.temp_path, &self.data_dir(), "temp")
    }

    /// 显式配置优先；否则使用数据目录下的 `source/ffmpeg`，再退回 PATH。
    pub fn ffmpeg_program(&self) -> PathBuf {
        let configured = self.ffmpeg_path.trim();
        if !configured.is_empty() {
            return PathBuf::from(configured);
        }
        let bundled = self
            .data_dir()
            .join("source")
            .join(format!("ffmpeg{}", std::env::consts::EXE_SUFFIX));
        if bundled.is_file() {
            bundled
        } else {
            PathBuf::from("ffmpeg")
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout.max(1))
    }

    pub fn retry_wait(&self) -> Duration {
        Duration::from_millis(self.retry_wait_time)
    }
}

fn resolve_dir(configured: &str, data_dir: &Path, fallback: &str) -> PathBuf {
    let configured = configured.trim();
    if configured.is_empty() {
        return data_dir.join(fallback);
    }
    let path = PathBuf::from(configured);
    if path.is_absolute() {
        path
    } else {
        data_dir.join(path)
    }
}

fn default_true() -> bool {
    true
}

fn default_max_workers() -> usize {
    6
}

fn default_request_timeout() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_wait_time() -> u64 {
    1000
}

fn default_ffmpeg_loglevel() -> String {
    "error".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paths_resolve_against_data_dir() {
        let cfg = Config::default().with_data_dir("/data");
        assert_eq!(cfg.output_dir(), PathBuf::from("/data/output"));
        assert_eq!(cfg.temp_dir(), PathBuf::from("/data/temp"));

        let cfg = Config {
            output_path: "videos".to_string(),
            temp_path: "/scratch".to_string(),
            ..Config::default()
        }
        .with_data_dir("/data");
        assert_eq!(cfg.output_dir(), PathBuf::from("/data/videos"));
        assert_eq!(cfg.temp_dir(), PathBuf::from("/scratch"));
    }

    #[test]
    fn ffmpeg_prefers_explicit_then_bundled_then_path() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = Config::default().with_data_dir(dir.path());
        assert_eq!(cfg.ffmpeg_program(), PathBuf::from("ffmpeg"));

        let bundled = dir
            .path()
            .join("source")
            .join(format!("ffmpeg{}", std::env::consts::EXE_SUFFIX));
        std::fs::create_dir_all(bundled.parent().unwrap()).unwrap();
        std::fs::write(&bundled, b"").unwrap();
        assert_eq!(cfg.ffmpeg_program(), bundled);

        let cfg = Config {
            ffmpeg_path: "/opt/ffmpeg/bin/ffmpeg".to_string(),
            ..cfg
        };
        assert_eq!(cfg.ffmpeg_program(), PathBuf::from("/opt/ffmpeg/bin/ffmpeg"));
    }

    #[test]
    fn defaults_match_original_tool() {
        let cfg = Config::default();
        assert_eq!(cfg.max_workers, 6);
        assert_eq!(cfg.request_timeout(), Duration::from_secs(30));
        assert_eq!(cfg.max_retries, 3);
        assert_eq!(cfg.retry_wait(), Duration::from_secs(1));
        assert!(cfg.validate().is_ok());
    }
}
