use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

pub const CONFIG_ENV: &str = "LAYERGRAB_CONFIG";

/// 应用配置的根结构。
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
    #[serde(default)]
    pub host: HostConfig,
}

impl AppConfig {
    /// 从显式路径加载配置。
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// 自动发现配置文件：优先读取环境变量 `LAYERGRAB_CONFIG`，否则寻找 `./config/default.toml`。
    /// 若文件缺失，则返回默认配置。
    pub fn discover() -> Result<Self, ConfigError> {
        if let Some(path) = env::var_os(CONFIG_ENV) {
            return Self::from_file(PathBuf::from(path));
        }

        let default_path = env::current_dir()
            .map(|dir| dir.join("config").join("default.toml"))
            .map_err(|source| ConfigError::Context {
                message: "获取当前工作目录失败".to_string(),
                source,
            })?;

        if default_path.exists() {
            Self::from_file(default_path)
        } else {
            Ok(Self::default())
        }
    }
}

/// 日志配置，支持设置默认等级。
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "LoggingConfig::default_level")]
    pub level: String,
}

impl LoggingConfig {
    fn default_level() -> String {
        "info".to_string()
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: Self::default_level(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputMode {
    #[default]
    Center,
    Corners,
}

/// 提取默认值，命令行参数可逐项覆盖。
#[derive(Debug, Clone, Deserialize)]
pub struct ExtractionConfig {
    #[serde(default)]
    pub layers: Vec<String>,
    #[serde(default)]
    pub mode: OutputMode,
    #[serde(default = "ExtractionConfig::default_prefix")]
    pub id_prefix: String,
    #[serde(default = "ExtractionConfig::default_start")]
    pub start_number: u64,
    #[serde(default = "ExtractionConfig::default_precision")]
    pub decimal_precision: u32,
    #[serde(default)]
    pub top_level_only: bool,
}

impl ExtractionConfig {
    fn default_prefix() -> String {
        "P".to_string()
    }

    fn default_start() -> u64 {
        1
    }

    fn default_precision() -> u32 {
        3
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            layers: Vec::new(),
            mode: OutputMode::default(),
            id_prefix: Self::default_prefix(),
            start_number: Self::default_start(),
            decimal_precision: Self::default_precision(),
            top_level_only: false,
        }
    }
}

/// 宿主调用的重试参数。
#[derive(Debug, Clone, Deserialize)]
pub struct HostConfig {
    #[serde(default = "HostConfig::default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "HostConfig::default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    #[serde(default = "HostConfig::default_backoff_factor")]
    pub backoff_factor: f64,
    #[serde(default = "HostConfig::default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl HostConfig {
    fn default_max_attempts() -> u32 {
        5
    }

    fn default_initial_delay_ms() -> u64 {
        50
    }

    fn default_backoff_factor() -> f64 {
        2.0
    }

    fn default_max_delay_ms() -> u64 {
        1000
    }

    #[inline]
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    #[inline]
    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            max_attempts: Self::default_max_attempts(),
            initial_delay_ms: Self::default_initial_delay_ms(),
            backoff_factor: Self::default_backoff_factor(),
            max_delay_ms: Self::default_max_delay_ms(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("读取配置文件 {path:?} 失败: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("解析配置文件 {path:?} 失败: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("{message}")]
    Context {
        message: String,
        #[source]
        source: std::io::Error,
    },
}
