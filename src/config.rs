/// 配置系统
///
/// 提供TOML/JSON配置文件和环境变量覆盖
use serde::{Deserialize, Serialize};
use sprite_particles_simd::SimdBackend;
use std::env;
use std::fs;
use std::path::Path;
use thiserror::Error;

/// 配置错误
#[derive(Error, Debug)]
pub enum ConfigError {
    /// 文件读取错误
    #[error("Config file error: {0}")]
    FileError(#[from] std::io::Error),
    /// 解析错误
    #[error("Config parse error: {0}")]
    ParseError(String),
    /// 验证错误
    #[error("Config validation error: {0}")]
    ValidationError(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// 粒子系统主配置
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParticleConfig {
    /// SIMD内核配置
    #[serde(default)]
    pub simd: SimdConfig,

    /// 日志配置
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ParticleConfig {
    /// 创建默认配置
    pub fn new() -> Self {
        Self::default()
    }

    /// 从TOML文件加载配置
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(ConfigError::FileError)?;
        Self::from_toml_str(&content)
    }

    /// 从TOML字符串解析配置
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// 从JSON文件加载配置
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(ConfigError::FileError)?;
        Self::from_json_str(&content)
    }

    /// 从JSON字符串解析配置
    pub fn from_json_str(content: &str) -> ConfigResult<Self> {
        serde_json::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// 保存为TOML文件
    pub fn save_toml<P: AsRef<Path>>(&self, path: P) -> ConfigResult<()> {
        let content =
            toml::to_string_pretty(self).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        fs::write(path, content).map_err(ConfigError::FileError)
    }

    /// 保存为JSON文件
    pub fn save_json<P: AsRef<Path>>(&self, path: P) -> ConfigResult<()> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::ParseError(e.to_string()))?;
        fs::write(path, content).map_err(ConfigError::FileError)
    }

    /// 从环境变量覆盖配置
    pub fn apply_env_overrides(&mut self) {
        self.simd.apply_env_overrides();

        if let Ok(val) = env::var("PARTICLES_LOG_LEVEL") {
            if let Some(level) = LogLevel::from_name(&val) {
                self.logging.level = level;
            }
        }
    }

    /// 验证配置
    pub fn validate(&self) -> ConfigResult<()> {
        self.simd.validate()
    }

    /// 自动查找并加载配置文件
    ///
    /// 按以下顺序查找：
    /// 1. ./particles.toml
    /// 2. ./particles.json
    /// 3. 使用默认配置
    pub fn load_or_default() -> Self {
        if let Ok(config) = Self::from_toml_file("particles.toml") {
            tracing::info!(target: "config", "Loaded config from particles.toml");
            return config;
        }

        if let Ok(config) = Self::from_json_file("particles.json") {
            tracing::info!(target: "config", "Loaded config from particles.json");
            return config;
        }

        tracing::debug!(target: "config", "Using default configuration");
        Self::default()
    }
}

/// SIMD内核配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimdConfig {
    /// 为false时所有内核使用标量实现
    pub enabled: bool,

    /// 强制使用的指令集（scalar / sse2 / avx2 / neon）
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub force_instruction_set: Option<String>,
}

impl_default!(SimdConfig {
    enabled: true,
    force_instruction_set: None,
});

impl SimdConfig {
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = env::var("PARTICLES_SIMD_ENABLED") {
            self.enabled = val.parse().unwrap_or(self.enabled);
        }
        if let Ok(val) = env::var("PARTICLES_SIMD_FORCE") {
            let val = val.trim();
            self.force_instruction_set = (!val.is_empty()).then(|| val.to_string());
        }
    }

    pub fn validate(&self) -> ConfigResult<()> {
        match &self.force_instruction_set {
            Some(name) if SimdBackend::from_name(name).is_none() => {
                Err(ConfigError::ValidationError(format!(
                    "unknown instruction set '{}', expected one of scalar, sse2, avx2, neon",
                    name
                )))
            }
            _ => Ok(()),
        }
    }

    /// 根据配置和当前CPU确定内核后端
    ///
    /// 强制的指令集不受支持时退回到检测到的最优后端。
    pub fn resolve_backend(&self) -> SimdBackend {
        if !self.enabled {
            return SimdBackend::Scalar;
        }

        let best = SimdBackend::best_available();
        let Some(name) = self.force_instruction_set.as_deref() else {
            return best;
        };

        match SimdBackend::from_name(name) {
            Some(forced) if forced.is_supported() => forced,
            Some(forced) => {
                tracing::warn!(
                    target: "simd",
                    forced = %forced,
                    fallback = %best,
                    "Forced instruction set not supported on this CPU"
                );
                best
            }
            None => {
                tracing::warn!(
                    target: "simd",
                    forced = name,
                    fallback = %best,
                    "Unknown forced instruction set"
                );
                best
            }
        }
    }
}

/// 日志配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// 日志级别（`RUST_LOG` 未设置时使用）
    pub level: LogLevel,
}

impl_default!(LoggingConfig {
    level: LogLevel::Info,
});

impl LoggingConfig {
    /// 初始化全局tracing订阅器，已初始化时不做任何事
    pub fn init_tracing(&self) {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(self.level.as_str()));
        let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
    }
}

/// 日志级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// 跟踪
    Trace,
    /// 调试
    Debug,
    /// 信息
    Info,
    /// 警告
    Warn,
    /// 错误
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "trace" => Some(Self::Trace),
            "debug" => Some(Self::Debug),
            "info" => Some(Self::Info),
            "warn" | "warning" => Some(Self::Warn),
            "error" => Some(Self::Error),
            _ => None,
        }
    }
}
