//! CLI 配置
//!
//! 优先级：命令行参数 > 配置文件 > 默认值。合并结果只在启动时生成一次。
//!
//! 配置文件（TOML，默认位于 `<config_dir>/servo/config.toml`）：
//!
//! ```toml
//! interface = "can0"
//! bitrate = 1000000
//! motors = [1, 2, 3]
//! reply_timeout_ms = 200
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use servo_driver::config::{DEFAULT_BITRATE, DEFAULT_INTERFACE, DEFAULT_REPLY_TIMEOUT};
use servo_driver::{MotorId, MotorSessionBuilder, SessionConfig};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// 默认配置文件路径
pub fn default_config_path() -> Option<PathBuf> {
    let mut path = dirs::config_dir()?;
    path.push("servo");
    path.push("config.toml");
    Some(path)
}

/// 配置文件内容（所有字段可选）
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    /// SocketCAN 接口名
    pub interface: Option<String>,
    /// CAN 波特率
    pub bitrate: Option<u32>,
    /// 电机名单（ID 超出范围时解析失败）
    pub motors: Option<Vec<MotorId>>,
    /// 应答超时（毫秒）
    pub reply_timeout_ms: Option<u64>,
}

impl FileConfig {
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("解析配置文件失败")
    }

    /// 读取配置文件
    ///
    /// 显式指定的路径必须存在；默认路径不存在时返回空配置。
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let (path, required) = match explicit {
            Some(path) => (path.to_path_buf(), true),
            None => match default_config_path() {
                Some(path) => (path, false),
                None => return Ok(Self::default()),
            },
        };

        if !path.exists() {
            if required {
                anyhow::bail!("配置文件不存在: {}", path.display());
            }
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("读取配置文件失败: {}", path.display()))?;
        let config = Self::parse(&content)
            .with_context(|| format!("配置文件无效: {}", path.display()))?;
        tracing::debug!("Loaded config file {}: {:?}", path.display(), config);
        Ok(config)
    }
}

/// 命令行覆盖项（未指定为 `None`）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    pub interface: Option<String>,
    pub bitrate: Option<u32>,
    pub motors: Option<Vec<u8>>,
    pub reply_timeout_ms: Option<u64>,
}

/// 合并后的最终配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectiveConfig {
    pub interface: String,
    pub bitrate: u32,
    pub session: SessionConfig,
}

impl EffectiveConfig {
    /// 合并命令行参数、配置文件与默认值，并校验会话配置
    pub fn resolve(overrides: Overrides, file: FileConfig) -> Result<Self> {
        let interface = overrides
            .interface
            .or(file.interface)
            .unwrap_or_else(|| DEFAULT_INTERFACE.to_string());
        let bitrate = overrides.bitrate.or(file.bitrate).unwrap_or(DEFAULT_BITRATE);
        let reply_timeout = overrides
            .reply_timeout_ms
            .or(file.reply_timeout_ms)
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_REPLY_TIMEOUT);

        let session = match (overrides.motors, file.motors) {
            (Some(ids), _) => SessionConfig::from_ids(&ids, reply_timeout)?,
            (None, Some(roster)) => SessionConfig::new(roster, reply_timeout)?,
            (None, None) => SessionConfig {
                reply_timeout,
                ..SessionConfig::default()
            },
        };
        session.validate()?;

        Ok(Self {
            interface,
            bitrate,
            session,
        })
    }

    pub fn builder(&self) -> MotorSessionBuilder {
        MotorSessionBuilder::new()
            .interface(self.interface.as_str())
            .bitrate(self.bitrate)
            .config(self.session.clone())
    }
}
