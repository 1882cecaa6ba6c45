//! 会话配置
//!
//! 启动时构建一次，之后不可变，通过构造函数传入 `MotorSession`。

use crate::error::DriverError;
use servo_protocol::MotorId;
use std::collections::HashSet;
use std::time::Duration;

/// 默认应答超时
pub const DEFAULT_REPLY_TIMEOUT: Duration = Duration::from_millis(200);

/// 默认 CAN 接口
pub const DEFAULT_INTERFACE: &str = "can0";

/// 默认 CAN 波特率（1Mbps）
pub const DEFAULT_BITRATE: u32 = 1_000_000;

/// 默认电机名单
pub const DEFAULT_ROSTER: [u8; 3] = [1, 2, 3];

/// 会话配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// 已知电机名单（按切换顺序）
    pub roster: Vec<MotorId>,
    /// 每次事务等待应答的超时
    pub reply_timeout: Duration,
}

impl SessionConfig {
    /// 创建并校验配置
    pub fn new(roster: Vec<MotorId>, reply_timeout: Duration) -> Result<Self, DriverError> {
        let config = Self {
            roster,
            reply_timeout,
        };
        config.validate()?;
        Ok(config)
    }

    /// 从原始 ID 列表创建配置
    pub fn from_ids(ids: &[u8], reply_timeout: Duration) -> Result<Self, DriverError> {
        let roster = ids
            .iter()
            .map(|&id| MotorId::new(id).map_err(|e| DriverError::Config(e.to_string())))
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(roster, reply_timeout)
    }

    /// 校验：名单非空且无重复，超时非零
    pub fn validate(&self) -> Result<(), DriverError> {
        if self.roster.is_empty() {
            return Err(DriverError::Config("motor roster is empty".to_string()));
        }

        let mut seen = HashSet::new();
        for id in &self.roster {
            if !seen.insert(*id) {
                return Err(DriverError::Config(format!(
                    "motor id {} appears more than once in the roster",
                    id
                )));
            }
        }

        if self.reply_timeout.is_zero() {
            return Err(DriverError::Config(
                "reply timeout must be greater than zero".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            roster: DEFAULT_ROSTER
                .iter()
                .filter_map(|&id| MotorId::new(id).ok())
                .collect(),
            reply_timeout: DEFAULT_REPLY_TIMEOUT,
        }
    }
}
