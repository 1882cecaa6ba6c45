//! Builder 模式实现
//!
//! 提供链式构造 `MotorSession` 实例的便捷方式。

use crate::config::{DEFAULT_BITRATE, DEFAULT_INTERFACE, SessionConfig};
use crate::error::DriverError;
use crate::session::MotorSession;
use crate::transport::CanTransport;
use servo_can::CanAdapter;
#[cfg(target_os = "linux")]
use servo_can::SocketCanAdapter;
use std::time::Duration;
use tracing::info;

/// MotorSession Builder（链式构造）
///
/// # Example
///
/// ```no_run
/// use servo_driver::MotorSessionBuilder;
/// use std::time::Duration;
///
/// let session = MotorSessionBuilder::new()
///     .interface("can0")
///     .roster([1, 2])
///     .reply_timeout(Duration::from_millis(100))
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone, Default)]
pub struct MotorSessionBuilder {
    /// SocketCAN 接口名（默认 "can0"）
    interface: Option<String>,
    /// CAN 波特率（默认 1M）
    bitrate: Option<u32>,
    /// 电机名单（原始 ID，构建时校验）
    roster: Option<Vec<u8>>,
    /// 应答超时
    reply_timeout: Option<Duration>,
}

impl MotorSessionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置 CAN 接口（可选，默认 "can0"）
    pub fn interface(mut self, interface: impl Into<String>) -> Self {
        self.interface = Some(interface.into());
        self
    }

    /// 设置 CAN 波特率（可选，默认 1M）
    pub fn bitrate(mut self, bitrate: u32) -> Self {
        self.bitrate = Some(bitrate);
        self
    }

    /// 设置电机名单（可选，默认 `[1, 2, 3]`）
    pub fn roster(mut self, ids: impl IntoIterator<Item = u8>) -> Self {
        self.roster = Some(ids.into_iter().collect());
        self
    }

    /// 设置应答超时（可选，默认 200ms）
    pub fn reply_timeout(mut self, timeout: Duration) -> Self {
        self.reply_timeout = Some(timeout);
        self
    }

    /// 使用已有配置（覆盖之前设置的名单与超时）
    pub fn config(mut self, config: SessionConfig) -> Self {
        self.roster = Some(config.roster.iter().map(|id| id.get()).collect());
        self.reply_timeout = Some(config.reply_timeout);
        self
    }

    pub fn interface_name(&self) -> &str {
        self.interface.as_deref().unwrap_or(DEFAULT_INTERFACE)
    }

    pub fn bitrate_value(&self) -> u32 {
        self.bitrate.unwrap_or(DEFAULT_BITRATE)
    }

    /// 生成并校验会话配置
    pub fn build_config(&self) -> Result<SessionConfig, DriverError> {
        let defaults = SessionConfig::default();
        let timeout = self.reply_timeout.unwrap_or(defaults.reply_timeout);
        match &self.roster {
            Some(ids) => SessionConfig::from_ids(ids, timeout),
            None => SessionConfig::new(defaults.roster, timeout),
        }
    }

    /// 使用给定的 CAN 适配器构建会话
    pub fn build_with_adapter<A: CanAdapter>(
        self,
        adapter: A,
    ) -> Result<MotorSession<CanTransport<A>>, DriverError> {
        let config = self.build_config()?;
        MotorSession::new(config, CanTransport::new(adapter))
    }

    /// 打开 SocketCAN 接口并构建会话
    ///
    /// # Errors
    /// - `DriverError::Config`: 名单或超时无效
    /// - `DriverError::Transport`: 接口不存在、未启动或无权限
    #[cfg(target_os = "linux")]
    pub fn build(self) -> Result<MotorSession<CanTransport<SocketCanAdapter>>, DriverError> {
        // 先校验配置，避免无效配置时打开设备
        self.build_config()?;

        let interface = self.interface_name().to_string();
        let bitrate = self.bitrate_value();
        let mut adapter = SocketCanAdapter::new(interface.as_str())?;
        adapter.configure(bitrate)?;
        info!(
            "SocketCAN interface {} opened (bitrate {} bps)",
            interface, bitrate
        );

        self.build_with_adapter(adapter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use servo_can::MockCanAdapter;

    #[test]
    fn test_builder_defaults() {
        let builder = MotorSessionBuilder::new();
        assert_eq!(builder.interface_name(), "can0");
        assert_eq!(builder.bitrate_value(), 1_000_000);
        assert_eq!(builder.build_config().unwrap(), SessionConfig::default());
    }

    #[test]
    fn test_builder_chain() {
        let builder = MotorSessionBuilder::new()
            .interface("vcan0")
            .bitrate(500_000)
            .roster([4, 6])
            .reply_timeout(Duration::from_millis(50));
        assert_eq!(builder.interface_name(), "vcan0");
        assert_eq!(builder.bitrate_value(), 500_000);

        let config = builder.build_config().unwrap();
        assert_eq!(config.roster.len(), 2);
        assert_eq!(config.roster[0].get(), 4);
        assert_eq!(config.reply_timeout, Duration::from_millis(50));
    }

    #[test]
    fn test_builder_from_config() {
        let config = SessionConfig::from_ids(&[9], Duration::from_millis(10)).unwrap();
        let built = MotorSessionBuilder::new().config(config.clone()).build_config().unwrap();
        assert_eq!(built, config);
    }

    #[test]
    fn test_builder_rejects_invalid_roster() {
        let err = MotorSessionBuilder::new().roster(Vec::new()).build_config().unwrap_err();
        assert!(matches!(err, DriverError::Config(_)));

        let err = MotorSessionBuilder::new()
            .roster([1, 40])
            .build_with_adapter(MockCanAdapter::new())
            .unwrap_err();
        assert!(matches!(err, DriverError::Config(_)));
    }

    #[test]
    fn test_build_with_mock_adapter() {
        let session = MotorSessionBuilder::new()
            .roster([2, 3])
            .build_with_adapter(MockCanAdapter::new())
            .unwrap();
        assert_eq!(session.active_motor().get(), 2);
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_build_missing_interface_fails() {
        let err = MotorSessionBuilder::new().interface("can999").build().unwrap_err();
        assert!(matches!(err, DriverError::Transport(_)));
    }
}
