//! 驱动层错误类型定义

use servo_can::CanError;
use servo_protocol::{MotorId, Opcode, ProtocolError};
use std::time::Duration;
use thiserror::Error;

/// 驱动层错误类型
///
/// 除 `Config` 外均为局部可恢复错误：报告给用户，操作结束，会话保持可用。
/// 任何错误都不会自动重试。
#[derive(Error, Debug)]
pub enum DriverError {
    /// CAN 传输错误（总线不可用、发送失败）
    #[error("CAN transport error: {0}")]
    Transport(#[from] CanError),

    /// 超时无应答（结果未知）
    #[error("No reply to {opcode} from motor {motor} within {timeout:?}")]
    NoReply {
        motor: MotorId,
        opcode: Opcode,
        timeout: Duration,
    },

    /// 应答格式错误（长度不足或命令字不匹配），数据不可信
    #[error("Malformed response: {0}")]
    Malformed(#[from] ProtocolError),

    /// 无效输入（如参数不是数字），暂存参数保持不变
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// 配置错误（启动阶段）
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl DriverError {
    /// 是否可恢复（交互循环应继续）
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, DriverError::Config(_))
    }

    /// 是否为无应答
    pub fn is_no_reply(&self) -> bool {
        matches!(self, DriverError::NoReply { .. })
    }
}
