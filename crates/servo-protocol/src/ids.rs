//! 命令字与 CAN ID 定义
//!
//! 每个电机占用一个标准帧仲裁 ID：`0x140 + MotorId`，请求与应答使用同一个 ID。

use crate::ProtocolError;
use num_enum::{IntoPrimitive, TryFromPrimitive};
use std::fmt;

/// 电机仲裁 ID 基址
pub const MOTOR_ARBITRATION_BASE: u32 = 0x140;

/// 所有命令/应答帧的固定长度
pub const FRAME_LEN: usize = 8;

/// 最小电机 ID
pub const MOTOR_ID_MIN: u8 = 1;

/// 最大电机 ID（`0x140 + 32 = 0x160`）
pub const MOTOR_ID_MAX: u8 = 32;

/// 命令字（Byte 0）
///
/// 应答帧的 Byte 0 回显对应请求的命令字。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum Opcode {
    /// 电机关闭（掉电，清除运行状态）
    PowerOff = 0x80,
    /// 电机运行（从关闭状态恢复）
    PowerRun = 0x88,
    /// 读取多圈角度
    ReadMultiTurnAngle = 0x92,
    /// 读取单圈角度
    ReadSingleTurnAngle = 0x94,
    /// 设置当前位置为任意角度
    SetZeroOffset = 0x95,
    /// 读取电机状态 1（温度、电压、电源状态）
    ReadStatus1 = 0x9A,
    /// 读取电机状态 2（温度、转矩电流、转速、编码器）
    ReadStatus2 = 0x9C,
    /// 单圈位置闭环控制
    AbsolutePosition = 0xA6,
    /// 增量位置闭环控制
    IncrementalPosition = 0xA8,
}

impl Opcode {
    /// 原始字节值
    pub fn as_byte(self) -> u8 {
        self.into()
    }

    /// 是否为纯查询命令（不改变电机状态）
    pub fn is_query(self) -> bool {
        matches!(
            self,
            Opcode::ReadMultiTurnAngle
                | Opcode::ReadSingleTurnAngle
                | Opcode::ReadStatus1
                | Opcode::ReadStatus2
        )
    }
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}(0x{:02X})", self, self.as_byte())
    }
}

/// 电机 ID
///
/// 合法范围 `1..=32`，由构造函数保证。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "u8", into = "u8")
)]
pub struct MotorId(u8);

impl MotorId {
    /// 创建电机 ID，超出 `1..=32` 时返回错误
    pub fn new(id: u8) -> Result<Self, ProtocolError> {
        if (MOTOR_ID_MIN..=MOTOR_ID_MAX).contains(&id) {
            Ok(Self(id))
        } else {
            Err(ProtocolError::InvalidMotorId {
                id,
                min: MOTOR_ID_MIN,
                max: MOTOR_ID_MAX,
            })
        }
    }

    /// 原始 ID 值
    pub fn get(self) -> u8 {
        self.0
    }

    /// 仲裁 ID（`0x140 + id`）
    pub fn arbitration_id(self) -> u32 {
        MOTOR_ARBITRATION_BASE + self.0 as u32
    }
}

impl TryFrom<u8> for MotorId {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        MotorId::new(value)
    }
}

impl From<MotorId> for u8 {
    fn from(id: MotorId) -> Self {
        id.0
    }
}

impl fmt::Display for MotorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
