//! # Servo Protocol
//!
//! 伺服电机驱动器 CAN 总线协议定义（无硬件依赖）
//!
//! ## 模块
//!
//! - `ids`: 命令字（opcode）与电机 ID 定义
//! - `units`: 物理量类型（角度、速度、电压）
//! - `control`: 命令帧构建
//! - `feedback`: 应答帧解析
//!
//! ## 字节序
//!
//! 协议使用 Intel 小端字节序（低位在前）。所有帧固定 8 字节：
//! Byte 0 为命令字，其余字节为命令相关字段，未使用的尾部字节填 0。

pub mod control;
pub mod feedback;
pub mod ids;
pub mod units;

// 重新导出常用类型
pub use control::*;
pub use feedback::*;
pub use ids::*;
pub use units::*;

use thiserror::Error;

/// CAN 2.0 标准帧的统一抽象
///
/// 协议层和 CAN 层之间的中间类型：协议层通过 `TryFrom<MotorFrame>` 解析，
/// 通过 `MotorCommand::to_frame()` 构建；CAN 层负责与具体硬件帧互转。
///
/// ```rust
/// use servo_protocol::MotorFrame;
///
/// let frame = MotorFrame::new_standard(0x141, &[0x9A, 0, 0, 0, 0, 0, 0, 0]);
/// assert_eq!(frame.id(), 0x141);
/// assert_eq!(frame.data_slice().len(), 8);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MotorFrame {
    /// CAN ID（标准帧或扩展帧）
    pub id: u32,

    /// 帧数据（固定 8 字节，未使用部分为 0）
    pub data: [u8; 8],

    /// 有效数据长度 (0-8)
    pub len: u8,

    /// 是否为扩展帧（29-bit ID）
    pub is_extended: bool,

    /// 接收时间戳（微秒），0 表示不可用
    pub timestamp_us: u64,
}

impl MotorFrame {
    /// 创建标准帧
    pub fn new_standard(id: u16, data: &[u8]) -> Self {
        Self::new(id as u32, data, false)
    }

    /// 创建扩展帧
    pub fn new_extended(id: u32, data: &[u8]) -> Self {
        Self::new(id, data, true)
    }

    fn new(id: u32, data: &[u8], is_extended: bool) -> Self {
        let mut fixed_data = [0u8; 8];
        let len = data.len().min(8);
        fixed_data[..len].copy_from_slice(&data[..len]);

        Self {
            id,
            data: fixed_data,
            len: len as u8,
            is_extended,
            timestamp_us: 0,
        }
    }

    /// 获取数据切片（只包含有效数据）
    pub fn data_slice(&self) -> &[u8] {
        &self.data[..self.len as usize]
    }

    /// 获取 CAN ID
    pub fn id(&self) -> u32 {
        self.id
    }

    /// 获取完整数据（8字节固定数组）
    pub fn data(&self) -> &[u8; 8] {
        &self.data
    }
}

/// 协议解析错误类型
///
/// 对上层而言，这些错误都表示"应答不可信，无可用数据"。
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Invalid frame length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("Unexpected opcode in reply: expected 0x{expected:02X}, got 0x{actual:02X}")]
    UnexpectedOpcode { expected: u8, actual: u8 },

    #[error("Invalid motor ID: {id} (valid range {min}..={max})")]
    InvalidMotorId { id: u8, min: u8, max: u8 },

    #[error("Invalid value for field {field}: {value}")]
    InvalidValue { field: String, value: u8 },
}

/// 7 字节（56 位）小端有符号整数符号扩展为 i64
///
/// 符号位取自最高字节（`bytes[6]`）的 bit 7。直接补零扩展会把负角度
/// 解析成巨大的正数。
pub fn sign_extend_i56(bytes: [u8; 7]) -> i64 {
    let fill = if bytes[6] & 0x80 != 0 { 0xFF } else { 0x00 };
    let mut wide = [fill; 8];
    wide[..7].copy_from_slice(&bytes);
    i64::from_le_bytes(wide)
}

/// 小端字节序转 i16
pub fn bytes_to_i16_le(bytes: [u8; 2]) -> i16 {
    i16::from_le_bytes(bytes)
}

/// 小端字节序转 u16
pub fn bytes_to_u16_le(bytes: [u8; 2]) -> u16 {
    u16::from_le_bytes(bytes)
}

/// 小端字节序转 u32
pub fn bytes_to_u32_le(bytes: [u8; 4]) -> u32 {
    u32::from_le_bytes(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_new_standard_pads_to_eight_bytes() {
        let frame = MotorFrame::new_standard(0x141, &[0x92]);
        assert_eq!(frame.id(), 0x141);
        assert_eq!(frame.len, 1);
        assert_eq!(frame.data(), &[0x92, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(frame.data_slice(), &[0x92]);
        assert!(!frame.is_extended);
    }

    #[test]
    fn test_frame_truncates_long_payload() {
        let frame = MotorFrame::new_extended(0x1234, &[1, 2, 3, 4, 5, 6, 7, 8, 9]);
        assert_eq!(frame.len, 8);
        assert_eq!(frame.data(), &[1, 2, 3, 4, 5, 6, 7, 8]);
        assert!(frame.is_extended);
    }

    #[test]
    fn test_sign_extend_i56_all_ones_is_minus_one() {
        assert_eq!(sign_extend_i56([0xFF; 7]), -1);
    }

    #[test]
    fn test_sign_extend_i56_positive() {
        assert_eq!(sign_extend_i56([0x50, 0x46, 0, 0, 0, 0, 0]), 18000);
        // 最高字节 0x7F：仍为正数
        assert_eq!(
            sign_extend_i56([0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x7F]),
            (1i64 << 55) - 1
        );
    }

    #[test]
    fn test_sign_extend_i56_most_negative() {
        assert_eq!(sign_extend_i56([0, 0, 0, 0, 0, 0, 0x80]), -(1i64 << 55));
    }

    #[test]
    fn test_le_helpers() {
        assert_eq!(bytes_to_i16_le([0x0A, 0x00]), 10);
        assert_eq!(bytes_to_i16_le([0xFF, 0xFF]), -1);
        assert_eq!(bytes_to_u16_le([0x1E, 0x00]), 30);
        assert_eq!(bytes_to_u32_le([0x50, 0x46, 0x00, 0x00]), 18000);
    }

    #[test]
    fn test_protocol_error_display() {
        let err = ProtocolError::InvalidLength {
            expected: 8,
            actual: 3,
        };
        assert_eq!(err.to_string(), "Invalid frame length: expected 8, got 3");

        let err = ProtocolError::UnexpectedOpcode {
            expected: 0x92,
            actual: 0x9A,
        };
        assert!(err.to_string().contains("0x92"));
        assert!(err.to_string().contains("0x9A"));
    }
}
