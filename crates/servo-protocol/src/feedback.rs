//! 应答帧解析
//!
//! 应答帧 Byte 0 回显请求命令字，其余字节为小端遥测数据。
//! 长度不足或命令字不匹配时返回 `ProtocolError`，调用方应视为"无可用数据"。

use crate::ids::{FRAME_LEN, Opcode};
use crate::units::{AngleDeg, Voltage};
use crate::{
    MotorFrame, ProtocolError, bytes_to_i16_le, bytes_to_u16_le, bytes_to_u32_le, sign_extend_i56,
};

/// 校验长度与命令字，返回定长数据
fn check_reply(data: &[u8], expected: Opcode) -> Result<[u8; FRAME_LEN], ProtocolError> {
    if data.len() < FRAME_LEN {
        return Err(ProtocolError::InvalidLength {
            expected: FRAME_LEN,
            actual: data.len(),
        });
    }

    let expected = expected.as_byte();
    if data[0] != expected {
        return Err(ProtocolError::UnexpectedOpcode {
            expected,
            actual: data[0],
        });
    }

    let mut fixed = [0u8; FRAME_LEN];
    fixed.copy_from_slice(&data[..FRAME_LEN]);
    Ok(fixed)
}

// ============================================================================
// 角度
// ============================================================================

/// 多圈角度应答 (0x92)
///
/// Byte 1-7 为 56 位有符号小端整数，0.01°/LSB，不在 360° 处回绕。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MultiTurnAngle {
    /// 原始值（0.01°，已符号扩展）
    pub raw_centideg: i64,
}

impl MultiTurnAngle {
    pub fn from_payload(data: &[u8]) -> Result<Self, ProtocolError> {
        let data = check_reply(data, Opcode::ReadMultiTurnAngle)?;
        let mut bytes = [0u8; 7];
        bytes.copy_from_slice(&data[1..8]);
        Ok(Self {
            raw_centideg: sign_extend_i56(bytes),
        })
    }

    /// 角度（度）
    pub fn angle(&self) -> AngleDeg {
        AngleDeg::from_centideg(self.raw_centideg)
    }
}

impl TryFrom<MotorFrame> for MultiTurnAngle {
    type Error = ProtocolError;

    fn try_from(frame: MotorFrame) -> Result<Self, Self::Error> {
        Self::from_payload(frame.data_slice())
    }
}

/// 单圈角度应答 (0x94)
///
/// Byte 4-7 为无符号 32 位小端整数，0.01°/LSB，概念范围 [0, 36000)。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SingleTurnAngle {
    /// 原始值（0.01°）
    pub raw_centideg: u32,
}

impl SingleTurnAngle {
    pub fn from_payload(data: &[u8]) -> Result<Self, ProtocolError> {
        let data = check_reply(data, Opcode::ReadSingleTurnAngle)?;
        Ok(Self {
            raw_centideg: bytes_to_u32_le([data[4], data[5], data[6], data[7]]),
        })
    }

    /// 角度（度）
    pub fn angle(&self) -> AngleDeg {
        AngleDeg::from_centideg(self.raw_centideg as i64)
    }
}

impl TryFrom<MotorFrame> for SingleTurnAngle {
    type Error = ProtocolError;

    fn try_from(frame: MotorFrame) -> Result<Self, Self::Error> {
        Self::from_payload(frame.data_slice())
    }
}

// ============================================================================
// 状态
// ============================================================================

/// 电机状态 1 应答 (0x9A)
///
/// - Byte 1: 温度（u8，1°C/LSB）
/// - Byte 2-3: 电压（i16，0.01V/LSB）
/// - Byte 6: 电源状态字节
/// - Byte 7: 错误标志（bit 0 低压，bit 3 过温）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Status1 {
    pub temperature_c: u8,
    pub voltage_raw: i16,
    pub power_state: u8,
    pub error_flags: u8,
}

impl Status1 {
    /// 低压错误位
    pub const ERROR_UNDER_VOLTAGE: u8 = 0x01;
    /// 过温错误位
    pub const ERROR_OVER_TEMPERATURE: u8 = 0x08;

    pub fn from_payload(data: &[u8]) -> Result<Self, ProtocolError> {
        let data = check_reply(data, Opcode::ReadStatus1)?;
        Ok(Self {
            temperature_c: data[1],
            voltage_raw: bytes_to_i16_le([data[2], data[3]]),
            power_state: data[6],
            error_flags: data[7],
        })
    }

    /// 电压（伏特）
    pub fn voltage(&self) -> Voltage {
        Voltage::from_raw(self.voltage_raw)
    }

    /// 电机是否处于运行（上电）状态
    ///
    /// 驱动器在运行状态下 Byte 6 为 0x00，关闭后为非零。
    pub fn is_powered_on(&self) -> bool {
        self.power_state == 0x00
    }

    pub fn under_voltage(&self) -> bool {
        self.error_flags & Self::ERROR_UNDER_VOLTAGE != 0
    }

    pub fn over_temperature(&self) -> bool {
        self.error_flags & Self::ERROR_OVER_TEMPERATURE != 0
    }
}

impl TryFrom<MotorFrame> for Status1 {
    type Error = ProtocolError;

    fn try_from(frame: MotorFrame) -> Result<Self, Self::Error> {
        Self::from_payload(frame.data_slice())
    }
}

/// 电机状态 2 应答 (0x9C)
///
/// - Byte 1: 温度（i8，1°C/LSB）
/// - Byte 2-3: 转矩电流原始值（i16）
/// - Byte 4-5: 转速（i16，1dps/LSB）
/// - Byte 6-7: 编码器位置（u16）
///
/// 位置控制指令（0xA6 / 0xA8）的应答使用相同布局，仅命令字不同。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Status2 {
    pub temperature_c: i8,
    pub torque_current_raw: i16,
    pub speed_dps: i16,
    pub encoder: u16,
}

impl Status2 {
    pub fn from_payload(data: &[u8]) -> Result<Self, ProtocolError> {
        Self::from_payload_with_opcode(data, Opcode::ReadStatus2)
    }

    /// 按状态 2 布局解析指定命令字的应答（用于运动指令应答）
    pub fn from_payload_with_opcode(data: &[u8], opcode: Opcode) -> Result<Self, ProtocolError> {
        let data = check_reply(data, opcode)?;
        Ok(Self {
            temperature_c: data[1] as i8,
            torque_current_raw: bytes_to_i16_le([data[2], data[3]]),
            speed_dps: bytes_to_i16_le([data[4], data[5]]),
            encoder: bytes_to_u16_le([data[6], data[7]]),
        })
    }
}

impl TryFrom<MotorFrame> for Status2 {
    type Error = ProtocolError;

    fn try_from(frame: MotorFrame) -> Result<Self, Self::Error> {
        Self::from_payload(frame.data_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_multi_turn_all_ones_is_minus_one_centidegree() {
        let data = [0x92, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF];
        let angle = MultiTurnAngle::from_payload(&data).unwrap();
        assert_eq!(angle.raw_centideg, -1);
        assert_eq!(angle.angle(), AngleDeg(-0.01));
    }

    #[test]
    fn test_multi_turn_negative_when_top_byte_high() {
        let data = [0x92, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x80];
        let angle = MultiTurnAngle::from_payload(&data).unwrap();
        assert!(angle.angle().value() < 0.0);
        assert_eq!(angle.raw_centideg, -(1i64 << 55));
    }

    #[test]
    fn test_multi_turn_positive() {
        // 720.50° = 72050 = 0x011972
        let data = [0x92, 0x72, 0x19, 0x01, 0x00, 0x00, 0x00, 0x00];
        let angle = MultiTurnAngle::from_payload(&data).unwrap();
        assert_eq!(angle.raw_centideg, 72050);
        assert_eq!(angle.angle(), AngleDeg(720.5));
    }

    #[test]
    fn test_multi_turn_negative_multi_revolution() {
        // -720.00° = -72000
        let raw = (-72000i64).to_le_bytes();
        let mut data = [0x92u8; 8];
        data[1..8].copy_from_slice(&raw[..7]);
        let angle = MultiTurnAngle::from_payload(&data).unwrap();
        assert_eq!(angle.angle(), AngleDeg(-720.0));
    }

    #[test]
    fn test_single_turn_angle() {
        // 359.99° = 35999 = 0x8C9F
        let data = [0x94, 0x00, 0x00, 0x00, 0x9F, 0x8C, 0x00, 0x00];
        let angle = SingleTurnAngle::from_payload(&data).unwrap();
        assert_eq!(angle.raw_centideg, 35999);
        assert_eq!(angle.angle(), AngleDeg(359.99));
    }

    #[test]
    fn test_single_turn_is_unsigned() {
        let data = [0x94, 0x00, 0x00, 0x00, 0xFF, 0xFF, 0xFF, 0xFF];
        let angle = SingleTurnAngle::from_payload(&data).unwrap();
        assert_eq!(angle.raw_centideg, u32::MAX);
        assert!(angle.angle().value() > 0.0);
    }

    #[test]
    fn test_status1_decode() {
        let data = [0x9A, 0x19, 0x0A, 0x00, 0x00, 0x00, 0x00, 0x00];
        let status = Status1::from_payload(&data).unwrap();
        assert_eq!(status.temperature_c, 25);
        assert_eq!(status.voltage(), Voltage(0.10));
        assert!(status.is_powered_on());
        assert!(!status.under_voltage());
        assert!(!status.over_temperature());
    }

    #[test]
    fn test_status1_powered_off_and_errors() {
        let data = [0x9A, 0x50, 0x60, 0x09, 0x00, 0x00, 0x01, 0x09];
        let status = Status1::from_payload(&data).unwrap();
        assert_eq!(status.temperature_c, 80);
        assert_eq!(status.voltage_raw, 2400);
        assert!(!status.is_powered_on());
        assert!(status.under_voltage());
        assert!(status.over_temperature());
    }

    #[test]
    fn test_status1_temperature_is_unsigned() {
        let data = [0x9A, 0xC8, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00];
        let status = Status1::from_payload(&data).unwrap();
        assert_eq!(status.temperature_c, 200);
    }

    #[test]
    fn test_status1_negative_voltage() {
        let data = [0x9A, 0x00, 0xFF, 0xFF, 0x00, 0x00, 0x00, 0x00];
        let status = Status1::from_payload(&data).unwrap();
        assert_eq!(status.voltage(), Voltage(-0.01));
    }

    #[test]
    fn test_status2_decode() {
        // speed = -100 dps = 0xFF9C
        let data = [0x9C, 0x1E, 0x10, 0x00, 0x9C, 0xFF, 0x34, 0x12];
        let status = Status2::from_payload(&data).unwrap();
        assert_eq!(status.temperature_c, 30);
        assert_eq!(status.torque_current_raw, 16);
        assert_eq!(status.speed_dps, -100);
        assert_eq!(status.encoder, 0x1234);
    }

    #[test]
    fn test_status2_layout_for_motion_reply() {
        let data = [0xA8, 0x20, 0x00, 0x00, 0x1E, 0x00, 0x00, 0x00];
        let fb = Status2::from_payload_with_opcode(&data, Opcode::IncrementalPosition).unwrap();
        assert_eq!(fb.speed_dps, 30);
        assert!(Status2::from_payload(&data).is_err());
    }

    #[test]
    fn test_short_reply_is_rejected() {
        let err = Status1::from_payload(&[0x9A, 0x19, 0x0A]).unwrap_err();
        assert_eq!(
            err,
            ProtocolError::InvalidLength {
                expected: 8,
                actual: 3
            }
        );
        assert!(MultiTurnAngle::from_payload(&[]).is_err());
        assert!(SingleTurnAngle::from_payload(&[0x94; 7]).is_err());
        assert!(Status2::from_payload(&[0x9C; 5]).is_err());
    }

    #[test]
    fn test_wrong_opcode_is_rejected() {
        let data = [0x9C, 0x19, 0x0A, 0x00, 0x00, 0x00, 0x00, 0x00];
        match Status1::from_payload(&data) {
            Err(ProtocolError::UnexpectedOpcode { expected, actual }) => {
                assert_eq!(expected, 0x9A);
                assert_eq!(actual, 0x9C);
            },
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_try_from_frame_respects_len() {
        let frame = MotorFrame::new_standard(0x141, &[0x92, 0xFF, 0xFF]);
        assert!(MultiTurnAngle::try_from(frame).is_err());

        let frame = MotorFrame::new_standard(0x141, &[0x92, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF]);
        assert_eq!(MultiTurnAngle::try_from(frame).unwrap().raw_centideg, -1);
    }
}
