//! 命令帧构建
//!
//! 所有命令帧固定 8 字节，Byte 0 为命令字，多字节字段为小端，
//! 未使用字节填 0。编码没有错误路径：超出线上宽度的值被截断或饱和，
//! 由驱动器决定是否拒绝。

use crate::ids::{MotorId, Opcode};
use crate::units::{AngleDeg, SpeedLimit};
use crate::{MotorFrame, ProtocolError};
use std::fmt;
use std::str::FromStr;

/// 旋转方向
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RotationDirection {
    /// 顺时针
    #[default]
    Clockwise = 0x00,
    /// 逆时针
    CounterClockwise = 0x01,
}

impl RotationDirection {
    /// 线上字节
    pub fn as_byte(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for RotationDirection {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x00 => Ok(RotationDirection::Clockwise),
            0x01 => Ok(RotationDirection::CounterClockwise),
            _ => Err(ProtocolError::InvalidValue {
                field: "RotationDirection".to_string(),
                value,
            }),
        }
    }
}

/// 文本解析：`0`/`cw` 为顺时针，`1`/`ccw` 为逆时针（不区分大小写）
impl FromStr for RotationDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "0" | "cw" => Ok(RotationDirection::Clockwise),
            "1" | "ccw" => Ok(RotationDirection::CounterClockwise),
            other => Err(format!("invalid rotation direction: {:?}", other)),
        }
    }
}

impl fmt::Display for RotationDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RotationDirection::Clockwise => write!(f, "CW"),
            RotationDirection::CounterClockwise => write!(f, "CCW"),
        }
    }
}

// ============================================================================
// 位置控制指令
// ============================================================================

/// 单圈位置闭环控制 (0xA6)
///
/// 布局：
/// - Byte 0: 0xA6
/// - Byte 1: 旋转方向
/// - Byte 2-3: 速度限制（u16，dps）
/// - Byte 4-7: 目标角度（i32，0.01°/LSB），概念上位于 [0, 360)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AbsolutePositionCommand {
    pub angle: AngleDeg,
    pub direction: RotationDirection,
    pub speed: SpeedLimit,
}

impl AbsolutePositionCommand {
    pub fn new(angle: AngleDeg, direction: RotationDirection, speed: SpeedLimit) -> Self {
        Self {
            angle,
            direction,
            speed,
        }
    }

    pub fn payload(&self) -> [u8; 8] {
        let mut data = [0u8; 8];
        data[0] = Opcode::AbsolutePosition.as_byte();
        data[1] = self.direction.as_byte();
        data[2..4].copy_from_slice(&self.speed.to_wire().to_le_bytes());
        data[4..8].copy_from_slice(&self.angle.to_centideg().to_le_bytes());
        data
    }
}

/// 增量位置闭环控制 (0xA8)
///
/// 布局：
/// - Byte 0: 0xA8
/// - Byte 1: 0x00（保留）
/// - Byte 2-3: 速度限制（u16，dps）
/// - Byte 4-7: 角度增量（i32，0.01°/LSB）
///
/// 注意：与 0xA6 不同，方向不单独发送，而是折叠进增量的符号：
/// 逆时针时增量取反。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IncrementalPositionCommand {
    pub angle: AngleDeg,
    pub direction: RotationDirection,
    pub speed: SpeedLimit,
}

impl IncrementalPositionCommand {
    pub fn new(angle: AngleDeg, direction: RotationDirection, speed: SpeedLimit) -> Self {
        Self {
            angle,
            direction,
            speed,
        }
    }

    /// 带符号的线上增量（0.01°）
    ///
    /// 逆时针取反时饱和，`i32::MIN` 取反为 `i32::MAX`，方向不会反转。
    pub fn increment_centideg(&self) -> i32 {
        let raw = self.angle.to_centideg();
        match self.direction {
            RotationDirection::Clockwise => raw,
            RotationDirection::CounterClockwise => raw.saturating_neg(),
        }
    }

    pub fn payload(&self) -> [u8; 8] {
        let mut data = [0u8; 8];
        data[0] = Opcode::IncrementalPosition.as_byte();
        // Byte 1: 保留
        data[2..4].copy_from_slice(&self.speed.to_wire().to_le_bytes());
        data[4..8].copy_from_slice(&self.increment_centideg().to_le_bytes());
        data
    }
}

/// 设置当前位置为任意角度 (0x95)
///
/// 布局：Byte 0 = 0x95，Byte 1-3 = 0，Byte 4-7 = 角度（i32，0.01°/LSB）。
/// 驱动器有应答即表示成功。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SetZeroOffsetCommand {
    pub angle: AngleDeg,
}

impl SetZeroOffsetCommand {
    pub fn new(angle: AngleDeg) -> Self {
        Self { angle }
    }

    pub fn payload(&self) -> [u8; 8] {
        let mut data = [0u8; 8];
        data[0] = Opcode::SetZeroOffset.as_byte();
        data[4..8].copy_from_slice(&self.angle.to_centideg().to_le_bytes());
        data
    }
}

// ============================================================================
// 查询与电源指令（命令字 + 7 字节 0）
// ============================================================================

/// 遥测查询
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TelemetryRequest {
    MultiTurnAngle,
    SingleTurnAngle,
    Status1,
    Status2,
}

impl TelemetryRequest {
    pub fn opcode(self) -> Opcode {
        match self {
            TelemetryRequest::MultiTurnAngle => Opcode::ReadMultiTurnAngle,
            TelemetryRequest::SingleTurnAngle => Opcode::ReadSingleTurnAngle,
            TelemetryRequest::Status1 => Opcode::ReadStatus1,
            TelemetryRequest::Status2 => Opcode::ReadStatus2,
        }
    }

    pub fn payload(self) -> [u8; 8] {
        opcode_only(self.opcode())
    }
}

/// 电源指令
///
/// 发送哪一个由会话层根据状态 1 决定，编码层不关心。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerCommand {
    /// 0x80：关闭
    Off,
    /// 0x88：运行
    Run,
}

impl PowerCommand {
    pub fn opcode(self) -> Opcode {
        match self {
            PowerCommand::Off => Opcode::PowerOff,
            PowerCommand::Run => Opcode::PowerRun,
        }
    }

    pub fn payload(self) -> [u8; 8] {
        opcode_only(self.opcode())
    }
}

fn opcode_only(opcode: Opcode) -> [u8; 8] {
    let mut data = [0u8; 8];
    data[0] = opcode.as_byte();
    data
}

// ============================================================================
// 统一命令类型
// ============================================================================

/// 所有支持的命令
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MotorCommand {
    AbsolutePosition(AbsolutePositionCommand),
    IncrementalPosition(IncrementalPositionCommand),
    SetZeroOffset(SetZeroOffsetCommand),
    Telemetry(TelemetryRequest),
    Power(PowerCommand),
}

impl MotorCommand {
    /// 命令字
    pub fn opcode(&self) -> Opcode {
        match self {
            MotorCommand::AbsolutePosition(_) => Opcode::AbsolutePosition,
            MotorCommand::IncrementalPosition(_) => Opcode::IncrementalPosition,
            MotorCommand::SetZeroOffset(_) => Opcode::SetZeroOffset,
            MotorCommand::Telemetry(req) => req.opcode(),
            MotorCommand::Power(cmd) => cmd.opcode(),
        }
    }

    /// 8 字节负载
    pub fn payload(&self) -> [u8; 8] {
        match self {
            MotorCommand::AbsolutePosition(cmd) => cmd.payload(),
            MotorCommand::IncrementalPosition(cmd) => cmd.payload(),
            MotorCommand::SetZeroOffset(cmd) => cmd.payload(),
            MotorCommand::Telemetry(req) => req.payload(),
            MotorCommand::Power(cmd) => cmd.payload(),
        }
    }

    /// 转换为发往指定电机的 CAN 帧
    pub fn to_frame(&self, motor: MotorId) -> MotorFrame {
        MotorFrame::new_standard(motor.arbitration_id() as u16, &self.payload())
    }
}

impl From<AbsolutePositionCommand> for MotorCommand {
    fn from(cmd: AbsolutePositionCommand) -> Self {
        MotorCommand::AbsolutePosition(cmd)
    }
}

impl From<IncrementalPositionCommand> for MotorCommand {
    fn from(cmd: IncrementalPositionCommand) -> Self {
        MotorCommand::IncrementalPosition(cmd)
    }
}

impl From<SetZeroOffsetCommand> for MotorCommand {
    fn from(cmd: SetZeroOffsetCommand) -> Self {
        MotorCommand::SetZeroOffset(cmd)
    }
}

impl From<TelemetryRequest> for MotorCommand {
    fn from(req: TelemetryRequest) -> Self {
        MotorCommand::Telemetry(req)
    }
}

impl From<PowerCommand> for MotorCommand {
    fn from(cmd: PowerCommand) -> Self {
        MotorCommand::Power(cmd)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rotation_direction_from_u8() {
        assert_eq!(
            RotationDirection::try_from(0x00).unwrap(),
            RotationDirection::Clockwise
        );
        assert_eq!(
            RotationDirection::try_from(0x01).unwrap(),
            RotationDirection::CounterClockwise
        );
        assert!(RotationDirection::try_from(0x02).is_err());
    }

    #[test]
    fn test_rotation_direction_from_str() {
        assert_eq!(
            "0".parse::<RotationDirection>().unwrap(),
            RotationDirection::Clockwise
        );
        assert_eq!(
            " CCW ".parse::<RotationDirection>().unwrap(),
            RotationDirection::CounterClockwise
        );
        assert!("2".parse::<RotationDirection>().is_err());
        assert!("left".parse::<RotationDirection>().is_err());
    }

    #[test]
    fn test_absolute_position_payload() {
        let cmd = AbsolutePositionCommand::new(
            AngleDeg(180.0),
            RotationDirection::Clockwise,
            SpeedLimit(30),
        );
        assert_eq!(
            cmd.payload(),
            [0xA6, 0x00, 0x1E, 0x00, 0x50, 0x46, 0x00, 0x00]
        );
    }

    #[test]
    fn test_absolute_position_counter_clockwise_byte() {
        let cmd = AbsolutePositionCommand::new(
            AngleDeg(90.0),
            RotationDirection::CounterClockwise,
            SpeedLimit(500),
        );
        let data = cmd.payload();
        assert_eq!(data[1], 0x01);
        assert_eq!(&data[2..4], &500u16.to_le_bytes());
        assert_eq!(&data[4..8], &9000i32.to_le_bytes());
    }

    #[test]
    fn test_absolute_position_out_of_range_still_encodes() {
        let cmd = AbsolutePositionCommand::new(
            AngleDeg(-10.0),
            RotationDirection::Clockwise,
            SpeedLimit(70000),
        );
        let data = cmd.payload();
        assert_eq!(&data[2..4], &(70000u32 as u16).to_le_bytes());
        assert_eq!(&data[4..8], &(-1000i32).to_le_bytes());
    }

    #[test]
    fn test_incremental_sign_convention() {
        let ccw = IncrementalPositionCommand::new(
            AngleDeg(10.0),
            RotationDirection::CounterClockwise,
            SpeedLimit(30),
        );
        assert_eq!(ccw.increment_centideg(), -1000);

        let cw = IncrementalPositionCommand::new(
            AngleDeg(10.0),
            RotationDirection::Clockwise,
            SpeedLimit(30),
        );
        assert_eq!(cw.increment_centideg(), 1000);
    }

    #[test]
    fn test_incremental_payload_layout() {
        let cmd = IncrementalPositionCommand::new(
            AngleDeg(10.0),
            RotationDirection::CounterClockwise,
            SpeedLimit(30),
        );
        // 方向字节不发送，Byte 1 保持 0
        assert_eq!(
            cmd.payload(),
            [0xA8, 0x00, 0x1E, 0x00, 0x18, 0xFC, 0xFF, 0xFF]
        );
    }

    #[test]
    fn test_incremental_negative_angle_counter_clockwise() {
        // 负角度 + 逆时针 = 正增量
        let cmd = IncrementalPositionCommand::new(
            AngleDeg(-5.5),
            RotationDirection::CounterClockwise,
            SpeedLimit(30),
        );
        assert_eq!(cmd.increment_centideg(), 550);
    }

    #[test]
    fn test_incremental_counter_clockwise_at_clamp_boundary() {
        // 角度饱和到 i32::MIN 后取反，仍应为正增量
        let cmd = IncrementalPositionCommand::new(
            AngleDeg(-21_474_836.48),
            RotationDirection::CounterClockwise,
            SpeedLimit(30),
        );
        assert_eq!(cmd.increment_centideg(), i32::MAX);

        let far = IncrementalPositionCommand::new(
            AngleDeg(-1.0e12),
            RotationDirection::CounterClockwise,
            SpeedLimit(30),
        );
        assert_eq!(far.increment_centideg(), i32::MAX);
        assert_eq!(&far.payload()[4..8], &i32::MAX.to_le_bytes());

        let cw = IncrementalPositionCommand::new(
            AngleDeg(-1.0e12),
            RotationDirection::Clockwise,
            SpeedLimit(30),
        );
        assert_eq!(cw.increment_centideg(), i32::MIN);
    }

    #[test]
    fn test_set_zero_offset_payload() {
        let cmd = SetZeroOffsetCommand::new(AngleDeg(-0.01));
        assert_eq!(
            cmd.payload(),
            [0x95, 0x00, 0x00, 0x00, 0xFF, 0xFF, 0xFF, 0xFF]
        );

        let cmd = SetZeroOffsetCommand::new(AngleDeg(180.0));
        assert_eq!(
            cmd.payload(),
            [0x95, 0x00, 0x00, 0x00, 0x50, 0x46, 0x00, 0x00]
        );
    }

    #[test]
    fn test_telemetry_requests_are_opcode_plus_zeros() {
        for (req, op) in [
            (TelemetryRequest::MultiTurnAngle, 0x92),
            (TelemetryRequest::SingleTurnAngle, 0x94),
            (TelemetryRequest::Status1, 0x9A),
            (TelemetryRequest::Status2, 0x9C),
        ] {
            assert_eq!(req.payload(), [op, 0, 0, 0, 0, 0, 0, 0]);
        }
    }

    #[test]
    fn test_power_commands() {
        assert_eq!(PowerCommand::Off.payload(), [0x80, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(PowerCommand::Run.payload(), [0x88, 0, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_motor_command_to_frame() {
        let motor = MotorId::new(2).unwrap();
        let cmd = MotorCommand::from(TelemetryRequest::Status1);
        let frame = cmd.to_frame(motor);
        assert_eq!(frame.id, 0x142);
        assert_eq!(frame.len, 8);
        assert!(!frame.is_extended);
        assert_eq!(frame.data, [0x9A, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(cmd.opcode(), Opcode::ReadStatus1);
    }

    #[test]
    fn test_motor_command_opcode_dispatch() {
        let abs: MotorCommand = AbsolutePositionCommand::new(
            AngleDeg(1.0),
            RotationDirection::Clockwise,
            SpeedLimit(1),
        )
        .into();
        assert_eq!(abs.opcode(), Opcode::AbsolutePosition);
        assert_eq!(abs.payload()[0], 0xA6);

        let zero: MotorCommand = SetZeroOffsetCommand::new(AngleDeg(0.0)).into();
        assert_eq!(zero.opcode(), Opcode::SetZeroOffset);

        let power: MotorCommand = PowerCommand::Run.into();
        assert_eq!(power.opcode(), Opcode::PowerRun);
    }
}
