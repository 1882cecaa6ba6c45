//! 编解码属性测试
//!
//! 使用 proptest 验证定点角度往返与 56 位符号扩展。

use proptest::prelude::*;
use servo_protocol::{
    AbsolutePositionCommand, AngleDeg, IncrementalPositionCommand, MultiTurnAngle,
    RotationDirection, SetZeroOffsetCommand, SpeedLimit,
};

fn angle_field(payload: &[u8; 8]) -> i32 {
    i32::from_le_bytes([payload[4], payload[5], payload[6], payload[7]])
}

proptest! {
    /// 单圈位置指令：角度往返（0.01° 量化内）
    #[test]
    fn absolute_position_angle_roundtrip(raw in (i32::MIN + 1)..=i32::MAX, speed in 0u16..=u16::MAX) {
        let angle = AngleDeg::from_centideg(raw as i64);
        let cmd = AbsolutePositionCommand::new(angle, RotationDirection::Clockwise, SpeedLimit(speed as i32));
        let payload = cmd.payload();
        let decoded = AngleDeg::from_centideg(angle_field(&payload) as i64);
        prop_assert_eq!(decoded, angle);
        prop_assert_eq!(u16::from_le_bytes([payload[2], payload[3]]), speed);
    }

    /// 设零点指令：角度往返
    #[test]
    fn set_zero_offset_angle_roundtrip(raw in (i32::MIN + 1)..=i32::MAX) {
        let angle = AngleDeg::from_centideg(raw as i64);
        let payload = SetZeroOffsetCommand::new(angle).payload();
        prop_assert_eq!(&payload[1..4], &[0u8, 0, 0][..]);
        prop_assert_eq!(AngleDeg::from_centideg(angle_field(&payload) as i64), angle);
    }

    /// 增量指令：逆时针增量与顺时针增量互为相反数
    #[test]
    fn incremental_direction_flips_sign(raw in -10_000_000i32..10_000_000) {
        let angle = AngleDeg::from_centideg(raw as i64);
        let cw = IncrementalPositionCommand::new(angle, RotationDirection::Clockwise, SpeedLimit(30));
        let ccw = IncrementalPositionCommand::new(angle, RotationDirection::CounterClockwise, SpeedLimit(30));
        prop_assert_eq!(angle_field(&cw.payload()), raw);
        prop_assert_eq!(angle_field(&ccw.payload()), -raw);
        prop_assert_eq!(cw.payload()[1], 0);
        prop_assert_eq!(ccw.payload()[1], 0);
    }

    /// 增量指令：任意角度下逆时针增量的符号与角度相反（饱和，不回绕）
    #[test]
    fn incremental_counter_clockwise_never_flips_direction(degrees in -1.0e10f64..1.0e10) {
        let ccw = IncrementalPositionCommand::new(
            AngleDeg(degrees),
            RotationDirection::CounterClockwise,
            SpeedLimit(30),
        );
        let increment = angle_field(&ccw.payload());
        if degrees <= -0.01 {
            prop_assert!(increment > 0);
        } else if degrees >= 0.01 {
            prop_assert!(increment < 0);
        }
    }

    /// 多圈角度：任意 56 位有符号值都能正确还原
    #[test]
    fn multi_turn_sign_extension(value in -(1i64 << 55)..(1i64 << 55)) {
        let bytes = value.to_le_bytes();
        let mut payload = [0u8; 8];
        payload[0] = 0x92;
        payload[1..8].copy_from_slice(&bytes[..7]);
        let decoded = MultiTurnAngle::from_payload(&payload).unwrap();
        prop_assert_eq!(decoded.raw_centideg, value);
        prop_assert_eq!(decoded.raw_centideg < 0, payload[7] >= 0x80);
    }
}
