//! 物理量类型
//!
//! 使用 NewType 模式区分角度、速度、电压，防止单位混淆。
//! 协议中角度与电压均为 0.01/LSB 定点数。

use std::fmt;
use std::ops::Neg;

/// 定点数缩放系数（0.01/LSB）
pub const CENTI_SCALE: f64 = 100.0;

/// 角度（度，有符号，可为小数）
///
/// 线上表示为 0.01°/LSB 的整数：`round(angle × 100)`。
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AngleDeg(pub f64);

impl AngleDeg {
    /// 零角度常量
    pub const ZERO: Self = AngleDeg(0.0);

    /// 创建新的角度值
    #[inline]
    pub const fn new(value: f64) -> Self {
        AngleDeg(value)
    }

    /// 获取原始值（度）
    #[inline]
    pub fn value(self) -> f64 {
        self.0
    }

    /// 转换为 0.01° 定点数
    ///
    /// 四舍五入；超出 i32 范围时饱和，NaN 编码为 0。
    #[inline]
    pub fn to_centideg(self) -> i32 {
        (self.0 * CENTI_SCALE).round() as i32
    }

    /// 从 0.01° 定点数构造
    #[inline]
    pub fn from_centideg(raw: i64) -> Self {
        AngleDeg(raw as f64 / CENTI_SCALE)
    }
}

impl Neg for AngleDeg {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        AngleDeg(-self.0)
    }
}

impl From<f64> for AngleDeg {
    fn from(value: f64) -> Self {
        AngleDeg(value)
    }
}

impl fmt::Display for AngleDeg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}°", self.0)
    }
}

/// 速度限制（dps，度每秒）
///
/// 线上为 16 位无符号小端字段。超出 `0..=65535` 的值按位截断，
/// 驱动器自行处理，不在此校验。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SpeedLimit(pub i32);

impl SpeedLimit {
    /// 默认速度限制
    pub const DEFAULT: Self = SpeedLimit(30);

    /// 获取原始值（dps）
    #[inline]
    pub fn value(self) -> i32 {
        self.0
    }

    /// 截断为线上宽度
    #[inline]
    pub fn to_wire(self) -> u16 {
        self.0 as u16
    }
}

impl Default for SpeedLimit {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for SpeedLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} dps", self.0)
    }
}

/// 母线电压（伏特）
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Voltage(pub f64);

impl Voltage {
    /// 从 0.01V/LSB 原始值构造
    #[inline]
    pub fn from_raw(raw: i16) -> Self {
        Voltage(raw as f64 / CENTI_SCALE)
    }

    /// 获取原始值（伏特）
    #[inline]
    pub fn value(self) -> f64 {
        self.0
    }
}

impl fmt::Display for Voltage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}V", self.0)
    }
}
