//! 菜单命令与分发
//!
//! 每个菜单键对应一次会话操作。所有错误都打印出来，循环继续；
//! 只有 `q` 结束循环。

use anyhow::Result;
use servo_driver::{DriverError, FrameTransport, MotorSession, Status1, parse_angle};
use std::fmt;
use std::io::Write;
use std::str::FromStr;
use thiserror::Error;

/// 菜单键
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuKey {
    /// 1: 切换到下一个电机
    SwitchMotor,
    /// 2: 设置运动参数
    SetParameters,
    /// 3: 绝对位置运动
    AbsoluteMove,
    /// 4: 设置零点偏移
    SetZero,
    /// 5: 增量位置运动
    IncrementalMove,
    /// 6: 读取角度
    ReadAngles,
    /// 7: 读取状态 1 与状态 2
    ReadStatus,
    /// 9: 切换电源
    TogglePower,
    /// q: 退出
    Quit,
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("未知菜单项: {0:?}（输入 1-7、9 或 q）")]
pub struct UnknownKey(pub String);

impl FromStr for MenuKey {
    type Err = UnknownKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "1" => Ok(MenuKey::SwitchMotor),
            "2" => Ok(MenuKey::SetParameters),
            "3" => Ok(MenuKey::AbsoluteMove),
            "4" => Ok(MenuKey::SetZero),
            "5" => Ok(MenuKey::IncrementalMove),
            "6" => Ok(MenuKey::ReadAngles),
            "7" => Ok(MenuKey::ReadStatus),
            "9" => Ok(MenuKey::TogglePower),
            "q" | "Q" => Ok(MenuKey::Quit),
            other => Err(UnknownKey(other.to_string())),
        }
    }
}

impl MenuKey {
    pub const ALL: [MenuKey; 9] = [
        MenuKey::SwitchMotor,
        MenuKey::SetParameters,
        MenuKey::AbsoluteMove,
        MenuKey::SetZero,
        MenuKey::IncrementalMove,
        MenuKey::ReadAngles,
        MenuKey::ReadStatus,
        MenuKey::TogglePower,
        MenuKey::Quit,
    ];

    pub fn key(self) -> char {
        match self {
            MenuKey::SwitchMotor => '1',
            MenuKey::SetParameters => '2',
            MenuKey::AbsoluteMove => '3',
            MenuKey::SetZero => '4',
            MenuKey::IncrementalMove => '5',
            MenuKey::ReadAngles => '6',
            MenuKey::ReadStatus => '7',
            MenuKey::TogglePower => '9',
            MenuKey::Quit => 'q',
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            MenuKey::SwitchMotor => "切换电机",
            MenuKey::SetParameters => "设置参数（角度、方向、速度）",
            MenuKey::AbsoluteMove => "绝对位置运动",
            MenuKey::SetZero => "设置零点偏移",
            MenuKey::IncrementalMove => "增量位置运动",
            MenuKey::ReadAngles => "读取多圈/单圈角度",
            MenuKey::ReadStatus => "读取状态 1 与状态 2",
            MenuKey::TogglePower => "切换电源（运行/关闭）",
            MenuKey::Quit => "退出",
        }
    }
}

impl fmt::Display for MenuKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}  {}", self.key(), self.label())
    }
}

/// 打印菜单
pub fn print_menu(out: &mut impl Write) -> Result<()> {
    writeln!(out, "可用命令:")?;
    for key in MenuKey::ALL {
        writeln!(out, "  {}", key)?;
    }
    Ok(())
}

/// 参数输入
///
/// 交互模式下由终端提示实现，测试中使用脚本输入。
pub trait Prompter {
    /// 提示输入一行文本，`default` 为回车时的取值
    fn ask(&mut self, label: &str, default: &str) -> Result<String>;
}

/// 分发结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// 执行一个菜单命令
///
/// 会话错误（无应答、格式错误、无效输入）写入 `out` 后返回 `Flow::Continue`；
/// 只有输出或输入本身失败才返回 `Err`。
pub fn dispatch<T: FrameTransport>(
    key: MenuKey,
    session: &mut MotorSession<T>,
    prompter: &mut impl Prompter,
    out: &mut impl Write,
) -> Result<Flow> {
    let result = match key {
        MenuKey::Quit => return Ok(Flow::Quit),
        MenuKey::SwitchMotor => {
            let motor = session.select_next();
            writeln!(out, "✅ 当前电机: {}", motor)?;
            Ok(())
        },
        MenuKey::SetParameters => set_parameters(session, prompter, out)?,
        MenuKey::AbsoluteMove => match session.run_absolute_position() {
            Ok(feedback) => {
                writeln!(
                    out,
                    "✅ 绝对位置指令已发送: {} (转速 {} dps, 温度 {}°C)",
                    session.staged(),
                    feedback.speed_dps,
                    feedback.temperature_c
                )?;
                Ok(())
            },
            Err(e) => Err(e),
        },
        MenuKey::SetZero => {
            let text = prompter.ask("零点角度（度）", "0")?;
            match parse_angle(&text).and_then(|angle| session.zero_at(angle).map(|()| angle)) {
                Ok(angle) => {
                    writeln!(out, "✅ 零点偏移已设置为 {}", angle)?;
                    Ok(())
                },
                Err(e) => Err(e),
            }
        },
        MenuKey::IncrementalMove => match session.run_incremental_position() {
            Ok(feedback) => {
                writeln!(
                    out,
                    "✅ 增量位置指令已发送: {} (转速 {} dps, 温度 {}°C)",
                    session.staged(),
                    feedback.speed_dps,
                    feedback.temperature_c
                )?;
                Ok(())
            },
            Err(e) => Err(e),
        },
        MenuKey::ReadAngles => {
            report_angles(session, out)?;
            Ok(())
        },
        MenuKey::ReadStatus => {
            report_status(session, out)?;
            Ok(())
        },
        MenuKey::TogglePower => match session.toggle_power() {
            Ok(outcome) => {
                writeln!(
                    out,
                    "✅ 已发送 {}{}",
                    outcome.command.opcode(),
                    if outcome.acknowledged { "" } else { "（无应答）" }
                )?;
                Ok(())
            },
            Err(e) => Err(e),
        },
    };

    if let Err(e) = result {
        tracing::debug!("Menu command {:?} failed: {}", key, e);
        writeln!(out, "❌ {}", e)?;
    }
    Ok(Flow::Continue)
}

/// 分别查询多圈与单圈角度，打印收到的读数
///
/// 一次查询失败不影响另一次。
pub fn report_angles<T: FrameTransport>(
    session: &mut MotorSession<T>,
    out: &mut impl Write,
) -> Result<()> {
    match session.read_multi_turn_angle() {
        Ok(angle) => writeln!(out, "📍 多圈角度: {}", angle)?,
        Err(e) => writeln!(out, "❌ 多圈角度: {}", e)?,
    }
    match session.read_single_turn_angle() {
        Ok(angle) => writeln!(out, "📍 单圈角度: {}", angle)?,
        Err(e) => writeln!(out, "❌ 单圈角度: {}", e)?,
    }
    Ok(())
}

/// 分别查询状态 1 与状态 2，打印收到的读数
///
/// 一次查询失败不影响另一次。
pub fn report_status<T: FrameTransport>(
    session: &mut MotorSession<T>,
    out: &mut impl Write,
) -> Result<()> {
    match session.read_status1() {
        Ok(status) => print_status1(&status, out)?,
        Err(e) => writeln!(out, "❌ 状态 1: {}", e)?,
    }
    match session.read_status2() {
        Ok(status) => writeln!(out, "📊 转速: {} dps", status.speed_dps)?,
        Err(e) => writeln!(out, "❌ 状态 2: {}", e)?,
    }
    Ok(())
}

fn print_status1(status: &Status1, out: &mut impl Write) -> Result<()> {
    writeln!(out, "📊 温度: {}°C", status.temperature_c)?;
    writeln!(out, "📊 电压: {}", status.voltage())?;
    writeln!(
        out,
        "📊 电源: {}",
        if status.is_powered_on() { "运行" } else { "关闭" }
    )?;
    if status.under_voltage() {
        writeln!(out, "⚠️  低压错误")?;
    }
    if status.over_temperature() {
        writeln!(out, "⚠️  过温错误")?;
    }
    Ok(())
}

fn set_parameters<T: FrameTransport>(
    session: &mut MotorSession<T>,
    prompter: &mut impl Prompter,
    out: &mut impl Write,
) -> Result<Result<(), DriverError>> {
    let current = session.staged();
    let angle = prompter.ask("角度（度）", &current.angle.value().to_string())?;
    let direction = prompter.ask(
        "方向（0 顺时针 / 1 逆时针）",
        &current.direction.as_byte().to_string(),
    )?;
    let speed = prompter.ask("速度（dps）", &current.speed.value().to_string())?;

    match session.set_parameters_from_text(&angle, &direction, &speed) {
        Ok(params) => {
            writeln!(out, "✅ 参数已暂存: {}", params)?;
            Ok(Ok(()))
        },
        Err(e) => Ok(Err(e)),
    }
}
