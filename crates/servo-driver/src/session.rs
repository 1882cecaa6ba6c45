//! 电机会话
//!
//! `MotorSession` 持有会话配置、帧传输与暂存运动参数，并维护当前活动电机。
//! 每个操作都是一次（或几次）严格串行的请求/应答事务：
//!
//! ```text
//! 编码命令 -> transact(0x140 + id, payload, timeout) -> 解析应答 / NoReply
//! ```
//!
//! 所有失败都以 `DriverError` 返回，会话状态不受影响，可继续使用。

use crate::config::SessionConfig;
use crate::error::DriverError;
use crate::transport::FrameTransport;
use servo_can::MotorFrame;
use servo_protocol::{
    AbsolutePositionCommand, AngleDeg, IncrementalPositionCommand, MotorCommand, MotorId,
    MultiTurnAngle, PowerCommand, RotationDirection, SetZeroOffsetCommand, SingleTurnAngle,
    SpeedLimit, Status1, Status2, TelemetryRequest, Voltage,
};
use std::fmt;
use tracing::{debug, info, trace, warn};

/// 暂存运动参数
///
/// 由"设置参数"操作写入，供位置指令读取。仅在解析全部成功后整体替换。
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StagedParameters {
    pub angle: AngleDeg,
    pub direction: RotationDirection,
    pub speed: SpeedLimit,
}

impl Default for StagedParameters {
    fn default() -> Self {
        Self {
            angle: AngleDeg::ZERO,
            direction: RotationDirection::Clockwise,
            speed: SpeedLimit::DEFAULT,
        }
    }
}

impl StagedParameters {
    pub fn new(angle: AngleDeg, direction: RotationDirection, speed: SpeedLimit) -> Self {
        Self {
            angle,
            direction,
            speed,
        }
    }

    /// 从用户输入文本解析
    ///
    /// 角度必须是有限小数，方向为 `0`/`1`（或 `cw`/`ccw`），速度必须是整数。
    /// 数值超出电机物理范围不做检查。
    pub fn parse(angle: &str, direction: &str, speed: &str) -> Result<Self, DriverError> {
        let angle = parse_angle(angle)?;
        let direction = direction
            .parse::<RotationDirection>()
            .map_err(DriverError::InvalidInput)?;
        let speed = speed
            .trim()
            .parse::<i32>()
            .map_err(|e| DriverError::InvalidInput(format!("speed {:?}: {}", speed.trim(), e)))?;

        Ok(Self::new(angle, direction, SpeedLimit(speed)))
    }
}

impl fmt::Display for StagedParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "angle={} direction={} speed={}",
            self.angle, self.direction, self.speed
        )
    }
}

/// 解析角度文本（度）
pub fn parse_angle(text: &str) -> Result<AngleDeg, DriverError> {
    let trimmed = text.trim();
    let value = trimmed
        .parse::<f64>()
        .map_err(|e| DriverError::InvalidInput(format!("angle {:?}: {}", trimmed, e)))?;
    if !value.is_finite() {
        return Err(DriverError::InvalidInput(format!(
            "angle {:?}: must be a finite number",
            trimmed
        )));
    }
    Ok(AngleDeg::new(value))
}

/// 多圈 + 单圈角度读数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotorAngles {
    pub multi_turn: AngleDeg,
    pub single_turn: AngleDeg,
}

/// 状态 1 + 状态 2 原始读数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusReadout {
    pub status1: Status1,
    pub status2: Status2,
}

impl StatusReadout {
    pub fn temperature_c(&self) -> u8 {
        self.status1.temperature_c
    }

    pub fn voltage(&self) -> Voltage {
        self.status1.voltage()
    }

    pub fn is_powered_on(&self) -> bool {
        self.status1.is_powered_on()
    }

    pub fn speed_dps(&self) -> i16 {
        self.status2.speed_dps
    }
}

/// 电机完整状态快照
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotorStatus {
    pub temperature_c: u8,
    pub voltage: Voltage,
    pub powered_on: bool,
    pub speed_dps: i16,
    pub multi_turn: AngleDeg,
    pub single_turn: AngleDeg,
}

impl fmt::Display for MotorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "temperature={}°C voltage={} power={} speed={} dps multi_turn={} single_turn={}",
            self.temperature_c,
            self.voltage,
            if self.powered_on { "ON" } else { "OFF" },
            self.speed_dps,
            self.multi_turn,
            self.single_turn
        )
    }
}

/// 电源切换结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PowerOutcome {
    /// 实际发送的电源命令
    pub command: PowerCommand,
    /// 驱动器是否应答了电源命令（应答不是必需的）
    pub acknowledged: bool,
}

/// 电机会话
///
/// 独占传输层；所有操作都需要 `&mut self`，因此同一时刻最多一个未完成请求。
pub struct MotorSession<T: FrameTransport> {
    config: SessionConfig,
    transport: T,
    active_index: usize,
    staged: StagedParameters,
}

impl<T: FrameTransport> MotorSession<T> {
    /// 创建会话（名单第一个电机为活动电机）
    pub fn new(config: SessionConfig, transport: T) -> Result<Self, DriverError> {
        config.validate()?;
        debug!(
            "Motor session created: roster={:?}, reply_timeout={:?}",
            config.roster, config.reply_timeout
        );
        Ok(Self {
            config,
            transport,
            active_index: 0,
            staged: StagedParameters::default(),
        })
    }

    pub fn active_motor(&self) -> MotorId {
        self.config.roster[self.active_index]
    }

    pub fn roster(&self) -> &[MotorId] {
        &self.config.roster
    }

    pub fn staged(&self) -> StagedParameters {
        self.staged
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    // ------------------------------------------------------------------
    // 电机选择（无总线活动）
    // ------------------------------------------------------------------

    /// 切换到名单中的下一个电机，末尾回绕到开头
    pub fn select_next(&mut self) -> MotorId {
        self.active_index = (self.active_index + 1) % self.config.roster.len();
        let motor = self.active_motor();
        debug!("Active motor switched to {}", motor);
        motor
    }

    /// 直接选择名单中的某个电机
    pub fn select(&mut self, motor: MotorId) -> Result<(), DriverError> {
        let index = self
            .config
            .roster
            .iter()
            .position(|&id| id == motor)
            .ok_or_else(|| {
                DriverError::InvalidInput(format!("motor {} is not in the roster", motor))
            })?;
        self.active_index = index;
        debug!("Active motor switched to {}", motor);
        Ok(())
    }

    // ------------------------------------------------------------------
    // 暂存参数
    // ------------------------------------------------------------------

    pub fn set_parameters(&mut self, params: StagedParameters) {
        debug!("Staged parameters updated: {}", params);
        self.staged = params;
    }

    /// 解析文本并暂存；任一字段解析失败时保持原参数不变
    pub fn set_parameters_from_text(
        &mut self,
        angle: &str,
        direction: &str,
        speed: &str,
    ) -> Result<StagedParameters, DriverError> {
        let params = StagedParameters::parse(angle, direction, speed)?;
        self.set_parameters(params);
        Ok(params)
    }

    pub fn reset_parameters(&mut self) {
        self.set_parameters(StagedParameters::default());
    }

    // ------------------------------------------------------------------
    // 运动
    // ------------------------------------------------------------------

    /// 绝对位置运动 (0xA6)，返回运动应答（状态 2 布局）
    pub fn run_absolute_position(&mut self) -> Result<Status2, DriverError> {
        let StagedParameters {
            angle,
            direction,
            speed,
        } = self.staged;
        let command = AbsolutePositionCommand::new(angle, direction, speed);
        info!(
            "Motor {}: absolute position {} {} at {}",
            self.active_motor(),
            angle,
            direction,
            speed
        );
        self.motion(command.into())
    }

    /// 增量位置运动 (0xA8)，方向折叠进增量符号
    pub fn run_incremental_position(&mut self) -> Result<Status2, DriverError> {
        let StagedParameters {
            angle,
            direction,
            speed,
        } = self.staged;
        let command = IncrementalPositionCommand::new(angle, direction, speed);
        info!(
            "Motor {}: incremental move {} {} at {}",
            self.active_motor(),
            angle,
            direction,
            speed
        );
        self.motion(command.into())
    }

    fn motion(&mut self, command: MotorCommand) -> Result<Status2, DriverError> {
        let opcode = command.opcode();
        let reply = self.transact(command)?;
        Ok(Status2::from_payload_with_opcode(reply.data_slice(), opcode)?)
    }

    /// 将指定角度设为零点偏移 (0x95)
    ///
    /// 收到任意应答即视为成功。
    pub fn zero_at(&mut self, angle: AngleDeg) -> Result<(), DriverError> {
        info!("Motor {}: set zero offset at {}", self.active_motor(), angle);
        self.transact(SetZeroOffsetCommand::new(angle).into())?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // 读数
    // ------------------------------------------------------------------

    pub fn read_multi_turn_angle(&mut self) -> Result<AngleDeg, DriverError> {
        let reply = self.transact(TelemetryRequest::MultiTurnAngle.into())?;
        Ok(MultiTurnAngle::try_from(reply)?.angle())
    }

    pub fn read_single_turn_angle(&mut self) -> Result<AngleDeg, DriverError> {
        let reply = self.transact(TelemetryRequest::SingleTurnAngle.into())?;
        Ok(SingleTurnAngle::try_from(reply)?.angle())
    }

    /// 读取多圈与单圈角度（两次事务）
    pub fn read_angles(&mut self) -> Result<MotorAngles, DriverError> {
        let multi_turn = self.read_multi_turn_angle()?;
        let single_turn = self.read_single_turn_angle()?;
        Ok(MotorAngles {
            multi_turn,
            single_turn,
        })
    }

    pub fn read_status1(&mut self) -> Result<Status1, DriverError> {
        let reply = self.transact(TelemetryRequest::Status1.into())?;
        Ok(Status1::try_from(reply)?)
    }

    pub fn read_status2(&mut self) -> Result<Status2, DriverError> {
        let reply = self.transact(TelemetryRequest::Status2.into())?;
        Ok(Status2::try_from(reply)?)
    }

    /// 读取状态 1 与状态 2（两次事务）
    pub fn read_status(&mut self) -> Result<StatusReadout, DriverError> {
        let status1 = self.read_status1()?;
        let status2 = self.read_status2()?;
        Ok(StatusReadout { status1, status2 })
    }

    /// 完整状态快照：状态 1、状态 2、多圈与单圈角度（四次事务）
    pub fn snapshot(&mut self) -> Result<MotorStatus, DriverError> {
        let status = self.read_status()?;
        let angles = self.read_angles()?;
        Ok(MotorStatus {
            temperature_c: status.temperature_c(),
            voltage: status.voltage(),
            powered_on: status.is_powered_on(),
            speed_dps: status.speed_dps(),
            multi_turn: angles.multi_turn,
            single_turn: angles.single_turn,
        })
    }

    // ------------------------------------------------------------------
    // 电源
    // ------------------------------------------------------------------

    /// 按当前电源状态切换：运行中发送关闭 (0x80)，否则发送运行 (0x88)
    ///
    /// 先读后写，两次事务之间状态可能被其他主机改变。
    pub fn toggle_power(&mut self) -> Result<PowerOutcome, DriverError> {
        let status = self.read_status1()?;
        let command = if status.is_powered_on() {
            PowerCommand::Off
        } else {
            PowerCommand::Run
        };
        self.send_power(command)
    }

    pub fn power_off(&mut self) -> Result<PowerOutcome, DriverError> {
        self.send_power(PowerCommand::Off)
    }

    pub fn power_run(&mut self) -> Result<PowerOutcome, DriverError> {
        self.send_power(PowerCommand::Run)
    }

    fn send_power(&mut self, command: PowerCommand) -> Result<PowerOutcome, DriverError> {
        let motor = self.active_motor();
        info!("Motor {}: sending {:?} ({})", motor, command, command.opcode());
        let acknowledged = match self.transact(command.into()) {
            Ok(_) => true,
            Err(DriverError::NoReply { .. }) => {
                debug!("Motor {}: power command not acknowledged", motor);
                false
            },
            Err(e) => return Err(e),
        };
        Ok(PowerOutcome {
            command,
            acknowledged,
        })
    }

    // ------------------------------------------------------------------
    // 事务
    // ------------------------------------------------------------------

    /// 向活动电机发送命令并等待应答，无应答转换为 `NoReply`
    fn transact(&mut self, command: MotorCommand) -> Result<MotorFrame, DriverError> {
        let motor = self.active_motor();
        let opcode = command.opcode();
        let payload = command.payload();
        let timeout = self.config.reply_timeout;

        trace!(
            "Motor {}: transact {} payload={:02X?}",
            motor, opcode, payload
        );

        match self
            .transport
            .transact(motor.arbitration_id(), payload, timeout)?
        {
            Some(reply) => {
                trace!(
                    "Motor {}: reply data={:02X?}",
                    motor,
                    reply.data_slice()
                );
                Ok(reply)
            },
            None => {
                warn!(
                    "Motor {}: no reply to {} within {:?}",
                    motor, opcode, timeout
                );
                Err(DriverError::NoReply {
                    motor,
                    opcode,
                    timeout,
                })
            },
        }
    }
}

impl<T: FrameTransport> fmt::Debug for MotorSession<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MotorSession")
            .field("active_motor", &self.active_motor())
            .field("roster", &self.config.roster)
            .field("staged", &self.staged)
            .finish()
    }
}
