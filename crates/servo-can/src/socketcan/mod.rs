//! SocketCAN CAN 适配器实现
//!
//! 基于 Linux SocketCAN 子系统。PCAN-USB 等 USB-CAN 设备经内核驱动
//! （`peak_usb` 等）暴露为 `can0`，同样通过本适配器访问。
//!
//! ## 限制
//!
//! - **仅限 Linux 平台**
//! - **接口配置**：波特率由系统工具配置，不在应用层设置：
//!   `sudo ip link set can0 type can bitrate 1000000 && sudo ip link set up can0`

use crate::{CanAdapter, CanDeviceError, CanDeviceErrorKind, CanError, MotorFrame};
use socketcan::{
    CanError as SocketCanError, CanErrorFrame, CanFrame, CanSocket, EmbeddedFrame, ExtendedId,
    Frame, Socket, StandardId,
};
use std::io;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tracing::{error, trace, warn};

mod interface_check;

pub use interface_check::check_interface_status;

/// SocketCAN 读超时下限
///
/// `SO_RCVTIMEO = 0` 表示无限阻塞，因此零超时被提升到 1ms。
const MIN_READ_TIMEOUT: Duration = Duration::from_millis(1);

/// 默认读超时（与会话默认应答超时一致）
const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(200);

/// SocketCAN 适配器
///
/// ```no_run
/// use servo_can::{CanAdapter, MotorFrame, SocketCanAdapter};
///
/// let mut adapter = SocketCanAdapter::new("can0").unwrap();
/// adapter.send(MotorFrame::new_standard(0x141, &[0x9A, 0, 0, 0, 0, 0, 0, 0])).unwrap();
/// let reply = adapter.receive().unwrap();
/// ```
#[derive(Debug)]
pub struct SocketCanAdapter {
    socket: CanSocket,
    /// 接口名称（如 "can0"）
    interface: String,
    /// 读超时时间（用于 receive 方法）
    read_timeout: Duration,
}

impl SocketCanAdapter {
    /// 打开 SocketCAN 接口
    ///
    /// 打开 socket 之前先检查接口存在且处于 UP 状态，给出可操作的错误信息。
    ///
    /// # 错误
    /// - `CanError::Device`: 接口不存在 / 未启动 / 无法打开
    /// - `CanError::Io`: 系统调用失败
    pub fn new(interface: impl Into<String>) -> Result<Self, CanError> {
        let interface = interface.into();

        if !check_interface_status(&interface)? {
            return Err(CanError::Device(CanDeviceError::new(
                CanDeviceErrorKind::NotUp,
                format!(
                    "CAN interface '{}' exists but is not UP. Please start it first:\n  sudo ip link set up {}",
                    interface, interface
                ),
            )));
        }

        let socket = CanSocket::open(&interface).map_err(|e| {
            let kind = if e.kind() == io::ErrorKind::PermissionDenied {
                CanDeviceErrorKind::AccessDenied
            } else {
                CanDeviceErrorKind::Backend
            };
            CanError::Device(CanDeviceError::new(
                kind,
                format!("Failed to open CAN interface '{}': {}", interface, e),
            ))
        })?;

        socket
            .set_read_timeout(DEFAULT_READ_TIMEOUT)
            .map_err(CanError::Io)?;

        trace!("SocketCAN interface '{}' opened", interface);

        Ok(Self {
            socket,
            interface,
            read_timeout: DEFAULT_READ_TIMEOUT,
        })
    }

    /// 获取接口名称
    pub fn interface(&self) -> &str {
        &self.interface
    }

    /// 获取读超时时间
    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    /// 设置读超时
    pub fn set_read_timeout(&mut self, timeout: Duration) -> Result<(), CanError> {
        let timeout = timeout.max(MIN_READ_TIMEOUT);
        if timeout == self.read_timeout {
            return Ok(());
        }
        self.socket.set_read_timeout(timeout).map_err(CanError::Io)?;
        self.read_timeout = timeout;
        Ok(())
    }

    /// 配置接口（仅记录，波特率由 `ip link` 设置）
    pub fn configure(&mut self, bitrate: u32) -> Result<(), CanError> {
        trace!(
            "SocketCAN interface '{}' expects bitrate {} (set externally via ip link)",
            self.interface, bitrate
        );
        Ok(())
    }

    /// 处理错误帧
    ///
    /// 总线关闭与缓冲区溢出上报为错误，其余错误帧忽略（返回 `Ok(())` 继续接收）。
    fn handle_error_frame(&self, frame: CanFrame) -> Result<(), CanError> {
        let Ok(error_frame) = CanErrorFrame::try_from(frame) else {
            warn!("Received CAN error frame but failed to parse, ignoring");
            return Ok(());
        };

        let socketcan_error = SocketCanError::from(error_frame);
        match &socketcan_error {
            SocketCanError::BusOff => {
                error!("CAN Bus Off error detected on '{}'", self.interface);
                Err(CanError::BusOff)
            },
            SocketCanError::ControllerProblem(problem) => {
                let problem_str = problem.to_string();
                if problem_str.to_lowercase().contains("overflow") {
                    error!("CAN Buffer Overflow detected: {}", problem);
                    Err(CanError::BufferOverflow)
                } else {
                    warn!("CAN Controller Problem: {}, ignoring", problem);
                    Ok(())
                }
            },
            _ => {
                warn!("CAN Error Frame received: {}, ignoring", socketcan_error);
                Ok(())
            },
        }
    }
}

fn now_us() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or(0)
}

impl CanAdapter for SocketCanAdapter {
    /// 发送帧
    ///
    /// # 错误
    /// - `CanError::Device`: 创建帧失败（如 ID 无效）
    /// - `CanError::Io`: 发送失败（如总线错误）
    fn send(&mut self, frame: MotorFrame) -> Result<(), CanError> {
        let payload = frame.data_slice();
        let can_frame = if frame.is_extended {
            ExtendedId::new(frame.id).and_then(|id| CanFrame::new(id, payload))
        } else {
            StandardId::new(frame.id as u16).and_then(|id| CanFrame::new(id, payload))
        }
        .ok_or_else(|| {
            CanError::Device(CanDeviceError::new(
                CanDeviceErrorKind::InvalidFrame,
                format!("Failed to create CAN frame with ID 0x{:X}", frame.id),
            ))
        })?;

        self.socket.write_frame(&can_frame).map_err(|e| {
            CanError::Io(io::Error::other(format!("SocketCAN transmit error: {}", e)))
        })?;

        trace!("Sent CAN frame: ID=0x{:X}, len={}", frame.id, frame.len);
        Ok(())
    }

    /// 接收帧（阻塞直到收到有效数据帧或超时）
    ///
    /// 错误帧被过滤；超时返回 `CanError::Timeout`。
    fn receive(&mut self) -> Result<MotorFrame, CanError> {
        loop {
            let can_frame = match self.socket.read_frame() {
                Ok(frame) => frame,
                Err(e)
                    if matches!(
                        e.kind(),
                        io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
                    ) =>
                {
                    return Err(CanError::Timeout);
                },
                Err(e) => return Err(CanError::Io(e)),
            };

            if can_frame.is_error_frame() {
                self.handle_error_frame(can_frame)?;
                continue;
            }

            let mut data = [0u8; 8];
            let frame_data = can_frame.data();
            let len = frame_data.len().min(8);
            data[..len].copy_from_slice(&frame_data[..len]);

            // raw_id() 可能带有标志位，按帧类型取有效位
            let id = if can_frame.is_extended() {
                can_frame.raw_id() & 0x1FFF_FFFF
            } else {
                can_frame.raw_id() & 0x7FF
            };

            let frame = MotorFrame {
                id,
                data,
                len: len as u8,
                is_extended: can_frame.is_extended(),
                timestamp_us: now_us(),
            };

            trace!(
                "Received CAN frame: ID=0x{:X}, len={}, data={:02X?}",
                frame.id,
                frame.len,
                frame.data_slice()
            );
            return Ok(frame);
        }
    }

    fn set_receive_timeout(&mut self, timeout: Duration) {
        if let Err(e) = self.set_read_timeout(timeout) {
            warn!("Failed to set receive timeout: {}", e);
        }
    }

    fn receive_timeout(&mut self, timeout: Duration) -> Result<MotorFrame, CanError> {
        self.set_read_timeout(timeout)?;
        self.receive()
    }
}
