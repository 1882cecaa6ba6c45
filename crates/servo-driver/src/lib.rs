//! # Servo Driver
//!
//! 电机会话层：在 CAN 适配层之上提供请求/应答事务，以及面向单个活动电机的
//! 操作（位置控制、零点设置、角度与状态读取、电源切换）。
//!
//! ## 分层
//!
//! ```text
//! servo-cli -> servo-driver (MotorSession) -> servo-can (CanAdapter) -> servo-protocol
//! ```
//!
//! ## 使用示例
//!
//! ```rust
//! use servo_can::MockCanAdapter;
//! use servo_driver::{MotorSessionBuilder, DriverError};
//!
//! let mut session = MotorSessionBuilder::new()
//!     .roster([1, 2])
//!     .build_with_adapter(MockCanAdapter::new())
//!     .unwrap();
//!
//! // 静默的总线：读数返回 NoReply，会话仍可继续使用
//! assert!(matches!(session.read_status1(), Err(DriverError::NoReply { .. })));
//! assert_eq!(session.select_next().get(), 2);
//! ```

mod builder;
pub mod config;
mod error;
pub mod session;
pub mod transport;

pub use builder::MotorSessionBuilder;
pub use config::SessionConfig;
pub use error::DriverError;
pub use session::{
    MotorAngles, MotorSession, MotorStatus, PowerOutcome, StagedParameters, StatusReadout,
    parse_angle,
};
pub use transport::{CanTransport, FrameTransport};

// 重新导出协议层常用类型
pub use servo_protocol::{
    AngleDeg, MotorId, Opcode, PowerCommand, RotationDirection, SpeedLimit, Status1, Status2,
    Voltage,
};
