//! 请求/应答事务传输
//!
//! 一次事务 = 发送一帧 + 在超时内等待最多一帧应答。协议要求每个电机同一时刻
//! 只有一个未完成请求，因此事务严格串行，由 `&mut self` 保证。

use servo_can::{CanAdapter, CanError, MotorFrame};
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// 发送前最多丢弃的滞留帧数
const MAX_STALE_FRAMES: usize = 64;

/// 帧传输能力
///
/// 向 `arbitration_id` 发送 8 字节负载，并在 `timeout` 内等待来自同一 ID 的应答。
/// 超时返回 `Ok(None)`；发送失败或总线错误返回 `Err`。不做重试。
pub trait FrameTransport {
    fn transact(
        &mut self,
        arbitration_id: u32,
        payload: [u8; 8],
        timeout: Duration,
    ) -> Result<Option<MotorFrame>, CanError>;
}

impl<T: FrameTransport + ?Sized> FrameTransport for Box<T> {
    fn transact(
        &mut self,
        arbitration_id: u32,
        payload: [u8; 8],
        timeout: Duration,
    ) -> Result<Option<MotorFrame>, CanError> {
        (**self).transact(arbitration_id, payload, timeout)
    }
}

/// 基于 `CanAdapter` 的事务传输
///
/// - 发送前丢弃接收队列中滞留的帧（例如上一次事务超时后迟到的应答）
/// - 只接受与请求相同仲裁 ID 的标准帧作为应答，其余帧跳过
#[derive(Debug)]
pub struct CanTransport<A: CanAdapter> {
    adapter: A,
}

impl<A: CanAdapter> CanTransport<A> {
    pub fn new(adapter: A) -> Self {
        Self { adapter }
    }

    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    pub fn adapter_mut(&mut self) -> &mut A {
        &mut self.adapter
    }

    pub fn into_inner(self) -> A {
        self.adapter
    }

    fn drain_stale(&mut self) -> Result<(), CanError> {
        for _ in 0..MAX_STALE_FRAMES {
            match self.adapter.try_receive()? {
                Some(frame) => debug!(
                    "Discarding stale frame before request: ID=0x{:X}, data={:02X?}",
                    frame.id,
                    frame.data_slice()
                ),
                None => break,
            }
        }
        Ok(())
    }
}

impl<A: CanAdapter> FrameTransport for CanTransport<A> {
    fn transact(
        &mut self,
        arbitration_id: u32,
        payload: [u8; 8],
        timeout: Duration,
    ) -> Result<Option<MotorFrame>, CanError> {
        self.drain_stale()?;

        let request = MotorFrame::new_standard(arbitration_id as u16, &payload);
        self.adapter.send(request)?;
        trace!(
            "Request sent: ID=0x{:X}, data={:02X?}",
            arbitration_id, payload
        );

        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Ok(None);
            }

            match self.adapter.receive_timeout(remaining) {
                Ok(reply) if reply.id == arbitration_id && !reply.is_extended => {
                    trace!(
                        "Reply received: ID=0x{:X}, data={:02X?}",
                        reply.id,
                        reply.data_slice()
                    );
                    return Ok(Some(reply));
                },
                Ok(other) => {
                    trace!(
                        "Ignoring unrelated frame while waiting for 0x{:X}: ID=0x{:X}",
                        arbitration_id, other.id
                    );
                },
                Err(CanError::Timeout) => return Ok(None),
                Err(e) => return Err(e),
            }
        }
    }
}
