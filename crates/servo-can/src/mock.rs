//! Mock CAN 适配器
//!
//! 无硬件依赖，用于测试会话层：
//! - 记录所有发送的帧
//! - 通过应答函数按请求帧生成应答（可返回多帧，用于模拟总线上的无关帧）
//! - 模拟静默（无应答）与发送失败

use crate::{CanAdapter, CanDeviceError, CanDeviceErrorKind, CanError, MotorFrame};
use std::collections::VecDeque;
use std::time::Duration;
use tracing::trace;

type Responder = Box<dyn FnMut(&MotorFrame) -> Vec<MotorFrame> + Send>;

/// 模拟 CAN 适配器
pub struct MockCanAdapter {
    sent: Vec<MotorFrame>,
    rx_queue: VecDeque<MotorFrame>,
    responder: Option<Responder>,
    send_failure: Option<CanDeviceErrorKind>,
    last_timeout: Option<Duration>,
}

impl MockCanAdapter {
    /// 创建静默适配器（从不应答）
    pub fn new() -> Self {
        Self {
            sent: Vec::new(),
            rx_queue: VecDeque::new(),
            responder: None,
            send_failure: None,
            last_timeout: None,
        }
    }

    /// 创建带应答函数的适配器
    ///
    /// 每发送一帧调用一次，返回的帧依次进入接收队列。
    pub fn with_responder<F>(responder: F) -> Self
    where
        F: FnMut(&MotorFrame) -> Vec<MotorFrame> + Send + 'static,
    {
        let mut adapter = Self::new();
        adapter.responder = Some(Box::new(responder));
        adapter
    }

    /// 替换应答函数
    pub fn set_responder<F>(&mut self, responder: F)
    where
        F: FnMut(&MotorFrame) -> Vec<MotorFrame> + Send + 'static,
    {
        self.responder = Some(Box::new(responder));
    }

    /// 移除应答函数（之后的请求都不会得到应答）
    pub fn go_silent(&mut self) {
        self.responder = None;
    }

    /// 直接向接收队列注入一帧
    pub fn push_rx(&mut self, frame: MotorFrame) {
        self.rx_queue.push_back(frame);
    }

    /// 让之后的发送失败（`None` 恢复正常）
    pub fn fail_sends(&mut self, kind: Option<CanDeviceErrorKind>) {
        self.send_failure = kind;
    }

    /// 已发送的帧
    pub fn sent(&self) -> &[MotorFrame] {
        &self.sent
    }

    /// 已发送帧的命令字
    pub fn sent_opcodes(&self) -> Vec<u8> {
        self.sent.iter().map(|f| f.data[0]).collect()
    }

    /// 清空发送记录
    pub fn clear_sent(&mut self) {
        self.sent.clear();
    }

    /// 最近一次设置的接收超时
    pub fn last_timeout(&self) -> Option<Duration> {
        self.last_timeout
    }

    /// 接收队列中尚未读取的帧数
    pub fn pending_rx(&self) -> usize {
        self.rx_queue.len()
    }
}

impl Default for MockCanAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MockCanAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MockCanAdapter")
            .field("sent", &self.sent.len())
            .field("rx_queue", &self.rx_queue.len())
            .field("has_responder", &self.responder.is_some())
            .finish()
    }
}

impl CanAdapter for MockCanAdapter {
    fn send(&mut self, frame: MotorFrame) -> Result<(), CanError> {
        if let Some(kind) = self.send_failure {
            return Err(CanError::Device(CanDeviceError::new(
                kind,
                "mock send failure",
            )));
        }

        trace!("mock send: ID=0x{:X}, data={:02X?}", frame.id, frame.data);
        self.sent.push(frame);

        if let Some(responder) = self.responder.as_mut() {
            self.rx_queue.extend(responder(&frame));
        }
        Ok(())
    }

    /// 队列为空立即返回 `Timeout`（不真实等待）
    fn receive(&mut self) -> Result<MotorFrame, CanError> {
        self.rx_queue.pop_front().ok_or(CanError::Timeout)
    }

    fn set_receive_timeout(&mut self, timeout: Duration) {
        self.last_timeout = Some(timeout);
    }
}
