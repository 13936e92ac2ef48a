//! 会话所有权与中断
//!
//! [`Session`] 独占客户端：从尝试连接那一刻起视为已打开，`close` 至多断开一次，
//! `Drop` 时兜底关闭。[`Interrupt`] 接收信号处理函数发来的中断请求，由主线程
//! 在检查点处理。

use std::cell::Cell;
use std::ops::{Deref, DerefMut};
use std::thread;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError};
use tracing::{debug, info, warn};

use super::client::TrafficClient;
use super::error::ClientResult;

pub struct Session<C: TrafficClient> {
    client: C,
    open: bool,
}

impl<C: TrafficClient> Session<C> {
    pub fn new(client: C) -> Self {
        Self {
            client,
            open: false,
        }
    }

    #[tracing::instrument(skip(self))]
    pub fn connect(&mut self) -> ClientResult<()> {
        // 连接失败也要在退出时断开
        self.open = true;
        self.client.connect()
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    /// 断开连接；重复调用无效果。
    pub fn close(&mut self) {
        if !self.open {
            return;
        }
        self.open = false;
        match self.client.disconnect() {
            Ok(()) => info!("🔌 已断开连接"),
            Err(e) => warn!(error = %e, "断开连接失败"),
        }
    }
}

impl<C: TrafficClient> Deref for Session<C> {
    type Target = C;

    fn deref(&self) -> &C {
        &self.client
    }
}

impl<C: TrafficClient> DerefMut for Session<C> {
    fn deref_mut(&mut self) -> &mut C {
        &mut self.client
    }
}

impl<C: TrafficClient> Drop for Session<C> {
    fn drop(&mut self) {
        self.close();
    }
}

/// 触发中断的一端，可在任意线程调用。
#[derive(Debug, Clone)]
pub struct InterruptTrigger {
    tx: Sender<()>,
}

impl InterruptTrigger {
    pub fn raise(&self) {
        // 已有未处理的请求时丢弃
        let _ = self.tx.try_send(());
    }
}

/// 中断的接收端；一旦收到便保持置位。
#[derive(Debug)]
pub struct Interrupt {
    rx: Receiver<()>,
    raised: Cell<bool>,
}

impl Interrupt {
    pub fn channel() -> (InterruptTrigger, Interrupt) {
        let (tx, rx) = crossbeam_channel::bounded(1);
        (
            InterruptTrigger { tx },
            Interrupt {
                rx,
                raised: Cell::new(false),
            },
        )
    }

    /// 注册 SIGINT 处理函数，返回对应的接收端。
    pub fn install() -> Result<Interrupt, ctrlc::Error> {
        let (trigger, interrupt) = Self::channel();
        ctrlc::set_handler(move || {
            trigger.raise();
        })?;
        debug!("已注册 SIGINT 处理函数");
        Ok(interrupt)
    }

    pub fn is_raised(&self) -> bool {
        if self.raised.get() {
            return true;
        }
        match self.rx.try_recv() {
            Ok(()) => {
                self.raised.set(true);
                true
            }
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => false,
        }
    }

    /// 最多等待 `timeout`，期间收到中断则立即返回 `true`。
    pub fn wait(&self, timeout: Duration) -> bool {
        if self.raised.get() {
            return true;
        }
        match self.rx.recv_timeout(timeout) {
            Ok(()) => {
                self.raised.set(true);
                true
            }
            Err(RecvTimeoutError::Timeout) => false,
            Err(RecvTimeoutError::Disconnected) => {
                thread::sleep(timeout);
                false
            }
        }
    }
}
