use std::io;
use std::path::PathBuf;

use thiserror::Error;

use super::client::PortId;
use crate::pkt::{PacketError, VmError};

pub type ClientResult<T> = Result<T, ClientError>;

/// 发生器会话返回的错误
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("not connected to server")]
    NotConnected,

    #[error("port {0} does not exist")]
    InvalidPort(PortId),

    #[error("port {port}: {reason}")]
    Port { port: PortId, reason: String },

    #[error("request rejected: {0}")]
    Rejected(String),

    #[error("invalid stream: {0}")]
    Stream(#[from] VmError),
}

impl ClientError {
    pub fn port(port: PortId, reason: impl Into<String>) -> Self {
        ClientError::Port {
            port,
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("invalid multiplier {0:?}")]
    Multiplier(String),

    #[error("--{flag} expects exactly two values (one per port), got {got}")]
    PortPair { flag: &'static str, got: usize },

    #[error("packet length {0} outside 60..=9216")]
    PacketLength(usize),

    #[error("vni {0} does not fit in 24 bits")]
    Vni(u32),
}

/// 控制流程的顶层错误
#[derive(Debug, Error)]
pub enum ControlError {
    #[error(transparent)]
    Client(#[from] ClientError),

    #[error(transparent)]
    Packet(#[from] PacketError),

    #[error("output error: {0}")]
    Io(#[from] io::Error),

    #[error("interrupted")]
    Interrupted,
}
