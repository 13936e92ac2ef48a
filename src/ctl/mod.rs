//! 流量发生器控制器
//!
//! 通过 [`TrafficClient`] 驱动一个双端口发生器会话：配置端口、下发流、
//! 开始发送并周期性打印速率。

// 子模块声明
mod client;
mod config;
mod controller;
mod error;
mod plan;
mod report;
mod session;
mod sim;

// 重新导出公共接口
pub use client::{
    PortId, PortInfo, PortStats, PortStatus, ServerVersion, StatsSnapshot, Stream, SystemInfo,
    TrafficClient, TxMode,
};
pub use config::{MAX_PKT_LEN, MIN_PKT_LEN, Multiplier, Profile, TrafficConfig, port_pair};
pub use controller::{Controller, HEADER_EVERY, POLL_INTERVAL, PORTS};
pub use error::{ClientError, ClientResult, ConfigError, ControlError};
pub use plan::StreamPlan;
pub use report::{connected_banner, counters_table, port_info_table, rate_header, rate_row};
pub use session::{Interrupt, InterruptTrigger, Session};
pub use sim::{SimClient, SimConfig};
