//! 发生器会话接口
//!
//! 控制器只通过 [`TrafficClient`] 与发生器交互；连接、端口状态、流和统计都由实现方持有。

use std::collections::BTreeMap;
use std::fmt;
use std::net::Ipv4Addr;

use super::config::Multiplier;
use super::error::ClientResult;
use crate::pkt::{FieldEngine, PacketTemplate};

pub type PortId = u8;

/// 服务端系统信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemInfo {
    pub hostname: String,
    pub dp_core_count: u32,
    pub dp_core_count_per_port: u32,
    pub port_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerVersion {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortStatus {
    Idle,
    Transmitting,
}

impl fmt::Display for PortStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PortStatus::Idle => "IDLE",
            PortStatus::Transmitting => "TRANSMITTING",
        })
    }
}

/// 端口硬件与链路信息
#[derive(Debug, Clone, PartialEq)]
pub struct PortInfo {
    pub pci_addr: String,
    pub driver: String,
    pub hw_mac: String,
    pub src_mac: String,
    /// 网关解析出的 MAC，未解析时为 `-`
    pub arp: String,
    pub src_ipv4: Option<Ipv4Addr>,
    pub speed_gbps: f64,
    pub numa: i32,
    pub link_up: bool,
    pub status: PortStatus,
}

impl PortInfo {
    pub const FIELD_NAMES: [&'static str; 10] = [
        "pci_addr", "driver", "hw_mac", "src_mac", "arp", "src_ipv4", "speed", "numa", "link",
        "status",
    ];

    /// 与 [`PortInfo::FIELD_NAMES`] 一一对应的显示值
    pub fn field_values(&self) -> [String; 10] {
        [
            self.pci_addr.clone(),
            self.driver.clone(),
            self.hw_mac.clone(),
            self.src_mac.clone(),
            self.arp.clone(),
            self.src_ipv4
                .map_or_else(|| "-".to_string(), |ip| ip.to_string()),
            format!("{}", self.speed_gbps),
            self.numa.to_string(),
            if self.link_up { "UP" } else { "DOWN" }.to_string(),
            self.status.to_string(),
        ]
    }
}

/// 发送模式
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TxMode {
    /// 以 `pps` 为基准速率持续发送，实际速率再乘以启动时的倍率
    Continuous { pps: f64 },
}

impl TxMode {
    pub fn continuous() -> Self {
        TxMode::Continuous { pps: 1.0 }
    }

    pub fn base_pps(&self) -> f64 {
        match self {
            TxMode::Continuous { pps } => *pps,
        }
    }
}

/// 报文模板 + 改写程序 + 发送模式
#[derive(Debug, Clone, PartialEq)]
pub struct Stream {
    pub packet: PacketTemplate,
    pub engine: FieldEngine,
    pub mode: TxMode,
}

/// 单端口（或全局）统计
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PortStats {
    pub tx_pps: f64,
    pub tx_bps: f64,
    pub rx_pps: f64,
    pub rx_bps: f64,
    pub ipackets: u64,
    pub opackets: u64,
    pub ibytes: u64,
    pub obytes: u64,
    pub ierrors: u64,
    pub oerrors: u64,
}

impl PortStats {
    pub const COUNTER_NAMES: [&'static str; 6] =
        ["ipackets", "opackets", "ibytes", "obytes", "ierrors", "oerrors"];

    pub fn counters(&self) -> [u64; 6] {
        [
            self.ipackets,
            self.opackets,
            self.ibytes,
            self.obytes,
            self.ierrors,
            self.oerrors,
        ]
    }

    fn accumulate(&mut self, other: &PortStats) {
        self.tx_pps += other.tx_pps;
        self.tx_bps += other.tx_bps;
        self.rx_pps += other.rx_pps;
        self.rx_bps += other.rx_bps;
        self.ipackets += other.ipackets;
        self.opackets += other.opackets;
        self.ibytes += other.ibytes;
        self.obytes += other.obytes;
        self.ierrors += other.ierrors;
        self.oerrors += other.oerrors;
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StatsSnapshot {
    pub ports: BTreeMap<PortId, PortStats>,
    pub global: PortStats,
}

impl StatsSnapshot {
    pub fn port(&self, port: PortId) -> PortStats {
        self.ports.get(&port).cloned().unwrap_or_default()
    }

    /// 所选端口之和
    pub fn total(&self) -> PortStats {
        let mut total = PortStats::default();
        for stats in self.ports.values() {
            total.accumulate(stats);
        }
        total
    }
}

/// 发生器控制面会话
pub trait TrafficClient {
    fn connect(&mut self) -> ClientResult<()>;
    fn disconnect(&mut self) -> ClientResult<()>;
    fn server_system_info(&mut self) -> ClientResult<SystemInfo>;
    fn server_version(&mut self) -> ClientResult<ServerVersion>;
    /// 停止流量、删除流、清空统计，端口回到初始状态
    fn reset(&mut self, ports: &[PortId]) -> ClientResult<()>;
    fn set_service_mode(&mut self, ports: &[PortId], enabled: bool) -> ClientResult<()>;
    fn set_l3_mode(&mut self, port: PortId, src_ipv4: Ipv4Addr, gateway: Ipv4Addr)
    -> ClientResult<()>;
    /// 解析网关的 MAC 地址
    fn resolve(&mut self, ports: &[PortId]) -> ClientResult<()>;
    fn port_info(&mut self, ports: &[PortId]) -> ClientResult<Vec<PortInfo>>;
    fn add_streams(&mut self, port: PortId, streams: Vec<Stream>) -> ClientResult<()>;
    fn clear_stats(&mut self) -> ClientResult<()>;
    fn start(&mut self, ports: &[PortId], mult: &Multiplier) -> ClientResult<()>;
    fn stop(&mut self, ports: &[PortId]) -> ClientResult<()>;
    fn stats(&mut self, ports: &[PortId]) -> ClientResult<StatsSnapshot>;
}
