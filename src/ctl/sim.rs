//! 内置的模拟发生器
//!
//! 进程内的环回发生器：端口 `2k` 与 `2k+1` 直连，一端发送的流量即另一端接收的流量。
//! 它执行与真实服务端相同的会话规则（未连接、服务模式、端口忙等），速率由倍率、
//! 帧长和端口速率推出，计数按墙钟时间累积。

use std::net::Ipv4Addr;
use std::time::Instant;

use tracing::{debug, info};

use super::client::{
    PortId, PortInfo, PortStats, PortStatus, ServerVersion, StatsSnapshot, Stream, SystemInfo,
    TrafficClient,
};
use super::config::Multiplier;
use super::error::{ClientError, ClientResult};

/// FCS 长度
const FCS_LEN: usize = 4;
/// 前导码 + 帧间隙
const L1_OVERHEAD: usize = 20;
/// 超出线速的容差
const LINE_RATE_SLACK: f64 = 1e-9;

#[derive(Debug, Clone)]
pub struct SimConfig {
    pub hostname: String,
    pub port_count: usize,
    pub speed_gbps: f64,
    pub cores_per_port: u32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            hostname: "localhost".to_string(),
            port_count: 2,
            speed_gbps: 10.0,
            cores_per_port: 1,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Flow {
    pps: f64,
    /// 含 FCS 的帧长
    l2_len: usize,
}

#[derive(Debug)]
struct Transmission {
    flows: Vec<Flow>,
    since: Instant,
}

impl Transmission {
    fn pps(&self) -> f64 {
        self.flows.iter().map(|f| f.pps).sum()
    }

    fn bps(&self) -> f64 {
        self.flows.iter().map(|f| f.pps * (f.l2_len * 8) as f64).sum()
    }

    /// 自 `since` 起发送的 (包数, 字节数)
    fn sent(&self, now: Instant) -> (u64, u64) {
        let secs = now.duration_since(self.since).as_secs_f64();
        self.flows.iter().fold((0, 0), |(pkts, bytes), f| {
            let n = (f.pps * secs) as u64;
            (pkts + n, bytes + n * f.l2_len as u64)
        })
    }
}

#[derive(Debug)]
struct SimPort {
    id: PortId,
    service_mode: bool,
    l3: Option<(Ipv4Addr, Ipv4Addr)>,
    resolved: bool,
    streams: Vec<Stream>,
    tx: Option<Transmission>,
    /// 已结算的发送计数
    opackets: u64,
    obytes: u64,
}

impl SimPort {
    fn new(id: PortId) -> Self {
        Self {
            id,
            service_mode: false,
            l3: None,
            resolved: false,
            streams: Vec::new(),
            tx: None,
            opackets: 0,
            obytes: 0,
        }
    }

    fn mac(id: PortId) -> String {
        format!("02:00:00:00:00:{id:02x}")
    }

    fn peer(&self) -> PortId {
        self.id ^ 1
    }

    /// 把进行中的发送结算进计数，并从 `now` 重新计时。
    fn settle(&mut self, now: Instant) {
        if let Some(tx) = &mut self.tx {
            let (pkts, bytes) = tx.sent(now);
            self.opackets += pkts;
            self.obytes += bytes;
            tx.since = now;
        }
    }

    fn tx_totals(&self, now: Instant) -> (u64, u64) {
        let (pkts, bytes) = self.tx.as_ref().map_or((0, 0), |tx| tx.sent(now));
        (self.opackets + pkts, self.obytes + bytes)
    }

    fn tx_rates(&self) -> (f64, f64) {
        self.tx.as_ref().map_or((0.0, 0.0), |tx| (tx.pps(), tx.bps()))
    }
}

/// 模拟发生器客户端
#[derive(Debug)]
pub struct SimClient {
    cfg: SimConfig,
    connected: bool,
    ports: Vec<SimPort>,
}

impl SimClient {
    pub fn new(cfg: SimConfig) -> Self {
        let ports = (0..cfg.port_count)
            .map(|id| SimPort::new(id as PortId))
            .collect();
        Self {
            cfg,
            connected: false,
            ports,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    fn ensure_connected(&self) -> ClientResult<()> {
        if self.connected {
            Ok(())
        } else {
            Err(ClientError::NotConnected)
        }
    }

    fn port_mut(&mut self, port: PortId) -> ClientResult<&mut SimPort> {
        self.ensure_connected()?;
        self.ports
            .get_mut(usize::from(port))
            .ok_or(ClientError::InvalidPort(port))
    }

    fn check_ports(&self, ports: &[PortId]) -> ClientResult<()> {
        self.ensure_connected()?;
        match ports.iter().find(|&&p| usize::from(p) >= self.ports.len()) {
            Some(&p) => Err(ClientError::InvalidPort(p)),
            None => Ok(()),
        }
    }

    fn line_rate_bps(&self) -> f64 {
        self.cfg.speed_gbps * 1e9
    }

    /// 按倍率把端口上的流换算成实际发送速率。
    fn scale_streams(
        &self,
        port: PortId,
        streams: &[Stream],
        mult: &Multiplier,
    ) -> ClientResult<Vec<Flow>> {
        let base: Vec<Flow> = streams
            .iter()
            .map(|s| Flow {
                pps: s.mode.base_pps(),
                l2_len: s.packet.len() + FCS_LEN,
            })
            .collect();
        let base_pps: f64 = base.iter().map(|f| f.pps).sum();
        let base_l2: f64 = base.iter().map(|f| f.pps * (f.l2_len * 8) as f64).sum();
        let base_l1: f64 = base
            .iter()
            .map(|f| f.pps * ((f.l2_len + L1_OVERHEAD) * 8) as f64)
            .sum();
        if base_pps <= 0.0 {
            return Err(ClientError::port(port, "streams have zero rate"));
        }

        let factor = match *mult {
            Multiplier::Percent(p) => self.line_rate_bps() * p / 100.0 / base_l1,
            Multiplier::Factor(f) => f,
            Multiplier::Pps(x) => x / base_pps,
            Multiplier::Bps(x) => x / base_l2,
        };
        if base_l1 * factor > self.line_rate_bps() * (1.0 + LINE_RATE_SLACK) {
            return Err(ClientError::Rejected(format!(
                "port {port}: multiplier {mult} exceeds line rate of {} Gb/s",
                self.cfg.speed_gbps
            )));
        }
        Ok(base
            .into_iter()
            .map(|f| Flow {
                pps: f.pps * factor,
                l2_len: f.l2_len,
            })
            .collect())
    }
}

impl Default for SimClient {
    fn default() -> Self {
        Self::new(SimConfig::default())
    }
}

impl TrafficClient for SimClient {
    fn connect(&mut self) -> ClientResult<()> {
        self.connected = true;
        info!(hostname = %self.cfg.hostname, "🔗 已连接模拟发生器");
        Ok(())
    }

    fn disconnect(&mut self) -> ClientResult<()> {
        if !self.connected {
            return Ok(());
        }
        let now = Instant::now();
        for port in &mut self.ports {
            port.settle(now);
            port.tx = None;
        }
        self.connected = false;
        Ok(())
    }

    fn server_system_info(&mut self) -> ClientResult<SystemInfo> {
        self.ensure_connected()?;
        Ok(SystemInfo {
            hostname: self.cfg.hostname.clone(),
            dp_core_count: self.cfg.cores_per_port * self.ports.len() as u32,
            dp_core_count_per_port: self.cfg.cores_per_port,
            port_count: self.ports.len(),
        })
    }

    fn server_version(&mut self) -> ClientResult<ServerVersion> {
        self.ensure_connected()?;
        Ok(ServerVersion {
            name: "trex-sim".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        })
    }

    #[tracing::instrument(skip(self))]
    fn reset(&mut self, ports: &[PortId]) -> ClientResult<()> {
        self.check_ports(ports)?;
        for &p in ports {
            self.ports[usize::from(p)] = SimPort::new(p);
        }
        debug!("端口已复位");
        Ok(())
    }

    fn set_service_mode(&mut self, ports: &[PortId], enabled: bool) -> ClientResult<()> {
        self.check_ports(ports)?;
        for &p in ports {
            self.ports[usize::from(p)].service_mode = enabled;
        }
        debug!(?ports, enabled, "服务模式切换");
        Ok(())
    }

    fn set_l3_mode(
        &mut self,
        port: PortId,
        src_ipv4: Ipv4Addr,
        gateway: Ipv4Addr,
    ) -> ClientResult<()> {
        let p = self.port_mut(port)?;
        if !p.service_mode {
            return Err(ClientError::port(port, "L3 configuration requires service mode"));
        }
        if p.tx.is_some() {
            return Err(ClientError::port(port, "port is transmitting"));
        }
        p.l3 = Some((src_ipv4, gateway));
        p.resolved = false;
        debug!(port, %src_ipv4, %gateway, "L3 模式");
        Ok(())
    }

    fn resolve(&mut self, ports: &[PortId]) -> ClientResult<()> {
        self.check_ports(ports)?;
        for &p in ports {
            let port = &mut self.ports[usize::from(p)];
            if !port.service_mode {
                return Err(ClientError::port(p, "resolve requires service mode"));
            }
            if port.l3.is_none() {
                return Err(ClientError::port(p, "no L3 configuration to resolve"));
            }
            port.resolved = true;
        }
        Ok(())
    }

    fn port_info(&mut self, ports: &[PortId]) -> ClientResult<Vec<PortInfo>> {
        self.check_ports(ports)?;
        Ok(ports
            .iter()
            .map(|&p| {
                let port = &self.ports[usize::from(p)];
                PortInfo {
                    pci_addr: format!("0000:00:{:02x}.0", 4 + usize::from(p)),
                    driver: "net_sim".to_string(),
                    hw_mac: SimPort::mac(p),
                    src_mac: SimPort::mac(p),
                    arp: if port.resolved {
                        SimPort::mac(port.peer())
                    } else {
                        "-".to_string()
                    },
                    src_ipv4: port.l3.map(|(src, _)| src),
                    speed_gbps: self.cfg.speed_gbps,
                    numa: 0,
                    link_up: true,
                    status: if port.tx.is_some() {
                        PortStatus::Transmitting
                    } else {
                        PortStatus::Idle
                    },
                }
            })
            .collect())
    }

    fn add_streams(&mut self, port: PortId, streams: Vec<Stream>) -> ClientResult<()> {
        for stream in &streams {
            stream.engine.validate(stream.packet.len())?;
        }
        let p = self.port_mut(port)?;
        if p.tx.is_some() {
            return Err(ClientError::port(port, "cannot add streams while transmitting"));
        }
        debug!(port, count = streams.len(), "添加流");
        p.streams.extend(streams);
        Ok(())
    }

    fn clear_stats(&mut self) -> ClientResult<()> {
        self.ensure_connected()?;
        let now = Instant::now();
        for port in &mut self.ports {
            port.settle(now);
            port.opackets = 0;
            port.obytes = 0;
        }
        Ok(())
    }

    #[tracing::instrument(skip(self, mult), fields(mult = %mult))]
    fn start(&mut self, ports: &[PortId], mult: &Multiplier) -> ClientResult<()> {
        self.check_ports(ports)?;
        let mut plans = Vec::with_capacity(ports.len());
        for &p in ports {
            let port = &self.ports[usize::from(p)];
            if port.tx.is_some() {
                return Err(ClientError::port(p, "port is already transmitting"));
            }
            if port.streams.is_empty() {
                return Err(ClientError::port(p, "no streams configured"));
            }
            plans.push((p, self.scale_streams(p, &port.streams, mult)?));
        }

        let now = Instant::now();
        for (p, flows) in plans {
            let tx = Transmission { flows, since: now };
            info!(port = p, pps = tx.pps(), bps = tx.bps(), "🚀 开始发送");
            self.ports[usize::from(p)].tx = Some(tx);
        }
        Ok(())
    }

    fn stop(&mut self, ports: &[PortId]) -> ClientResult<()> {
        self.check_ports(ports)?;
        let now = Instant::now();
        for &p in ports {
            let port = &mut self.ports[usize::from(p)];
            port.settle(now);
            port.tx = None;
        }
        debug!(?ports, "停止发送");
        Ok(())
    }

    fn stats(&mut self, ports: &[PortId]) -> ClientResult<StatsSnapshot> {
        self.check_ports(ports)?;
        let now = Instant::now();
        let port_stats = |id: PortId| -> PortStats {
            let port = &self.ports[usize::from(id)];
            let (tx_pps, tx_bps) = port.tx_rates();
            let (opackets, obytes) = port.tx_totals(now);
            let (rx_pps, rx_bps, ipackets, ibytes) =
                match self.ports.get(usize::from(port.peer())) {
                    Some(peer) => {
                        let (pps, bps) = peer.tx_rates();
                        let (pkts, bytes) = peer.tx_totals(now);
                        (pps, bps, pkts, bytes)
                    }
                    None => (0.0, 0.0, 0, 0),
                };
            PortStats {
                tx_pps,
                tx_bps,
                rx_pps,
                rx_bps,
                ipackets,
                opackets,
                ibytes,
                obytes,
                ierrors: 0,
                oerrors: 0,
            }
        };

        let mut snapshot = StatsSnapshot::default();
        for id in 0..self.ports.len() as PortId {
            let stats = port_stats(id);
            snapshot.global.tx_pps += stats.tx_pps;
            snapshot.global.tx_bps += stats.tx_bps;
            snapshot.global.rx_pps += stats.rx_pps;
            snapshot.global.rx_bps += stats.rx_bps;
            if ports.contains(&id) {
                snapshot.ports.insert(id, stats);
            }
        }
        Ok(snapshot)
    }
}
