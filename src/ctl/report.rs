//! 终端输出格式
//!
//! 连接信息、端口信息表、速率表和最终计数表的排版。

use super::client::{PortId, PortInfo, PortStats, ServerVersion, StatsSnapshot, SystemInfo};

pub fn connected_banner(info: &SystemInfo, version: &ServerVersion) -> String {
    format!(
        "Connected to {} running {} {} with {} cores ({} cores per port)...",
        info.hostname,
        version.name,
        version.version,
        info.dp_core_count,
        info.dp_core_count_per_port
    )
}

/// 每行一个字段，每列一个端口
pub fn port_info_table(ports: &[PortId], infos: &[PortInfo]) -> Vec<String> {
    let mut header = format!("{:>12}", "");
    for p in ports {
        header.push_str(&format!(" | {:^20}", format!("Port {p}")));
    }

    let values: Vec<[String; 10]> = infos.iter().map(PortInfo::field_values).collect();
    let mut lines = vec![header];
    for (i, name) in PortInfo::FIELD_NAMES.iter().enumerate() {
        let mut line = format!("{name:>12}");
        for v in &values {
            line.push_str(&format!(" | {:<20}", v[i]));
        }
        lines.push(line);
    }
    lines
}

/// 速率表的三行表头
pub fn rate_header(ports: &[PortId]) -> [String; 3] {
    let mut captions = String::new();
    for p in ports {
        captions.push_str(&format!("{:^32}", format!("Port {p}")));
        captions.push_str(" | ");
    }
    captions.push_str(&format!("{:^32}", "Global"));

    let direction = format!("{:^16}{:^16}", "TX", "RX");
    let unit = format!("{:>8}{:>8}", "[Mpps]", "[Gb/s]");
    let mut directions = String::new();
    let mut units = String::new();
    for _ in ports {
        directions.push_str(&direction);
        directions.push_str(" | ");
        units.push_str(&unit);
        units.push_str(&unit);
        units.push_str(" | ");
    }
    directions.push_str(&direction);
    units.push_str(&unit);
    units.push_str(&unit);

    [captions, directions, units]
}

/// 一行速率：每端口及全局的 TX Mpps、TX Gb/s、RX Mpps、RX Gb/s
pub fn rate_row(snapshot: &StatsSnapshot, ports: &[PortId]) -> String {
    let mut line = String::new();
    for &p in ports {
        line.push_str(&rate_cells(&snapshot.port(p)));
        line.push_str(" | ");
    }
    line.push_str(&rate_cells(&snapshot.global));
    line
}

fn rate_cells(s: &PortStats) -> String {
    format!(
        "{:>8.2}{:>8.2}{:>8.2}{:>8.2}",
        s.tx_pps / 1e6,
        s.tx_bps / 1e9,
        s.rx_pps / 1e6,
        s.rx_bps / 1e9
    )
}

/// 中断退出前打印的累计计数表
pub fn counters_table(snapshot: &StatsSnapshot, ports: &[PortId]) -> Vec<String> {
    let mut header = format!("{:>15} | ", "");
    for p in ports {
        header.push_str(&format!("{:>15} | ", format!("Port {p}")));
    }
    header.push_str(&format!("{:>15}", "Total"));

    let total = snapshot.total().counters();
    let per_port: Vec<[u64; 6]> = ports.iter().map(|&p| snapshot.port(p).counters()).collect();

    let mut lines = vec![String::new(), "Statistics:".to_string(), header];
    for (i, name) in PortStats::COUNTER_NAMES.iter().enumerate() {
        let mut line = format!("{name:>15} | ");
        for counters in &per_port {
            line.push_str(&format!("{:>15} | ", counters[i]));
        }
        line.push_str(&format!("{:>15}", total[i]));
        lines.push(line);
    }
    lines
}
