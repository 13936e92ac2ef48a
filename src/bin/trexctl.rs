//! 流量发生器控制台
//!
//! 配置两个端口、每个方向下发一条流并持续发送，每秒打印一次速率，Ctrl-C 退出。

use std::io;
use std::net::Ipv4Addr;
use std::path::PathBuf;
use std::process;

use clap::Parser;
use perfctl_rs::ctl::{
    ConfigError, Controller, Interrupt, Multiplier, Profile, SimClient, TrafficConfig, port_pair,
};
use tracing::info;

#[derive(Debug, Parser)]
#[command(
    name = "trexctl",
    version,
    about = "Drive a two-port traffic generator and print live rates"
)]
struct Args {
    /// JSON 配置文件，命令行参数覆盖其中的值
    #[arg(long)]
    config: Option<PathBuf>,

    /// Packet length in bytes (without FCS)
    #[arg(short = 'l', long)]
    pkt_len: Option<usize>,

    /// Rate multiplier: N%, N, N[k|m|g]pps or N[k|m|g]bps
    #[arg(short = 'm', long)]
    multiplier: Option<Multiplier>,

    /// Packet construction profile
    #[arg(short = 'p', long, value_enum)]
    profile: Option<Profile>,

    /// Port IP addresses: PORT0,PORT1
    #[arg(long, value_delimiter = ',')]
    ip_addr: Option<Vec<Ipv4Addr>>,

    /// Default gateways: PORT0,PORT1
    #[arg(long, value_delimiter = ',')]
    default_gw: Option<Vec<Ipv4Addr>>,

    /// Base addresses of the randomized ranges (scale profile)
    #[arg(long, value_delimiter = ',')]
    range_addr: Option<Vec<Ipv4Addr>>,

    /// Masks of the randomized bits (scale profile)
    #[arg(long, value_delimiter = ',')]
    range_mask: Option<Vec<Ipv4Addr>>,

    /// Outer source addresses (geneve profile)
    #[arg(long, value_delimiter = ',')]
    tunnel_src_addr: Option<Vec<Ipv4Addr>>,

    /// Outer destination addresses (geneve profile)
    #[arg(long, value_delimiter = ',')]
    tunnel_dst_addr: Option<Vec<Ipv4Addr>>,

    /// Virtual network identifiers (geneve profile)
    #[arg(long, value_delimiter = ',')]
    vni: Option<Vec<u32>>,

    /// Inner addresses (geneve profile)
    #[arg(long, value_delimiter = ',')]
    inner_ip_addr: Option<Vec<Ipv4Addr>>,

    /// 发送多少秒后退出；默认一直运行直到 Ctrl-C
    #[arg(long)]
    duration: Option<u64>,
}

impl Args {
    fn into_config(self) -> Result<TrafficConfig, ConfigError> {
        let mut cfg = match &self.config {
            Some(path) => TrafficConfig::from_json_file(path)?,
            None => TrafficConfig::default(),
        };

        if let Some(v) = self.pkt_len {
            cfg.pkt_len = v;
        }
        if let Some(v) = self.multiplier {
            cfg.multiplier = v;
        }
        if let Some(v) = self.profile {
            cfg.profile = v;
        }
        if let Some(v) = self.ip_addr {
            cfg.ip_addr = port_pair("ip-addr", &v)?;
        }
        if let Some(v) = self.default_gw {
            cfg.default_gw = port_pair("default-gw", &v)?;
        }
        if let Some(v) = self.range_addr {
            cfg.range_addr = port_pair("range-addr", &v)?;
        }
        if let Some(v) = self.range_mask {
            cfg.range_mask = port_pair("range-mask", &v)?;
        }
        if let Some(v) = self.tunnel_src_addr {
            cfg.tunnel_src_addr = port_pair("tunnel-src-addr", &v)?;
        }
        if let Some(v) = self.tunnel_dst_addr {
            cfg.tunnel_dst_addr = port_pair("tunnel-dst-addr", &v)?;
        }
        if let Some(v) = self.vni {
            cfg.vni = port_pair("vni", &v)?;
        }
        if let Some(v) = self.inner_ip_addr {
            cfg.inner_ip_addr = port_pair("inner-ip-addr", &v)?;
        }
        if self.duration.is_some() {
            cfg.duration_secs = self.duration;
        }

        cfg.validate()?;
        Ok(cfg)
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .with_file(true)
        .with_line_number(true)
        .with_target(true)
        .init();

    let cfg = match Args::parse().into_config() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    };
    info!(?cfg, "配置已加载");

    let interrupt = match Interrupt::install() {
        Ok(interrupt) => interrupt,
        Err(e) => {
            eprintln!("error: failed to install SIGINT handler: {e}");
            process::exit(1);
        }
    };

    let mut ctl = Controller::new(SimClient::default(), cfg, io::stdout());
    let code = ctl.execute(&interrupt);
    drop(ctl);
    process::exit(code);
}
