//! 控制器配置
//!
//! 启动时构造一次，之后只读。默认值即命令行的默认值；可以先从 JSON 文件加载，
//! 再由显式给出的命令行参数覆盖。

use std::fmt;
use std::fs;
use std::net::Ipv4Addr;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use super::error::ConfigError;

pub const MIN_PKT_LEN: usize = 60;
pub const MAX_PKT_LEN: usize = 9216;
const MAX_VNI: u32 = 0x00ff_ffff;

/// Rate multiplier applied when traffic is started.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Multiplier {
    /// Percentage of port line rate.
    Percent(f64),
    /// Factor applied to each stream's base rate.
    Factor(f64),
    /// Absolute packets per second per port.
    Pps(f64),
    /// Absolute L2 bits per second per port.
    Bps(f64),
}

impl Multiplier {
    pub fn parse(raw: &str) -> Result<Self, ConfigError> {
        let normalized = raw.trim().to_lowercase();
        let invalid = || ConfigError::Multiplier(raw.to_string());

        let (number, kind) = if let Some(n) = normalized.strip_suffix('%') {
            (n, Self::Percent as fn(f64) -> Self)
        } else if let Some(n) = normalized.strip_suffix("pps") {
            (n, Self::Pps as fn(f64) -> Self)
        } else if let Some(n) = normalized.strip_suffix("bps") {
            (n, Self::Bps as fn(f64) -> Self)
        } else {
            (normalized.as_str(), Self::Factor as fn(f64) -> Self)
        };

        let absolute = !normalized.ends_with('%') && number.len() != normalized.len();
        let (number, scale) = match number.chars().last() {
            Some('k') if absolute => (&number[..number.len() - 1], 1e3),
            Some('m') if absolute => (&number[..number.len() - 1], 1e6),
            Some('g') if absolute => (&number[..number.len() - 1], 1e9),
            _ => (number, 1.0),
        };

        let value: f64 = number.trim().parse().map_err(|_| invalid())?;
        if !value.is_finite() || value <= 0.0 {
            return Err(invalid());
        }
        Ok(kind(value * scale))
    }
}

impl FromStr for Multiplier {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Multiplier {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Multiplier> for String {
    fn from(value: Multiplier) -> Self {
        value.to_string()
    }
}

impl Default for Multiplier {
    fn default() -> Self {
        Multiplier::Percent(100.0)
    }
}

impl fmt::Display for Multiplier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn scaled(f: &mut fmt::Formatter<'_>, value: f64, unit: &str) -> fmt::Result {
            for (scale, prefix) in [(1e9, "g"), (1e6, "m"), (1e3, "k")] {
                if value >= scale {
                    return write!(f, "{}{prefix}{unit}", value / scale);
                }
            }
            write!(f, "{value}{unit}")
        }
        match *self {
            Multiplier::Percent(p) => write!(f, "{p}%"),
            Multiplier::Factor(x) => write!(f, "{x}"),
            Multiplier::Pps(x) => scaled(f, x, "pps"),
            Multiplier::Bps(x) => scaled(f, x, "bps"),
        }
    }
}

/// 报文构造策略
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
pub enum Profile {
    /// 每个方向固定源/目的地址
    #[default]
    #[serde(rename = "l3-base-ip4", alias = "base")]
    #[value(name = "l3-base-ip4", alias = "base")]
    BaseIp4,
    /// 源/目的地址在配置的范围内逐包随机
    #[serde(rename = "l3-scale-ip4", alias = "scale")]
    #[value(name = "l3-scale-ip4", alias = "scale")]
    ScaleIp4,
    /// 外层 GENEVE 隧道封装
    #[serde(rename = "l3-geneve-ip4", alias = "geneve")]
    #[value(name = "l3-geneve-ip4", alias = "geneve")]
    GeneveIp4,
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Profile::BaseIp4 => "l3-base-ip4",
            Profile::ScaleIp4 => "l3-scale-ip4",
            Profile::GeneveIp4 => "l3-geneve-ip4",
        })
    }
}

/// 每个端口对应一个元素，下标即端口号
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrafficConfig {
    pub pkt_len: usize,
    pub multiplier: Multiplier,
    pub profile: Profile,
    pub ip_addr: [Ipv4Addr; 2],
    pub default_gw: [Ipv4Addr; 2],
    pub range_addr: [Ipv4Addr; 2],
    pub range_mask: [Ipv4Addr; 2],
    pub tunnel_src_addr: [Ipv4Addr; 2],
    pub tunnel_dst_addr: [Ipv4Addr; 2],
    pub vni: [u32; 2],
    pub inner_ip_addr: [Ipv4Addr; 2],
    /// 发送多久后正常退出；不设置则一直轮询直到被中断
    pub duration_secs: Option<u64>,
}

impl Default for TrafficConfig {
    fn default() -> Self {
        Self {
            pkt_len: 64,
            multiplier: Multiplier::default(),
            profile: Profile::default(),
            ip_addr: [Ipv4Addr::new(172, 16, 0, 2), Ipv4Addr::new(172, 16, 1, 2)],
            default_gw: [Ipv4Addr::new(172, 16, 0, 1), Ipv4Addr::new(172, 16, 1, 1)],
            range_addr: [Ipv4Addr::new(10, 0, 0, 1), Ipv4Addr::new(10, 128, 0, 1)],
            range_mask: [Ipv4Addr::new(0, 127, 255, 248); 2],
            tunnel_src_addr: [Ipv4Addr::new(1, 1, 1, 1), Ipv4Addr::new(2, 2, 2, 2)],
            tunnel_dst_addr: [Ipv4Addr::new(9, 9, 9, 9); 2],
            vni: [101, 102],
            inner_ip_addr: [Ipv4Addr::new(192, 168, 1, 1), Ipv4Addr::new(192, 168, 2, 1)],
            duration_secs: None,
        }
    }
}

impl TrafficConfig {
    pub fn from_json_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_PKT_LEN..=MAX_PKT_LEN).contains(&self.pkt_len) {
            return Err(ConfigError::PacketLength(self.pkt_len));
        }
        if let Some(&vni) = self.vni.iter().find(|&&vni| vni > MAX_VNI) {
            return Err(ConfigError::Vni(vni));
        }
        Ok(())
    }

    pub fn duration(&self) -> Option<Duration> {
        self.duration_secs.map(Duration::from_secs)
    }
}

/// 把命令行给出的列表转换成每端口一个值的数组。
pub fn port_pair<T: Copy>(flag: &'static str, values: &[T]) -> Result<[T; 2], ConfigError> {
    match values {
        [a, b] => Ok([*a, *b]),
        _ => Err(ConfigError::PortPair {
            flag,
            got: values.len(),
        }),
    }
}
