//! 按方向规划流
//!
//! 方向 0 从端口 0 发往端口 1，方向 1 反之；两方向的源/目的角色互换。

use std::net::Ipv4Addr;

use super::client::{PortId, Stream, TxMode};
use super::config::{Profile, TrafficConfig};
use crate::pkt::{AddrRange, FieldEngine, PacketError, TemplateBuilder, Tunnel};

#[derive(Debug, Clone, PartialEq)]
pub struct StreamPlan {
    pub direction: PortId,
    pub src: Ipv4Addr,
    pub dst: Ipv4Addr,
    /// 源、目的地址的随机范围（scale profile）
    pub randomize: Option<(AddrRange, AddrRange)>,
    pub tunnel: Option<Tunnel>,
}

impl StreamPlan {
    pub fn for_direction(cfg: &TrafficConfig, direction: PortId) -> Self {
        let (s, d) = if direction == 0 { (0, 1) } else { (1, 0) };
        match cfg.profile {
            Profile::BaseIp4 => Self {
                direction,
                src: cfg.ip_addr[s],
                dst: cfg.ip_addr[d],
                randomize: None,
                tunnel: None,
            },
            Profile::ScaleIp4 => Self {
                direction,
                src: cfg.range_addr[s],
                dst: cfg.range_addr[d],
                randomize: Some((
                    AddrRange::new(cfg.range_addr[s], cfg.range_mask[s]),
                    AddrRange::new(cfg.range_addr[d], cfg.range_mask[d]),
                )),
                tunnel: None,
            },
            Profile::GeneveIp4 => Self {
                direction,
                src: cfg.inner_ip_addr[s],
                dst: cfg.inner_ip_addr[d],
                randomize: None,
                tunnel: Some(Tunnel {
                    src: cfg.tunnel_src_addr[s],
                    dst: cfg.tunnel_dst_addr[s],
                    vni: cfg.vni[s],
                }),
            },
        }
    }

    /// 打印给用户看的流参数
    pub fn describe(&self) -> Vec<String> {
        let mut lines = Vec::new();
        if let Some((src, dst)) = &self.randomize {
            lines.push(format!("{:15} {}", "Source:", src));
            lines.push(format!("{:15} {}", "Destination:", dst));
        }
        if let Some(tunnel) = &self.tunnel {
            lines.push(format!(
                "{:15} {} -> {} (vni {})",
                "Tunnel:", tunnel.src, tunnel.dst, tunnel.vni
            ));
            lines.push(format!("{:15} {} -> {}", "Inner:", self.src, self.dst));
        }
        lines
    }

    pub fn build(&self, pkt_len: usize) -> Result<Stream, PacketError> {
        let mut builder = TemplateBuilder::ipv4(self.src, self.dst);
        if let Some(tunnel) = self.tunnel {
            builder = builder.tunnel(tunnel);
        }
        let packet = builder.build(pkt_len)?;
        let engine = match &self.randomize {
            Some((src, dst)) => {
                FieldEngine::randomize_ipv4_pair(&packet, src.mask_bits(), dst.mask_bits())
            }
            None => FieldEngine::new(),
        };
        Ok(Stream {
            packet,
            engine,
            mode: TxMode::continuous(),
        })
    }
}
