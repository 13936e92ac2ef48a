//! 流模板构造
//!
//! 模板是一帧完整的报文字节，MAC 地址留零，由发生器在 L3 模式下填写。

use std::net::Ipv4Addr;

use etherparse::PacketBuilder;
use tracing::trace;

use super::error::PacketError;

pub const ETHERNET_HEADER_LEN: usize = 14;
const IPV4_HEADER_LEN: usize = 20;
const UDP_HEADER_LEN: usize = 8;
const GENEVE_HEADER_LEN: usize = 8;

/// 内层 UDP 的源/目的端口
pub const STREAM_UDP_PORT: u16 = 1234;
pub const GENEVE_UDP_PORT: u16 = 6081;
/// 填充字节
pub const PAD_BYTE: u8 = b'x';

const GENEVE_PROTO_IPV4: u16 = 0x0800;
const MAX_VNI: u32 = 0x00ff_ffff;
const TTL: u8 = 64;

/// GENEVE 隧道外层参数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tunnel {
    pub src: Ipv4Addr,
    pub dst: Ipv4Addr,
    pub vni: u32,
}

/// 构造好的报文模板
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacketTemplate {
    bytes: Vec<u8>,
    ip_offset: usize,
    inner_ip_offset: Option<usize>,
}

impl PacketTemplate {
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// 第一个 IPv4 头的偏移
    pub fn ip_offset(&self) -> usize {
        self.ip_offset
    }

    pub fn ip_src_offset(&self) -> usize {
        self.ip_offset + 12
    }

    pub fn ip_dst_offset(&self) -> usize {
        self.ip_offset + 16
    }

    /// 隧道内层 IPv4 头的偏移（仅隧道报文）
    pub fn inner_ip_offset(&self) -> Option<usize> {
        self.inner_ip_offset
    }
}

/// `Ether / IPv4 / UDP / pad`，或带隧道时
/// `Ether / IPv4 / UDP / GENEVE / IPv4 / UDP / pad`。
#[derive(Debug, Clone, Copy)]
pub struct TemplateBuilder {
    src: Ipv4Addr,
    dst: Ipv4Addr,
    tunnel: Option<Tunnel>,
}

impl TemplateBuilder {
    pub fn ipv4(src: Ipv4Addr, dst: Ipv4Addr) -> Self {
        Self {
            src,
            dst,
            tunnel: None,
        }
    }

    pub fn tunnel(mut self, tunnel: Tunnel) -> Self {
        self.tunnel = Some(tunnel);
        self
    }

    /// 不含填充时的报文长度
    pub fn header_len(&self) -> usize {
        let inner = IPV4_HEADER_LEN + UDP_HEADER_LEN;
        match self.tunnel {
            None => ETHERNET_HEADER_LEN + inner,
            Some(_) => {
                ETHERNET_HEADER_LEN + IPV4_HEADER_LEN + UDP_HEADER_LEN + GENEVE_HEADER_LEN + inner
            }
        }
    }

    /// 构造长度为 `frame_len` 的模板；头部本身更长时不填充。
    pub fn build(&self, frame_len: usize) -> Result<PacketTemplate, PacketError> {
        let pad = vec![PAD_BYTE; frame_len.saturating_sub(self.header_len())];
        trace!(frame_len, pad = pad.len(), tunnel = self.tunnel.is_some(), "构造报文模板");

        let Some(tunnel) = self.tunnel else {
            let builder = PacketBuilder::ethernet2([0; 6], [0; 6])
                .ipv4(self.src.octets(), self.dst.octets(), TTL)
                .udp(STREAM_UDP_PORT, STREAM_UDP_PORT);
            let mut bytes = Vec::with_capacity(builder.size(pad.len()));
            builder
                .write(&mut bytes, &pad)
                .map_err(|e| PacketError::Build(e.to_string()))?;
            return Ok(PacketTemplate {
                bytes,
                ip_offset: ETHERNET_HEADER_LEN,
                inner_ip_offset: None,
            });
        };

        if tunnel.vni > MAX_VNI {
            return Err(PacketError::Vni(tunnel.vni));
        }

        let inner = PacketBuilder::ipv4(self.src.octets(), self.dst.octets(), TTL)
            .udp(STREAM_UDP_PORT, STREAM_UDP_PORT);
        let mut encapsulated = Vec::with_capacity(GENEVE_HEADER_LEN + inner.size(pad.len()));
        encapsulated.extend_from_slice(&geneve_header(tunnel.vni));
        inner
            .write(&mut encapsulated, &pad)
            .map_err(|e| PacketError::Build(e.to_string()))?;

        let outer = PacketBuilder::ethernet2([0; 6], [0; 6])
            .ipv4(tunnel.src.octets(), tunnel.dst.octets(), TTL)
            .udp(GENEVE_UDP_PORT, GENEVE_UDP_PORT);
        let mut bytes = Vec::with_capacity(outer.size(encapsulated.len()));
        outer
            .write(&mut bytes, &encapsulated)
            .map_err(|e| PacketError::Build(e.to_string()))?;

        Ok(PacketTemplate {
            bytes,
            ip_offset: ETHERNET_HEADER_LEN,
            inner_ip_offset: Some(
                ETHERNET_HEADER_LEN + IPV4_HEADER_LEN + UDP_HEADER_LEN + GENEVE_HEADER_LEN,
            ),
        })
    }
}

/// 无选项的 GENEVE 头，载荷直接是 IPv4。
fn geneve_header(vni: u32) -> [u8; GENEVE_HEADER_LEN] {
    let [_, v0, v1, v2] = vni.to_be_bytes();
    let [p0, p1] = GENEVE_PROTO_IPV4.to_be_bytes();
    [0, 0, p0, p1, v0, v1, v2, 0]
}
