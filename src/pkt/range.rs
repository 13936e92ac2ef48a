//! 地址范围
//!
//! 以基地址加掩码描述：掩码为 1 的位逐包随机，其余位固定取基地址的值。

use std::fmt;
use std::net::Ipv4Addr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddrRange {
    pub base: Ipv4Addr,
    pub mask: Ipv4Addr,
}

impl AddrRange {
    pub fn new(base: Ipv4Addr, mask: Ipv4Addr) -> Self {
        Self { base, mask }
    }

    pub fn mask_bits(&self) -> u32 {
        u32::from(self.mask)
    }

    /// 固定位与基地址一致即属于该范围。
    pub fn contains(&self, addr: Ipv4Addr) -> bool {
        let fixed = !self.mask_bits();
        u32::from(addr) & fixed == u32::from(self.base) & fixed
    }

    /// 范围内的地址个数
    pub fn size(&self) -> u64 {
        1u64 << self.mask_bits().count_ones()
    }
}

impl fmt::Display for AddrRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.mask)
    }
}
