//! 逐包字段改写程序（field engine）
//!
//! 程序是一串有序指令：先推进流变量，再按掩码把变量写入报文，
//! 最后修正 IPv4 头校验和。每发送一个包执行一遍。

use std::collections::HashMap;

use etherparse::Ipv4HeaderSlice;
use rand::Rng;

use super::error::VmError;
use super::template::PacketTemplate;

/// 流变量每包的变化方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowVarOp {
    Inc,
    Dec,
    Random,
}

/// 流变量：`size` 字节宽，取值范围 `[min, max]`。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowVar {
    pub name: String,
    pub size: u8,
    pub op: FlowVarOp,
    pub min: u64,
    pub max: u64,
    pub step: u64,
}

impl FlowVar {
    /// 覆盖整个位宽的随机变量
    pub fn random(name: impl Into<String>, size: u8) -> Self {
        Self {
            name: name.into(),
            size,
            op: FlowVarOp::Random,
            min: 0,
            max: width_max(size),
            step: 1,
        }
    }

    fn next<R: Rng + ?Sized>(&self, prev: Option<u64>, rng: &mut R) -> u64 {
        match (self.op, prev) {
            (FlowVarOp::Random, _) => rng.gen_range(self.min..=self.max),
            (FlowVarOp::Inc, None) => self.min,
            (FlowVarOp::Inc, Some(p)) => match p.checked_add(self.step) {
                Some(v) if v <= self.max => v,
                _ => self.min,
            },
            (FlowVarOp::Dec, None) => self.max,
            (FlowVarOp::Dec, Some(p)) => match p.checked_sub(self.step) {
                Some(v) if v >= self.min => v,
                _ => self.max,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Instruction {
    FlowVar(FlowVar),
    /// `field = (field & !mask) | ((value << shift) & mask)`，负 `shift` 表示右移。
    WriteMask {
        var: String,
        pkt_offset: usize,
        cast_size: u8,
        mask: u32,
        shift: i8,
    },
    /// 重新计算 `offset` 处 IPv4 头的校验和
    FixIpv4 { offset: usize },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldEngine {
    instructions: Vec<Instruction>,
}

impl FieldEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(mut self, instruction: Instruction) -> Self {
        self.instructions.push(instruction);
        self
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// 源/目的地址按掩码逐包随机，然后修正校验和。
    pub fn randomize_ipv4_pair(template: &PacketTemplate, src_mask: u32, dst_mask: u32) -> Self {
        Self::new()
            .push(Instruction::FlowVar(FlowVar::random("sip", 4)))
            .push(Instruction::FlowVar(FlowVar::random("dip", 4)))
            .push(Instruction::WriteMask {
                var: "sip".into(),
                pkt_offset: template.ip_src_offset(),
                cast_size: 4,
                mask: src_mask,
                shift: 0,
            })
            .push(Instruction::WriteMask {
                var: "dip".into(),
                pkt_offset: template.ip_dst_offset(),
                cast_size: 4,
                mask: dst_mask,
                shift: 0,
            })
            .push(Instruction::FixIpv4 {
                offset: template.ip_offset(),
            })
    }

    /// 检查程序能否作用于长度为 `frame_len` 的报文。
    pub fn validate(&self, frame_len: usize) -> Result<(), VmError> {
        let mut defined: Vec<&str> = Vec::new();
        for instruction in &self.instructions {
            match instruction {
                Instruction::FlowVar(var) => {
                    if !matches!(var.size, 1 | 2 | 4 | 8) {
                        return Err(VmError::VarSize {
                            name: var.name.clone(),
                            size: var.size,
                        });
                    }
                    if var.min > var.max || var.max > width_max(var.size) {
                        return Err(VmError::VarRange {
                            name: var.name.clone(),
                            min: var.min,
                            max: var.max,
                        });
                    }
                    if defined.contains(&var.name.as_str()) {
                        return Err(VmError::DuplicateVar(var.name.clone()));
                    }
                    defined.push(&var.name);
                }
                Instruction::WriteMask {
                    var,
                    pkt_offset,
                    cast_size,
                    ..
                } => {
                    if !defined.contains(&var.as_str()) {
                        return Err(VmError::UnknownVar(var.clone()));
                    }
                    if !matches!(cast_size, 1 | 2 | 4) {
                        return Err(VmError::CastSize(*cast_size));
                    }
                    check_bounds(*pkt_offset, usize::from(*cast_size), frame_len)?;
                }
                Instruction::FixIpv4 { offset } => check_bounds(*offset, 20, frame_len)?,
            }
        }
        Ok(())
    }

    pub fn runner(&self) -> FieldEngineRunner<'_> {
        FieldEngineRunner {
            engine: self,
            values: HashMap::new(),
        }
    }
}

/// 单条流上的执行状态，保存各流变量的当前值。
#[derive(Debug)]
pub struct FieldEngineRunner<'a> {
    engine: &'a FieldEngine,
    values: HashMap<String, u64>,
}

impl FieldEngineRunner<'_> {
    /// 以 `template` 为底生成下一个包。
    pub fn next_packet<R: Rng + ?Sized>(
        &mut self,
        template: &[u8],
        rng: &mut R,
    ) -> Result<Vec<u8>, VmError> {
        let mut pkt = template.to_vec();
        for instruction in &self.engine.instructions {
            match instruction {
                Instruction::FlowVar(var) => {
                    let value = var.next(self.values.get(&var.name).copied(), rng);
                    self.values.insert(var.name.clone(), value);
                }
                Instruction::WriteMask {
                    var,
                    pkt_offset,
                    cast_size,
                    mask,
                    shift,
                } => {
                    let value = *self
                        .values
                        .get(var)
                        .ok_or_else(|| VmError::UnknownVar(var.clone()))?;
                    write_masked(&mut pkt, *pkt_offset, *cast_size, *mask, *shift, value)?;
                }
                Instruction::FixIpv4 { offset } => fix_ipv4_checksum(&mut pkt, *offset)?,
            }
        }
        Ok(pkt)
    }

    pub fn value(&self, name: &str) -> Option<u64> {
        self.values.get(name).copied()
    }
}

fn width_max(size: u8) -> u64 {
    match size {
        0 => 0,
        1..=7 => (1u64 << (u32::from(size) * 8)) - 1,
        _ => u64::MAX,
    }
}

fn check_bounds(offset: usize, len: usize, frame_len: usize) -> Result<(), VmError> {
    match offset.checked_add(len) {
        Some(end) if end <= frame_len => Ok(()),
        _ => Err(VmError::OutOfBounds {
            offset,
            len,
            frame_len,
        }),
    }
}

fn write_masked(
    pkt: &mut [u8],
    offset: usize,
    cast_size: u8,
    mask: u32,
    shift: i8,
    value: u64,
) -> Result<(), VmError> {
    let len = usize::from(cast_size);
    check_bounds(offset, len, pkt.len())?;
    let field = &mut pkt[offset..offset + len];

    let current = field.iter().fold(0u64, |acc, b| acc << 8 | u64::from(*b));
    let shifted = if shift >= 0 {
        value.checked_shl(u32::from(shift.unsigned_abs())).unwrap_or(0)
    } else {
        value.checked_shr(u32::from(shift.unsigned_abs())).unwrap_or(0)
    };
    let mask = u64::from(mask) & width_max(cast_size);
    let updated = (current & !mask) | (shifted & mask);

    for (i, byte) in field.iter_mut().enumerate() {
        *byte = (updated >> (8 * (len - 1 - i))) as u8;
    }
    Ok(())
}

fn fix_ipv4_checksum(pkt: &mut [u8], offset: usize) -> Result<(), VmError> {
    let header = pkt
        .get(offset..)
        .and_then(|rest| Ipv4HeaderSlice::from_slice(rest).ok())
        .ok_or(VmError::NotIpv4(offset))?
        .to_header();
    let checksum = header.calc_header_checksum();
    pkt[offset + 10..offset + 12].copy_from_slice(&checksum.to_be_bytes());
    Ok(())
}
