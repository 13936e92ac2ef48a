use thiserror::Error;

#[derive(Debug, Error)]
pub enum PacketError {
    #[error("failed to serialize headers: {0}")]
    Build(String),

    #[error("vni {0} does not fit in 24 bits")]
    Vni(u32),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VmError {
    #[error("flow variable {0:?} is not defined before use")]
    UnknownVar(String),

    #[error("flow variable {0:?} defined twice")]
    DuplicateVar(String),

    #[error("flow variable {name:?}: invalid size {size}")]
    VarSize { name: String, size: u8 },

    #[error("flow variable {name:?}: min {min} > max {max}")]
    VarRange { name: String, min: u64, max: u64 },

    #[error("invalid cast size {0}")]
    CastSize(u8),

    #[error("write of {len} bytes at offset {offset} exceeds {frame_len}-byte frame")]
    OutOfBounds {
        offset: usize,
        len: usize,
        frame_len: usize,
    },

    #[error("no valid ipv4 header at offset {0}")]
    NotIpv4(usize),
}
