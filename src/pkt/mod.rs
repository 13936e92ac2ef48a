//! 数据包模板模块
//!
//! 流模板的构造（以太网 / IPv4 / UDP，可选 GENEVE 隧道封装）以及
//! 逐包字段改写程序（field engine）。

// 子模块声明
mod error;
mod range;
mod template;
mod vm;

// 重新导出公共接口
pub use error::{PacketError, VmError};
pub use range::AddrRange;
pub use template::{
    ETHERNET_HEADER_LEN, GENEVE_UDP_PORT, PAD_BYTE, PacketTemplate, STREAM_UDP_PORT,
    TemplateBuilder, Tunnel,
};
pub use vm::{FieldEngine, FieldEngineRunner, FlowVar, FlowVarOp, Instruction};
