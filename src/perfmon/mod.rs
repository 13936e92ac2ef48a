//! 性能计数器事件描述转换
//!
//! 把 perfmon JSON 事件描述列表转换成 C 预处理器 `foreach` 宏调用列表。

// 子模块声明
mod error;
mod event;
mod foreach;
mod wrap;

// 重新导出公共接口
pub use error::{PerfmonError, PerfmonResult};
pub use event::{EventDescriptor, FieldValue, load_events};
pub use foreach::{DESCRIPTION_WIDTH, convert, render_event};
pub use wrap::TextWrapper;
