//! `foreach` 宏列表渲染
//!
//! 每个事件输出为一条 `_(...)` 宏调用，行尾带续行符，整份输出可直接作为
//! 一个多行 `#define` 的主体。

use std::fmt::Write as _;
use std::io::{Read, Write};

use tracing::{debug, info};

use super::error::PerfmonResult;
use super::event::{EventDescriptor, load_events};
use super::wrap::TextWrapper;

/// 描述文本的折行宽度
pub const DESCRIPTION_WIDTH: usize = 70;

/// 渲染单个事件（不含结尾换行）。
pub fn render_event(event: &EventDescriptor, wrapper: &TextWrapper) -> PerfmonResult<String> {
    let cmask = event.counter_mask.as_u64("CounterMask")?;
    let mut out = String::new();
    // String 的 fmt::Write 不会失败
    let _ = write!(
        out,
        " \n  _({}, {}, {}, {}, {}, 0x{:02x}, ",
        event.event_code, event.umask, event.edge_detect, event.any_thread, event.invert, cmask
    );
    out.push_str(&format!("0, {},", event.event_name).replace('.', ", "));
    for line in wrapper.wrap(&event.brief_description) {
        let _ = write!(out, " \\\n    \"{}\"", escape_c(&line));
    }
    out.push_str(") \\");
    Ok(out)
}

/// 从 `input` 读取事件列表，把受支持的事件依次写到 `output`，返回输出条数。
#[tracing::instrument(skip_all)]
pub fn convert<R: Read, W: Write>(input: R, mut output: W) -> PerfmonResult<usize> {
    let events = load_events(input)?;
    info!(total = events.len(), "📥 读取事件描述");
    let wrapper = TextWrapper::new(DESCRIPTION_WIDTH);

    let mut emitted = 0;
    for raw in events {
        let Some(event) = EventDescriptor::decode_selected(raw)? else {
            continue;
        };
        debug!(name = %event.event_name, code = %event.event_code, "输出事件");
        output.write_all(render_event(&event, &wrapper)?.as_bytes())?;
        emitted += 1;
    }
    output.write_all(b"\n")?;
    output.flush()?;
    info!(emitted, "✅ 转换完成");
    Ok(emitted)
}

fn escape_c(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    for ch in line.chars() {
        if ch == '"' || ch == '\\' {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}
