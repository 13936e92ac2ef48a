//! 事件描述
//!
//! perfmon JSON 中单个事件的字段定义及解码。

use std::fmt;
use std::io::Read;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::{PerfmonError, PerfmonResult};

/// 事件字段值：perfmon 文件里大多是字符串，也兼容数字和布尔标志。
/// 负数不被接受。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Bool(bool),
    Number(u64),
}

impl FieldValue {
    /// 按十进制或 `0x` 十六进制解析。
    pub fn as_u64(&self, field: &'static str) -> PerfmonResult<u64> {
        match self {
            FieldValue::Number(n) => Ok(*n),
            FieldValue::Bool(b) => Ok(u64::from(*b)),
            FieldValue::Text(raw) => {
                let text = raw.trim();
                let parsed = match text
                    .strip_prefix("0x")
                    .or_else(|| text.strip_prefix("0X"))
                {
                    Some(hex) => u64::from_str_radix(hex, 16),
                    None => text.parse::<u64>(),
                };
                parsed.map_err(|_| PerfmonError::Number {
                    field,
                    value: raw.clone(),
                })
            }
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Text(s) => f.write_str(s),
            FieldValue::Bool(b) => write!(f, "{}", u8::from(*b)),
            FieldValue::Number(n) => write!(f, "{n}"),
        }
    }
}

/// 单个性能计数器事件
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct EventDescriptor {
    #[serde(rename = "MSRIndex")]
    pub msr_index: FieldValue,
    pub event_code: FieldValue,
    #[serde(rename = "UMask")]
    pub umask: FieldValue,
    pub edge_detect: FieldValue,
    pub any_thread: FieldValue,
    pub invert: FieldValue,
    pub counter_mask: FieldValue,
    pub event_name: String,
    pub brief_description: String,
}

impl EventDescriptor {
    /// 先只看 `MSRIndex` 和 `EventCode` 做筛选，通过后才完整解码；
    /// 被跳过的记录不要求字段齐全。
    pub fn decode_selected(raw: Value) -> PerfmonResult<Option<Self>> {
        let msr = raw
            .get("MSRIndex")
            .cloned()
            .ok_or(PerfmonError::MissingField("MSRIndex"))?;
        let msr: FieldValue = serde_json::from_value(msr)?;
        if msr.to_string() != "0" {
            return Ok(None);
        }
        if let Some(code) = raw.get("EventCode") {
            let code: FieldValue = serde_json::from_value(code.clone())?;
            if code.to_string().contains(',') {
                return Ok(None);
            }
        }
        let event: EventDescriptor = serde_json::from_value(raw)?;
        Ok(event.is_supported().then_some(event))
    }

    /// 输出格式只支持 MSRIndex 为 "0" 且事件码是单值的事件。
    pub fn is_supported(&self) -> bool {
        self.msr_index.to_string() == "0" && !self.event_code.to_string().contains(',')
    }

    /// 计算 perf_event_attr 的 raw config 字。
    pub fn raw_config(&self) -> PerfmonResult<u64> {
        let event = self.event_code.as_u64("EventCode")?;
        let umask = self.umask.as_u64("UMask")?;
        let edge = self.edge_detect.as_u64("EdgeDetect")?;
        let any = self.any_thread.as_u64("AnyThread")?;
        let inv = self.invert.as_u64("Invert")?;
        let cmask = self.counter_mask.as_u64("CounterMask")?;
        Ok(event | umask << 8 | edge << 18 | any << 21 | inv << 23 | cmask << 24)
    }
}

/// 读取事件列表：接受顶层数组，或带 `"Events"` 数组的对象。
pub fn load_events<R: Read>(reader: R) -> PerfmonResult<Vec<Value>> {
    let doc: Value = serde_json::from_reader(reader)?;
    match doc {
        Value::Array(events) => Ok(events),
        Value::Object(mut obj) => match obj.remove("Events") {
            Some(Value::Array(events)) => Ok(events),
            _ => Err(PerfmonError::Layout),
        },
        _ => Err(PerfmonError::Layout),
    }
}
