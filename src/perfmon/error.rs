use std::io;

use thiserror::Error;

pub type PerfmonResult<T> = Result<T, PerfmonError>;

#[derive(Debug, Error)]
pub enum PerfmonError {
    #[error("invalid event json: {0}")]
    Json(#[from] serde_json::Error),

    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    #[error("event file must be an array or an object with an \"Events\" array")]
    Layout,

    #[error("event descriptor is missing field {0}")]
    MissingField(&'static str),

    #[error("field {field}: {value:?} is not a number")]
    Number { field: &'static str, value: String },
}
