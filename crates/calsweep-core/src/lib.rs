//! Core types: event rows, tabular output, time coercion, tracing

pub mod event;
pub mod table;
pub mod time;
pub mod tracing;

pub use event::EventRow;
pub use table::{COLUMNS, EventTable, OutputFormat};
pub use time::{
    DEFAULT_TIME_OF_DAY, TimeParseError, date_at_default_time, parse_date, parse_time_bound,
    parse_timestamp,
};
pub use crate::tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};
