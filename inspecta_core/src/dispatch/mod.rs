mod config;
mod error;
mod types;

pub use config::DispatchConfig;
pub use error::{DispatchError, Result};
pub use types::{
    BoundParameter, BoundValue, CardEntry, DispatchResult, EscalatedAnswer, Provenance,
    QueryResult, RowExclusion, RuleAnswer, SummaryCard, TablePayload, field_text,
};
