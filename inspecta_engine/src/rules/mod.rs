//! Rule catalog persistence and the in-memory snapshot served to queries.

mod convert;
mod repository;
mod snapshot;
mod store;

pub use repository::DatabaseRuleRepository;
pub use snapshot::{RuleCache, RuleSnapshot, validate_rule};
pub use store::RuleStore;
