mod repository;
mod types;

pub use repository::RuleRepo;
pub use types::{
    Category, Exclusion, IntentRule, ParameterKind, ParameterSpec, RuleStatus, ValueType,
};
