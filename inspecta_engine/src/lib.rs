#![warn(
    clippy::all,
    clippy::nursery,
    clippy::pedantic,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::correctness,
    clippy::suspicious,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(
    clippy::similar_names,
    clippy::missing_safety_doc,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc,
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation
)]

mod dispatcher;
pub mod escalation;
pub mod extraction;
pub mod format;
pub mod matcher;
pub mod rules;
pub mod seed;
pub mod session;
pub mod storage;
pub mod template;
pub mod tokenizer;

pub use dispatcher::Dispatcher;
pub use escalation::LlmEscalation;
pub use extraction::{Extraction, ParameterError, ParameterExtractor};
pub use format::{FormattedResult, NO_MATCHING_RECORDS, ResultFormatter};
pub use matcher::{CategoryDetector, MatchCandidate, Matcher, Ranking};
pub use rules::{DatabaseRuleRepository, RuleCache, RuleSnapshot, RuleStore};
pub use session::{SessionContext, SessionRegistry, SessionUpdate};
pub use storage::{SqlRecordStore, connect, ensure_schema};
pub use template::{Execution, ExecutionState, TemplateCompiler, TemplateError, TemplateExecutor};
pub use tokenizer::{Token, TokenKind, tokenize};
