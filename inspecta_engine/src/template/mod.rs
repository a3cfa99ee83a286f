//! Template compilation and execution.

pub mod compiler;
mod executor;

pub use compiler::{TemplateCompiler, TemplateError, count_placeholders};
pub use executor::{Execution, ExecutionState, TemplateExecutor};
