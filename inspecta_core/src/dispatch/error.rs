use thiserror::Error;

pub type Result<T> = std::result::Result<T, DispatchError>;

/// Failure taxonomy of the dispatch pipeline.
///
/// `NoCandidateMatch` and `LowConfidenceMatch` escalate automatically;
/// `MissingParameter` moves on to the next candidate first. The rest are final.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum DispatchError {
    #[error("no intent rule matched the query")]
    NoCandidateMatch,

    #[error("best rule {rule_id} scored {score}, below the threshold {threshold}")]
    LowConfidenceMatch {
        rule_id: i32,
        score: u32,
        threshold: u32,
    },

    #[error("rule {rule_id}: required parameter `{parameter}` could not be resolved")]
    MissingParameter { rule_id: i32, parameter: String },

    #[error("rule {rule_id}: template execution failed: {reason}")]
    TemplateExecutionError { rule_id: i32, reason: String },

    #[error("escalation unavailable ({0}); try a more specific query")]
    EscalationUnavailable(String),

    #[error("rules {first} and {second} tie on every ranking key")]
    AmbiguousMatch { first: i32, second: i32 },
}

impl DispatchError {
    /// Whether the dispatcher hands the query to the escalation collaborator.
    #[must_use]
    pub const fn escalates(&self) -> bool {
        matches!(self, Self::NoCandidateMatch | Self::LowConfidenceMatch { .. })
    }

    /// Whether a selection failure still leaves escalation as the answer:
    /// the match failures, plus `MissingParameter` once every candidate is
    /// exhausted.
    #[must_use]
    pub const fn falls_back(&self) -> bool {
        self.escalates() || matches!(self, Self::MissingParameter { .. })
    }

    /// Rule the failure is attributed to, if any.
    #[must_use]
    pub const fn rule_id(&self) -> Option<i32> {
        match self {
            Self::LowConfidenceMatch { rule_id, .. }
            | Self::MissingParameter { rule_id, .. }
            | Self::TemplateExecutionError { rule_id, .. } => Some(*rule_id),
            Self::AmbiguousMatch { first, .. } => Some(*first),
            Self::NoCandidateMatch | Self::EscalationUnavailable(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_match_failures_escalate() {
        assert!(DispatchError::NoCandidateMatch.escalates());
        assert!(
            DispatchError::LowConfidenceMatch {
                rule_id: 1,
                score: 5,
                threshold: 50
            }
            .escalates()
        );
        assert!(
            !DispatchError::TemplateExecutionError {
                rule_id: 3,
                reason: "no such column".to_string()
            }
            .escalates()
        );
    }

    #[test]
    fn missing_parameter_falls_back_without_escalating() {
        let missing = DispatchError::MissingParameter {
            rule_id: 2,
            parameter: "supplier".to_string(),
        };
        assert!(!missing.escalates());
        assert!(missing.falls_back());
        assert!(DispatchError::NoCandidateMatch.falls_back());
        assert!(!DispatchError::EscalationUnavailable("offline".to_string()).falls_back());
        assert!(
            !DispatchError::AmbiguousMatch {
                first: 1,
                second: 2
            }
            .falls_back()
        );
    }

    #[test]
    fn execution_error_names_rule() {
        let err = DispatchError::TemplateExecutionError {
            rule_id: 7,
            reason: "no such column: vendor".to_string(),
        };
        assert_eq!(err.rule_id(), Some(7));
        assert!(err.to_string().contains("rule 7"));
    }
}
