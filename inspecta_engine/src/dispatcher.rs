//! Query dispatch: rank rules, extract parameters, execute, format, or escalate.

use std::sync::Arc;
use std::time::Duration;

use inspecta_core::{
    ContextSnapshot, DispatchConfig, DispatchError, DispatchResult, EscalatedAnswer,
    EscalationProvider, IntentRule, RecordStore, RuleAnswer,
};
use tracing::{debug, info, warn};

use crate::extraction::{Extraction, ParameterExtractor};
use crate::format::ResultFormatter;
use crate::matcher::{Matcher, Ranking};
use crate::rules::{RuleSnapshot, RuleStore};
use crate::session::{SessionContext, SessionRegistry, SessionUpdate};
use crate::template::{Execution, TemplateExecutor};

/// A rule chosen for execution, already bound.
struct Selected {
    rule: Arc<IntentRule>,
    score: u32,
    matched_keywords: Vec<String>,
    extraction: Extraction,
    execution: Execution,
}

pub struct Dispatcher {
    rules: Arc<RuleStore>,
    store: Arc<dyn RecordStore>,
    matcher: Matcher,
    executor: TemplateExecutor,
    formatter: ResultFormatter,
    sessions: SessionRegistry,
    escalation: Option<Arc<dyn EscalationProvider>>,
    config: DispatchConfig,
}

impl Dispatcher {
    #[must_use]
    pub fn new(rules: Arc<RuleStore>, store: Arc<dyn RecordStore>, config: DispatchConfig) -> Self {
        Self {
            matcher: Matcher::new(&config),
            executor: TemplateExecutor::new(Arc::clone(&store), &config),
            formatter: ResultFormatter::from_config(&config),
            sessions: SessionRegistry::new(config.context_history),
            rules,
            store,
            escalation: None,
            config,
        }
    }

    #[must_use]
    pub fn with_escalation(mut self, escalation: Arc<dyn EscalationProvider>) -> Self {
        self.escalation = Some(escalation);
        self
    }

    /// Override the per-execution timeout.
    #[must_use]
    pub fn with_execution_timeout(mut self, timeout: Duration) -> Self {
        self.executor = self.executor.with_timeout(timeout);
        self
    }

    #[must_use]
    pub const fn rules(&self) -> &Arc<RuleStore> {
        &self.rules
    }

    #[must_use]
    pub const fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    #[must_use]
    pub const fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Answer a free-text query.
    ///
    /// The session, when given, supplies follow-up context and escalation
    /// history; its lock is never held across execution or escalation.
    pub async fn query(&self, text: &str, session_id: Option<&str>) -> DispatchResult {
        let snapshot = self.rules.snapshot();
        let session = match session_id {
            Some(id) => Some(self.sessions.snapshot(id).await),
            None => None,
        };

        debug!("Dispatching {text:?} against rule snapshot v{}", snapshot.version);
        let ranking = self.matcher.rank(text, &snapshot.rules);

        let result = match self.select(text, &ranking, &snapshot, session.as_ref()) {
            Ok(selected) => self.answer(selected).await,
            Err(reason) if reason.falls_back() => {
                self.escalate(text, &reason, session.as_ref()).await
            }
            Err(reason) => DispatchResult::Failed(reason),
        };

        if let Some(id) = session_id {
            let answered_by = result
                .answer()
                .map(|a| (a.rule_id, a.parameters.clone()));
            self.sessions
                .record(
                    id,
                    SessionUpdate {
                        query: text.to_string(),
                        answered_by,
                    },
                )
                .await;
        }

        result
    }

    /// Pick the first candidate above the threshold whose parameters resolve
    /// and bind. Falls back to the session's last rule for follow-ups.
    fn select(
        &self,
        text: &str,
        ranking: &Ranking,
        snapshot: &RuleSnapshot,
        session: Option<&SessionContext>,
    ) -> Result<Selected, DispatchError> {
        let threshold = self.config.min_confidence;

        let Some(best) = ranking.best() else {
            return self
                .follow_up(text, snapshot, session)
                .ok_or(DispatchError::NoCandidateMatch);
        };

        if best.score < threshold {
            debug!(
                "Best rule {} scored {} below threshold {threshold}",
                best.rule_id(),
                best.score
            );
            return self
                .follow_up(text, snapshot, session)
                .ok_or(DispatchError::LowConfidenceMatch {
                    rule_id: best.rule_id(),
                    score: best.score,
                    threshold,
                });
        }

        let mut last_error = DispatchError::NoCandidateMatch;
        for candidate in ranking.candidates.iter().filter(|c| c.score >= threshold) {
            let bound = ParameterExtractor::extract(&candidate.rule, text).and_then(|extraction| {
                self.executor
                    .bind(&candidate.rule, extraction.clone())
                    .map(|execution| (extraction, execution))
            });
            match bound {
                Ok((extraction, execution)) => {
                    return Ok(Selected {
                        rule: Arc::clone(&candidate.rule),
                        score: candidate.score,
                        matched_keywords: candidate.matched_keywords.clone(),
                        extraction,
                        execution,
                    });
                }
                Err(e @ DispatchError::MissingParameter { .. }) => {
                    debug!("Candidate {} skipped: {e}", candidate.rule_id());
                    last_error = e;
                }
                Err(e) => return Err(e),
            }
        }

        info!("Every candidate above the threshold failed parameter extraction");
        Err(last_error)
    }

    /// Re-run the session's last rule when the query only changes its values.
    fn follow_up(
        &self,
        text: &str,
        snapshot: &RuleSnapshot,
        session: Option<&SessionContext>,
    ) -> Option<Selected> {
        let session = session?;
        let rule = snapshot.get(session.last_rule_id?)?;
        let extraction =
            ParameterExtractor::extract_follow_up(rule, text, &session.last_parameters)?;
        let execution = self.executor.bind(rule, extraction.clone()).ok()?;

        info!("Treating {text:?} as a follow-up to rule {}", rule.id);
        Some(Selected {
            rule: Arc::clone(rule),
            score: 0,
            matched_keywords: Vec::new(),
            extraction,
            execution,
        })
    }

    async fn answer(&self, selected: Selected) -> DispatchResult {
        let Selected {
            rule,
            score,
            matched_keywords,
            extraction,
            execution,
        } = selected;

        let result = match self.executor.execute(execution).await.into_result() {
            Ok(result) => result,
            Err(e) => return DispatchResult::Failed(e),
        };

        let formatted = self.formatter.format(&rule.name, rule.category, &result);
        info!(
            "Rule {} ({}) answered with {} rows, score {score}",
            rule.id, rule.name, result.row_count
        );

        DispatchResult::Answered(RuleAnswer {
            rule_id: rule.id,
            rule_name: rule.name.clone(),
            category: rule.category,
            score,
            matched_keywords,
            parameters: extraction.values,
            table: formatted.table,
            cards: formatted.cards,
            narrative: formatted.narrative,
        })
    }

    async fn context_snapshot(&self, session: Option<&SessionContext>) -> ContextSnapshot {
        let family_counts = self.store.family_counts().await.unwrap_or_else(|e| {
            warn!("Could not count record families for escalation context: {e:#}");
            std::collections::BTreeMap::new()
        });

        let recent_queries = session
            .map(|s| {
                let skip = s.recent_queries.len().saturating_sub(self.config.context_history);
                s.recent_queries.iter().skip(skip).cloned().collect()
            })
            .unwrap_or_default();

        ContextSnapshot {
            family_counts,
            recent_queries,
        }
    }

    async fn escalate(
        &self,
        text: &str,
        reason: &DispatchError,
        session: Option<&SessionContext>,
    ) -> DispatchResult {
        let Some(provider) = &self.escalation else {
            info!("Cannot escalate ({reason}): no provider configured");
            return DispatchResult::Failed(DispatchError::EscalationUnavailable(
                "no escalation provider configured".to_string(),
            ));
        };

        info!("Escalating query: {reason}");
        let context = match serde_json::to_value(self.context_snapshot(session).await) {
            Ok(context) => context,
            Err(e) => {
                return DispatchResult::Failed(DispatchError::EscalationUnavailable(e.to_string()));
            }
        };

        let timeout = Duration::from_millis(self.config.escalation_timeout_ms);
        match tokio::time::timeout(timeout, provider.generate(text, &context)).await {
            Ok(Ok(answer)) => DispatchResult::Escalated(EscalatedAnswer::new(answer)),
            Ok(Err(e)) => {
                warn!("Escalation failed: {e:#}");
                DispatchResult::Failed(DispatchError::EscalationUnavailable(format!("{e:#}")))
            }
            Err(_) => {
                warn!("Escalation timed out after {timeout:?}");
                DispatchResult::Failed(DispatchError::EscalationUnavailable(format!(
                    "timed out after {} ms",
                    timeout.as_millis()
                )))
            }
        }
    }
}
