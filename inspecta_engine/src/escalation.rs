//! Adapter from a chat-completions provider to the escalation seam.

use async_trait::async_trait;
use inspecta_core::{ChatMessage, EscalationProvider, LLMProvider, Role};
use tracing::info;

const SYSTEM_PROMPT: &str = "你是制造业来料检验数据平台的助手。规则引擎无法回答下面的问题，\
请结合给出的数据概况简洁作答；无法确定时请说明需要哪些信息。\n\
You assist a manufacturing inspection data platform. The rule engine could not \
answer the question below; answer concisely from the data overview, or say what \
information is missing.";

/// Escalates through any [`LLMProvider`] with a fixed system prompt and the
/// serialized context snapshot.
pub struct LlmEscalation<P: LLMProvider> {
    provider: P,
    model: String,
}

impl<P: LLMProvider> LlmEscalation<P> {
    /// Use `model`, or the provider's default when empty.
    pub fn new(provider: P, model: impl Into<String>) -> Self {
        let model = model.into();
        let model = if model.is_empty() {
            provider.get_default_model().to_string()
        } else {
            model
        };
        Self { provider, model }
    }

    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }
}

/// Chat messages for one escalation: system prompt with context, then the query.
pub fn build_messages(
    prompt: &str,
    context: &serde_json::Value,
) -> anyhow::Result<Vec<ChatMessage>> {
    let context = serde_json::to_string_pretty(context)?;
    Ok(vec![
        ChatMessage {
            role: Role::System,
            content: format!("{SYSTEM_PROMPT}\n\n数据概况 / data overview:\n{context}"),
        },
        ChatMessage {
            role: Role::User,
            content: prompt.to_string(),
        },
    ])
}

#[async_trait]
impl<P: LLMProvider> EscalationProvider for LlmEscalation<P> {
    async fn generate(&self, prompt: &str, context: &serde_json::Value) -> anyhow::Result<String> {
        let messages = build_messages(prompt, context)?;
        let response = self.provider.chat(&messages, &self.model).await?;
        if let Some(usage) = &response.usage {
            info!(
                "Escalation used {} tokens ({} prompt, {} completion)",
                usage.total_tokens, usage.prompt_tokens, usage.completion_tokens
            );
        }
        Ok(response.content)
    }
}
