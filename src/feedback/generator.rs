use std::{sync::Arc, time::Duration};

use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::{
    config::{FeedbackSettings, PERSONAS, Persona},
    journal::EntryType,
    llm::{ChatMessage, LlmClient, LlmRequest, MessageRole},
};

/// Produces one persona's feedback for an entry.
#[async_trait]
pub trait PerspectiveGenerator: Send + Sync {
    fn persona(&self) -> &'static Persona;

    async fn generate(&self, content: &str, entry_type: EntryType) -> Result<String>;
}

/// Generator backed by the chat-completions client.
pub struct LlmPerspectiveGenerator {
    persona: &'static Persona,
    llm: LlmClient,
    model: String,
    max_attempts: usize,
    retry_delay: Duration,
}

impl LlmPerspectiveGenerator {
    pub fn new(persona: &'static Persona, llm: LlmClient, settings: &FeedbackSettings) -> Self {
        Self {
            persona,
            llm,
            model: settings.model.clone(),
            max_attempts: settings.max_attempts.max(1),
            retry_delay: settings.retry_delay,
        }
    }

    async fn call_llm(&self, content: &str, entry_type: EntryType) -> Result<String> {
        let request = LlmRequest::new(
            self.model.clone(),
            vec![
                ChatMessage::new(MessageRole::System, system_prompt(self.persona, entry_type)),
                ChatMessage::new(MessageRole::User, content),
            ],
        );

        let response = self.llm.execute(request).await?;
        debug!(
            persona = self.persona.key,
            provider = %response.provider,
            model = %response.model,
            total_tokens = response.token_usage.total_tokens,
            "persona feedback generated"
        );

        let text = response.text.trim();
        if text.is_empty() {
            bail!("{} returned an empty completion", response.provider);
        }
        Ok(text.to_string())
    }
}

#[async_trait]
impl PerspectiveGenerator for LlmPerspectiveGenerator {
    fn persona(&self) -> &'static Persona {
        self.persona
    }

    async fn generate(&self, content: &str, entry_type: EntryType) -> Result<String> {
        let mut last_error = None;
        for attempt in 0..self.max_attempts {
            match self.call_llm(content, entry_type).await {
                Ok(text) => return Ok(text),
                Err(err) => {
                    if attempt + 1 < self.max_attempts {
                        warn!(persona = self.persona.key, attempt, ?err, "persona call failed, retrying");
                        sleep(self.retry_delay).await;
                    }
                    last_error = Some(err);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| anyhow!("no attempts were made")))
    }
}

/// The system message: persona framing plus the kind of entry being read.
pub fn system_prompt(persona: &Persona, entry_type: EntryType) -> String {
    format!(
        "{}\n\nThe writer filed this entry under \"{}\".",
        persona.instruction, entry_type
    )
}

/// One LLM-backed generator per configured persona, in canonical order.
pub fn llm_generators(
    llm: &LlmClient,
    settings: &FeedbackSettings,
) -> Vec<Arc<dyn PerspectiveGenerator>> {
    PERSONAS
        .iter()
        .map(|persona| {
            Arc::new(LlmPerspectiveGenerator::new(persona, llm.clone(), settings))
                as Arc<dyn PerspectiveGenerator>
        })
        .collect()
}
