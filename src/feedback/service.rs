use serde::{Deserialize, Serialize};
use tracing::error;

use super::{aggregator::FeedbackAggregator, error::FeedbackError};
use crate::{
    config::{PERSONAS, persona_by_role},
    journal::{AiFeedbackSet, EntryType, PerspectiveComment},
};

/// Wire request: `{content, type}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FeedbackRequest {
    #[serde(default)]
    pub content: String,
    #[serde(rename = "type", default)]
    pub entry_type: String,
}

/// Wire response: one optional field per persona.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedbackResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub therapist_feedback: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coach_feedback: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expert_feedback: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub philosopher_feedback: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priest_feedback: Option<String>,
}

impl FeedbackResponse {
    fn slot(&self, persona_key: &str) -> Option<&Option<String>> {
        match persona_key {
            "therapist" => Some(&self.therapist_feedback),
            "coach" => Some(&self.coach_feedback),
            "expert" => Some(&self.expert_feedback),
            "philosopher" => Some(&self.philosopher_feedback),
            "priest" => Some(&self.priest_feedback),
            _ => None,
        }
    }

    fn slot_mut(&mut self, persona_key: &str) -> Option<&mut Option<String>> {
        match persona_key {
            "therapist" => Some(&mut self.therapist_feedback),
            "coach" => Some(&mut self.coach_feedback),
            "expert" => Some(&mut self.expert_feedback),
            "philosopher" => Some(&mut self.philosopher_feedback),
            "priest" => Some(&mut self.priest_feedback),
            _ => None,
        }
    }

    pub fn from_feedback_set(feedback: &AiFeedbackSet) -> Self {
        let mut response = Self::default();
        for comment in feedback.comments() {
            let Some(persona) = persona_by_role(&comment.role) else {
                continue;
            };
            if let Some(slot) = response.slot_mut(persona.key) {
                *slot = Some(comment.content.clone());
            }
        }
        response
    }

    /// Rebuilds the ordered set by walking personas in canonical order,
    /// skipping absent or blank fields.
    pub fn into_feedback_set(self) -> AiFeedbackSet {
        AiFeedbackSet::new(
            PERSONAS
                .iter()
                .filter_map(|persona| {
                    let text = self.slot(persona.key)?.as_deref()?;
                    (!text.trim().is_empty()).then(|| PerspectiveComment::new(persona.role, text))
                })
                .collect(),
        )
    }
}

/// Boundary around the aggregator: validates input, rejects total failure.
pub struct FeedbackService {
    aggregator: FeedbackAggregator,
}

impl FeedbackService {
    pub fn new(aggregator: FeedbackAggregator) -> Self {
        Self { aggregator }
    }

    pub fn aggregator(&self) -> &FeedbackAggregator {
        &self.aggregator
    }

    pub async fn generate(
        &self,
        content: &str,
        entry_type: EntryType,
    ) -> Result<AiFeedbackSet, FeedbackError> {
        if content.trim().is_empty() {
            return Err(FeedbackError::validation("content must not be empty"));
        }

        let feedback = self.aggregator.aggregate(content, entry_type).await;

        if feedback.is_empty() {
            error!(%entry_type, "every persona failed to produce feedback");
            return Err(FeedbackError::aggregation(
                "no persona produced feedback for this entry",
            ));
        }
        if !feedback.is_valid() {
            error!(%entry_type, "aggregated feedback set failed validation");
            return Err(FeedbackError::aggregation("aggregated feedback was malformed"));
        }

        Ok(feedback)
    }

    /// Full wire operation: `{content, type}` in, persona fields out.
    pub async fn handle(&self, request: FeedbackRequest) -> Result<FeedbackResponse, FeedbackError> {
        let entry_type = request
            .entry_type
            .parse::<EntryType>()
            .map_err(|err| FeedbackError::validation(err.to_string()))?;

        let feedback = self.generate(&request.content, entry_type).await?;
        Ok(FeedbackResponse::from_feedback_set(&feedback))
    }
}
