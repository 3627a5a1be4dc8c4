use std::{env, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use chrono::Local;
use tracing::info;

use crate::{
    config::FeedbackSettings,
    feedback::{
        FeedbackAggregator, FeedbackClient, FeedbackService, HttpFeedbackClient, llm_generators,
    },
    journal::{LogNotifier, SharedTimeline, TimelineController},
    llm::LlmClient,
};

/// Slack on top of the persona timeout before a remote round-trip is abandoned.
const REMOTE_FEEDBACK_GRACE: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct AppState {
    feedback: Arc<FeedbackService>,
    timeline_client: Arc<dyn FeedbackClient>,
    timeline: SharedTimeline,
}

impl AppState {
    pub fn new() -> Result<Self> {
        let settings = FeedbackSettings::from_env().context("failed to load feedback settings")?;
        let llm_client = LlmClient::from_env().context("failed to initialize LLM client")?;

        let aggregator = FeedbackAggregator::new(
            llm_generators(&llm_client, &settings),
            settings.persona_timeout,
        );
        let feedback = Arc::new(FeedbackService::new(aggregator));
        info!(
            model = %settings.model,
            personas = feedback.aggregator().personas().count(),
            timeout_secs = settings.persona_timeout.as_secs(),
            max_attempts = settings.max_attempts,
            "feedback service configured"
        );

        let timeline_client: Arc<dyn FeedbackClient> = match env::var("FEEDBACK_SERVICE_URL") {
            Ok(url) if !url.trim().is_empty() => {
                info!(endpoint = %url.trim(), "timeline will use remote feedback service");
                Arc::new(
                    HttpFeedbackClient::new(
                        url.trim(),
                        settings.persona_timeout + REMOTE_FEEDBACK_GRACE,
                    )
                    .context("failed to initialize remote feedback client")?,
                )
            }
            _ => feedback.clone(),
        };

        Ok(Self::from_parts(feedback, timeline_client))
    }

    pub fn from_parts(
        feedback: Arc<FeedbackService>,
        timeline_client: Arc<dyn FeedbackClient>,
    ) -> Self {
        let timeline = TimelineController::new(Local::now().date_naive(), Arc::new(LogNotifier));

        Self {
            feedback,
            timeline_client,
            timeline: SharedTimeline::new(timeline),
        }
    }

    pub fn feedback_service(&self) -> &FeedbackService {
        &self.feedback
    }

    pub fn timeline_client(&self) -> Arc<dyn FeedbackClient> {
        Arc::clone(&self.timeline_client)
    }

    pub fn timeline(&self) -> &SharedTimeline {
        &self.timeline
    }
}
