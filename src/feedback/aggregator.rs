use std::{sync::Arc, time::Duration};

use tokio::time::timeout;
use tracing::{info, warn};

use super::{
    error::{PersonaFailure, PersonaFailureKind},
    generator::PerspectiveGenerator,
};
use crate::{
    config::Persona,
    journal::{AiFeedbackSet, EntryType, PerspectiveComment},
};

/// Fans an entry out to every persona and merges whatever comes back.
pub struct FeedbackAggregator {
    generators: Vec<Arc<dyn PerspectiveGenerator>>,
    persona_timeout: Duration,
}

impl FeedbackAggregator {
    pub fn new(generators: Vec<Arc<dyn PerspectiveGenerator>>, persona_timeout: Duration) -> Self {
        Self {
            generators,
            persona_timeout,
        }
    }

    pub fn personas(&self) -> impl Iterator<Item = &'static Persona> + '_ {
        self.generators.iter().map(|generator| generator.persona())
    }

    /// Comments from every persona that succeeded, in configuration order.
    /// Failed personas are dropped; an empty set means all of them failed.
    pub async fn aggregate(&self, content: &str, entry_type: EntryType) -> AiFeedbackSet {
        let mut feedback = AiFeedbackSet::default();
        let mut failures = 0usize;

        for outcome in self.settle(content, entry_type).await {
            match outcome {
                Ok(comment) => feedback.push(comment),
                Err(failure) => {
                    failures += 1;
                    warn!(persona = failure.role, error = %failure.kind, "persona feedback dropped");
                }
            }
        }

        info!(
            succeeded = feedback.len(),
            failed = failures,
            %entry_type,
            "feedback aggregation settled"
        );
        feedback
    }

    /// Dispatches every generator, then waits for all of them to settle.
    ///
    /// Each generator runs in its own task, so a slow or failing persona never
    /// holds back its siblings, and a task keeps running to completion even if
    /// this future is dropped. Handles are awaited in configuration order,
    /// which fixes the output order regardless of completion order.
    async fn settle(
        &self,
        content: &str,
        entry_type: EntryType,
    ) -> Vec<Result<PerspectiveComment, PersonaFailure>> {
        let content: Arc<str> = Arc::from(content);
        let mut handles = Vec::with_capacity(self.generators.len());

        for generator in &self.generators {
            let generator = Arc::clone(generator);
            let content = Arc::clone(&content);
            let limit = self.persona_timeout;

            handles.push(tokio::spawn(async move {
                match timeout(limit, generator.generate(&content, entry_type)).await {
                    Ok(Ok(text)) if !text.trim().is_empty() => Ok(text),
                    Ok(Ok(_)) => Err(PersonaFailureKind::EmptyResponse),
                    Ok(Err(err)) => Err(PersonaFailureKind::Upstream(format!("{err:#}"))),
                    Err(_) => Err(PersonaFailureKind::TimedOut(limit)),
                }
            }));
        }

        let mut outcomes = Vec::with_capacity(handles.len());
        for (generator, handle) in self.generators.iter().zip(handles) {
            let persona = generator.persona();
            let outcome = match handle.await {
                Ok(Ok(text)) => Ok(PerspectiveComment::new(persona.role, text)),
                Ok(Err(kind)) => Err(PersonaFailure {
                    role: persona.role,
                    kind,
                }),
                Err(join_err) => Err(PersonaFailure {
                    role: persona.role,
                    kind: PersonaFailureKind::Aborted(join_err.to_string()),
                }),
            };
            outcomes.push(outcome);
        }

        outcomes
    }
}
