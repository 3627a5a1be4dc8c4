use std::{env, time::Duration};

use anyhow::{Context, Result, bail};

const DEFAULT_FEEDBACK_MODEL: &str = "openai/gpt-4o-mini";
const DEFAULT_PERSONA_TIMEOUT_SECS: u64 = 60;
const DEFAULT_PERSONA_MAX_ATTEMPTS: usize = 1;
const MAX_PERSONA_ATTEMPTS: usize = 5;
const DEFAULT_PERSONA_RETRY_DELAY_MS: u64 = 2000;

/// Static identity of one simulated professional viewpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Persona {
    pub key: &'static str,
    /// Label attached to every comment this persona produces.
    pub role: &'static str,
    /// Field name used on the wire by the feedback endpoint.
    pub response_field: &'static str,
    /// Framing instruction sent as the system message.
    pub instruction: &'static str,
}

/// Canonical persona order. Feedback sets are always merged in this order.
pub const PERSONAS: &[Persona] = &[
    Persona {
        key: "therapist",
        role: "Therapist",
        response_field: "therapistFeedback",
        instruction: "As a compassionate therapist, provide supportive feedback and emotional insights about this journal entry:",
    },
    Persona {
        key: "coach",
        role: "Life Coach",
        response_field: "coachFeedback",
        instruction: "As a motivational life coach, offer actionable advice and growth opportunities based on this journal entry:",
    },
    Persona {
        key: "expert",
        role: "Mental Health Expert",
        response_field: "expertFeedback",
        instruction: "As a mental health expert, provide professional perspective and well-being strategies related to this journal entry:",
    },
    Persona {
        key: "philosopher",
        role: "Philosopher",
        response_field: "philosopherFeedback",
        instruction: "As a deep-thinking philosopher, provide wisdom and philosophical insights about the meaning and implications of this journal entry:",
    },
    Persona {
        key: "priest",
        role: "Priest",
        response_field: "priestFeedback",
        instruction: "As a spiritual advisor and priest, offer guidance and spiritual perspective on this journal entry with compassion and understanding:",
    },
];

pub fn persona_by_role(role: &str) -> Option<&'static Persona> {
    PERSONAS.iter().find(|persona| persona.role == role)
}

/// Runtime knobs for the feedback pipeline.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FeedbackSettings {
    pub model: String,
    pub persona_timeout: Duration,
    pub max_attempts: usize,
    pub retry_delay: Duration,
}

impl Default for FeedbackSettings {
    fn default() -> Self {
        Self {
            model: DEFAULT_FEEDBACK_MODEL.to_string(),
            persona_timeout: Duration::from_secs(DEFAULT_PERSONA_TIMEOUT_SECS),
            max_attempts: DEFAULT_PERSONA_MAX_ATTEMPTS,
            retry_delay: Duration::from_millis(DEFAULT_PERSONA_RETRY_DELAY_MS),
        }
    }
}

impl FeedbackSettings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let model = lookup("FEEDBACK_MODEL")
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or(defaults.model);

        let persona_timeout = match lookup("PERSONA_TIMEOUT_SECS") {
            Some(raw) => {
                let secs: u64 = raw
                    .trim()
                    .parse()
                    .with_context(|| format!("PERSONA_TIMEOUT_SECS is not a number: {raw}"))?;
                if secs == 0 {
                    bail!("PERSONA_TIMEOUT_SECS must be greater than zero");
                }
                Duration::from_secs(secs)
            }
            None => defaults.persona_timeout,
        };

        let max_attempts = match lookup("PERSONA_MAX_ATTEMPTS") {
            Some(raw) => raw
                .trim()
                .parse::<usize>()
                .with_context(|| format!("PERSONA_MAX_ATTEMPTS is not a number: {raw}"))?
                .clamp(1, MAX_PERSONA_ATTEMPTS),
            None => defaults.max_attempts,
        };

        let retry_delay = match lookup("PERSONA_RETRY_DELAY_MS") {
            Some(raw) => Duration::from_millis(
                raw.trim()
                    .parse()
                    .with_context(|| format!("PERSONA_RETRY_DELAY_MS is not a number: {raw}"))?,
            ),
            None => defaults.retry_delay,
        };

        Ok(Self {
            model,
            persona_timeout,
            max_attempts,
            retry_delay,
        })
    }
}
