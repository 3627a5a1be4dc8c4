use std::{fmt, str::FromStr};

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::feedback::FeedbackError;

/// Closed set of entry kinds a user can record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    Incident,
    #[default]
    Feeling,
    Comment,
    Plan,
}

impl EntryType {
    pub const ALL: [EntryType; 4] = [
        EntryType::Incident,
        EntryType::Feeling,
        EntryType::Comment,
        EntryType::Plan,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntryType::Incident => "incident",
            EntryType::Feeling => "feeling",
            EntryType::Comment => "comment",
            EntryType::Plan => "plan",
        }
    }
}

impl fmt::Display for EntryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unrecognized entry type: {0:?}")]
pub struct UnknownEntryType(pub String);

impl FromStr for EntryType {
    type Err = UnknownEntryType;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        EntryType::ALL
            .into_iter()
            .find(|kind| kind.as_str() == raw)
            .ok_or_else(|| UnknownEntryType(raw.to_string()))
    }
}

/// Opaque handle to an uploaded image. The bytes live with the upload service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttachmentRef(String);

impl AttachmentRef {
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// One persona's comment on an entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerspectiveComment {
    pub role: String,
    pub content: String,
}

impl PerspectiveComment {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }

    pub fn is_valid(&self) -> bool {
        !self.role.trim().is_empty() && !self.content.trim().is_empty()
    }
}

/// Ordered persona comments attached to an entry.
///
/// A set may be constructed with missing members (e.g. when read back from an
/// older client); readers must go through [`AiFeedbackSet::is_valid`] before
/// treating it as feedback.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AiFeedbackSet(Vec<PerspectiveComment>);

impl AiFeedbackSet {
    pub fn new(comments: Vec<PerspectiveComment>) -> Self {
        Self(comments)
    }

    pub(crate) fn push(&mut self, comment: PerspectiveComment) {
        self.0.push(comment);
    }

    pub fn comments(&self) -> &[PerspectiveComment] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn roles(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|comment| comment.role.as_str())
    }

    /// Non-empty and every comment carries both a role and content.
    pub fn is_valid(&self) -> bool {
        !self.0.is_empty() && self.0.iter().all(PerspectiveComment::is_valid)
    }
}

/// A submission that has not yet been through the feedback round-trip.
///
/// Drafts are the only way to build a [`JournalEntry`], and committing one
/// consumes it, so feedback is attached exactly once.
#[derive(Debug, Clone)]
pub struct EntryDraft {
    content: String,
    entry_type: EntryType,
    date: NaiveDateTime,
    attachment: Option<AttachmentRef>,
}

impl EntryDraft {
    pub fn new(
        content: impl Into<String>,
        entry_type: EntryType,
        date: NaiveDateTime,
    ) -> Result<Self, FeedbackError> {
        let content = content.into();
        if content.trim().is_empty() {
            return Err(FeedbackError::validation("entry content must not be empty"));
        }

        Ok(Self {
            content,
            entry_type,
            date,
            attachment: None,
        })
    }

    pub fn with_attachment(mut self, attachment: AttachmentRef) -> Self {
        self.attachment = Some(attachment);
        self
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn entry_type(&self) -> EntryType {
        self.entry_type
    }

    pub fn date(&self) -> NaiveDateTime {
        self.date
    }

    pub fn commit(self, feedback: AiFeedbackSet) -> JournalEntry {
        JournalEntry {
            id: Uuid::new_v4(),
            content: self.content,
            entry_type: self.entry_type,
            date: self.date,
            attachment: self.attachment,
            feedback: Some(feedback),
            created_at: Utc::now(),
        }
    }
}

/// A committed journal entry. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalEntry {
    id: Uuid,
    content: String,
    #[serde(rename = "type")]
    entry_type: EntryType,
    date: NaiveDateTime,
    #[serde(skip_serializing_if = "Option::is_none")]
    attachment: Option<AttachmentRef>,
    #[serde(skip_serializing_if = "Option::is_none")]
    feedback: Option<AiFeedbackSet>,
    created_at: DateTime<Utc>,
}

impl JournalEntry {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn entry_type(&self) -> EntryType {
        self.entry_type
    }

    pub fn date(&self) -> NaiveDateTime {
        self.date
    }

    pub fn day(&self) -> NaiveDate {
        self.date.date()
    }

    pub fn attachment(&self) -> Option<&AttachmentRef> {
        self.attachment.as_ref()
    }

    pub fn feedback(&self) -> Option<&AiFeedbackSet> {
        self.feedback.as_ref()
    }

    pub fn has_valid_feedback(&self) -> bool {
        self.feedback.as_ref().is_some_and(AiFeedbackSet::is_valid)
    }
}

/// Accepts `YYYY-MM-DD`, a naive `YYYY-MM-DDTHH:MM[:SS[.f]]` or an RFC 3339 timestamp.
/// Offsets are dropped in favour of the wall-clock time the user picked.
pub fn parse_entry_date(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();

    if let Ok(stamp) = DateTime::parse_from_rfc3339(raw) {
        return Some(stamp.naive_local());
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(stamp) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(stamp);
        }
    }

    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|day| day.and_hms_opt(0, 0, 0))
}
