use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{error, info, warn};
use uuid::Uuid;

use super::{
    entry::{AiFeedbackSet, EntryDraft, JournalEntry},
    store::EntryStore,
};
use crate::feedback::{FeedbackClient, FeedbackError};

/// Where the controller is in the submit → feedback → store cycle.
///
/// `Submitting` covers the gap between accepting a draft and dispatching its
/// feedback request; `AwaitingFeedback` lasts for the round-trip itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SubmissionState {
    Idle,
    Submitting,
    AwaitingFeedback,
    Attached,
    FeedbackFailed,
}

/// User-facing outcome of a submission. Persona-level failures never show up here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    EntrySaved { entry_id: Uuid, comments: usize },
    SubmissionFailed { reason: String },
}

/// Receives submission outcomes on behalf of the display layer.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Default notifier for headless deployments: outcomes only reach the log.
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notification: Notification) {
        match notification {
            Notification::EntrySaved { entry_id, comments } => {
                info!(%entry_id, comments, "journal entry saved with feedback");
            }
            Notification::SubmissionFailed { reason } => {
                warn!(%reason, "journal entry submission failed");
            }
        }
    }
}

/// Whether the feedback history panel should be shown.
///
/// The current flag is kept unless the selected day holds at least one entry
/// with valid feedback, in which case the panel is forced open.
pub fn derive_visibility(store: &EntryStore, selected_date: NaiveDate, current: bool) -> bool {
    current
        || store
            .filter_by_date(selected_date)
            .iter()
            .any(|entry| entry.has_valid_feedback())
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineSnapshot {
    pub selected_date: NaiveDate,
    pub show_history: bool,
    pub state: SubmissionState,
    pub entries: Vec<JournalEntry>,
}

/// Identifies one submission across its state transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmissionTicket(u64);

/// Sole writer of the [`EntryStore`]; owns the selected date and visibility flag.
///
/// Submissions move through it in phases so no network I/O happens while it
/// is borrowed. Only the most recent submission drives `state`; an older one
/// finishing late still stores its entry and notifies.
pub struct TimelineController {
    store: EntryStore,
    selected_date: NaiveDate,
    show_history: bool,
    state: SubmissionState,
    latest_ticket: u64,
    notifier: Arc<dyn Notifier>,
}

impl TimelineController {
    pub fn new(selected_date: NaiveDate, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            store: EntryStore::new(),
            selected_date,
            show_history: true,
            state: SubmissionState::Idle,
            latest_ticket: 0,
            notifier,
        }
    }

    pub fn state(&self) -> SubmissionState {
        self.state
    }

    pub fn selected_date(&self) -> NaiveDate {
        self.selected_date
    }

    pub fn show_history(&self) -> bool {
        self.show_history
    }

    pub fn store(&self) -> &EntryStore {
        &self.store
    }

    /// Entries on the currently selected day, in store order.
    pub fn visible_entries(&self) -> Vec<&JournalEntry> {
        self.store.filter_by_date(self.selected_date)
    }

    pub fn entries_on(&self, day: NaiveDate) -> Vec<&JournalEntry> {
        self.store.filter_by_date(day)
    }

    pub fn select_date(&mut self, date: NaiveDate) {
        self.selected_date = date;
        self.refresh_visibility();
    }

    /// Manual show/hide. Not sticky: the next date change or arrival re-derives it.
    pub fn set_history_visible(&mut self, show: bool) {
        self.show_history = show;
    }

    pub fn toggle_history(&mut self) -> bool {
        self.show_history = !self.show_history;
        self.show_history
    }

    pub fn snapshot(&self) -> TimelineSnapshot {
        TimelineSnapshot {
            selected_date: self.selected_date,
            show_history: self.show_history,
            state: self.state,
            entries: self.visible_entries().into_iter().cloned().collect(),
        }
    }

    pub fn begin_submission(&mut self, draft: &EntryDraft) -> SubmissionTicket {
        self.latest_ticket += 1;
        self.state = SubmissionState::Submitting;
        info!(
            ticket = self.latest_ticket,
            entry_type = %draft.entry_type(),
            date = %draft.date(),
            "submitting journal entry"
        );
        SubmissionTicket(self.latest_ticket)
    }

    pub fn mark_awaiting(&mut self, ticket: SubmissionTicket) {
        if self.is_latest(ticket) {
            self.state = SubmissionState::AwaitingFeedback;
        }
    }

    /// Applies the round-trip outcome. The entry reaches the store only on
    /// success; a failed round-trip leaves the store untouched.
    pub fn finish_submission(
        &mut self,
        ticket: SubmissionTicket,
        draft: EntryDraft,
        outcome: Result<AiFeedbackSet, FeedbackError>,
    ) -> Result<JournalEntry, FeedbackError> {
        match outcome {
            Ok(feedback) => {
                let entry = draft.commit(feedback);
                let committed = entry.clone();
                self.store.insert(entry);
                self.selected_date = committed.day();
                self.show_history = true;
                self.refresh_visibility();
                if self.is_latest(ticket) {
                    self.state = SubmissionState::Attached;
                }
                self.notifier.notify(Notification::EntrySaved {
                    entry_id: committed.id(),
                    comments: committed.feedback().map_or(0, |set| set.len()),
                });
                Ok(committed)
            }
            Err(err) => Err(self.fail_submission(ticket, err)),
        }
    }

    fn fail_submission(&mut self, ticket: SubmissionTicket, err: FeedbackError) -> FeedbackError {
        if self.is_latest(ticket) {
            self.state = SubmissionState::FeedbackFailed;
        }
        self.notifier.notify(Notification::SubmissionFailed {
            reason: err.to_string(),
        });
        err
    }

    fn is_latest(&self, ticket: SubmissionTicket) -> bool {
        ticket.0 == self.latest_ticket
    }

    fn refresh_visibility(&mut self) {
        self.show_history = derive_visibility(&self.store, self.selected_date, self.show_history);
    }
}

/// The timeline behind its single writer lock.
///
/// The lock is taken once per transition and never held across the feedback
/// round-trip, so readers are not queued behind a slow submission.
#[derive(Clone)]
pub struct SharedTimeline {
    inner: Arc<Mutex<TimelineController>>,
}

impl SharedTimeline {
    pub fn new(controller: TimelineController) -> Self {
        Self {
            inner: Arc::new(Mutex::new(controller)),
        }
    }

    pub async fn lock(&self) -> MutexGuard<'_, TimelineController> {
        self.inner.lock().await
    }

    /// Runs one submission through the feedback round-trip.
    ///
    /// The round-trip runs on its own task, so it reaches a terminal state
    /// even when the caller stops waiting for it.
    pub async fn submit(
        &self,
        client: Arc<dyn FeedbackClient>,
        draft: EntryDraft,
    ) -> Result<JournalEntry, FeedbackError> {
        let ticket = self.inner.lock().await.begin_submission(&draft);

        let inner = Arc::clone(&self.inner);
        let round_trip = tokio::spawn(async move {
            inner.lock().await.mark_awaiting(ticket);
            let outcome = client
                .request_feedback(draft.content(), draft.entry_type())
                .await;
            let mut timeline = inner.lock().await;
            timeline.finish_submission(ticket, draft, outcome)
        });

        match round_trip.await {
            Ok(result) => result,
            Err(join_err) => {
                error!(?join_err, "feedback round-trip task aborted");
                let err = FeedbackError::aggregation(format!("feedback round-trip aborted: {join_err}"));
                Err(self.inner.lock().await.fail_submission(ticket, err))
            }
        }
    }
}
