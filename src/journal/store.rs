use chrono::{NaiveDate, NaiveDateTime};

use super::entry::JournalEntry;

/// Append-only, date-ordered collection of committed entries.
#[derive(Debug, Default)]
pub struct EntryStore {
    entries: Vec<JournalEntry>,
}

impl EntryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends and re-sorts by `date`. `sort_by_key` is stable, so entries
    /// sharing a timestamp keep their insertion order.
    pub fn insert(&mut self, entry: JournalEntry) {
        self.entries.push(entry);
        self.entries.sort_by_key(JournalEntry::date);
    }

    /// Entries whose date falls on the same calendar day as `day`.
    pub fn filter_by_date(&self, day: NaiveDate) -> Vec<&JournalEntry> {
        self.entries
            .iter()
            .filter(|entry| same_calendar_day(entry.date(), day))
            .collect()
    }

    pub fn entries(&self) -> &[JournalEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub fn same_calendar_day(stamp: NaiveDateTime, day: NaiveDate) -> bool {
    stamp.date() == day
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::{
        AiFeedbackSet, EntryDraft, EntryType, PerspectiveComment, entry::parse_entry_date,
    };

    fn entry(content: &str, date: &str) -> JournalEntry {
        EntryDraft::new(content, EntryType::Comment, parse_entry_date(date).unwrap())
            .unwrap()
            .commit(AiFeedbackSet::new(vec![PerspectiveComment::new(
                "Therapist",
                "noted",
            )]))
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn filter_ignores_time_of_day() {
        let mut store = EntryStore::new();
        store.insert(entry("late", "2024-01-05T23:59"));
        store.insert(entry("early", "2024-01-05T00:01"));
        store.insert(entry("next day", "2024-01-06T00:00"));
        store.insert(entry("day before", "2024-01-04T23:59"));

        let matched: Vec<_> = store
            .filter_by_date(day(2024, 1, 5))
            .into_iter()
            .map(JournalEntry::content)
            .collect();
        assert_eq!(matched, vec!["early", "late"]);
        assert!(store.filter_by_date(day(2023, 1, 5)).is_empty());
    }

    #[test]
    fn insert_keeps_non_decreasing_order() {
        let mut store = EntryStore::new();
        for date in [
            "2024-02-10T08:00",
            "2023-12-31T22:00",
            "2024-02-01",
            "2024-03-15T12:30",
            "2024-01-01T00:00",
        ] {
            store.insert(entry(date, date));
        }

        assert_eq!(store.len(), 5);
        assert!(
            store
                .entries()
                .windows(2)
                .all(|pair| pair[0].date() <= pair[1].date())
        );
        assert_eq!(store.entries()[0].content(), "2023-12-31T22:00");
    }

    #[test]
    fn equal_dates_keep_insertion_order() {
        let mut store = EntryStore::new();
        store.insert(entry("first", "2024-01-05T10:00"));
        store.insert(entry("earlier day", "2024-01-04T10:00"));
        store.insert(entry("second", "2024-01-05T10:00"));
        store.insert(entry("third", "2024-01-05T10:00"));

        let order: Vec<_> = store.entries().iter().map(JournalEntry::content).collect();
        assert_eq!(order, vec!["earlier day", "first", "second", "third"]);
    }

    #[test]
    fn insert_does_not_touch_existing_entries() {
        let mut store = EntryStore::new();
        let original = entry("keep me", "2024-01-05T10:00");
        store.insert(original.clone());
        store.insert(entry("another", "2024-01-01T10:00"));

        assert!(store.entries().contains(&original));
        assert!(!store.is_empty());
    }
}
