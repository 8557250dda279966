//! The message list: flattened thread results, selection and marks.

use std::collections::BTreeSet;

use crate::model::{Message, MessageId, Thread};

/// Position of a message inside the thread list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct MessageIndex {
    thread: usize,
    message: usize,
}

/// Flattened view over the threads of the current search.
///
/// Rows list the messages of each thread newest first. Marks are kept by row
/// and are cleared whenever a new result is loaded.
#[derive(Debug, Default)]
pub struct Messages {
    threads: Vec<Thread>,
    index: Vec<MessageIndex>,
    selected: usize,
    marked: BTreeSet<usize>,
}

impl Messages {
    /// Creates an empty message list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the current result, clearing all marks.
    pub fn set_threads(&mut self, threads: Vec<Thread>) {
        self.clear_marks();
        self.index = threads
            .iter()
            .enumerate()
            .flat_map(|(thread, t)| {
                let count = t.messages.len();
                (0..count).map(move |i| MessageIndex {
                    thread,
                    message: count - i - 1,
                })
            })
            .collect();
        self.threads = threads;
        self.selected = self.selected.min(self.count().saturating_sub(1));
    }

    /// Returns the threads of the current result.
    #[must_use]
    pub fn threads(&self) -> &[Thread] {
        &self.threads
    }

    /// Returns the number of rows.
    #[must_use]
    pub fn count(&self) -> usize {
        self.index.len()
    }

    /// Returns the selected row.
    #[must_use]
    pub const fn selected_row(&self) -> usize {
        self.selected
    }

    /// Selects a row. Returns false if the row is out of bounds.
    pub fn select(&mut self, row: usize) -> bool {
        if row >= self.count() {
            return false;
        }
        self.selected = row;
        true
    }

    /// Moves the selection by `delta` rows, clamped to the list.
    pub fn move_selection(&mut self, delta: isize) {
        if self.count() == 0 {
            return;
        }
        let last = self.count() - 1;
        self.selected = self.selected.saturating_add_signed(delta).min(last);
    }

    /// Returns true if the row is marked.
    #[must_use]
    pub fn is_marked(&self, row: usize) -> bool {
        self.marked.contains(&row)
    }

    /// Toggles the mark on a row. Out of bounds rows are ignored.
    pub fn toggle_mark(&mut self, row: usize) {
        if row >= self.count() {
            return;
        }
        if !self.marked.remove(&row) {
            self.marked.insert(row);
        }
    }

    /// Marks every unmarked row and unmarks every marked one.
    pub fn invert_marks(&mut self) {
        self.marked = (0..self.count())
            .filter(|row| !self.marked.contains(row))
            .collect();
    }

    /// Removes all marks.
    pub fn clear_marks(&mut self) {
        self.marked.clear();
    }

    /// Returns the number of marked rows.
    #[must_use]
    pub fn marked_count(&self) -> usize {
        self.marked.len()
    }

    /// Returns the message at a row.
    #[must_use]
    pub fn get(&self, row: usize) -> Option<&Message> {
        let idx = self.index.get(row)?;
        self.threads.get(idx.thread)?.messages.get(idx.message)
    }

    /// Returns all messages in row order.
    #[must_use]
    pub fn all(&self) -> Vec<&Message> {
        (0..self.count()).filter_map(|row| self.get(row)).collect()
    }

    /// Returns the marked messages in row order.
    #[must_use]
    pub fn marked(&self) -> Vec<&Message> {
        self.marked.iter().filter_map(|&row| self.get(row)).collect()
    }

    /// Returns the selected message, if any.
    #[must_use]
    pub fn selected(&self) -> Option<&Message> {
        self.get(self.selected)
    }

    /// Applies tag operations to the listed copies of the given messages,
    /// so the list reflects a tagging without searching again.
    pub fn apply_tags(&mut self, ids: &[MessageId], operations: &[String]) {
        for thread in &mut self.threads {
            for message in thread.messages.iter_mut().filter(|m| ids.contains(&m.id)) {
                message.apply_tags(operations);
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn thread(id: &str, message_ids: &[&str]) -> Thread {
        Thread {
            id: id.to_string(),
            messages: message_ids
                .iter()
                .map(|m| Message::new(*m, id, format!("/mail/{m}")))
                .collect(),
            ..Thread::default()
        }
    }

    fn sample() -> Messages {
        let mut messages = Messages::new();
        messages.set_threads(vec![thread("t1", &["a1", "a2"]), thread("t2", &["b1"])]);
        messages
    }

    #[test]
    fn test_rows_newest_first_within_thread() {
        let messages = sample();
        let ids: Vec<_> = messages.all().iter().map(|m| m.id.0.clone()).collect();
        assert_eq!(ids, ["a2", "a1", "b1"]);
    }

    #[test]
    fn test_select_bounds() {
        let mut messages = sample();
        assert!(messages.select(2));
        assert_eq!(messages.selected().unwrap().id.as_str(), "b1");
        assert!(!messages.select(3));
        assert_eq!(messages.selected_row(), 2);
    }

    #[test]
    fn test_toggle_and_marked_order() {
        let mut messages = sample();
        messages.toggle_mark(2);
        messages.toggle_mark(0);
        let ids: Vec<_> = messages.marked().iter().map(|m| m.id.0.clone()).collect();
        assert_eq!(ids, ["a2", "b1"]);

        messages.toggle_mark(0);
        assert_eq!(messages.marked_count(), 1);
        messages.toggle_mark(10);
        assert_eq!(messages.marked_count(), 1);
    }

    #[test]
    fn test_invert_and_clear() {
        let mut messages = sample();
        messages.toggle_mark(1);
        messages.invert_marks();
        assert!(messages.is_marked(0));
        assert!(!messages.is_marked(1));
        assert!(messages.is_marked(2));

        messages.clear_marks();
        assert_eq!(messages.marked_count(), 0);
    }

    #[test]
    fn test_set_threads_clears_marks_and_clamps_selection() {
        let mut messages = sample();
        messages.select(2);
        messages.toggle_mark(1);
        messages.set_threads(vec![thread("t3", &["c1"])]);
        assert_eq!(messages.marked_count(), 0);
        assert_eq!(messages.selected_row(), 0);
    }

    #[test]
    fn test_apply_tags_updates_listing() {
        let mut messages = sample();
        messages.apply_tags(&[MessageId::from("b1")], &["+todo".to_string()]);
        assert!(messages.get(2).unwrap().has_tag("todo"));
        assert!(!messages.get(0).unwrap().has_tag("todo"));
    }

    #[test]
    fn test_empty_list() {
        let mut messages = Messages::new();
        assert!(messages.selected().is_none());
        messages.move_selection(1);
        messages.invert_marks();
        assert_eq!(messages.marked_count(), 0);
    }

    proptest! {
        #[test]
        fn prop_invert_twice_restores_marks(rows in prop::collection::vec(0usize..6, 0..6)) {
            let mut messages = Messages::new();
            messages.set_threads(vec![
                thread("t1", &["a1", "a2", "a3"]),
                thread("t2", &["b1", "b2", "b3"]),
            ]);
            for row in rows {
                messages.toggle_mark(row);
            }
            let before: Vec<_> = (0..6).map(|r| messages.is_marked(r)).collect();
            messages.invert_marks();
            messages.invert_marks();
            let after: Vec<_> = (0..6).map(|r| messages.is_marked(r)).collect();
            prop_assert_eq!(before, after);
        }
    }
}
