//! Saved queries and the currently selected one.

use crate::model::SearchQuery;

/// Characters of a query's text used to name it when added interactively.
pub const QUERY_NAME_LENGTH: usize = 10;

/// Ordered list of saved queries with a cyclic selection.
#[derive(Debug, Clone)]
pub struct Queries {
    queries: Vec<SearchQuery>,
    selected: usize,
}

impl Queries {
    /// Creates the query list, falling back to `INBOX` when `saved` is empty.
    #[must_use]
    pub fn new(saved: Vec<SearchQuery>) -> Self {
        let queries = if saved.is_empty() {
            vec![SearchQuery::new("INBOX", "query:INBOX")]
        } else {
            saved
        };
        Self {
            queries,
            selected: 0,
        }
    }

    /// Returns all queries.
    #[must_use]
    pub fn all(&self) -> &[SearchQuery] {
        &self.queries
    }

    /// Returns the selected query.
    #[must_use]
    pub fn current(&self) -> Option<&SearchQuery> {
        self.queries.get(self.selected)
    }

    /// Returns the index of the selected query.
    #[must_use]
    pub const fn selected_index(&self) -> usize {
        self.selected
    }

    /// Selects a query by index. Returns false if out of bounds.
    pub fn select(&mut self, index: usize) -> bool {
        if index >= self.queries.len() {
            return false;
        }
        self.selected = index;
        true
    }

    /// Selects the next query, wrapping around.
    pub fn select_next(&mut self) -> bool {
        if self.queries.is_empty() {
            return false;
        }
        self.select((self.selected + 1) % self.queries.len())
    }

    /// Selects the previous query, wrapping around.
    pub fn select_previous(&mut self) -> bool {
        if self.queries.is_empty() {
            return false;
        }
        let len = self.queries.len();
        self.select((self.selected + len - 1) % len)
    }

    /// Selects the last query.
    pub fn select_last(&mut self) -> bool {
        self.select(self.queries.len().saturating_sub(1))
    }

    /// Appends a query.
    pub fn add(&mut self, query: SearchQuery) {
        self.queries.push(query);
    }

    /// Appends a query typed by the user and selects it.
    pub fn add_text(&mut self, text: &str) {
        self.add(SearchQuery::from_text(text, QUERY_NAME_LENGTH));
        self.select_last();
    }
}

impl Default for Queries {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn sample() -> Queries {
        Queries::new(vec![
            SearchQuery::new("inbox", "tag:inbox"),
            SearchQuery::new("unread", "tag:unread"),
            SearchQuery::new("flagged", "tag:flagged"),
        ])
    }

    #[test]
    fn test_default_inbox() {
        let queries = Queries::default();
        assert_eq!(queries.current().unwrap().query, "query:INBOX");
    }

    #[test]
    fn test_next_wraps() {
        let mut queries = sample();
        queries.select_next();
        queries.select_next();
        assert_eq!(queries.current().unwrap().name, "flagged");
        queries.select_next();
        assert_eq!(queries.selected_index(), 0);
    }

    #[test]
    fn test_previous_wraps() {
        let mut queries = sample();
        queries.select_previous();
        assert_eq!(queries.current().unwrap().name, "flagged");
    }

    #[test]
    fn test_add_text_selects_new_query() {
        let mut queries = sample();
        queries.add_text("from:alice@example.com");
        assert_eq!(queries.all().len(), 4);
        assert_eq!(queries.selected_index(), 3);
        assert_eq!(queries.current().unwrap().query, "from:alice@example.com");
    }

    #[test]
    fn test_select_out_of_bounds() {
        let mut queries = sample();
        assert!(!queries.select(3));
        assert_eq!(queries.selected_index(), 0);
    }
}
