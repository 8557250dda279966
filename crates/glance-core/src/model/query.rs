//! Saved search query model.

/// A named notmuch search query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    /// Short name shown in the query tabs.
    pub name: String,
    /// The notmuch query string.
    pub query: String,
}

impl SearchQuery {
    /// Creates a new named query.
    #[must_use]
    pub fn new(name: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            query: query.into(),
        }
    }

    /// Creates a query named after the first `max_chars` characters of its text.
    #[must_use]
    pub fn from_text(query: &str, max_chars: usize) -> Self {
        let name = if query.chars().count() > max_chars {
            let mut name: String = query.chars().take(max_chars.saturating_sub(1)).collect();
            name.push('…');
            name
        } else {
            query.to_string()
        };
        Self::new(name, query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_text_short() {
        let query = SearchQuery::from_text("tag:inbox", 10);
        assert_eq!(query.name, "tag:inbox");
        assert_eq!(query.query, "tag:inbox");
    }

    #[test]
    fn test_from_text_truncates() {
        let query = SearchQuery::from_text("from:alice and tag:unread", 10);
        assert_eq!(query.name.chars().count(), 10);
        assert!(query.name.ends_with('…'));
        assert_eq!(query.query, "from:alice and tag:unread");
    }
}
