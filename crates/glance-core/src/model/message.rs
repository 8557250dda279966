//! Message data models.

use std::fmt;

use chrono::{DateTime, Utc};

/// Identifier of a message in the mail index (the Message-ID without brackets).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct MessageId(pub String);

impl MessageId {
    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MessageId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// A single message as seen in the message list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Message {
    /// Message identifier.
    pub id: MessageId,
    /// Identifier of the thread this message belongs to.
    pub thread_id: String,
    /// Message date.
    pub date: Option<DateTime<Utc>>,
    /// Path of the backing maildir file.
    pub filename: String,
    /// Tags attached to the message.
    pub tags: Vec<String>,
    /// `From` header.
    pub from: String,
    /// `To` header.
    pub to: String,
    /// `Subject` header.
    pub subject: String,
    /// Maildir flags parsed from the filename.
    pub flags: MessageFlags,
}

impl Message {
    /// Creates a message with the identity fields set and everything else empty.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        thread_id: impl Into<String>,
        filename: impl Into<String>,
    ) -> Self {
        let filename = filename.into();
        Self {
            id: MessageId(id.into()),
            thread_id: thread_id.into(),
            flags: MessageFlags::from_filename(&filename),
            filename,
            ..Self::default()
        }
    }

    /// Returns the display name of the sender.
    ///
    /// `"Alice <alice@example.com>"` yields `"Alice"`, a bare address yields itself.
    #[must_use]
    pub fn from_name(&self) -> &str {
        if let Some(start) = self.from.rfind('<') {
            let name = self.from[..start].trim().trim_matches('"').trim();
            if !name.is_empty() {
                return name;
            }
            if let Some(end) = self.from.rfind('>')
                && end > start
            {
                return &self.from[start + 1..end];
            }
        }
        self.from.trim()
    }

    /// Returns true if the message carries the given tag.
    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    /// Applies notmuch-style tag operations: `-tag` removes, `+tag` or a
    /// bare `tag` adds.
    pub fn apply_tags(&mut self, operations: &[String]) {
        for operation in operations {
            if let Some(tag) = operation.strip_prefix('-') {
                self.tags.retain(|t| t != tag);
            } else {
                let tag = operation.strip_prefix('+').unwrap_or(operation);
                if !tag.is_empty() && !self.has_tag(tag) {
                    self.tags.push(tag.to_string());
                }
            }
        }
    }
}

/// Maildir flags of a message (the `:2,` info suffix of its filename).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)] // One bool per maildir flag letter
pub struct MessageFlags {
    /// `D`: the message is a draft.
    pub draft: bool,
    /// `F`: the message is flagged.
    pub flagged: bool,
    /// `P`: the message was passed (forwarded or bounced).
    pub passed: bool,
    /// `R`: the message was replied to.
    pub replied: bool,
    /// `S`: the message was seen.
    pub seen: bool,
    /// `T`: the message is trashed.
    pub trashed: bool,
}

impl MessageFlags {
    /// Parses the flags from a maildir filename.
    ///
    /// Unknown letters are ignored and parsing stops at `Z`, the last
    /// possible flag letter. Filenames without an info suffix have no flags.
    #[must_use]
    pub fn from_filename(filename: &str) -> Self {
        let mut flags = Self::default();
        let Some(start) = filename.rfind("2,") else {
            return flags;
        };

        for c in filename[start + 2..].chars() {
            match c {
                'D' => flags.draft = true,
                'F' => flags.flagged = true,
                'P' => flags.passed = true,
                'R' => flags.replied = true,
                'S' => flags.seen = true,
                'T' => flags.trashed = true,
                'Z' => break,
                _ => {}
            }
        }

        flags
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_from_filename() {
        let flags = MessageFlags::from_filename("/mail/cur/1700000000.123_4.host:2,FRS");
        assert!(flags.flagged);
        assert!(flags.replied);
        assert!(flags.seen);
        assert!(!flags.draft);
        assert!(!flags.passed);
        assert!(!flags.trashed);
    }

    #[test]
    fn test_flags_without_info_suffix() {
        assert_eq!(
            MessageFlags::from_filename("/mail/new/1700000000.123_4.host"),
            MessageFlags::default()
        );
    }

    #[test]
    fn test_flags_stop_at_terminator() {
        let flags = MessageFlags::from_filename("/mail/cur/x:2,DZST");
        assert!(flags.draft);
        assert!(!flags.seen);
        assert!(!flags.trashed);
    }

    #[test]
    fn test_new_parses_flags() {
        let message = Message::new("abc@example.com", "0001", "/mail/cur/x:2,S");
        assert_eq!(message.id.as_str(), "abc@example.com");
        assert!(message.flags.seen);
    }

    #[test]
    fn test_apply_tags() {
        let mut message = Message::new("a", "t", "/mail/cur/a");
        message.tags = vec!["inbox".to_string(), "unread".to_string()];
        message.apply_tags(&["-unread".to_string(), "+todo".to_string(), "inbox".to_string()]);
        assert_eq!(message.tags, vec!["inbox".to_string(), "todo".to_string()]);
    }

    #[test]
    fn test_from_name() {
        let mut message = Message::new("id", "t", "f");
        message.from = "Alice Example <alice@example.com>".to_string();
        assert_eq!(message.from_name(), "Alice Example");

        message.from = "<bob@example.com>".to_string();
        assert_eq!(message.from_name(), "bob@example.com");

        message.from = "carol@example.com".to_string();
        assert_eq!(message.from_name(), "carol@example.com");
    }
}
