//! Status text and transient notifications.

use chrono::{DateTime, Duration, Utc};

/// Severity of a notification. Higher severities win over lower ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Informational message.
    Info,
    /// Something went wrong but the host carries on.
    Warning,
    /// A failure the user should see.
    Error,
}

impl Severity {
    /// Parse from a level name (`"warning"`, `"error"`, anything else is info).
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "warn" | "warning" => Self::Warning,
            "error" => Self::Error,
            _ => Self::Info,
        }
    }

    /// How long a notification of this severity stays visible by default.
    #[must_use]
    pub const fn default_lifetime(self) -> Duration {
        match self {
            Self::Info => Duration::seconds(5),
            Self::Warning => Duration::seconds(8),
            Self::Error => Duration::seconds(12),
        }
    }
}

/// A temporary message shown instead of the status text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Text to show.
    pub message: String,
    /// Severity of the notification.
    pub severity: Severity,
    /// When the notification was raised.
    pub raised_at: DateTime<Utc>,
    /// When the notification stops being shown.
    pub expires_at: DateTime<Utc>,
}

/// Host-held status text plus pending notifications.
#[derive(Debug, Default)]
pub struct Status {
    message: String,
    notifications: Vec<Notification>,
}

impl Status {
    /// Creates an empty status.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the status text set by the script.
    #[must_use]
    pub fn get(&self) -> &str {
        &self.message
    }

    /// Replaces the status text.
    pub fn set(&mut self, message: impl Into<String>) {
        self.message = message.into();
    }

    /// Clears the status text.
    pub fn clear(&mut self) {
        self.message.clear();
    }

    /// Raises a notification with the default lifetime for its severity.
    pub fn notify(&mut self, severity: Severity, message: impl Into<String>) {
        self.notify_at(severity, message, Utc::now());
    }

    /// Raises a notification as of `now`. Replaces any notification of the
    /// same severity.
    pub fn notify_at(&mut self, severity: Severity, message: impl Into<String>, now: DateTime<Utc>) {
        self.notifications.retain(|n| n.severity != severity);
        self.notifications.push(Notification {
            message: message.into(),
            severity,
            raised_at: now,
            expires_at: now + severity.default_lifetime(),
        });
        self.notifications.sort_by(|a, b| {
            b.severity
                .cmp(&a.severity)
                .then_with(|| b.raised_at.cmp(&a.raised_at))
        });
    }

    /// Drops expired notifications.
    pub fn expire(&mut self, now: DateTime<Utc>) {
        self.notifications.retain(|n| n.expires_at > now);
    }

    /// Returns the most important notification still visible at `now`.
    #[must_use]
    pub fn notification_at(&self, now: DateTime<Utc>) -> Option<&Notification> {
        self.notifications.iter().find(|n| n.expires_at > now)
    }

    /// Returns the text to display: the current notification, else the status.
    #[must_use]
    pub fn current(&self) -> &str {
        self.current_at(Utc::now())
    }

    /// Like [`Status::current`] as of `now`.
    #[must_use]
    pub fn current_at(&self, now: DateTime<Utc>) -> &str {
        self.notification_at(now)
            .map_or(self.message.as_str(), |n| n.message.as_str())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_clear() {
        let mut status = Status::new();
        status.set("syncing");
        assert_eq!(status.get(), "syncing");
        status.clear();
        assert_eq!(status.get(), "");
    }

    #[test]
    fn test_notification_overrides_status_until_expired() {
        let mut status = Status::new();
        let now = Utc::now();
        status.set("idle");
        status.notify_at(Severity::Info, "saved", now);

        assert_eq!(status.current_at(now), "saved");
        assert_eq!(status.current_at(now + Duration::seconds(6)), "idle");
    }

    #[test]
    fn test_higher_severity_wins() {
        let mut status = Status::new();
        let now = Utc::now();
        status.notify_at(Severity::Error, "failed", now);
        status.notify_at(Severity::Info, "hello", now + Duration::seconds(1));

        assert_eq!(status.current_at(now + Duration::seconds(2)), "failed");
        assert_eq!(status.current_at(now + Duration::seconds(13)), "");
    }

    #[test]
    fn test_same_severity_replaces() {
        let mut status = Status::new();
        let now = Utc::now();
        status.notify_at(Severity::Warning, "first", now);
        status.notify_at(Severity::Warning, "second", now);
        status.expire(now);
        assert_eq!(status.notification_at(now).unwrap().message, "second");
    }

    #[test]
    fn test_severity_parse() {
        assert_eq!(Severity::parse("WARNING"), Severity::Warning);
        assert_eq!(Severity::parse("error"), Severity::Error);
        assert_eq!(Severity::parse("debug"), Severity::Info);
    }
}
