//! Messages as seen from scripts.

use mlua::{AnyUserData, MetaMethod, UserData, UserDataFields, UserDataMethods};

use crate::model::{Message, MessageId};

/// Read-only view of a message handed to scripts.
///
/// Being userdata, a handle cannot be forged from a table: capabilities that
/// take messages check for this type and ignore anything else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageHandle(Message);

impl MessageHandle {
    /// Returns the wrapped message.
    #[must_use]
    pub const fn message(&self) -> &Message {
        &self.0
    }

    /// Returns the message identifier.
    #[must_use]
    pub const fn id(&self) -> &MessageId {
        &self.0.id
    }
}

impl From<Message> for MessageHandle {
    fn from(message: Message) -> Self {
        Self(message)
    }
}

impl UserData for MessageHandle {
    fn add_fields<F: UserDataFields<Self>>(fields: &mut F) {
        fields.add_field_method_get("id", |_, this| Ok(this.0.id.0.clone()));
        fields.add_field_method_get("thread_id", |_, this| Ok(this.0.thread_id.clone()));
        fields.add_field_method_get("filename", |_, this| Ok(this.0.filename.clone()));
        fields.add_field_method_get("subject", |_, this| Ok(this.0.subject.clone()));
        fields.add_field_method_get("from", |_, this| Ok(this.0.from.clone()));
        fields.add_field_method_get("to", |_, this| Ok(this.0.to.clone()));
        fields.add_field_method_get("date", |_, this| Ok(this.0.date.map(|d| d.timestamp())));
        fields.add_field_method_get("tags", |_, this| Ok(this.0.tags.clone()));
        fields.add_field_method_get("flags", |lua, this| {
            let flags = this.0.flags;
            let table = lua.create_table()?;
            table.set("draft", flags.draft)?;
            table.set("flagged", flags.flagged)?;
            table.set("passed", flags.passed)?;
            table.set("replied", flags.replied)?;
            table.set("seen", flags.seen)?;
            table.set("trashed", flags.trashed)?;
            Ok(table)
        });
    }

    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        methods.add_meta_method(MetaMethod::ToString, |_, this, ()| {
            Ok(format!("glance.Message({})", this.0.id))
        });
        methods.add_meta_method(MetaMethod::Eq, |_, this, other: AnyUserData| {
            Ok(other
                .borrow::<Self>()
                .is_ok_and(|other| other.0.id == this.0.id))
        });
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{TimeZone, Utc};
    use mlua::Lua;

    use super::*;

    fn handle() -> MessageHandle {
        let mut message = Message::new("id-1@example.com", "thread-1", "/mail/cur/1:2,FS");
        message.subject = "Lunch?".to_string();
        message.tags = vec!["inbox".to_string(), "unread".to_string()];
        message.date = Utc.timestamp_opt(1_700_000_000, 0).single();
        MessageHandle::from(message)
    }

    #[test]
    fn test_fields_are_readable() {
        let lua = Lua::new();
        lua.globals().set("m", handle()).unwrap();

        let (id, subject, date, tag_count, flagged): (String, String, i64, i64, bool) = lua
            .load("return m.id, m.subject, m.date, #m.tags, m.flags.flagged")
            .eval()
            .unwrap();
        assert_eq!(id, "id-1@example.com");
        assert_eq!(subject, "Lunch?");
        assert_eq!(date, 1_700_000_000);
        assert_eq!(tag_count, 2);
        assert!(flagged);
    }

    #[test]
    fn test_fields_are_read_only() {
        let lua = Lua::new();
        lua.globals().set("m", handle()).unwrap();
        assert!(lua.load("m.subject = 'changed'").exec().is_err());
    }

    #[test]
    fn test_tostring_and_equality() {
        let lua = Lua::new();
        lua.globals().set("a", handle()).unwrap();
        lua.globals().set("b", handle()).unwrap();

        let (text, equal): (String, bool) = lua.load("return tostring(a), a == b").eval().unwrap();
        assert_eq!(text, "glance.Message(id-1@example.com)");
        assert!(equal);
    }
}
