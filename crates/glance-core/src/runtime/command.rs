//! The command protocol: intents the script hands back to the host.

use mlua::{MetaMethod, UserData, UserDataFields, UserDataMethods};

use super::Handle;
use super::spawn::SpawnRequest;

/// An intent the host must execute.
///
/// Every variant except [`Command::Batch`] is a leaf. Scripts see commands as
/// opaque userdata values, so a plain table can never pass for one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Leave the application.
    Quit,
    /// Re-run the current query.
    Refresh,
    /// Add a query and switch to it.
    NewQuery(String),
    /// Switch to the next saved query.
    NextQuery,
    /// Switch to the previous saved query.
    PreviousQuery,
    /// Toggle the mark on the selected message.
    ToggleMarks,
    /// Invert all marks.
    InvertMarks,
    /// Remove all marks.
    ClearMarks,
    /// Show a single-line prompt; its submission resolves `handle`.
    OpenInput {
        /// Label shown before the text field.
        prompt: String,
        /// Initial hint shown in the empty field.
        placeholder: String,
        /// Callback to resolve with the submitted text.
        handle: Handle,
    },
    /// Replace the status text.
    SetStatus(String),
    /// Several commands, executed in order.
    Batch(Vec<Command>),
    /// Run an external process off the event loop.
    Spawn(SpawnRequest),
}

impl Command {
    /// Short name of the variant, as shown to scripts.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Quit => "quit",
            Self::Refresh => "refresh",
            Self::NewQuery(_) => "new_query",
            Self::NextQuery => "next_query",
            Self::PreviousQuery => "previous_query",
            Self::ToggleMarks => "toggle_marks",
            Self::InvertMarks => "invert_marks",
            Self::ClearMarks => "clear_marks",
            Self::OpenInput { .. } => "open_input",
            Self::SetStatus(_) => "set_status",
            Self::Batch(_) => "batch",
            Self::Spawn(_) => "spawn",
        }
    }

    /// Flattens batches into the leaf commands they contain, in order.
    #[must_use]
    pub fn leaves(self) -> Vec<Self> {
        match self {
            Self::Batch(items) => items.into_iter().flat_map(Self::leaves).collect(),
            leaf => vec![leaf],
        }
    }
}

impl UserData for Command {
    fn add_fields<F: UserDataFields<Self>>(fields: &mut F) {
        fields.add_field_method_get("kind", |_, this| Ok(this.name()));
    }

    fn add_methods<M: UserDataMethods<Self>>(methods: &mut M) {
        methods.add_meta_method(MetaMethod::ToString, |_, this, ()| {
            Ok(format!("glance.Command({})", this.name()))
        });
    }
}
