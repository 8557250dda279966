//! Application state and the update function.

use std::cell::RefCell;
use std::rc::Rc;

use glance_core::runtime::PendingInput;
use glance_core::{
    Command, Error, Host, InputHistory, KeyDispatch, Message as MailMessage, MessageId, Messages,
    Notmuch, Queries, Runtime, Severity, SpawnExecutor, Status, Theme,
};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::message::Message;

/// Line a cooked terminal sends for the up arrow.
pub const HISTORY_PREVIOUS_LINE: &str = "\x1b[A";
/// Line a cooked terminal sends for the down arrow.
pub const HISTORY_NEXT_LINE: &str = "\x1b[B";

/// Host state shared between the application and the script host.
#[derive(Debug, Default)]
pub struct State {
    /// Current search result.
    pub messages: Messages,
    /// Saved queries.
    pub queries: Queries,
    /// Status text and notifications.
    pub status: Status,
    /// Colors installed by the script.
    pub theme: Theme,
    /// Text submitted to each prompt.
    pub history: InputHistory,
    /// History entry recalled into the open prompt.
    pub draft: Option<String>,
}

impl State {
    /// Creates the state for the given queries.
    #[must_use]
    pub fn new(queries: Queries) -> Self {
        Self {
            queries,
            ..Self::default()
        }
    }
}

/// Exposes the application state to scripts.
pub struct GlanceHost {
    state: Rc<RefCell<State>>,
    notmuch: Notmuch,
}

impl GlanceHost {
    /// Creates a host over `state`, tagging through `notmuch`.
    #[must_use]
    pub const fn new(state: Rc<RefCell<State>>, notmuch: Notmuch) -> Self {
        Self { state, notmuch }
    }
}

impl Host for GlanceHost {
    fn status(&self) -> String {
        self.state.borrow().status.get().to_string()
    }

    fn all_messages(&self) -> Vec<MailMessage> {
        self.state.borrow().messages.all().into_iter().cloned().collect()
    }

    fn marked_messages(&self) -> Vec<MailMessage> {
        self.state
            .borrow()
            .messages
            .marked()
            .into_iter()
            .cloned()
            .collect()
    }

    fn selected_message(&self) -> Option<MailMessage> {
        self.state.borrow().messages.selected().cloned()
    }

    fn tag(&self, ids: &[MessageId], tags: &[String]) -> glance_core::Result<()> {
        self.notmuch.tag(ids, tags)?;
        self.state.borrow_mut().messages.apply_tags(ids, tags);
        Ok(())
    }

    fn set_theme(&self, theme: Theme) {
        debug!(?theme, "theme changed");
        self.state.borrow_mut().theme = theme;
    }

    fn report(&self, error: &Error) {
        warn!(%error, "script error");
        self.state
            .borrow_mut()
            .status
            .notify(Severity::Error, error.to_string());
    }
}

/// The running application.
pub struct App {
    runtime: Runtime,
    state: Rc<RefCell<State>>,
    notmuch: Notmuch,
    executor: SpawnExecutor,
    events: mpsc::UnboundedSender<Message>,
    running: bool,
}

impl App {
    /// Creates the application. Search results are sent to `events`.
    #[must_use]
    pub const fn new(
        runtime: Runtime,
        state: Rc<RefCell<State>>,
        notmuch: Notmuch,
        executor: SpawnExecutor,
        events: mpsc::UnboundedSender<Message>,
    ) -> Self {
        Self {
            runtime,
            state,
            notmuch,
            executor,
            events,
            running: true,
        }
    }

    /// Runs the script's startup hook and the first search.
    pub fn start(&mut self) {
        let commands = self.runtime.on_startup();
        self.execute(commands);
        self.search(0);
    }

    /// Returns false once the application should exit.
    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.running
    }

    /// Shared state, for rendering.
    #[must_use]
    pub fn state(&self) -> &Rc<RefCell<State>> {
        &self.state
    }

    /// The prompt currently shown, if any.
    #[must_use]
    pub fn pending_input(&self) -> Option<PendingInput> {
        self.runtime.pending_input()
    }

    /// Turns a line read from the terminal into a message.
    ///
    /// While a prompt is open, a non-empty line submits it and the arrow
    /// lines walk its history. An empty line submits the recalled entry, or
    /// cancels the prompt when none is recalled. Otherwise the line names a key.
    #[must_use]
    pub fn line_message(&self, line: &str) -> Message {
        if self.runtime.pending_input().is_none() {
            return Message::Key(line.trim().to_string());
        }
        match line {
            HISTORY_PREVIOUS_LINE => Message::HistoryPrevious,
            HISTORY_NEXT_LINE => Message::HistoryNext,
            "" => self
                .state
                .borrow()
                .draft
                .clone()
                .map_or(Message::CancelInput, Message::SubmitInput),
            text => Message::SubmitInput(text.to_string()),
        }
    }

    /// Handles a message.
    pub fn update(&mut self, message: Message) {
        match message {
            Message::Key(key) => match self.runtime.on_key(&key) {
                KeyDispatch::Handled(commands) => self.execute(commands),
                KeyDispatch::Unhandled => self.default_key(&key),
            },
            Message::SubmitInput(text) => {
                if let Some(pending) = self.runtime.pending_input() {
                    let mut state = self.state.borrow_mut();
                    state.history.add(&pending.prompt, &text);
                    state.draft = None;
                }
                let commands = self.runtime.submit_input(&text);
                self.execute(commands);
            }
            Message::CancelInput => {
                if let Some(pending) = self.runtime.cancel_input() {
                    let mut state = self.state.borrow_mut();
                    state.history.reset(&pending.prompt);
                    state.draft = None;
                }
            }
            Message::HistoryPrevious => {
                if let Some(pending) = self.runtime.pending_input() {
                    let mut state = self.state.borrow_mut();
                    if let Some(entry) = state.history.previous(&pending.prompt).map(str::to_string) {
                        state.draft = Some(entry);
                    }
                }
            }
            Message::HistoryNext => {
                if let Some(pending) = self.runtime.pending_input() {
                    let mut state = self.state.borrow_mut();
                    state.draft = state.history.next(&pending.prompt).map(str::to_string);
                }
            }
            Message::InputClosed => {
                info!("input closed");
                self.running = false;
            }
            Message::SearchFinished { query, result, row } => self.search_finished(&query, result, row),
            Message::SpawnFinished(result) => {
                debug!(handle = %result.handle, "spawn finished");
                let commands = self.runtime.on_spawn_result(&result);
                self.execute(commands);
            }
        }
    }

    /// Navigation for keys the script leaves unbound.
    fn default_key(&mut self, key: &str) {
        let mut state = self.state.borrow_mut();
        match key {
            "j" | "down" => state.messages.move_selection(1),
            "k" | "up" => state.messages.move_selection(-1),
            "g" | "home" => {
                state.messages.select(0);
            }
            "G" | "end" => {
                let last = state.messages.count().saturating_sub(1);
                state.messages.select(last);
            }
            "ctrl+c" => self.running = false,
            "" => {}
            other => debug!(key = other, "unbound key"),
        }
    }

    /// Executes commands in order.
    pub fn execute(&mut self, commands: Vec<Command>) {
        for command in commands.into_iter().flat_map(Command::leaves) {
            self.execute_one(command);
        }
    }

    fn execute_one(&mut self, command: Command) {
        debug!(command = command.name(), "executing");
        match command {
            Command::Quit => self.running = false,
            Command::Refresh => {
                let row = self.state.borrow().messages.selected_row();
                self.search(row);
            }
            Command::NewQuery(text) => {
                self.state.borrow_mut().queries.add_text(&text);
                self.search(0);
            }
            Command::NextQuery => {
                self.state.borrow_mut().queries.select_next();
                self.search(0);
            }
            Command::PreviousQuery => {
                self.state.borrow_mut().queries.select_previous();
                self.search(0);
            }
            Command::ToggleMarks => {
                let mut state = self.state.borrow_mut();
                let row = state.messages.selected_row();
                state.messages.toggle_mark(row);
            }
            Command::InvertMarks => self.state.borrow_mut().messages.invert_marks(),
            Command::ClearMarks => self.state.borrow_mut().messages.clear_marks(),
            Command::OpenInput { prompt, .. } => {
                let mut state = self.state.borrow_mut();
                state.history.reset(&prompt);
                state.draft = None;
                debug!(%prompt, "prompt opened");
            }
            Command::SetStatus(text) => self.state.borrow_mut().status.set(text),
            Command::Batch(commands) => self.execute(commands),
            Command::Spawn(request) => {
                info!(argv = ?request.argv, "spawning");
                self.executor.execute(request);
            }
        }
    }

    /// Searches the current query in the background.
    fn search(&self, row: usize) {
        let Some(query) = self.state.borrow().queries.current().map(|q| q.query.clone()) else {
            return;
        };
        let notmuch = self.notmuch.clone();
        let events = self.events.clone();

        tokio::spawn(async move {
            let result = notmuch
                .search_threads(&query)
                .await
                .map_err(|e| e.to_string());
            if events.send(Message::SearchFinished { query, result, row }).is_err() {
                debug!("event loop gone, dropping search result");
            }
        });
    }

    fn search_finished(&self, query: &str, result: Result<Vec<glance_core::Thread>, String>, row: usize) {
        let mut state = self.state.borrow_mut();
        let current = state.queries.current().map(|q| q.query.as_str());
        if current != Some(query) {
            debug!(query, "discarding stale search result");
            return;
        }

        match result {
            Ok(threads) => {
                state.messages.set_threads(threads);
                if !state.messages.select(row) {
                    let last = state.messages.count().saturating_sub(1);
                    state.messages.select(last);
                }
            }
            Err(error) => {
                warn!(query, %error, "search failed");
                state.status.notify(Severity::Error, error);
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use glance_core::{Script, SearchQuery, Thread};

    use super::*;

    fn thread(id: &str, message_ids: &[&str]) -> Thread {
        Thread {
            id: id.to_string(),
            messages: message_ids
                .iter()
                .map(|m| MailMessage::new(*m, id, format!("/mail/cur/{m}:2,")))
                .collect(),
            ..Thread::default()
        }
    }

    fn app(source: &str) -> (App, mpsc::UnboundedReceiver<Message>) {
        let state = Rc::new(RefCell::new(State::new(Queries::new(vec![
            SearchQuery::new("inbox", "tag:inbox"),
            SearchQuery::new("todo", "tag:todo"),
        ]))));
        let notmuch = Notmuch::new("/nonexistent/notmuch");
        let host = Rc::new(GlanceHost::new(state.clone(), notmuch.clone()));
        let runtime = Runtime::new(host, &Script::from_source("test.lua", source)).unwrap();
        let (spawn_tx, _spawn_rx) = mpsc::unbounded_channel();
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let app = App::new(runtime, state, notmuch, SpawnExecutor::new(spawn_tx), events_tx);
        (app, events_rx)
    }

    fn load(app: &mut App, query: &str) {
        app.update(Message::SearchFinished {
            query: query.to_string(),
            result: Ok(vec![thread("t1", &["a", "b"]), thread("t2", &["c"])]),
            row: 0,
        });
    }

    #[tokio::test]
    async fn test_quit_key() {
        let (mut app, _events) = app("key.q = glance.quit");
        app.update(Message::Key("q".into()));
        assert!(!app.is_running());
    }

    #[tokio::test]
    async fn test_default_navigation() {
        let (mut app, _events) = app("");
        load(&mut app, "tag:inbox");
        app.update(Message::Key("j".into()));
        app.update(Message::Key("j".into()));
        app.update(Message::Key("j".into()));
        assert_eq!(app.state().borrow().messages.selected_row(), 2);
        app.update(Message::Key("g".into()));
        assert_eq!(app.state().borrow().messages.selected_row(), 0);
    }

    #[tokio::test]
    async fn test_stale_search_is_discarded() {
        let (mut app, _events) = app("");
        load(&mut app, "tag:todo");
        assert_eq!(app.state().borrow().messages.count(), 0);
        load(&mut app, "tag:inbox");
        assert_eq!(app.state().borrow().messages.count(), 3);
    }

    #[tokio::test]
    async fn test_search_failure_notifies() {
        let (mut app, mut events) = app("key.r = glance.refresh");
        app.update(Message::Key("r".into()));
        let message = events.recv().await.unwrap();
        app.update(message);
        assert!(!app.state().borrow().status.current().is_empty());
    }

    #[tokio::test]
    async fn test_marks_and_status() {
        let (mut app, _events) = app(
            r#"
            key.space = glance.marks.toggle
            key.s = function()
                return glance.status.set(#glance.messages.marked() .. " marked")
            end
            "#,
        );
        load(&mut app, "tag:inbox");
        app.update(Message::Key("space".into()));
        app.update(Message::Key("s".into()));
        assert_eq!(app.state().borrow().status.get(), "1 marked");
    }

    #[tokio::test]
    async fn test_prompt_lines() {
        let (mut app, _events) = app(
            r#"
            key["/"] = function()
                return glance.input { prompt = "query: ", with_input = glance.query.new }
            end
            "#,
        );
        app.update(Message::Key("/".into()));
        assert_eq!(app.pending_input().unwrap().prompt, "query: ");
        assert!(matches!(app.line_message(""), Message::CancelInput));

        let message = app.line_message("from:alice");
        app.update(message);
        assert!(app.pending_input().is_none());
        let state = app.state().borrow();
        assert_eq!(state.queries.current().unwrap().query, "from:alice");
        assert_eq!(state.history.last("query: "), Some("from:alice"));
    }

    #[tokio::test]
    async fn test_prompt_history_navigation() {
        let (mut app, _events) = app(
            r#"
            key["/"] = function()
                return glance.input { prompt = "query: ", with_input = glance.query.new }
            end
            "#,
        );
        for text in ["tag:a", "tag:b"] {
            app.update(Message::Key("/".into()));
            let message = app.line_message(text);
            app.update(message);
        }

        app.update(Message::Key("/".into()));
        for line in [HISTORY_PREVIOUS_LINE, HISTORY_PREVIOUS_LINE, HISTORY_PREVIOUS_LINE] {
            let message = app.line_message(line);
            app.update(message);
        }
        assert_eq!(app.state().borrow().draft.as_deref(), Some("tag:a"));

        let message = app.line_message(HISTORY_NEXT_LINE);
        app.update(message);
        assert_eq!(app.state().borrow().draft.as_deref(), Some("tag:b"));

        let message = app.line_message("");
        assert!(matches!(&message, Message::SubmitInput(text) if text == "tag:b"));
        app.update(message);
        assert!(app.pending_input().is_none());
        assert!(app.state().borrow().draft.is_none());
        assert_eq!(app.state().borrow().queries.current().unwrap().query, "tag:b");
    }

    #[tokio::test]
    async fn test_history_past_newest_clears_draft() {
        let (mut app, _events) = app(
            r#"key.t = function() return glance.input { prompt = "tag: " } end"#,
        );
        app.update(Message::Key("t".into()));
        let message = app.line_message("+todo");
        app.update(message);

        app.update(Message::Key("t".into()));
        app.update(Message::HistoryPrevious);
        assert_eq!(app.state().borrow().draft.as_deref(), Some("+todo"));
        app.update(Message::HistoryNext);
        assert!(app.state().borrow().draft.is_none());
        assert!(matches!(app.line_message(""), Message::CancelInput));
    }

    #[tokio::test]
    async fn test_script_errors_become_notifications() {
        let (mut app, _events) = app(r#"key.e = function() error("broken binding") end"#);
        app.update(Message::Key("e".into()));
        assert!(app.state().borrow().status.current().contains("broken binding"));
    }
}
