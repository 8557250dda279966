//! Plain-text rendering of the application state.

use std::fmt::Write;

use chrono::{DateTime, Local, Utc};
use glance_core::runtime::PendingInput;
use glance_core::{Message, Theme};

use crate::app::State;

const RESET: &str = "\x1b[0m";
const SENDER_WIDTH: usize = 20;

/// ANSI escape selecting a 256-color foreground, or nothing for colors that
/// are not palette numbers.
fn fg(color: &str) -> String {
    color
        .parse::<u8>()
        .map_or_else(|_| String::new(), |n| format!("\x1b[38;5;{n}m"))
}

fn paint(text: &str, color: &str) -> String {
    let code = fg(color);
    if code.is_empty() {
        text.to_string()
    } else {
        format!("{code}{text}{RESET}")
    }
}

/// Short date: the time for today, day and month otherwise.
fn format_date(date: Option<DateTime<Utc>>, now: DateTime<Local>) -> String {
    let Some(date) = date else {
        return String::new();
    };
    let local = date.with_timezone(&Local);
    if local.date_naive() == now.date_naive() {
        local.format("%H:%M").to_string()
    } else {
        local.format("%b %d").to_string()
    }
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        format!("{text:<width$}")
    } else {
        let mut out: String = text.chars().take(width.saturating_sub(1)).collect();
        out.push('…');
        out
    }
}

fn row(message: &Message, selected: bool, marked: bool, theme: &Theme, now: DateTime<Local>) -> String {
    let cursor = if selected { ">" } else { " " };
    let mark = if marked { "*" } else { " " };
    let unread = message.has_tag("unread");
    let sender_color = if unread { &theme.accent_bright } else { &theme.foreground };
    let subject_color = if selected { &theme.highlight } else { &theme.foreground };

    format!(
        "{}{} {} {} {} {}",
        paint(cursor, &theme.accent),
        paint(mark, &theme.secondary_bright),
        paint(&format!("{:>6}", format_date(message.date, now)), &theme.muted),
        paint(&truncate(message.from_name(), SENDER_WIDTH), sender_color),
        paint(&message.subject, subject_color),
        paint(&message.tags.join(" "), &theme.tertiary),
    )
}

/// Index range of the rows shown, keeping the selection visible.
fn window(selected: usize, count: usize, rows: usize) -> std::ops::Range<usize> {
    if count <= rows {
        return 0..count;
    }
    let start = selected.saturating_sub(rows / 2).min(count - rows);
    start..start + rows
}

/// Renders the whole screen.
#[must_use]
pub fn render(state: &State, pending: Option<&PendingInput>, rows: usize) -> String {
    render_at(state, pending, rows, Local::now(), Utc::now())
}

fn render_at(
    state: &State,
    pending: Option<&PendingInput>,
    rows: usize,
    now: DateTime<Local>,
    utc_now: DateTime<Utc>,
) -> String {
    let theme = &state.theme;
    let messages = &state.messages;
    let mut out = String::new();

    let tabs: Vec<String> = state
        .queries
        .all()
        .iter()
        .enumerate()
        .map(|(i, query)| {
            if i == state.queries.selected_index() {
                paint(&format!("[{}]", query.name), &theme.accent)
            } else {
                paint(&format!(" {} ", query.name), &theme.muted)
            }
        })
        .collect();
    let _ = writeln!(out, "{}", tabs.join(""));

    let selected = messages.selected_row();
    for index in window(selected, messages.count(), rows) {
        if let Some(message) = messages.get(index) {
            let line = row(message, index == selected, messages.is_marked(index), theme, now);
            let _ = writeln!(out, "{line}");
        }
    }

    let query = state.queries.current().map_or("", |q| q.query.as_str());
    let position = if messages.count() == 0 { 0 } else { selected + 1 };
    let _ = writeln!(
        out,
        "{} | {}/{} | {} marked  {}",
        paint(query, &theme.secondary),
        position,
        messages.count(),
        messages.marked_count(),
        state.status.current_at(utc_now),
    );

    if let Some(pending) = pending {
        if let Some(draft) = &state.draft {
            let _ = write!(
                out,
                "{}{}",
                paint(&pending.prompt, &theme.accent_bright),
                paint(draft, &theme.foreground)
            );
            return out;
        }
        let seed = if pending.placeholder.is_empty() {
            state.history.last(&pending.prompt).unwrap_or_default()
        } else {
            pending.placeholder.as_str()
        };
        let hint = if seed.is_empty() {
            String::new()
        } else {
            paint(&format!("[{seed}] "), &theme.muted)
        };
        let _ = write!(out, "{}{hint}", paint(&pending.prompt, &theme.accent_bright));
    }
    out
}
