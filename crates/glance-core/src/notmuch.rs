//! Access to the mail index through the `notmuch` command line tool.

use std::process::Output;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::error::{Error, Result};
use crate::model::{Message, MessageId, SearchQuery, Thread};

/// Client for the `notmuch` binary.
#[derive(Debug, Clone)]
pub struct Notmuch {
    binary: String,
}

impl Default for Notmuch {
    fn default() -> Self {
        Self::new("notmuch")
    }
}

impl Notmuch {
    /// Creates a client running `binary`.
    #[must_use]
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Returns the binary this client runs.
    #[must_use]
    pub fn binary(&self) -> &str {
        &self.binary
    }

    /// Searches threads matching `query`, newest first, with their matching
    /// messages.
    ///
    /// # Errors
    ///
    /// Returns an error if notmuch fails or prints something unexpected.
    #[instrument(skip(self))]
    pub async fn search_threads(&self, query: &str) -> Result<Vec<Thread>> {
        let summary = self
            .run_async(&["search", "--format=json", "--output=summary", "--sort=newest-first", query])
            .await?;
        let messages = self
            .run_async(&[
                "show",
                "--format=json",
                "--entire-thread=false",
                "--body=false",
                "--sort=newest-first",
                query,
            ])
            .await?;

        let threads = parse_threads(&summary, &messages)?;
        debug!(count = threads.len(), "threads found");
        Ok(threads)
    }

    /// Reads the saved queries from the notmuch configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if notmuch fails.
    pub async fn saved_queries(&self) -> Result<Vec<SearchQuery>> {
        let output = self.run_async(&["config", "list"]).await?;
        Ok(parse_saved_queries(&String::from_utf8_lossy(&output)))
    }

    /// Applies tag operations to messages and waits for notmuch to finish.
    ///
    /// # Errors
    ///
    /// Returns an error if notmuch fails.
    pub fn tag(&self, ids: &[MessageId], tags: &[String]) -> Result<()> {
        let args = tag_args(ids, tags);
        debug!(?args, "tagging");
        let output = std::process::Command::new(&self.binary)
            .args(&args)
            .output()?;
        check(&self.binary, &output)?;
        Ok(())
    }

    async fn run_async(&self, args: &[&str]) -> Result<Vec<u8>> {
        let output = tokio::process::Command::new(&self.binary)
            .args(args)
            .kill_on_drop(true)
            .output()
            .await?;
        check(&self.binary, &output)?;
        Ok(output.stdout)
    }
}

fn check(binary: &str, output: &Output) -> Result<()> {
    if output.status.success() {
        return Ok(());
    }
    let stderr = String::from_utf8_lossy(&output.stderr);
    Err(Error::Notmuch(format!(
        "{binary} exited with {}: {}",
        output.status,
        stderr.trim()
    )))
}

/// Arguments of `notmuch tag` for the given messages and tag operations.
#[must_use]
pub fn tag_args(ids: &[MessageId], tags: &[String]) -> Vec<String> {
    let mut args = Vec::with_capacity(ids.len() + tags.len() + 2);
    args.push("tag".to_string());
    args.extend(tags.iter().cloned());
    args.push("--".to_string());
    args.extend(ids.iter().map(id_term));
    args
}

/// Quoted `id:` search term. Embedded quotes are doubled.
fn id_term(id: &MessageId) -> String {
    format!("id:\"{}\"", id.as_str().replace('"', "\"\""))
}

/// Parses `query.<name>=<query>` lines of `notmuch config list`.
#[must_use]
pub fn parse_saved_queries(config: &str) -> Vec<SearchQuery> {
    config
        .lines()
        .filter_map(|line| line.strip_prefix("query."))
        .filter_map(|entry| entry.split_once('='))
        .filter(|(name, query)| !name.is_empty() && !query.is_empty())
        .map(|(name, query)| SearchQuery::new(name, query))
        .collect()
}

#[derive(Debug, Deserialize)]
struct ThreadSummary {
    thread: String,
    #[serde(default)]
    authors: String,
    #[serde(default)]
    subject: String,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    matched: usize,
    #[serde(default)]
    timestamp: Option<i64>,
}

/// One node of a `notmuch show` thread tree.
#[derive(Debug, Deserialize)]
struct Node(Option<ShownMessage>, Vec<Node>);

#[derive(Debug, Deserialize)]
struct ShownMessage {
    id: String,
    #[serde(default)]
    filename: Filenames,
    #[serde(default)]
    timestamp: Option<i64>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    headers: Headers,
}

/// Older notmuch versions print one filename, newer ones a list.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Filenames {
    One(String),
    Many(Vec<String>),
}

impl Default for Filenames {
    fn default() -> Self {
        Self::Many(Vec::new())
    }
}

impl Filenames {
    fn first(&self) -> &str {
        match self {
            Self::One(name) => name,
            Self::Many(names) => names.first().map_or("", String::as_str),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct Headers {
    subject: String,
    from: String,
    to: String,
}

/// notmuch separates matched from other authors with `|`, names with `,`.
fn split_authors(authors: &str) -> Vec<String> {
    authors
        .split([',', '|'])
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(ToString::to_string)
        .collect()
}

fn timestamp(seconds: Option<i64>) -> Option<DateTime<Utc>> {
    seconds.and_then(|s| DateTime::from_timestamp(s, 0))
}

fn flatten(thread_id: &str, nodes: Vec<Node>, out: &mut Vec<Message>) {
    for Node(message, replies) in nodes {
        if let Some(shown) = message {
            let mut message = Message::new(shown.id, thread_id, shown.filename.first());
            message.date = timestamp(shown.timestamp);
            message.tags = shown.tags;
            message.subject = shown.headers.subject;
            message.from = shown.headers.from;
            message.to = shown.headers.to;
            out.push(message);
        }
        flatten(thread_id, replies, out);
    }
}

/// Combines `notmuch search --output=summary` and `notmuch show` output for
/// the same query. Both list threads in the same order.
fn parse_threads(summary: &[u8], shown: &[u8]) -> Result<Vec<Thread>> {
    let summaries: Vec<ThreadSummary> = serde_json::from_slice(summary)?;
    let trees: Vec<Vec<Node>> = serde_json::from_slice(shown)?;
    if summaries.len() != trees.len() {
        return Err(Error::Notmuch(format!(
            "search found {} threads but show returned {}",
            summaries.len(),
            trees.len()
        )));
    }

    Ok(summaries
        .into_iter()
        .zip(trees)
        .map(|(summary, tree)| {
            let mut messages = Vec::new();
            flatten(&summary.thread, tree, &mut messages);
            let newest = messages.iter().filter_map(|m| m.date).max();
            let oldest = messages.iter().filter_map(|m| m.date).min();
            Thread {
                authors: split_authors(&summary.authors),
                subject: summary.subject,
                tags: summary.tags,
                newest: newest.or_else(|| timestamp(summary.timestamp)),
                oldest,
                matched: summary.matched,
                messages,
                id: summary.thread,
            }
        })
        .collect())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const SUMMARY: &str = r#"[
        {"thread": "0000000000000002", "timestamp": 1700000200, "matched": 2, "total": 3,
         "authors": "Alice| Bob", "subject": "Lunch?", "tags": ["inbox", "unread"]},
        {"thread": "0000000000000001", "timestamp": 1700000000, "matched": 1, "total": 1,
         "authors": "Carol", "subject": "Report", "tags": ["inbox"]}
    ]"#;

    const SHOW: &str = r#"[
        [[{"id": "a@example.com", "match": true, "filename": ["/mail/cur/a:2,S"],
           "timestamp": 1700000100, "tags": ["inbox"],
           "headers": {"Subject": "Lunch?", "From": "Alice <alice@example.com>", "To": "bob@example.com"}},
          [[null,
            [[{"id": "b@example.com", "match": true, "filename": "/mail/cur/b:2,",
               "timestamp": 1700000200, "tags": ["inbox", "unread"],
               "headers": {"Subject": "Re: Lunch?", "From": "Bob <bob@example.com>"}}, []]]]]]],
        [[{"id": "c@example.com", "match": true, "filename": ["/mail/cur/c:2,F"],
           "timestamp": 1700000000, "tags": ["inbox"],
           "headers": {"Subject": "Report", "From": "carol@example.com", "To": "team@example.com"}}, []]]
    ]"#;

    #[test]
    fn test_parse_threads() {
        let threads = parse_threads(SUMMARY.as_bytes(), SHOW.as_bytes()).unwrap();
        assert_eq!(threads.len(), 2);

        let lunch = &threads[0];
        assert_eq!(lunch.id, "0000000000000002");
        assert_eq!(lunch.matched, 2);
        assert_eq!(lunch.authors, vec!["Alice", "Bob"]);
        assert_eq!(lunch.messages.len(), 2);
        assert_eq!(lunch.messages[1].id.as_str(), "b@example.com");
        assert_eq!(lunch.messages[1].thread_id, "0000000000000002");
        assert_eq!(lunch.messages[1].filename, "/mail/cur/b:2,");
        assert_eq!(lunch.newest, DateTime::from_timestamp(1_700_000_200, 0));
        assert_eq!(lunch.oldest, DateTime::from_timestamp(1_700_000_100, 0));

        let report = &threads[1];
        assert!(report.messages[0].flags.flagged);
        assert_eq!(report.messages[0].from_name(), "carol@example.com");
    }

    #[test]
    fn test_parse_threads_mismatch() {
        let result = parse_threads(SUMMARY.as_bytes(), b"[]");
        assert!(matches!(result, Err(Error::Notmuch(_))));
    }

    #[test]
    fn test_parse_threads_empty() {
        assert!(parse_threads(b"[]", b"[]").unwrap().is_empty());
    }

    #[test]
    fn test_parse_saved_queries() {
        let config = "database.path=/home/u/mail\nquery.inbox=tag:inbox\nquery.todo=tag:todo and not tag:done\nquery.broken\nuser.name=U\n";
        let queries = parse_saved_queries(config);
        assert_eq!(
            queries,
            vec![
                SearchQuery::new("inbox", "tag:inbox"),
                SearchQuery::new("todo", "tag:todo and not tag:done"),
            ]
        );
    }

    #[test]
    fn test_tag_args() {
        let args = tag_args(
            &[MessageId::from("a@example.com"), MessageId::from("b@example.com")],
            &["+todo".to_string(), "-inbox".to_string()],
        );
        assert_eq!(
            args,
            vec![
                "tag",
                "+todo",
                "-inbox",
                "--",
                "id:\"a@example.com\"",
                "id:\"b@example.com\"",
            ]
        );
    }

    #[test]
    fn test_tag_args_quote_ids() {
        let args = tag_args(
            &[MessageId::from("odd id (x)\"y\"@example.com")],
            &["+todo".to_string()],
        );
        assert_eq!(args[3], "id:\"odd id (x)\"\"y\"\"@example.com\"");
    }

    #[tokio::test]
    async fn test_missing_binary_is_an_error() {
        let notmuch = Notmuch::new("/nonexistent/notmuch");
        assert!(notmuch.search_threads("tag:inbox").await.is_err());
        assert!(notmuch.tag(&[MessageId::from("x")], &["+a".to_string()]).is_err());
    }
}
