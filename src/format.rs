//! Message formatting pipeline
//!
//! Converts raw message text into display markup. Escaping runs first, so
//! every later substitution only wraps already-escaped text in a fixed set
//! of tags; player input can never inject markup of its own.

use crate::message::{Message, Sender};
use chrono::{DateTime, Local, TimeZone, Utc};
use regex::Regex;
use std::fmt::Display;
use std::sync::LazyLock;

struct Rule {
    pattern: Regex,
    replacement: &'static str,
}

impl Rule {
    fn new(pattern: &str, replacement: &'static str) -> Self {
        Self {
            pattern: Regex::new(pattern).expect("formatting pattern is valid"),
            replacement,
        }
    }
}

/// Markup rules in application order. The order is significant.
static RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    vec![
        Rule::new(r"(?s)```(.+?)```", "<pre><code>${1}</code></pre>"),
        Rule::new(r"`([^`]+?)`", "<code>${1}</code>"),
        Rule::new(r"\*(.+?)\*", "<strong>${1}</strong>"),
        Rule::new(r"_(.+?)_", "<em>${1}</em>"),
        Rule::new(r"~(.+?)~", "<del>${1}</del>"),
        Rule::new(r"\n", "<br />"),
    ]
});

/// Escape the five HTML-significant characters
pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

/// Render raw text to sanitized markup. Pure and total: unmatched markers
/// are left as literal text.
pub fn render(raw: &str) -> String {
    RULES.iter().fold(escape_html(raw), |text, rule| {
        rule.pattern
            .replace_all(&text, rule.replacement)
            .into_owned()
    })
}

/// `HH:MM` label in the local time zone, empty when there is no timestamp
pub fn time_label(created_at: Option<DateTime<Utc>>) -> String {
    time_label_in(created_at, &Local)
}

pub fn time_label_in<Tz>(created_at: Option<DateTime<Utc>>, tz: &Tz) -> String
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    created_at
        .map(|ts| ts.with_timezone(tz).format("%H:%M").to_string())
        .unwrap_or_default()
}

/// Render-ready view of a message; the view layer owns node creation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage {
    pub sender: Sender,
    pub html: String,
    pub time: String,
}

impl RenderedMessage {
    /// CSS-style modifier distinguishing player and valezap bubbles
    #[allow(dead_code)] // For markup views
    pub fn css_class(&self) -> &'static str {
        match self.sender {
            Sender::Player => "message--player",
            Sender::Valezap => "message--valezap",
        }
    }
}

pub fn render_message(message: &Message) -> RenderedMessage {
    RenderedMessage {
        sender: message.sender,
        html: render(&message.content),
        time: time_label(message.created_at),
    }
}
