//! Line-oriented terminal view

use crate::error::TemplateError;
use crate::format::RenderedMessage;
use crate::message::Sender;
use crate::runtime::ChatView;
use crate::state_machine::{BubbleId, Connection, Status, StatusKind};
use std::io::Write;

/// Prints the conversation as a transcript
///
/// Bubbles cannot be edited once printed, so confirmations and rollbacks
/// are printed as follow-up lines. Markup is flattened to plain text.
pub struct TerminalView<W: Write + Send> {
    out: W,
    log: Vec<(BubbleId, RenderedMessage)>,
}

impl<W: Write + Send> TerminalView<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            log: Vec::new(),
        }
    }

    #[allow(dead_code)] // Inspected by tests
    pub fn into_inner(self) -> W {
        self.out
    }

    fn line(&mut self, text: &str) {
        if let Err(e) = writeln!(self.out, "{text}").and_then(|()| self.out.flush()) {
            tracing::warn!(error = %e, "Failed to write to terminal");
        }
    }

    fn position(&self, bubble: &BubbleId) -> Option<usize> {
        self.log.iter().position(|(id, _)| id == bubble)
    }
}

fn speaker(sender: Sender) -> &'static str {
    match sender {
        Sender::Player => "you",
        Sender::Valezap => "valezap",
    }
}

/// Tags the formatting pipeline can emit
const MARKUP_TAGS: [&str; 10] = [
    "<pre>", "</pre>", "<code>", "</code>", "<strong>", "</strong>", "<em>", "</em>", "<del>",
    "</del>",
];

/// Entities produced by escaping; `&amp;` goes last so `&amp;lt;` stays `&lt;`
const ENTITIES: [(&str, &str); 5] = [
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&quot;", "\""),
    ("&#39;", "'"),
    ("&amp;", "&"),
];

/// Flatten sanitized markup back to terminal text
fn plain_text(html: &str) -> String {
    let mut text = html.replace("<br />", "\n");
    for tag in MARKUP_TAGS {
        text = text.replace(tag, "");
    }
    for (entity, raw) in ENTITIES {
        text = text.replace(entity, raw);
    }
    text
}

fn bubble_line(message: &RenderedMessage) -> String {
    let text = plain_text(&message.html);
    if message.time.is_empty() {
        format!("{}: {text}", speaker(message.sender))
    } else {
        format!("[{}] {}: {text}", message.time, speaker(message.sender))
    }
}

impl<W: Write + Send> ChatView for TerminalView<W> {
    fn set_connection(&mut self, connection: Connection) {
        self.line(&format!("** {}", connection.label()));
    }

    fn set_input_locked(&mut self, _locked: bool) {}

    fn set_status(&mut self, status: Option<&Status>) {
        if let Some(status) = status {
            let marker = match status.kind() {
                StatusKind::Info => "..",
                StatusKind::Success => "ok",
                StatusKind::Error => "!!",
            };
            self.line(&format!("{marker} {status}"));
        }
    }

    fn clear_log(&mut self) {
        self.log.clear();
    }

    fn append(
        &mut self,
        bubble: &BubbleId,
        message: &RenderedMessage,
    ) -> Result<(), TemplateError> {
        self.line(&bubble_line(message));
        self.log.push((bubble.clone(), message.clone()));
        Ok(())
    }

    fn replace(
        &mut self,
        bubble: &BubbleId,
        message: &RenderedMessage,
    ) -> Result<(), TemplateError> {
        let index = self
            .position(bubble)
            .ok_or_else(|| TemplateError::MissingBubble(bubble.to_string()))?;
        if self.log[index].1.html != message.html {
            self.line(&format!("   (stored as) {}", bubble_line(message)));
        }
        self.log[index].1 = message.clone();
        Ok(())
    }

    fn remove(&mut self, bubble: &BubbleId) {
        if let Some(index) = self.position(bubble) {
            let (_, message) = self.log.remove(index);
            self.line(&format!("   (not sent) {}", plain_text(&message.html)));
        }
    }

    fn clear_input(&mut self) {}
}
