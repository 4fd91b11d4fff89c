//! Rendering of notifications into Telegram MarkdownV2 text.
//!
//! Telegram rejects a MarkdownV2 message outright if a reserved character is
//! left unescaped. The Bot API allows any character with code 1 through 126 to
//! be escaped with a preceding `\`, so every such character is escaped and
//! everything else passes through untouched.
//!
//! See: <https://core.telegram.org/bots/api#markdownv2-style>

use chrono::SecondsFormat;
use serde::Serialize;

use crate::types::Notification;

/// Markup dialect announced to Telegram in `parse_mode`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum ParseMode {
    #[default]
    MarkdownV2,
}

impl ParseMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParseMode::MarkdownV2 => "MarkdownV2",
        }
    }
}

/// Escaped message text together with the dialect it is escaped for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattedMessage {
    pub text: String,
    pub parse_mode: ParseMode,
}

impl FormattedMessage {
    /// Render `<LEVEL> on <check name> at <time>`, a blank line, then the message
    ///
    /// The level is uppercased and bolded. The time is rendered as RFC 3339 with
    /// whole seconds and `Z` for a zero offset.
    pub fn from_notification(notification: &Notification) -> Self {
        let time = notification
            .time
            .to_rfc3339_opts(SecondsFormat::Secs, true);

        let text = format!(
            "{} on {} at {}\n\n{}",
            markdown_bold(&uppercase(&notification.level)),
            markdown_safe(&notification.check_name),
            markdown_safe(&time),
            markdown_safe(&notification.message),
        );

        Self {
            text,
            parse_mode: ParseMode::MarkdownV2,
        }
    }
}

/// Uppercase one char at a time; a char whose uppercase form is several
/// chars (`ß` to `SS`) is kept as is, so `straße` becomes `STRAßE`
fn uppercase(text: &str) -> String {
    text.chars()
        .map(|c| {
            let mut upper = c.to_uppercase();
            match (upper.next(), upper.next()) {
                (Some(u), None) => u,
                _ => c,
            }
        })
        .collect()
}

fn needs_escape(c: char) -> bool {
    matches!(c as u32, 1..=126)
}

/// Escape every character with code 1..=126 by prefixing it with `\`
pub fn markdown_safe(text: &str) -> String {
    let mut safe = String::with_capacity(text.len() * 2);
    for c in text.chars() {
        if needs_escape(c) {
            safe.push('\\');
        }
        safe.push(c);
    }
    safe
}

/// Escape `text` and wrap it in bold delimiters
pub fn markdown_bold(text: &str) -> String {
    format!("*{}*", markdown_safe(text))
}
