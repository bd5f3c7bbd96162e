//! Text protocol spoken with telnet-style clients
//!
//! Every request and response is a newline-terminated line of UTF-8 text.
//! Prompts are the one exception: they are written without a terminator so
//! the client types its answer on the same line.

use chrono::{DateTime, Local, TimeZone};

/// Default limit for a single line read from a client (4 KiB)
pub const MAX_LINE_LENGTH: usize = 4 * 1024;

/// Characters stripped from the end of every line read
pub const LINE_ENDINGS: &[char] = &['\n', '\r'];

/// Strip line terminators and surrounding whitespace from a raw line
pub fn trim_line(raw: &str) -> &str {
    raw.trim_end_matches(LINE_ENDINGS).trim()
}

/// Format a chat line stamped with the current local time
pub fn format_chat_line(timestamp_format: &str, name: &str, text: &str) -> String {
    format_chat_line_at(&Local::now(), timestamp_format, name, text)
}

/// Format a chat line as `<timestamp> (name): text`
pub fn format_chat_line_at<Tz>(
    at: &DateTime<Tz>,
    timestamp_format: &str,
    name: &str,
    text: &str,
) -> String
where
    Tz: TimeZone,
    Tz::Offset: std::fmt::Display,
{
    format!("<{}> ({}): {}", at.format(timestamp_format), name, text)
}

/// Notice broadcast to a room when a member renames themselves
pub fn format_rename_notice(old_name: &str, new_name: &str) -> String {
    format!("User {} changed name to {}", old_name, new_name)
}

/// Render the numbered room menu shown during room selection
pub fn format_room_list<'a>(header: &str, names: impl IntoIterator<Item = &'a str>) -> String {
    let mut out = String::from(header);
    for (index, name) in names.into_iter().enumerate() {
        out.push_str(&format!("\n\t{}: {}", index, name));
    }
    out
}
