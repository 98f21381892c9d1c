//! The synchronization-and-dispatch pipeline.
//!
//! [`sync::Synchronizer`] drives the poll loop; each new post flows through
//! [`repost::deliver_with_reposts`] and [`dispatch::ContentDispatcher`],
//! which use [`translate`] to map VK attachments onto Telegram primitives.

pub mod dispatch;
pub mod filename;
pub mod repost;
pub mod sync;
pub mod translate;

pub use dispatch::ContentDispatcher;
pub use sync::Synchronizer;

/// Truncate to at most `max` characters, on a character boundary.
pub(crate) fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Human-readable UTC timestamp for log lines.
pub(crate) fn format_ts(ts: i64) -> String {
    chrono::DateTime::from_timestamp(ts, 0)
        .map_or_else(|| ts.to_string(), |dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
}
