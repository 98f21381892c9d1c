//! Filename derivation for fetched binary media.
//!
//! Document and audio titles come straight from user-controlled feed data and
//! end up as upload filenames, so everything outside a small safe alphabet is
//! stripped and lengths are capped.

/// Strip characters outside `[A-Za-z0-9_\-. ]` (alphanumerics are Unicode),
/// cap at `max` characters, and trim surrounding whitespace.
pub fn sanitize_component(raw: &str, max: usize) -> String {
    let kept: String = raw
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | ' '))
        .take(max)
        .collect();
    kept.trim().to_string()
}

/// Build a document filename: `sanitized-title.ext`.
///
/// The extension defaults to `bin` and the title to `document` when empty
/// after sanitization. A title that already carries the extension keeps a
/// single copy of it.
#[must_use]
pub fn document_filename(title: &str, ext: &str) -> String {
    let ext = {
        let e = sanitize_component(ext, 10);
        if e.is_empty() {
            "bin".to_string()
        } else {
            e
        }
    };

    let mut title = sanitize_component(title, 64);
    if title.is_empty() {
        title = "document".to_string();
    }

    // "report.pdf" + "pdf" must come out as "report.pdf", not "report.pdf.pdf".
    if title.contains('.') {
        if let Some(stem) = strip_suffix_ignore_case(&title, &ext) {
            title = stem.trim_end_matches('.').to_string();
            if title.is_empty() {
                title = "document".to_string();
            }
        }
    }

    format!("{title}.{ext}")
}

/// Build an audio filename: `artist - title.mp3`.
#[must_use]
pub fn audio_filename(artist: &str, title: &str) -> String {
    format!(
        "{} - {}.mp3",
        sanitize_component(artist, 32),
        sanitize_component(title, 32)
    )
}

fn strip_suffix_ignore_case<'a>(s: &'a str, suffix: &str) -> Option<&'a str> {
    let tail_len = suffix.len();
    if s.len() < tail_len {
        return None;
    }
    let split = s.len() - tail_len;
    if !s.is_char_boundary(split) {
        return None;
    }
    let (head, tail) = s.split_at(split);
    tail.eq_ignore_ascii_case(suffix).then_some(head)
}
