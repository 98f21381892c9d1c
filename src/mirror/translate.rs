//! Attachment translation: VK attachment records to Telegram send primitives.
//!
//! Pure functions, no I/O. Photos and videos become media-group items;
//! documents, audio and polls become dedicated sends; anything else is
//! skipped with a reason the dispatcher logs.

use crate::telegram::{
    AudioSend, DocumentUpload, InputMedia, PollSend, POLL_OPTION_LIMIT, POLL_QUESTION_LIMIT,
};
use crate::vk::types::Attachment;

use super::filename::{audio_filename, document_filename};
use super::truncate_chars;

/// Longest title/performer Telegram displays for an audio send.
const AUDIO_FIELD_LIMIT: usize = 64;

/// An attachment that needs its own dedicated message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecialSend {
    Document(DocumentUpload),
    Audio(AudioSend),
    Poll(PollSend),
}

impl SpecialSend {
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Document(_) => "doc",
            Self::Audio(_) => "audio",
            Self::Poll(_) => "poll",
        }
    }
}

/// Outcome of translating a single attachment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Translated {
    /// Embeddable in a media group.
    Inline(InputMedia),
    /// Needs a dedicated message.
    Special(SpecialSend),
    /// Nothing to send; `kind`/`reason` feed the log line.
    Skipped { kind: String, reason: &'static str },
}

/// Map one attachment to its send primitive. Never fails: attachments that
/// cannot be represented come back as [`Translated::Skipped`].
#[must_use]
pub fn translate(attachment: &Attachment) -> Translated {
    match attachment {
        Attachment::Photo { photo } => match photo.sizes.iter().max_by_key(|s| s.width) {
            Some(size) => Translated::Inline(InputMedia::Photo {
                media: size.url.clone(),
                caption: None,
            }),
            None => Translated::Skipped {
                kind: "photo".to_string(),
                reason: "no sizes in photo record",
            },
        },
        Attachment::Video { video } => match video.player.as_deref() {
            Some(player) if !player.is_empty() => Translated::Inline(InputMedia::Video {
                media: player.to_string(),
                caption: None,
            }),
            _ => Translated::Skipped {
                kind: "video".to_string(),
                reason: "no player url",
            },
        },
        Attachment::Doc { doc } => Translated::Special(SpecialSend::Document(DocumentUpload {
            url: doc.url.clone(),
            filename: document_filename(&doc.title, &doc.ext),
        })),
        Attachment::Audio { audio } => Translated::Special(SpecialSend::Audio(AudioSend {
            url: audio.url.clone(),
            performer: truncate_chars(&audio.artist, AUDIO_FIELD_LIMIT).to_string(),
            title: truncate_chars(&audio.title, AUDIO_FIELD_LIMIT).to_string(),
            filename: audio_filename(&audio.artist, &audio.title),
        })),
        Attachment::Poll { poll } => Translated::Special(SpecialSend::Poll(PollSend {
            question: truncate_chars(&poll.question, POLL_QUESTION_LIMIT).to_string(),
            options: poll
                .answers
                .iter()
                .map(|a| truncate_chars(&a.text, POLL_OPTION_LIMIT).to_string())
                .collect(),
            allows_multiple: poll.multiple,
        })),
        Attachment::Unknown(unknown) => Translated::Skipped {
            kind: unknown.kind.clone(),
            reason: "unsupported attachment type",
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vk::types::{Audio, Doc, Photo, PhotoSize, Poll, PollAnswer, UnknownAttachment, Video};

    fn photo(sizes: Vec<(u32, &str)>) -> Attachment {
        Attachment::Photo {
            photo: Photo {
                sizes: sizes
                    .into_iter()
                    .map(|(width, url)| PhotoSize {
                        width,
                        url: url.to_string(),
                    })
                    .collect(),
            },
        }
    }

    #[test]
    fn test_photo_picks_widest_size() {
        let translated = translate(&photo(vec![(130, "small"), (1280, "large"), (604, "mid")]));
        let Translated::Inline(InputMedia::Photo { media, .. }) = translated else {
            panic!("expected inline photo");
        };
        assert_eq!(media, "large");
    }

    #[test]
    fn test_photo_without_sizes_skipped() {
        assert!(matches!(
            translate(&photo(vec![])),
            Translated::Skipped { kind, .. } if kind == "photo"
        ));
    }

    #[test]
    fn test_video_uses_player_url() {
        let att = Attachment::Video {
            video: Video {
                player: Some("https://player/x".to_string()),
            },
        };
        let Translated::Inline(InputMedia::Video { media, .. }) = translate(&att) else {
            panic!("expected inline video");
        };
        assert_eq!(media, "https://player/x");
    }

    #[test]
    fn test_video_without_player_skipped() {
        let att = Attachment::Video {
            video: Video { player: None },
        };
        assert!(matches!(translate(&att), Translated::Skipped { .. }));
    }

    #[test]
    fn test_doc_gets_sanitized_filename() {
        let att = Attachment::Doc {
            doc: Doc {
                url: "https://f/d".to_string(),
                title: "Report: Q1/2024".to_string(),
                ext: "pdf".to_string(),
            },
        };
        let Translated::Special(SpecialSend::Document(doc)) = translate(&att) else {
            panic!("expected document");
        };
        assert_eq!(doc.filename, "Report Q12024.pdf");
        assert_eq!(doc.url, "https://f/d");
    }

    #[test]
    fn test_audio_fields_capped() {
        let att = Attachment::Audio {
            audio: Audio {
                url: "https://a/t.mp3".to_string(),
                artist: "z".repeat(80),
                title: "Song".to_string(),
            },
        };
        let Translated::Special(SpecialSend::Audio(audio)) = translate(&att) else {
            panic!("expected audio");
        };
        assert_eq!(audio.performer.chars().count(), 64);
        assert_eq!(audio.title, "Song");
        assert!(audio.filename.ends_with(" - Song.mp3"));
    }

    #[test]
    fn test_poll_maps_options_in_order() {
        let att = Attachment::Poll {
            poll: Poll {
                question: "Best day?".to_string(),
                answers: vec![
                    PollAnswer { text: "Sat".to_string() },
                    PollAnswer { text: "Sun".to_string() },
                ],
                multiple: true,
            },
        };
        let Translated::Special(SpecialSend::Poll(poll)) = translate(&att) else {
            panic!("expected poll");
        };
        assert_eq!(poll.options, vec!["Sat", "Sun"]);
        assert!(poll.allows_multiple);
    }

    #[test]
    fn test_unknown_attachment_skipped_with_tag() {
        let att = Attachment::Unknown(UnknownAttachment {
            kind: "graffiti".to_string(),
        });
        assert!(matches!(
            translate(&att),
            Translated::Skipped { kind, .. } if kind == "graffiti"
        ));
    }
}
