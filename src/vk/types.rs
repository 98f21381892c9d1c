//! Wire types for the VK JSON API (v5.131).
//!
//! Only the fields the mirror consumes are modeled; serde ignores the rest.
//! Every field that VK sometimes omits carries a default so a sparse post
//! never fails the whole `wall.get` page.

use serde::Deserialize;

/// A wall post, possibly carrying a nested-repost chain.
#[derive(Debug, Clone, Deserialize)]
pub struct Post {
    pub id: i64,
    /// Wall the post lives on: positive = user, negative = group. Absent on
    /// some malformed repost entries; such entries cannot be attributed.
    #[serde(default)]
    pub owner_id: Option<i64>,
    #[serde(default)]
    pub date: i64,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    /// Nested reposts, the last entry being closest to the original author.
    #[serde(default)]
    pub copy_history: Vec<Post>,
}

/// A post attachment. VK tags the envelope with `type` and nests the payload
/// under a key of the same name. Tags we do not translate fall through to
/// [`Attachment::Unknown`], keeping the tag for logging.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Attachment {
    Photo { photo: Photo },
    Video { video: Video },
    Doc { doc: Doc },
    Audio { audio: Audio },
    Poll { poll: Poll },
    #[serde(untagged)]
    Unknown(UnknownAttachment),
}

impl Attachment {
    /// The wire tag, for log lines.
    #[must_use]
    pub fn kind(&self) -> &str {
        match self {
            Self::Photo { .. } => "photo",
            Self::Video { .. } => "video",
            Self::Doc { .. } => "doc",
            Self::Audio { .. } => "audio",
            Self::Poll { .. } => "poll",
            Self::Unknown(u) => &u.kind,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UnknownAttachment {
    #[serde(rename = "type", default)]
    pub kind: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Photo {
    #[serde(default)]
    pub sizes: Vec<PhotoSize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PhotoSize {
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Video {
    /// Embeddable player URL; only present when the token may play the video.
    #[serde(default)]
    pub player: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Doc {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub ext: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Audio {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub artist: String,
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Poll {
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub answers: Vec<PollAnswer>,
    #[serde(default)]
    pub multiple: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PollAnswer {
    #[serde(default)]
    pub text: String,
}
