//! Telegram channel sink: message primitives and the Bot API client.

mod client;

pub use client::TelegramClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Longest caption a media group item accepts.
pub const CAPTION_LIMIT: usize = 1024;
/// Longest text a single message accepts.
pub const MESSAGE_LIMIT: usize = 4096;
/// Most items one media group accepts.
pub const MEDIA_GROUP_LIMIT: usize = 10;
/// Longest poll question.
pub const POLL_QUESTION_LIMIT: usize = 300;
/// Longest poll option label.
pub const POLL_OPTION_LIMIT: usize = 100;

/// Identifier of a sent message, used only as a reply-threading target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageId(pub i64);

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("telegram transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("telegram api returned http status {0}")]
    Status(reqwest::StatusCode),
    #[error("telegram api error {code}: {description}")]
    Api { code: i64, description: String },
    #[error("malformed telegram response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("telegram response was missing the expected payload")]
    MissingPayload,
    #[error("failed to fetch media from {url}: {source}")]
    MediaFetch {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}

/// One item of a media group, serialized straight into the Bot API's
/// `InputMedia` shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InputMedia {
    Photo {
        media: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        caption: Option<String>,
    },
    Video {
        media: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        caption: Option<String>,
    },
}

impl InputMedia {
    pub fn set_caption(&mut self, text: String) {
        match self {
            Self::Photo { caption, .. } | Self::Video { caption, .. } => *caption = Some(text),
        }
    }

    #[must_use]
    pub fn caption(&self) -> Option<&str> {
        match self {
            Self::Photo { caption, .. } | Self::Video { caption, .. } => caption.as_deref(),
        }
    }
}

/// A document to upload: bytes are fetched from `url` at send time and
/// attached under `filename`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentUpload {
    pub url: String,
    pub filename: String,
}

/// An audio track sent by remote URL, no local fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioSend {
    pub url: String,
    pub performer: String,
    pub title: String,
    /// Derived `artist - title.mp3` name; informational, Telegram names the
    /// file itself for URL sends.
    pub filename: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollSend {
    pub question: String,
    pub options: Vec<String>,
    pub allows_multiple: bool,
}

/// The channel the mirror writes to.
///
/// No call is idempotent: a retried send is a duplicate on the destination
/// side, which is why the synchronizer only retries posts whose watermark
/// never advanced.
#[async_trait]
pub trait MessageSink: Send + Sync {
    async fn send_text(
        &self,
        text: &str,
        reply_to: Option<MessageId>,
    ) -> Result<MessageId, DeliveryError>;

    /// Send up to [`MEDIA_GROUP_LIMIT`] items as one grouped message.
    async fn send_media_group(
        &self,
        media: &[InputMedia],
        reply_to: Option<MessageId>,
    ) -> Result<Vec<MessageId>, DeliveryError>;

    async fn send_document(
        &self,
        doc: &DocumentUpload,
        reply_to: Option<MessageId>,
    ) -> Result<MessageId, DeliveryError>;

    async fn send_audio(
        &self,
        audio: &AudioSend,
        reply_to: Option<MessageId>,
    ) -> Result<MessageId, DeliveryError>;

    async fn send_poll(
        &self,
        poll: &PollSend,
        reply_to: Option<MessageId>,
    ) -> Result<MessageId, DeliveryError>;
}

/// Parsed `message_id` from a Bot API `Message` object.
#[derive(Debug, Deserialize)]
pub(crate) struct WireMessage {
    pub message_id: i64,
}
