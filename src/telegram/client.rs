use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::config::Config;

use super::{
    AudioSend, DeliveryError, DocumentUpload, InputMedia, MessageId, MessageSink, PollSend,
    WireMessage,
};

/// Telegram Bot API client bound to one channel.
#[derive(Debug, Clone)]
pub struct TelegramClient {
    http: reqwest::Client,
    base: Url,
    token: String,
    chat_id: String,
}

/// Bot API envelope: `{"ok": true, "result": ...}` on success,
/// `{"ok": false, "error_code": ..., "description": ...}` otherwise.
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
struct ApiResponse<T> {
    ok: bool,
    #[serde(default)]
    result: Option<T>,
    #[serde(default)]
    error_code: Option<i64>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Serialize)]
struct TextRequest<'a> {
    chat_id: &'a str,
    text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_to_message_id: Option<i64>,
}

#[derive(Debug, Serialize)]
struct MediaGroupRequest<'a> {
    chat_id: &'a str,
    media: &'a [InputMedia],
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_to_message_id: Option<i64>,
}

#[derive(Debug, Serialize)]
struct AudioRequest<'a> {
    chat_id: &'a str,
    audio: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    performer: &'a str,
    #[serde(skip_serializing_if = "str::is_empty")]
    title: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_to_message_id: Option<i64>,
}

#[derive(Debug, Serialize)]
struct PollRequest<'a> {
    chat_id: &'a str,
    question: &'a str,
    options: &'a [String],
    allows_multiple_answers: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_to_message_id: Option<i64>,
}

impl TelegramClient {
    #[must_use]
    pub fn new(config: &Config, http: reqwest::Client) -> Self {
        Self {
            http,
            base: config.tg_api_base.clone(),
            token: config.tg_bot_token.clone(),
            chat_id: config.tg_channel_id.clone(),
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}bot{}/{}", self.base, self.token, method)
    }

    async fn post_json<T: DeserializeOwned>(
        &self,
        method: &str,
        body: &impl Serialize,
    ) -> Result<T, DeliveryError> {
        let response = self
            .http
            .post(self.method_url(method))
            .json(body)
            .send()
            .await?;
        Self::read_result(response).await
    }

    async fn read_result<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, DeliveryError> {
        let status = response.status();
        let body = response.bytes().await?;

        let api: ApiResponse<T> = match serde_json::from_slice(&body) {
            Ok(api) => api,
            Err(_) if !status.is_success() => return Err(DeliveryError::Status(status)),
            Err(e) => return Err(DeliveryError::Decode(e)),
        };

        if !api.ok {
            return Err(DeliveryError::Api {
                code: api.error_code.unwrap_or_default(),
                description: api
                    .description
                    .unwrap_or_else(|| "unknown error".to_string()),
            });
        }
        api.result.ok_or(DeliveryError::MissingPayload)
    }
}

#[async_trait]
impl MessageSink for TelegramClient {
    async fn send_text(
        &self,
        text: &str,
        reply_to: Option<MessageId>,
    ) -> Result<MessageId, DeliveryError> {
        let message: WireMessage = self
            .post_json(
                "sendMessage",
                &TextRequest {
                    chat_id: &self.chat_id,
                    text,
                    reply_to_message_id: reply_to.map(|id| id.0),
                },
            )
            .await?;
        Ok(MessageId(message.message_id))
    }

    async fn send_media_group(
        &self,
        media: &[InputMedia],
        reply_to: Option<MessageId>,
    ) -> Result<Vec<MessageId>, DeliveryError> {
        let messages: Vec<WireMessage> = self
            .post_json(
                "sendMediaGroup",
                &MediaGroupRequest {
                    chat_id: &self.chat_id,
                    media,
                    reply_to_message_id: reply_to.map(|id| id.0),
                },
            )
            .await?;
        Ok(messages
            .into_iter()
            .map(|m| MessageId(m.message_id))
            .collect())
    }

    async fn send_document(
        &self,
        doc: &DocumentUpload,
        reply_to: Option<MessageId>,
    ) -> Result<MessageId, DeliveryError> {
        // Telegram's by-URL document sends are picky about content types, so
        // the bytes are fetched here and re-uploaded as a file part.
        let bytes = self
            .http
            .get(&doc.url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|source| DeliveryError::MediaFetch {
                url: doc.url.clone(),
                source,
            })?
            .bytes()
            .await
            .map_err(|source| DeliveryError::MediaFetch {
                url: doc.url.clone(),
                source,
            })?;
        debug!(filename = %doc.filename, bytes = bytes.len(), "Fetched document");

        let part = reqwest::multipart::Part::bytes(bytes.to_vec()).file_name(doc.filename.clone());
        let mut form = reqwest::multipart::Form::new()
            .text("chat_id", self.chat_id.clone())
            .part("document", part);
        if let Some(id) = reply_to {
            form = form.text("reply_to_message_id", id.0.to_string());
        }

        let response = self
            .http
            .post(self.method_url("sendDocument"))
            .multipart(form)
            .send()
            .await?;
        let message: WireMessage = Self::read_result(response).await?;
        Ok(MessageId(message.message_id))
    }

    async fn send_audio(
        &self,
        audio: &AudioSend,
        reply_to: Option<MessageId>,
    ) -> Result<MessageId, DeliveryError> {
        debug!(filename = %audio.filename, "Sending audio by url");
        let message: WireMessage = self
            .post_json(
                "sendAudio",
                &AudioRequest {
                    chat_id: &self.chat_id,
                    audio: &audio.url,
                    performer: &audio.performer,
                    title: &audio.title,
                    reply_to_message_id: reply_to.map(|id| id.0),
                },
            )
            .await?;
        Ok(MessageId(message.message_id))
    }

    async fn send_poll(
        &self,
        poll: &PollSend,
        reply_to: Option<MessageId>,
    ) -> Result<MessageId, DeliveryError> {
        let message: WireMessage = self
            .post_json(
                "sendPoll",
                &PollRequest {
                    chat_id: &self.chat_id,
                    question: &poll.question,
                    options: &poll.options,
                    allows_multiple_answers: poll.allows_multiple,
                    reply_to_message_id: reply_to.map(|id| id.0),
                },
            )
            .await?;
        Ok(MessageId(message.message_id))
    }
}
