//! Content dispatch: one (text, attachments) block to outbound messages.

use tracing::{debug, warn};

use crate::telegram::{
    DeliveryError, MessageId, MessageSink, CAPTION_LIMIT, MEDIA_GROUP_LIMIT, MESSAGE_LIMIT,
};
use crate::vk::types::Attachment;

use super::translate::{translate, SpecialSend, Translated};
use super::truncate_chars;

/// Decides, per block of text and attachments, what becomes a standalone
/// text message, what becomes a captioned media group, and what goes out as
/// dedicated follow-up messages threaded to the primary one.
pub struct ContentDispatcher<'a> {
    sink: &'a dyn MessageSink,
}

impl<'a> ContentDispatcher<'a> {
    #[must_use]
    pub fn new(sink: &'a dyn MessageSink) -> Self {
        Self { sink }
    }

    /// Deliver one content block, threading everything to `reply_to`.
    ///
    /// Returns the handle of the primary message, or `None` when the block
    /// produced no primary (a post of only special attachments announces
    /// itself purely through those). `None` is not a failure: callers use it
    /// as "no thread anchor".
    ///
    /// Special-attachment failures are absorbed and logged so one bad
    /// attachment never blocks its siblings.
    ///
    /// # Errors
    ///
    /// Returns an error only when the primary text or media-group send
    /// fails; the post then counts as undelivered.
    pub async fn dispatch(
        &self,
        text: &str,
        attachments: &[Attachment],
        reply_to: Option<MessageId>,
    ) -> Result<Option<MessageId>, DeliveryError> {
        let mut inline = Vec::new();
        let mut special = Vec::new();
        for attachment in attachments {
            match translate(attachment) {
                Translated::Inline(media) => inline.push(media),
                Translated::Special(send) => special.push(send),
                Translated::Skipped { kind, reason } => {
                    debug!(kind = %kind, reason, "Dropping attachment");
                }
            }
        }

        let text_len = text.chars().count();
        let primary = if text_len > CAPTION_LIMIT || (inline.is_empty() && !text.is_empty()) {
            // Text too long for a caption, or nothing to caption: the text
            // becomes its own message and any inline media is dropped.
            if !inline.is_empty() {
                debug!(
                    dropped = inline.len(),
                    "Text exceeds caption limit, sending without media"
                );
            }
            let id = self
                .sink
                .send_text(truncate_chars(text, MESSAGE_LIMIT), reply_to)
                .await?;
            Some(id)
        } else if !inline.is_empty() {
            if inline.len() > MEDIA_GROUP_LIMIT {
                warn!(
                    dropped = inline.len() - MEDIA_GROUP_LIMIT,
                    "Media group over platform limit, dropping extra items"
                );
                inline.truncate(MEDIA_GROUP_LIMIT);
            }
            if !text.is_empty() {
                // Fits the caption limit, guaranteed by the branch above.
                inline[0].set_caption(text.to_string());
            }
            let ids = self.sink.send_media_group(&inline, reply_to).await?;
            ids.first().copied()
        } else {
            None
        };

        let anchor = primary.or(reply_to);
        for send in &special {
            if let Err(e) = self.send_special(send, anchor).await {
                warn!(kind = send.kind(), error = %e, "Special attachment send failed");
            }
        }

        Ok(primary)
    }

    async fn send_special(
        &self,
        send: &SpecialSend,
        reply_to: Option<MessageId>,
    ) -> Result<MessageId, DeliveryError> {
        match send {
            SpecialSend::Document(doc) => self.sink.send_document(doc, reply_to).await,
            SpecialSend::Audio(audio) => self.sink.send_audio(audio, reply_to).await,
            SpecialSend::Poll(poll) => self.sink.send_poll(poll, reply_to).await,
        }
    }
}
