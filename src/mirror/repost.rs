//! Repost flattening: a post and its nested-repost chain become a threaded
//! message sequence.

use tracing::{debug, info, warn};

use crate::telegram::{DeliveryError, MessageId};
use crate::vk::types::Post;
use crate::vk::FeedSource;

use super::dispatch::ContentDispatcher;
use super::format_ts;

/// Deliver a post followed by its repost chain.
///
/// The post's own block goes first and yields the thread anchor. Repost
/// entries follow in reverse source order, so the level closest to the
/// original author lands first and the outermost repost lands last — the
/// channel reads "X reposted Y reposted Z" top-down. Entries without an
/// owner are skipped; a failed repost block is logged and does not stop the
/// remaining levels.
///
/// # Errors
///
/// Returns an error when the post's own primary message fails to send; the
/// caller must then leave the watermark untouched.
pub async fn deliver_with_reposts(
    source: &dyn FeedSource,
    dispatcher: &ContentDispatcher<'_>,
    post: &Post,
) -> Result<Option<MessageId>, DeliveryError> {
    let main = dispatcher.dispatch(&post.text, &post.attachments, None).await?;

    for repost in post.copy_history.iter().rev() {
        let Some(owner_id) = repost.owner_id else {
            debug!(repost_id = repost.id, "Repost entry without owner, skipping");
            continue;
        };

        let author = source.author_name(owner_id).await;
        let mut attribution = format!("\u{2198}\u{fe0f} Repost from {author}");
        if !repost.text.is_empty() {
            attribution.push_str(":\n");
            attribution.push_str(&repost.text);
        }

        if let Err(e) = dispatcher
            .dispatch(&attribution, &repost.attachments, main)
            .await
        {
            warn!(repost_id = repost.id, owner_id, error = %e, "Failed to deliver repost block");
        }
    }

    info!(post_id = post.id, date = %format_ts(post.date), "Post delivered");
    Ok(main)
}
