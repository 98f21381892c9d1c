//! The poll loop: watermark-based delta detection and ordered delivery.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::state::WatermarkStore;
use crate::telegram::MessageSink;
use crate::vk::types::Post;
use crate::vk::{FeedSource, FetchError};

use super::dispatch::ContentDispatcher;
use super::repost::deliver_with_reposts;

/// Posts newer than the watermark, oldest first.
///
/// The feed returns newest-first; delivery must replay history in
/// chronological order so reply threads and "new since last check" semantics
/// hold even across a backlog.
#[must_use]
pub fn pending_after(posts: Vec<Post>, watermark: i64) -> Vec<Post> {
    let mut fresh: Vec<Post> = posts.into_iter().filter(|p| p.id > watermark).collect();
    fresh.sort_by_key(|p| p.id);
    fresh
}

/// Drives the poll cycle: fetch, delta, deliver, advance.
pub struct Synchronizer {
    source: Arc<dyn FeedSource>,
    sink: Arc<dyn MessageSink>,
    store: WatermarkStore,
    page_size: u32,
    poll_interval: std::time::Duration,
    throttle: std::time::Duration,
}

impl Synchronizer {
    #[must_use]
    pub fn new(
        source: Arc<dyn FeedSource>,
        sink: Arc<dyn MessageSink>,
        store: WatermarkStore,
        config: &Config,
    ) -> Self {
        Self {
            source,
            sink,
            store,
            page_size: config.page_size,
            poll_interval: config.poll_interval,
            throttle: config.throttle,
        }
    }

    /// Run the poll loop forever. Transient faults never escape: a failed
    /// cycle is logged and retried after the poll interval.
    pub async fn run(mut self) {
        loop {
            match self.cycle().await {
                Ok(0) => debug!("No new posts"),
                Ok(delivered) => info!(delivered, "Cycle complete"),
                Err(e) => error!(error = %e, "Poll cycle failed"),
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }

    /// One poll cycle. Returns the number of posts delivered.
    ///
    /// Posts go out strictly in ascending id order, with the throttle pause
    /// between consecutive posts — deliberate backpressure against flooding
    /// the channel with a backlog. The watermark advances after each
    /// individual success, never on failure; a failed post is re-seen next
    /// cycle unless a later post already advanced past it.
    ///
    /// # Errors
    ///
    /// Returns an error when the feed fetch fails; delivery and persistence
    /// failures are absorbed per post and logged.
    pub async fn cycle(&mut self) -> Result<usize, FetchError> {
        let fetched = self.source.recent_posts(self.page_size).await?;
        let pending = pending_after(fetched, self.store.current());
        if pending.is_empty() {
            return Ok(0);
        }
        info!(count = pending.len(), watermark = self.store.current(), "New posts to deliver");

        let dispatcher = ContentDispatcher::new(self.sink.as_ref());
        let mut delivered = 0;
        for (i, post) in pending.iter().enumerate() {
            if i > 0 {
                debug!(secs = self.throttle.as_secs(), "Throttling before next post");
                tokio::time::sleep(self.throttle).await;
            }

            match deliver_with_reposts(self.source.as_ref(), &dispatcher, post).await {
                Ok(_) => {
                    delivered += 1;
                    // Persist before the next post so a crash here re-sends
                    // nothing already delivered.
                    if let Err(e) = self.store.advance(post.id).await {
                        error!(post_id = post.id, error = %e, "WATERMARK WRITE FAILED - posts up to this id will be re-sent after a restart");
                    }
                }
                Err(e) => {
                    warn!(post_id = post.id, error = %e, "Failed to deliver post");
                }
            }
        }
        Ok(delivered)
    }

    /// The current watermark, for observability and tests.
    #[must_use]
    pub fn watermark(&self) -> i64 {
        self.store.current()
    }
}
