//! Integration tests for the content dispatcher and repost flattener,
//! running against an in-memory message sink.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use wallcaster::mirror::dispatch::ContentDispatcher;
use wallcaster::mirror::repost::deliver_with_reposts;
use wallcaster::telegram::{
    AudioSend, DeliveryError, DocumentUpload, InputMedia, MessageId, MessageSink, PollSend,
};
use wallcaster::vk::types::{Attachment, Doc, Photo, PhotoSize, Poll, PollAnswer, Post};
use wallcaster::vk::{FeedSource, FetchError, UNKNOWN_AUTHOR};

#[derive(Debug, Clone, PartialEq)]
enum Sent {
    Text { text: String, reply_to: Option<i64> },
    Group { media: Vec<InputMedia>, reply_to: Option<i64> },
    Document { filename: String, reply_to: Option<i64> },
    Audio { title: String, reply_to: Option<i64> },
    Poll { question: String, options: Vec<String>, reply_to: Option<i64> },
}

/// Message sink that records every call and hands out sequential ids.
struct RecordingSink {
    calls: Mutex<Vec<Sent>>,
    next_id: AtomicI64,
    fail_texts: bool,
    fail_documents: bool,
}

impl RecordingSink {
    fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            next_id: AtomicI64::new(1),
            fail_texts: false,
            fail_documents: false,
        }
    }

    fn failing_documents() -> Self {
        Self {
            fail_documents: true,
            ..Self::new()
        }
    }

    fn failing_texts() -> Self {
        Self {
            fail_texts: true,
            ..Self::new()
        }
    }

    fn sent(&self) -> Vec<Sent> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: Sent) -> MessageId {
        self.calls.lock().unwrap().push(call);
        MessageId(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    fn refuse() -> DeliveryError {
        DeliveryError::Api {
            code: 500,
            description: "refused by test".to_string(),
        }
    }
}

#[async_trait]
impl MessageSink for RecordingSink {
    async fn send_text(
        &self,
        text: &str,
        reply_to: Option<MessageId>,
    ) -> Result<MessageId, DeliveryError> {
        if self.fail_texts {
            return Err(Self::refuse());
        }
        Ok(self.record(Sent::Text {
            text: text.to_string(),
            reply_to: reply_to.map(|id| id.0),
        }))
    }

    async fn send_media_group(
        &self,
        media: &[InputMedia],
        reply_to: Option<MessageId>,
    ) -> Result<Vec<MessageId>, DeliveryError> {
        let first = self.record(Sent::Group {
            media: media.to_vec(),
            reply_to: reply_to.map(|id| id.0),
        });
        let mut ids = vec![first];
        for _ in 1..media.len() {
            ids.push(MessageId(self.next_id.fetch_add(1, Ordering::SeqCst)));
        }
        Ok(ids)
    }

    async fn send_document(
        &self,
        doc: &DocumentUpload,
        reply_to: Option<MessageId>,
    ) -> Result<MessageId, DeliveryError> {
        if self.fail_documents {
            return Err(Self::refuse());
        }
        Ok(self.record(Sent::Document {
            filename: doc.filename.clone(),
            reply_to: reply_to.map(|id| id.0),
        }))
    }

    async fn send_audio(
        &self,
        audio: &AudioSend,
        reply_to: Option<MessageId>,
    ) -> Result<MessageId, DeliveryError> {
        Ok(self.record(Sent::Audio {
            title: audio.title.clone(),
            reply_to: reply_to.map(|id| id.0),
        }))
    }

    async fn send_poll(
        &self,
        poll: &PollSend,
        reply_to: Option<MessageId>,
    ) -> Result<MessageId, DeliveryError> {
        Ok(self.record(Sent::Poll {
            question: poll.question.clone(),
            options: poll.options.clone(),
            reply_to: reply_to.map(|id| id.0),
        }))
    }
}

/// Feed source with a fixed author directory, for repost attribution.
struct StaticSource {
    names: HashMap<i64, String>,
}

#[async_trait]
impl FeedSource for StaticSource {
    async fn recent_posts(&self, _count: u32) -> Result<Vec<Post>, FetchError> {
        Ok(Vec::new())
    }

    async fn author_name(&self, owner_id: i64) -> String {
        self.names
            .get(&owner_id)
            .cloned()
            .unwrap_or_else(|| UNKNOWN_AUTHOR.to_string())
    }
}

fn photo(url: &str) -> Attachment {
    Attachment::Photo {
        photo: Photo {
            sizes: vec![PhotoSize {
                width: 800,
                url: url.to_string(),
            }],
        },
    }
}

fn doc(title: &str) -> Attachment {
    Attachment::Doc {
        doc: Doc {
            url: format!("https://files.example/{title}"),
            title: title.to_string(),
            ext: "pdf".to_string(),
        },
    }
}

fn poll(question: &str) -> Attachment {
    Attachment::Poll {
        poll: Poll {
            question: question.to_string(),
            answers: vec![
                PollAnswer { text: "yes".to_string() },
                PollAnswer { text: "no".to_string() },
            ],
            multiple: false,
        },
    }
}

fn bare_post(id: i64, owner_id: Option<i64>, text: &str) -> Post {
    Post {
        id,
        owner_id,
        date: 1_700_000_000 + id,
        text: text.to_string(),
        attachments: Vec::new(),
        copy_history: Vec::new(),
    }
}

#[tokio::test]
async fn test_long_text_with_photo_sends_text_only() {
    let sink = RecordingSink::new();
    let dispatcher = ContentDispatcher::new(&sink);

    let text = "x".repeat(2000);
    let result = dispatcher
        .dispatch(&text, &[photo("https://img/1")], None)
        .await
        .unwrap();

    assert!(result.is_some());
    let sent = sink.sent();
    assert_eq!(sent.len(), 1);
    assert!(matches!(&sent[0], Sent::Text { text: t, .. } if t.len() == 2000));
}

#[tokio::test]
async fn test_short_text_with_photos_sends_captioned_group() {
    let sink = RecordingSink::new();
    let dispatcher = ContentDispatcher::new(&sink);

    let attachments = [photo("a"), photo("b"), photo("c")];
    let result = dispatcher.dispatch("hello", &attachments, None).await.unwrap();

    assert_eq!(result, Some(MessageId(1)));
    let sent = sink.sent();
    assert_eq!(sent.len(), 1);
    let Sent::Group { media, reply_to } = &sent[0] else {
        panic!("expected a media group, got {sent:?}");
    };
    assert_eq!(media.len(), 3);
    assert_eq!(media[0].caption(), Some("hello"));
    assert_eq!(media[1].caption(), None);
    assert_eq!(*reply_to, None);
}

#[tokio::test]
async fn test_media_group_capped_at_ten_items() {
    let sink = RecordingSink::new();
    let dispatcher = ContentDispatcher::new(&sink);

    let attachments: Vec<Attachment> = (0..11).map(|i| photo(&format!("img-{i}"))).collect();
    dispatcher.dispatch("", &attachments, None).await.unwrap();

    let sent = sink.sent();
    let Sent::Group { media, .. } = &sent[0] else {
        panic!("expected a media group");
    };
    assert_eq!(media.len(), 10);
}

#[tokio::test]
async fn test_text_truncated_to_message_limit() {
    let sink = RecordingSink::new();
    let dispatcher = ContentDispatcher::new(&sink);

    dispatcher.dispatch(&"y".repeat(5000), &[], None).await.unwrap();

    let sent = sink.sent();
    assert!(matches!(&sent[0], Sent::Text { text, .. } if text.chars().count() == 4096));
}

#[tokio::test]
async fn test_special_only_post_has_no_anchor() {
    let sink = RecordingSink::new();
    let dispatcher = ContentDispatcher::new(&sink);

    let attachments = [doc("paper"), poll("lunch?")];
    let result = dispatcher
        .dispatch("", &attachments, Some(MessageId(77)))
        .await
        .unwrap();

    assert_eq!(result, None);
    let sent = sink.sent();
    assert_eq!(sent.len(), 2);
    // No primary message, so specials thread to the caller's anchor.
    assert!(matches!(&sent[0], Sent::Document { reply_to: Some(77), .. }));
    assert!(matches!(&sent[1], Sent::Poll { reply_to: Some(77), .. }));
}

#[tokio::test]
async fn test_specials_thread_to_primary_message() {
    let sink = RecordingSink::new();
    let dispatcher = ContentDispatcher::new(&sink);

    dispatcher
        .dispatch("note", &[doc("paper")], None)
        .await
        .unwrap();

    let sent = sink.sent();
    assert!(matches!(&sent[0], Sent::Text { reply_to: None, .. }));
    assert!(matches!(&sent[1], Sent::Document { reply_to: Some(1), .. }));
}

#[tokio::test]
async fn test_document_failure_does_not_block_poll() {
    let sink = RecordingSink::failing_documents();
    let dispatcher = ContentDispatcher::new(&sink);

    let attachments = [doc("paper"), poll("lunch?")];
    let result = dispatcher.dispatch("", &attachments, None).await.unwrap();

    assert_eq!(result, None);
    let sent = sink.sent();
    assert_eq!(sent.len(), 1);
    assert!(matches!(&sent[0], Sent::Poll { question, .. } if question == "lunch?"));
}

#[tokio::test]
async fn test_primary_send_failure_propagates() {
    let sink = RecordingSink::failing_texts();
    let dispatcher = ContentDispatcher::new(&sink);

    let result = dispatcher.dispatch("hello", &[], None).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_repost_chain_delivered_deepest_first() {
    let sink = RecordingSink::new();
    let dispatcher = ContentDispatcher::new(&sink);
    let source = StaticSource {
        names: HashMap::from([
            (3, "Alice Smith".to_string()),
            (-4, "My Club".to_string()),
        ]),
    };

    let mut post = bare_post(10, Some(-1), "main text");
    post.copy_history = vec![
        bare_post(9, Some(3), "outer text"),
        bare_post(8, Some(-4), "original text"),
    ];

    let main = deliver_with_reposts(&source, &dispatcher, &post)
        .await
        .unwrap();
    assert_eq!(main, Some(MessageId(1)));

    let sent = sink.sent();
    assert_eq!(sent.len(), 3);
    assert!(matches!(&sent[0], Sent::Text { text, reply_to: None } if text == "main text"));
    // Deepest level (closest to the original author) lands first.
    let Sent::Text { text, reply_to } = &sent[1] else {
        panic!("expected text");
    };
    assert!(text.contains("Repost from My Club"));
    assert!(text.ends_with(":\noriginal text"));
    assert_eq!(*reply_to, Some(1));
    let Sent::Text { text, reply_to } = &sent[2] else {
        panic!("expected text");
    };
    assert!(text.contains("Repost from Alice Smith"));
    assert_eq!(*reply_to, Some(1));
}

#[tokio::test]
async fn test_repost_without_owner_is_skipped() {
    let sink = RecordingSink::new();
    let dispatcher = ContentDispatcher::new(&sink);
    let source = StaticSource {
        names: HashMap::from([(5, "Bob Jones".to_string())]),
    };

    let mut post = bare_post(10, Some(-1), "main text");
    post.copy_history = vec![
        bare_post(9, None, "unattributable outer"),
        bare_post(8, Some(5), "inner"),
    ];

    deliver_with_reposts(&source, &dispatcher, &post)
        .await
        .unwrap();

    let sent = sink.sent();
    // Main message plus the inner level only; the ownerless outer level is gone.
    assert_eq!(sent.len(), 2);
    assert!(matches!(&sent[1], Sent::Text { text, reply_to: Some(1) } if text.contains("Bob Jones")));
}

#[tokio::test]
async fn test_repost_failure_does_not_block_other_levels() {
    // Text sends fail, so the main post must carry media to survive while
    // the text-only repost levels fail and are absorbed.
    let sink = RecordingSink::failing_texts();
    let dispatcher = ContentDispatcher::new(&sink);
    let source = StaticSource { names: HashMap::new() };

    let mut post = bare_post(10, Some(-1), "");
    post.attachments = vec![photo("main-img")];
    post.copy_history = vec![bare_post(9, Some(3), "text level")];

    let main = deliver_with_reposts(&source, &dispatcher, &post)
        .await
        .unwrap();
    assert!(main.is_some());
    assert_eq!(sink.sent().len(), 1);
}
