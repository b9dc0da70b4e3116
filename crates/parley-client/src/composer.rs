//! Outgoing message preparation.
//!
//! The composer turns a draft into the pair the send path needs: the
//! optimistic entry shown immediately, and the outbound draft handed to
//! the gateway.  It also owns the transient upload marker the rendering
//! layer reads to decorate an in-flight optimistic message.

use chrono::{DateTime, Utc};

use parley_net::gateway::{OutgoingAttachment, OutgoingMessage};
use parley_shared::constants::UPLOAD_PROGRESS_NONE;
use parley_shared::protocol::{Attachment, Message};
use parley_shared::types::{MessageId, UserId};

/// The local authenticated user, as the engine needs to know them.
#[derive(Debug, Clone)]
pub struct LocalUser {
    pub id: UserId,
    pub username: String,
    pub avatar: Option<String>,
}

/// Transient (message id, percent) pair for an in-flight upload.
/// Percent −1 means "none".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadMarker {
    pub id: Option<MessageId>,
    pub percent: i32,
}

impl UploadMarker {
    pub fn none() -> Self {
        Self {
            id: None,
            percent: UPLOAD_PROGRESS_NONE,
        }
    }

    /// Record a progress report.  A completed upload collapses straight
    /// back to the none sentinel.
    pub fn update(&mut self, id: MessageId, percent: i32) {
        if percent >= 100 {
            *self = Self::none();
        } else {
            self.id = Some(id);
            self.percent = percent;
        }
    }
}

impl Default for UploadMarker {
    fn default() -> Self {
        Self::none()
    }
}

/// What the user asked to send.
#[derive(Debug, Clone, Default)]
pub struct Draft {
    pub text: String,
    pub attachments: Vec<OutgoingAttachment>,
}

/// A prepared send: the optimistic entry plus the outbound draft.
#[derive(Debug, Clone)]
pub struct Submission {
    pub fake: Message,
    pub outgoing: OutgoingMessage,
}

/// Builds submissions on behalf of one local user.
#[derive(Debug, Clone)]
pub struct Composer {
    user: LocalUser,
}

impl Composer {
    pub fn new(user: LocalUser) -> Self {
        Self { user }
    }

    pub fn user(&self) -> &LocalUser {
        &self.user
    }

    /// Prepare a draft for sending at `now`.
    ///
    /// Text is trimmed; a draft with neither text nor attachments yields
    /// `None`.  The optimistic entry gets a negative id derived from the
    /// submission instant, `sending=true`, `isFake=true`, and attachment
    /// stubs pointing at local preview URIs.
    pub fn prepare(&self, draft: Draft, now: DateTime<Utc>) -> Option<Submission> {
        let text = draft.text.trim();
        if text.is_empty() && draft.attachments.is_empty() {
            return None;
        }

        let fake_id = MessageId::optimistic(now.timestamp_millis());
        let attachments = draft
            .attachments
            .iter()
            .map(|a| Attachment {
                id: fake_id.0,
                name: String::new(),
                source: a.preview_uri.clone(),
                kind: a.kind(),
                format: a.format(),
                description: String::new(),
            })
            .collect();

        let body = (!text.is_empty()).then(|| text.to_string());
        let fake = Message {
            id: fake_id,
            message: body.clone(),
            sender: self.user.username.clone(),
            sent_on: now,
            attachments,
            sending: true,
            is_fake: true,
            is_updated: false,
        };

        Some(Submission {
            fake,
            outgoing: OutgoingMessage {
                text: body,
                attachments: draft.attachments,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use parley_shared::types::MediaKind;

    fn composer() -> Composer {
        Composer::new(LocalUser {
            id: UserId(7),
            username: "you".into(),
            avatar: None,
        })
    }

    fn at() -> DateTime<Utc> {
        Utc.timestamp_millis_opt(1_700_000_000_000).unwrap()
    }

    #[test]
    fn test_empty_draft_is_rejected() {
        assert!(composer().prepare(Draft::default(), at()).is_none());

        let whitespace = Draft {
            text: "   ".into(),
            attachments: Vec::new(),
        };
        assert!(composer().prepare(whitespace, at()).is_none());
    }

    #[test]
    fn test_text_submission_builds_optimistic_entry() {
        let draft = Draft {
            text: "  hi there  ".into(),
            attachments: Vec::new(),
        };
        let submission = composer().prepare(draft, at()).unwrap();

        let fake = &submission.fake;
        assert_eq!(fake.id, MessageId(-1_700_000_000_000));
        assert!(fake.id.is_optimistic());
        assert_eq!(fake.message.as_deref(), Some("hi there"));
        assert_eq!(fake.sender, "you");
        assert!(fake.sending);
        assert!(fake.is_fake);
        assert_eq!(submission.outgoing.text.as_deref(), Some("hi there"));
    }

    #[test]
    fn test_attachment_only_submission() {
        let draft = Draft {
            text: String::new(),
            attachments: vec![OutgoingAttachment {
                file_name: "clip.webm".into(),
                mime_type: "video/webm".into(),
                preview_uri: "blob:preview-1".into(),
            }],
        };
        let submission = composer().prepare(draft, at()).unwrap();

        let fake = &submission.fake;
        assert!(fake.message.is_none());
        assert_eq!(fake.attachments.len(), 1);

        let stub = &fake.attachments[0];
        assert_eq!(stub.source, "blob:preview-1");
        assert_eq!(stub.kind, MediaKind::Video);
        assert_eq!(stub.format, "webm");
        assert!(stub.id < 0);
        assert_eq!(submission.outgoing.attachments.len(), 1);
    }

    #[test]
    fn test_upload_marker_collapses_at_completion() {
        let mut marker = UploadMarker::none();
        marker.update(MessageId(-5), 40);
        assert_eq!(marker.id, Some(MessageId(-5)));
        assert_eq!(marker.percent, 40);

        marker.update(MessageId(-5), 100);
        assert_eq!(marker, UploadMarker::none());
        assert_eq!(marker.percent, UPLOAD_PROGRESS_NONE);
    }
}
