//! Command protocol to the HTTP API collaborator.
//!
//! The core never performs HTTP itself.  It sends typed commands into a
//! channel served by whatever transport task the host wires up, with
//! oneshot reply channels for the calls it needs answers from.  Tests
//! serve the channel with an in-process fake.

use tokio::sync::{mpsc, oneshot};
use tracing::warn;

use parley_shared::protocol::{Message, TypingSignal};
use parley_shared::types::{MediaKind, RoomId};

/// Errors surfaced to callers of the gateway.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// The transport reported a request failure.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The transport task is gone (channel closed, no reply).
    #[error("Gateway task stopped")]
    Closed,
}

pub type Result<T> = std::result::Result<T, GatewayError>;

/// A local file attached to a draft, described by metadata only.  The
/// transport resolves `preview_uri` to the actual bytes; the core never
/// touches file contents.
#[derive(Debug, Clone)]
pub struct OutgoingAttachment {
    pub file_name: String,
    pub mime_type: String,
    /// Local object/preview URI, shown until the server copy exists.
    pub preview_uri: String,
}

impl OutgoingAttachment {
    /// Coarse media kind, from the MIME type.
    pub fn kind(&self) -> MediaKind {
        MediaKind::from_mime(&self.mime_type)
    }

    /// Lowercased file-name extension, empty if there is none.
    pub fn format(&self) -> String {
        self.file_name
            .rsplit_once('.')
            .map(|(_, ext)| ext.to_lowercase())
            .unwrap_or_default()
    }
}

/// An outbound message draft: optional trimmed text plus attachments.
#[derive(Debug, Clone)]
pub struct OutgoingMessage {
    pub text: Option<String>,
    pub attachments: Vec<OutgoingAttachment>,
}

/// Progress of an in-flight multipart upload.
#[derive(Debug, Clone, Copy)]
pub struct UploadProgress {
    pub loaded: u64,
    pub total: u64,
}

impl UploadProgress {
    /// Percent complete, 0..=100, rounded.
    pub fn percent(&self) -> i32 {
        (self.loaded as f64 * 100.0 / self.total.max(1) as f64).round() as i32
    }
}

/// Commands served by the transport task.
#[derive(Debug)]
pub enum GatewayCommand {
    /// `GET messages?room=<id>&page=<n>`.  Replies with the page,
    /// oldest-first; an empty page signals end of history.
    FetchPage {
        room: RoomId,
        page: u32,
        reply: oneshot::Sender<Result<Vec<Message>>>,
    },
    /// `POST messages?room=<id>` with a multipart body.  Upload progress,
    /// when requested, streams on the provided channel.
    PostMessage {
        room: RoomId,
        draft: OutgoingMessage,
        progress: Option<mpsc::UnboundedSender<UploadProgress>>,
        reply: oneshot::Sender<Result<()>>,
    },
    /// `POST typing` with the JSON signal body.  Fire-and-forget.
    PostTyping { signal: TypingSignal },
}

/// Caller-side handle wrapping the command channel.
#[derive(Clone)]
pub struct Gateway {
    cmd_tx: mpsc::Sender<GatewayCommand>,
}

impl Gateway {
    pub fn new(cmd_tx: mpsc::Sender<GatewayCommand>) -> Self {
        Self { cmd_tx }
    }

    /// Build a gateway plus the receiving half a transport task serves.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<GatewayCommand>) {
        let (cmd_tx, cmd_rx) = mpsc::channel(capacity);
        (Self::new(cmd_tx), cmd_rx)
    }

    /// Fetch one page of room history.
    pub async fn fetch_page(&self, room: RoomId, page: u32) -> Result<Vec<Message>> {
        let (reply, rx) = oneshot::channel();
        self.cmd_tx
            .send(GatewayCommand::FetchPage { room, page, reply })
            .await
            .map_err(|_| GatewayError::Closed)?;
        rx.await.map_err(|_| GatewayError::Closed)?
    }

    /// Post an outbound message, optionally streaming upload progress.
    pub async fn post_message(
        &self,
        room: RoomId,
        draft: OutgoingMessage,
        progress: Option<mpsc::UnboundedSender<UploadProgress>>,
    ) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.cmd_tx
            .send(GatewayCommand::PostMessage {
                room,
                draft,
                progress,
                reply,
            })
            .await
            .map_err(|_| GatewayError::Closed)?;
        rx.await.map_err(|_| GatewayError::Closed)?
    }

    /// Post a typing signal.  No reply is awaited; a full or closed
    /// channel only logs, since indicator loss is harmless.
    pub fn post_typing(&self, signal: TypingSignal) {
        if let Err(e) = self.cmd_tx.try_send(GatewayCommand::PostTyping { signal }) {
            warn!(error = %e, "Dropping typing signal");
        }
    }
}
