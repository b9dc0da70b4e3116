use tokio::sync::mpsc;

use parley_shared::protocol::TypingEvent;

use crate::composer::UploadMarker;

/// Notifications pushed to the rendering layer.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// The room message list changed (insert, reconcile, edit, recall,
    /// or history prepend).  The renderer re-reads the snapshot.
    MessagesChanged,
    /// A page fetch started or settled; `page` is the page in flight,
    /// `None` once it resolves.  Covers both the initial load and
    /// older-page fetches.
    LoadingChanged { page: Option<u32> },
    /// The remote typing slot was overwritten.
    RemoteTyping(TypingEvent),
    /// The upload progress marker moved.
    UploadProgress(UploadMarker),
}

pub fn emit_event(tx: &mpsc::UnboundedSender<SessionEvent>, event: SessionEvent) {
    if tx.send(event).is_err() {
        tracing::debug!("Session event receiver gone, dropping event");
    }
}
