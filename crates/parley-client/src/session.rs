//! Per-room glue: one [`RoomSession`] wires the message store, the
//! pagination controller and the typing machinery to the push hub and
//! the API gateway, and notifies the rendering layer through
//! [`SessionEvent`]s.
//!
//! All list mutations happen under one lock on the caller's task or the
//! pump task; every handler runs to completion, so no mutation ever
//! observes another one mid-flight.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use parley_net::gateway::{Gateway, UploadProgress};
use parley_net::hub::RealtimeHub;
use parley_net::topics::{chat_topic, typing_topic};
use parley_shared::constants::FIRST_PAGE;
use parley_shared::protocol::{Message, TypingEvent};
use parley_shared::types::{MessageId, RoomId};
use parley_store::MessageStore;

use crate::composer::{Composer, Draft, LocalUser, Submission, UploadMarker};
use crate::events::{emit_event, SessionEvent};
use crate::scroll::{jump_button_visible, Paginator, ScrollViewport};
use crate::typing::{TypingTracker, TypingWatch};

/// Everything the session mutates, behind one lock.
pub struct RoomState {
    pub store: MessageStore,
    pub paginator: Paginator,
    pub typing_watch: TypingWatch,
    pub upload: UploadMarker,
}

/// An open room: subscriptions held, pump running, ready for input.
pub struct RoomSession {
    room: RoomId,
    composer: Composer,
    gateway: Gateway,
    state: Arc<Mutex<RoomState>>,
    events_tx: mpsc::UnboundedSender<SessionEvent>,
    typing: TypingTracker,
    pump: JoinHandle<()>,
    _signal_pump: JoinHandle<()>,
}

impl RoomSession {
    /// Subscribe to the room's message and typing topics and start the
    /// pump.  The returned receiver is the rendering layer's feed.
    pub fn open(
        room: RoomId,
        user: LocalUser,
        hub: &RealtimeHub,
        gateway: Gateway,
    ) -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let state = Arc::new(Mutex::new(RoomState {
            store: MessageStore::new(),
            paginator: Paginator::new(),
            typing_watch: TypingWatch::new(user.id),
            upload: UploadMarker::none(),
        }));
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        // Outbound typing signals: tracker -> channel -> gateway.
        let (signal_tx, mut signal_rx) = mpsc::unbounded_channel();
        let typing = TypingTracker::new(room, user.id, user.avatar.clone(), signal_tx);
        let signal_gateway = gateway.clone();
        let signal_pump = tokio::spawn(async move {
            while let Some(signal) = signal_rx.recv().await {
                signal_gateway.post_typing(signal);
            }
        });

        let mut chat_sub = hub.subscribe(&chat_topic(room));
        let mut typing_sub = hub.subscribe(&typing_topic(room));
        let pump_state = Arc::clone(&state);
        let pump_events = events_tx.clone();
        let pump = tokio::spawn(async move {
            loop {
                tokio::select! {
                    payload = chat_sub.recv() => {
                        let Some(payload) = payload else { break };
                        match Message::from_value(payload) {
                            Ok(msg) => {
                                {
                                    let mut state =
                                        pump_state.lock().expect("room state lock poisoned");
                                    state.store.on_realtime_message(msg);
                                }
                                emit_event(&pump_events, SessionEvent::MessagesChanged);
                            }
                            Err(e) => warn!(error = %e, "Undecodable chat payload"),
                        }
                    }
                    payload = typing_sub.recv() => {
                        let Some(payload) = payload else { break };
                        match TypingEvent::from_value(payload) {
                            Ok(event) => {
                                let stored = pump_state
                                    .lock()
                                    .expect("room state lock poisoned")
                                    .typing_watch
                                    .on_event(event.clone());
                                if stored {
                                    emit_event(&pump_events, SessionEvent::RemoteTyping(event));
                                }
                            }
                            Err(e) => warn!(error = %e, "Undecodable typing payload"),
                        }
                    }
                }
            }
        });

        info!(room = %room, "Room session opened");

        let session = Self {
            room,
            composer: Composer::new(user),
            gateway,
            state,
            events_tx,
            typing,
            pump,
            _signal_pump: signal_pump,
        };
        (session, events_rx)
    }

    fn lock_state(&self) -> MutexGuard<'_, RoomState> {
        self.state.lock().expect("room state lock poisoned")
    }

    pub fn room(&self) -> RoomId {
        self.room
    }

    /// Fetch page 1 and replace the list.  A result that lands after
    /// another load started (fast room switching) is discarded by the
    /// store's ticket check.
    pub async fn load_initial(&self) {
        let ticket = self.lock_state().store.begin_initial_load(self.room);
        emit_event(
            &self.events_tx,
            SessionEvent::LoadingChanged {
                page: Some(FIRST_PAGE),
            },
        );

        match self.gateway.fetch_page(self.room, FIRST_PAGE).await {
            Ok(page) => {
                let applied = self.lock_state().store.complete_initial_load(ticket, page);
                if applied {
                    emit_event(&self.events_tx, SessionEvent::MessagesChanged);
                }
            }
            Err(e) => {
                warn!(room = %self.room, error = %e, "Initial load failed");
                self.lock_state().store.fail_initial_load(ticket);
            }
        }

        let page = self.lock_state().store.loading_page();
        emit_event(&self.events_tx, SessionEvent::LoadingChanged { page });
    }

    /// Send a draft: the optimistic entry is in the list before the
    /// outbound post is issued, so a send is never invisible.
    ///
    /// A transport failure leaves the optimistic entry stuck with
    /// `sending=true`; no rollback or error marker.
    pub async fn submit(&self, draft: Draft) {
        let Some(Submission { fake, outgoing }) = self.composer.prepare(draft, Utc::now()) else {
            return;
        };
        let fake_id = fake.id;

        self.typing.on_submit();
        self.lock_state().store.insert_optimistic(fake);
        emit_event(&self.events_tx, SessionEvent::MessagesChanged);

        let progress = if outgoing.attachments.is_empty() {
            None
        } else {
            let (tx, mut rx) = mpsc::unbounded_channel::<UploadProgress>();
            let state = Arc::clone(&self.state);
            let events = self.events_tx.clone();
            tokio::spawn(async move {
                while let Some(report) = rx.recv().await {
                    let marker = {
                        let mut state = state.lock().expect("room state lock poisoned");
                        state.upload.update(fake_id, report.percent());
                        state.upload
                    };
                    emit_event(&events, SessionEvent::UploadProgress(marker));
                }
            });
            Some(tx)
        };

        if let Err(e) = self.gateway.post_message(self.room, outgoing, progress).await {
            warn!(room = %self.room, id = %fake_id, error = %e, "Send failed");
        }
    }

    /// Handle one scroll event: evaluate the near-top pagination trigger
    /// (fetching, prepending and restoring the offset when it fires) and
    /// return whether the jump-to-bottom affordance should be visible.
    pub async fn on_scroll<V: ScrollViewport>(&self, view: &mut V) -> bool {
        let jump_visible = jump_button_visible(view);

        let fetch = self.lock_state().paginator.on_scroll(view);
        if let Some(fetch) = fetch {
            emit_event(
                &self.events_tx,
                SessionEvent::LoadingChanged {
                    page: Some(fetch.page),
                },
            );
            match self.gateway.fetch_page(self.room, fetch.page).await {
                Ok(page) => {
                    let prepended = {
                        let mut state = self.lock_state();
                        let n = state.store.prepend_page(page);
                        state.paginator.finish(&fetch, n);
                        n
                    };
                    if prepended > 0 {
                        emit_event(&self.events_tx, SessionEvent::MessagesChanged);
                        fetch.restore(view).await;
                    }
                    // The guard opens only after the deferred restore.
                    self.lock_state().paginator.release(&fetch);
                }
                Err(e) => {
                    warn!(room = %self.room, page = fetch.page, error = %e, "Page fetch failed");
                    self.lock_state().paginator.abort(&fetch);
                }
            }
            emit_event(&self.events_tx, SessionEvent::LoadingChanged { page: None });
        }

        jump_visible
    }

    /// Feed the composer text after a keystroke (drives the typing
    /// debounce).
    pub fn on_input(&self, text: &str) {
        self.typing.on_input(text);
    }

    /// Apply a server-confirmed edit.
    pub fn edit_message(
        &self,
        id: MessageId,
        new_body: impl Into<String>,
        sending: bool,
        is_updated: bool,
    ) {
        self.lock_state()
            .store
            .edit_message(id, new_body, sending, is_updated);
        emit_event(&self.events_tx, SessionEvent::MessagesChanged);
    }

    /// Apply a server-confirmed recall (tombstone, not removal).
    pub fn delete_message(&self, id: MessageId) {
        self.lock_state().store.delete_message(id);
        emit_event(&self.events_tx, SessionEvent::MessagesChanged);
    }

    // -- Snapshots for the rendering layer --

    pub fn messages(&self) -> Vec<Message> {
        self.lock_state().store.messages().to_vec()
    }

    pub fn loading_page(&self) -> Option<u32> {
        self.lock_state().store.loading_page()
    }

    pub fn has_more(&self) -> bool {
        self.lock_state().paginator.has_more()
    }

    pub fn is_loading_more(&self) -> bool {
        self.lock_state().paginator.is_loading_more()
    }

    pub fn upload_marker(&self) -> UploadMarker {
        self.lock_state().upload
    }

    /// The remote typing event currently active, TTL included.
    pub fn remote_typing(&self) -> Option<TypingEvent> {
        let now_ms = Utc::now().timestamp_millis();
        self.lock_state().typing_watch.active_at(now_ms).cloned()
    }

    /// Tear the session down: final stop-typing goes out if needed, the
    /// pump stops, subscriptions drop.
    pub fn close(&self) {
        self.typing.shutdown();
        self.pump.abort();
        info!(room = %self.room, "Room session closed");
    }
}

impl Drop for RoomSession {
    fn drop(&mut self) {
        self.pump.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_net::gateway::{GatewayCommand, GatewayError, OutgoingAttachment};
    use parley_shared::types::UserId;
    use serde_json::json;

    fn user() -> LocalUser {
        LocalUser {
            id: UserId(7),
            username: "you".into(),
            avatar: None,
        }
    }

    struct FakeViewport {
        top: f64,
        height: f64,
        client: f64,
    }

    impl ScrollViewport for FakeViewport {
        fn scroll_top(&self) -> f64 {
            self.top
        }
        fn scroll_height(&self) -> f64 {
            self.height
        }
        fn client_height(&self) -> f64 {
            self.client
        }
        fn set_scroll_top(&mut self, offset: f64) {
            self.top = offset;
        }
    }

    /// Serve the gateway with a fixed page per fetch and Ok posts.
    fn serve_pages(mut cmd_rx: mpsc::Receiver<GatewayCommand>, pages: Vec<Vec<serde_json::Value>>) {
        tokio::spawn(async move {
            while let Some(cmd) = cmd_rx.recv().await {
                match cmd {
                    GatewayCommand::FetchPage { page, reply, .. } => {
                        let body = pages
                            .get((page - 1) as usize)
                            .cloned()
                            .unwrap_or_default()
                            .into_iter()
                            .map(|v| serde_json::from_value(v).unwrap())
                            .collect();
                        let _ = reply.send(Ok(body));
                    }
                    GatewayCommand::PostMessage { reply, .. } => {
                        let _ = reply.send(Ok(()));
                    }
                    GatewayCommand::PostTyping { .. } => {}
                }
            }
        });
    }

    fn wire_message(id: i64, body: &str) -> serde_json::Value {
        json!({
            "id": id,
            "message": body,
            "sender": "alice",
            "sentOn": "2025-06-01T12:00:00Z",
        })
    }

    async fn next_event(rx: &mut mpsc::UnboundedReceiver<SessionEvent>) -> SessionEvent {
        tokio::time::timeout(std::time::Duration::from_secs(5), rx.recv())
            .await
            .expect("timed out waiting for session event")
            .expect("event channel closed")
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_initial_replaces_list() {
        let hub = RealtimeHub::new();
        let (gateway, cmd_rx) = Gateway::channel(8);
        serve_pages(cmd_rx, vec![vec![wire_message(1, "a"), wire_message(2, "b")]]);

        let (session, _events) = RoomSession::open(RoomId(1), user(), &hub, gateway);
        session.load_initial().await;

        let messages = session.messages();
        assert_eq!(messages.len(), 2);
        assert_eq!(session.loading_page(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_load_initial_failure_leaves_list_empty() {
        let hub = RealtimeHub::new();
        let (gateway, mut cmd_rx) = Gateway::channel(8);
        tokio::spawn(async move {
            if let Some(GatewayCommand::FetchPage { reply, .. }) = cmd_rx.recv().await {
                let _ = reply.send(Err(GatewayError::Transport("boom".into())));
            }
        });

        let (session, _events) = RoomSession::open(RoomId(1), user(), &hub, gateway);
        session.load_initial().await;

        assert!(session.messages().is_empty());
        assert_eq!(session.loading_page(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_realtime_arrival_purges_optimistic() {
        let hub = RealtimeHub::new();
        let (gateway, cmd_rx) = Gateway::channel(8);
        serve_pages(cmd_rx, vec![vec![]]);

        let (session, mut events) = RoomSession::open(RoomId(1), user(), &hub, gateway);
        session.load_initial().await;
        while events.try_recv().is_ok() {}

        session
            .submit(Draft {
                text: "hi".into(),
                attachments: Vec::new(),
            })
            .await;
        let optimistic = session.messages();
        assert_eq!(optimistic.len(), 1);
        assert!(optimistic[0].is_fake);
        assert!(optimistic[0].sending);

        hub.dispatch(&chat_topic(RoomId(1)), wire_message(55, "hi"));
        loop {
            if matches!(next_event(&mut events).await, SessionEvent::MessagesChanged) {
                let messages = session.messages();
                if messages.len() == 1 && messages[0].id == MessageId(55) {
                    break;
                }
            }
        }
        assert!(session.messages().iter().all(|m| !m.is_fake));
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_failure_leaves_message_stuck_sending() {
        let hub = RealtimeHub::new();
        let (gateway, mut cmd_rx) = Gateway::channel(8);
        tokio::spawn(async move {
            while let Some(cmd) = cmd_rx.recv().await {
                match cmd {
                    GatewayCommand::FetchPage { reply, .. } => {
                        let _ = reply.send(Ok(Vec::new()));
                    }
                    GatewayCommand::PostMessage { reply, .. } => {
                        let _ = reply.send(Err(GatewayError::Transport("offline".into())));
                    }
                    GatewayCommand::PostTyping { .. } => {}
                }
            }
        });

        let (session, _events) = RoomSession::open(RoomId(1), user(), &hub, gateway);
        session.load_initial().await;
        session
            .submit(Draft {
                text: "hi".into(),
                attachments: Vec::new(),
            })
            .await;

        let messages = session.messages();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].sending);
        assert!(messages[0].is_fake);
    }

    #[tokio::test(start_paused = true)]
    async fn test_older_page_fetch_reports_loading_until_settled() {
        let hub = RealtimeHub::new();
        let (gateway, cmd_rx) = Gateway::channel(8);
        serve_pages(
            cmd_rx,
            vec![
                vec![wire_message(55, "live")],
                vec![wire_message(10, "old")],
            ],
        );

        let (session, mut events) = RoomSession::open(RoomId(1), user(), &hub, gateway);
        session.load_initial().await;
        while events.try_recv().is_ok() {}

        let mut view = FakeViewport {
            top: 5.0,
            height: 1000.0,
            client: 400.0,
        };
        session.on_scroll(&mut view).await;
        assert!(!session.is_loading_more());

        assert!(matches!(
            next_event(&mut events).await,
            SessionEvent::LoadingChanged { page: Some(2) }
        ));
        assert!(matches!(
            next_event(&mut events).await,
            SessionEvent::MessagesChanged
        ));
        assert!(matches!(
            next_event(&mut events).await,
            SessionEvent::LoadingChanged { page: None }
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_upload_progress_moves_marker_and_collapses() {
        let hub = RealtimeHub::new();
        let (gateway, mut cmd_rx) = Gateway::channel(8);
        tokio::spawn(async move {
            while let Some(cmd) = cmd_rx.recv().await {
                match cmd {
                    GatewayCommand::FetchPage { reply, .. } => {
                        let _ = reply.send(Ok(Vec::new()));
                    }
                    GatewayCommand::PostMessage {
                        progress, reply, ..
                    } => {
                        let progress = progress.unwrap();
                        let _ = progress.send(UploadProgress {
                            loaded: 40,
                            total: 100,
                        });
                        let _ = progress.send(UploadProgress {
                            loaded: 100,
                            total: 100,
                        });
                        let _ = reply.send(Ok(()));
                    }
                    GatewayCommand::PostTyping { .. } => {}
                }
            }
        });

        let (session, mut events) = RoomSession::open(RoomId(1), user(), &hub, gateway);
        session.load_initial().await;
        while events.try_recv().is_ok() {}

        session
            .submit(Draft {
                text: "pic".into(),
                attachments: vec![OutgoingAttachment {
                    file_name: "cat.png".into(),
                    mime_type: "image/png".into(),
                    preview_uri: "blob:preview-1".into(),
                }],
            })
            .await;

        loop {
            if let SessionEvent::UploadProgress(marker) = next_event(&mut events).await {
                assert_eq!(marker.percent, 40);
                assert!(marker.id.unwrap().is_optimistic());
                break;
            }
        }
        loop {
            if let SessionEvent::UploadProgress(marker) = next_event(&mut events).await {
                assert_eq!(marker, UploadMarker::none());
                break;
            }
        }
        assert_eq!(session.upload_marker(), UploadMarker::none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_remote_typing_event_reaches_watch() {
        let hub = RealtimeHub::new();
        let (gateway, cmd_rx) = Gateway::channel(8);
        serve_pages(cmd_rx, vec![]);

        let (session, mut events) = RoomSession::open(RoomId(1), user(), &hub, gateway);

        // Our own echo is ignored.
        hub.dispatch(
            &typing_topic(RoomId(1)),
            json!({
                "senderId": 7, "avatar": null, "roomId": 1,
                "typing": true, "timestamp": Utc::now().timestamp_millis(), "ttlMs": 5_000,
            }),
        );
        // A remote peer is not.
        hub.dispatch(
            &typing_topic(RoomId(1)),
            json!({
                "senderId": 9, "avatar": "a.png", "roomId": 1,
                "typing": true, "timestamp": Utc::now().timestamp_millis(), "ttlMs": 5_000,
            }),
        );

        match next_event(&mut events).await {
            SessionEvent::RemoteTyping(event) => assert_eq!(event.sender_id, UserId(9)),
            other => panic!("unexpected event: {other:?}"),
        }
        assert!(session.remote_typing().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_emits_stop_typing() {
        let hub = RealtimeHub::new();
        let (gateway, mut cmd_rx) = Gateway::channel(8);
        let (seen_tx, mut seen_rx) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            while let Some(cmd) = cmd_rx.recv().await {
                match cmd {
                    GatewayCommand::FetchPage { reply, .. } => {
                        let _ = reply.send(Ok(Vec::new()));
                    }
                    GatewayCommand::PostMessage { reply, .. } => {
                        let _ = reply.send(Ok(()));
                    }
                    GatewayCommand::PostTyping { signal } => {
                        let _ = seen_tx.send(signal);
                    }
                }
            }
        });

        let (session, _events) = RoomSession::open(RoomId(1), user(), &hub, gateway);
        session.on_input("h");
        session
            .submit(Draft {
                text: "h".into(),
                attachments: Vec::new(),
            })
            .await;

        let start = tokio::time::timeout(std::time::Duration::from_secs(5), seen_rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(start.typing);
        let stop = tokio::time::timeout(std::time::Duration::from_secs(5), seen_rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(!stop.typing);
    }
}
