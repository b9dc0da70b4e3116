//! Typing indicator machinery for one room.
//!
//! The local side is a two-state machine (idle / announcing) with a
//! leading-edge start signal and a trailing-edge stop timer.  The remote
//! side is a single slot holding the latest event from any other user.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use parley_shared::constants::TYPING_STOP_DELAY_MS;
use parley_shared::protocol::{TypingEvent, TypingSignal};
use parley_shared::types::{RoomId, UserId};

struct TrackerInner {
    announcing: bool,
    /// Invalidates timers spawned before the latest transition.  A timer
    /// that outlives its generation emits nothing.
    timer_gen: u64,
    stop_timer: Option<JoinHandle<()>>,
}

/// Local typing state machine.
///
/// Emits [`TypingSignal`]s on the channel given at construction: one
/// `typing=true` on the first keystroke out of idle (no leading-edge
/// debounce), one `typing=false` after the trailing-edge delay elapses
/// with no further input — or immediately when the input empties, on
/// submit, and on shutdown.  Every transition cancels the pending timer.
pub struct TypingTracker {
    room: RoomId,
    sender: UserId,
    avatar: Option<String>,
    delay: Duration,
    signal_tx: mpsc::UnboundedSender<TypingSignal>,
    inner: Arc<Mutex<TrackerInner>>,
}

impl TypingTracker {
    pub fn new(
        room: RoomId,
        sender: UserId,
        avatar: Option<String>,
        signal_tx: mpsc::UnboundedSender<TypingSignal>,
    ) -> Self {
        Self {
            room,
            sender,
            avatar,
            delay: Duration::from_millis(TYPING_STOP_DELAY_MS),
            signal_tx,
            inner: Arc::new(Mutex::new(TrackerInner {
                announcing: false,
                timer_gen: 0,
                stop_timer: None,
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, TrackerInner> {
        self.inner.lock().expect("tracker lock poisoned")
    }

    fn signal(&self, typing: bool) -> TypingSignal {
        TypingSignal {
            room_id: self.room,
            sender_id: self.sender,
            avatar: self.avatar.clone(),
            typing,
        }
    }

    fn emit(&self, typing: bool) {
        debug!(room = %self.room, typing, "Emitting typing signal");
        let _ = self.signal_tx.send(self.signal(typing));
    }

    fn cancel_timer(inner: &mut TrackerInner) {
        inner.timer_gen += 1;
        if let Some(timer) = inner.stop_timer.take() {
            timer.abort();
        }
    }

    /// Feed the current composer text after a keystroke.
    pub fn on_input(&self, text: &str) {
        let mut inner = self.lock();

        if text.is_empty() {
            Self::cancel_timer(&mut inner);
            if inner.announcing {
                inner.announcing = false;
                self.emit(false);
            }
            return;
        }

        if !inner.announcing {
            inner.announcing = true;
            self.emit(true);
        }

        Self::cancel_timer(&mut inner);
        let gen = inner.timer_gen;
        let shared = Arc::clone(&self.inner);
        let tx = self.signal_tx.clone();
        let stop = self.signal(false);
        let delay = self.delay;

        inner.stop_timer = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let mut inner = shared.lock().expect("tracker lock poisoned");
            if inner.timer_gen == gen && inner.announcing {
                inner.announcing = false;
                inner.stop_timer = None;
                let _ = tx.send(stop);
            }
        }));
    }

    /// The message was submitted: the stop signal goes out at once, and
    /// any pending timer dies with the transition.
    pub fn on_submit(&self) {
        let mut inner = self.lock();
        Self::cancel_timer(&mut inner);
        inner.announcing = false;
        self.emit(false);
    }

    /// Teardown (room switch / unmount): never leave the remote side
    /// believing the user is permanently typing.
    pub fn shutdown(&self) {
        let mut inner = self.lock();
        Self::cancel_timer(&mut inner);
        if inner.announcing {
            inner.announcing = false;
            self.emit(false);
        }
    }

    pub fn is_announcing(&self) -> bool {
        self.lock().announcing
    }
}

impl Drop for TypingTracker {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Remote typing state for one room: a single slot, last writer wins.
///
/// Events from the local user are ignored; events from different remote
/// senders overwrite each other rather than merge.
#[derive(Debug)]
pub struct TypingWatch {
    self_user: UserId,
    slot: Option<TypingEvent>,
}

impl TypingWatch {
    pub fn new(self_user: UserId) -> Self {
        Self {
            self_user,
            slot: None,
        }
    }

    /// Store an inbound event.  Returns whether the slot changed.
    pub fn on_event(&mut self, event: TypingEvent) -> bool {
        if event.sender_id == self.self_user {
            return false;
        }
        debug!(
            sender = %event.sender_id,
            typing = event.typing,
            "Remote typing event"
        );
        self.slot = Some(event);
        true
    }

    /// Latest stored event, regardless of expiry.
    pub fn latest(&self) -> Option<&TypingEvent> {
        self.slot.as_ref()
    }

    /// The event currently indicating live typing, honoring the wire TTL
    /// so a lost stop event cannot pin the indicator.
    pub fn active_at(&self, now_ms: i64) -> Option<&TypingEvent> {
        self.slot.as_ref().filter(|e| e.is_active_at(now_ms))
    }
}
