use tracing::{debug, warn};

use parley_shared::constants::{FIRST_PAGE, RECALLED_MESSAGE_TEXT};
use parley_shared::protocol::Message;
use parley_shared::types::{MessageId, RoomId};

/// Proof of which load a fetch result belongs to.
///
/// Initial loads are not cancelled when the user switches rooms; the
/// superseded response simply fails the ticket check and is discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket {
    room: RoomId,
    epoch: u64,
}

/// The ordered message list for one room.
///
/// Append-order is arrival-order for live traffic; prepend-order is
/// fetched-page-order for history.  All mutations run to completion on
/// the caller's task, so no two operations ever interleave mid-list.
#[derive(Debug)]
pub struct MessageStore {
    room: Option<RoomId>,
    messages: Vec<Message>,
    /// Page number currently being loaded, `None` when idle.  Lets the
    /// UI tell a first load apart from an older-page load.
    loading: Option<u32>,
    epoch: u64,
}

impl MessageStore {
    pub fn new() -> Self {
        Self {
            room: None,
            messages: Vec::new(),
            loading: None,
            epoch: 0,
        }
    }

    pub fn room(&self) -> Option<RoomId> {
        self.room
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Page number currently in flight, `None` when idle.
    pub fn loading_page(&self) -> Option<u32> {
        self.loading
    }

    /// Start the initial load for `room`: the list is replaced wholesale,
    /// so it empties now and fills when the fetch resolves.
    ///
    /// The returned ticket must accompany the completion call.  Any
    /// earlier outstanding ticket is implicitly invalidated.
    pub fn begin_initial_load(&mut self, room: RoomId) -> LoadTicket {
        self.epoch += 1;
        self.room = Some(room);
        self.messages.clear();
        self.loading = Some(FIRST_PAGE);

        debug!(room = %room, epoch = self.epoch, "Initial load started");
        LoadTicket {
            room,
            epoch: self.epoch,
        }
    }

    /// Apply a resolved initial load.  Returns `false` (and changes
    /// nothing) when the ticket is stale, i.e. another load started or
    /// the room changed while the fetch was in flight.
    pub fn complete_initial_load(&mut self, ticket: LoadTicket, page: Vec<Message>) -> bool {
        if !self.ticket_is_current(ticket) {
            warn!(room = %ticket.room, "Discarding stale initial load result");
            return false;
        }

        debug!(room = %ticket.room, count = page.len(), "Initial load resolved");
        self.messages = page;
        self.loading = None;
        true
    }

    /// Record a failed initial load: list stays empty, indicator clears,
    /// no retry.  Stale failures are ignored like stale results.
    pub fn fail_initial_load(&mut self, ticket: LoadTicket) {
        if !self.ticket_is_current(ticket) {
            return;
        }
        warn!(room = %ticket.room, "Initial load failed, leaving list empty");
        self.loading = None;
    }

    fn ticket_is_current(&self, ticket: LoadTicket) -> bool {
        ticket.epoch == self.epoch && Some(ticket.room) == self.room
    }

    /// Append an optimistic message before its outbound post is issued.
    /// Never blocks: the entry is visible immediately.
    pub fn insert_optimistic(&mut self, msg: Message) {
        debug!(id = %msg.id, "Optimistic insert");
        self.messages.push(msg);
    }

    /// Reconcile a confirmed push-channel arrival: every fake entry is
    /// purged, then the confirmed message is appended.
    ///
    /// The server echoes no client correlation id, so exact matching is
    /// impossible; the purge assumes at most one outstanding optimistic
    /// send matters visually.  An optimistic entry still mid-upload when
    /// an unrelated confirmed message arrives is dropped from view.
    pub fn on_realtime_message(&mut self, msg: Message) {
        let before = self.messages.len();
        self.messages.retain(|m| !m.is_fake);
        let purged = before - self.messages.len();

        debug!(id = %msg.id, purged, "Confirmed message arrived");
        self.messages.push(msg.into_confirmed());
    }

    /// Replace the body and flags of the message with `id`, preserving
    /// every other field.  No-op if the id is absent.
    pub fn edit_message(
        &mut self,
        id: MessageId,
        new_body: impl Into<String>,
        sending: bool,
        is_updated: bool,
    ) {
        let Some(m) = self.messages.iter_mut().find(|m| m.id == id) else {
            debug!(id = %id, "Edit for unknown message ignored");
            return;
        };
        m.message = Some(new_body.into());
        m.sending = sending;
        m.is_updated = is_updated;
    }

    /// Recall the message with `id`: its body becomes the tombstone text.
    /// The entry and its attachment metadata stay in the list.
    pub fn delete_message(&mut self, id: MessageId) {
        let Some(m) = self.messages.iter_mut().find(|m| m.id == id) else {
            debug!(id = %id, "Delete for unknown message ignored");
            return;
        };
        m.message = Some(RECALLED_MESSAGE_TEXT.to_string());
    }

    /// Merge one older history page at the head of the list, preserving
    /// the fetched order.  Returns the number of entries prepended.
    ///
    /// Safe to apply after newer live messages arrived: a head insert
    /// only touches the oldest portion of the list.
    pub fn prepend_page(&mut self, page: Vec<Message>) -> usize {
        let count = page.len();
        if count == 0 {
            return 0;
        }

        debug!(count, "Prepending history page");
        let mut merged = page;
        merged.append(&mut self.messages);
        self.messages = merged;
        count
    }
}

impl Default for MessageStore {
    fn default() -> Self {
        Self::new()
    }
}
