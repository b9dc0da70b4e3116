//! Topic path builders for the per-room push subscriptions.

use parley_shared::types::RoomId;

/// Topic delivering confirmed messages for a room.
pub fn chat_topic(room: RoomId) -> String {
    format!("/user/queue/chat/{room}")
}

/// Topic delivering typing indicator events for a room.
pub fn typing_topic(room: RoomId) -> String {
    format!("/queue/typing.room{room}")
}
