//! # parley-shared
//!
//! Identifiers, wire payload types and protocol constants shared by every
//! Parley crate.  Pure data: everything here derives `Serialize` and
//! `Deserialize` so payloads can move between the push channel, the HTTP
//! gateway and the UI layer without translation.

pub mod constants;
pub mod protocol;
pub mod types;

mod error;

pub use error::ProtocolError;
pub use protocol::{Attachment, Message, TypingEvent, TypingSignal};
pub use types::{MediaKind, MessageId, RoomId, UserId};
