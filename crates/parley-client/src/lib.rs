//! # parley-client
//!
//! The room-facing half of the engine: typing debounce, scroll-driven
//! pagination, optimistic composition, and the [`RoomSession`] that ties
//! them to the store and the transports.

pub mod composer;
pub mod events;
pub mod logging;
pub mod scroll;
pub mod session;
pub mod typing;

pub use composer::{Composer, Draft, LocalUser, Submission, UploadMarker};
pub use events::SessionEvent;
pub use logging::init_tracing;
pub use scroll::{jump_button_visible, Paginator, PrependFetch, ScrollViewport};
pub use session::{RoomSession, RoomState};
pub use typing::{TypingTracker, TypingWatch};
