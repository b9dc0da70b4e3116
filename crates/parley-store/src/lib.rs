//! # parley-store
//!
//! The per-room message list and the rules that keep it consistent.
//!
//! Three unordered input streams mutate the list: optimistic local
//! inserts, authoritative push deliveries, and backward history pages.
//! There is no shared sequence number, so consistency rests on
//! client-local bookkeeping: negative ids and an `is_fake` flag for
//! optimistic entries, purge-then-append reconciliation on confirmed
//! arrival, prepend-only history merges, and an epoch ticket that
//! discards stale initial loads after a room switch.

pub mod messages;

pub use messages::{LoadTicket, MessageStore};
