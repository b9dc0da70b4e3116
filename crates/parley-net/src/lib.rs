//! # parley-net
//!
//! Client-side contracts for the two transports Parley consumes: the
//! shared push connection (modelled as a topic registry, [`RealtimeHub`])
//! and the HTTP API (modelled as a command channel, [`Gateway`]).
//!
//! Neither transport is implemented here.  Connection lifecycle, reconnect
//! and backoff belong to the collaborator that feeds the hub; request
//! plumbing belongs to the task that serves the gateway commands.  The
//! core treats every delivered payload as independent and merge-safe.

pub mod gateway;
pub mod hub;
pub mod topics;

pub use gateway::{
    Gateway, GatewayCommand, GatewayError, OutgoingAttachment, OutgoingMessage, UploadProgress,
};
pub use hub::{RealtimeHub, Subscription, SubscriptionId};
pub use topics::{chat_topic, typing_topic};
