use serde::{Deserialize, Serialize};

/// A chat room identifier assigned by the server.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoomId(pub i64);

impl std::fmt::Display for RoomId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A user identifier assigned by the server.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct UserId(pub i64);

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A message identifier.
///
/// Confirmed messages carry positive server-assigned ids, unique within a
/// room.  Negative ids are reserved for locally synthesized optimistic
/// messages and are never issued by the server.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct MessageId(pub i64);

impl MessageId {
    /// Build a client-local id for an optimistic message from the epoch
    /// milliseconds of its submission.
    pub fn optimistic(epoch_ms: i64) -> Self {
        Self(-epoch_ms.abs())
    }

    /// Whether this id was generated client-side (negative range).
    pub fn is_optimistic(&self) -> bool {
        self.0 < 0
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Coarse media classification of an attachment.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MediaKind {
    Image,
    Video,
    Other,
}

impl MediaKind {
    /// Classify from a MIME type string (`video/webm`, `image/png`, ...).
    pub fn from_mime(mime: &str) -> Self {
        if mime.starts_with("video") {
            Self::Video
        } else if mime.starts_with("image") {
            Self::Image
        } else {
            Self::Other
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_optimistic_id_is_negative() {
        let id = MessageId::optimistic(1_700_000_000_000);
        assert!(id.is_optimistic());
        assert_eq!(id.0, -1_700_000_000_000);
    }

    #[test]
    fn test_server_id_is_not_optimistic() {
        assert!(!MessageId(55).is_optimistic());
    }

    #[test]
    fn test_media_kind_from_mime() {
        assert_eq!(MediaKind::from_mime("video/webm"), MediaKind::Video);
        assert_eq!(MediaKind::from_mime("image/png"), MediaKind::Image);
        assert_eq!(MediaKind::from_mime("application/pdf"), MediaKind::Other);
    }
}
