use thiserror::Error;

/// Errors raised while decoding payloads delivered by the push channel.
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// Payload JSON did not match the expected shape.
    #[error("Payload decode error: {0}")]
    Decode(#[from] serde_json::Error),
}
