use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced while decoding or interpreting a packet.
///
/// These never cross a socket boundary — per the wire format there is no
/// NACK, so decode failures are always handled locally by the caller
/// (dropped and logged).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    #[error("malformed packet: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("broadcast packet missing control fields")]
    NotControl,
}
