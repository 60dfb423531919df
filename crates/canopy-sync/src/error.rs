//! Coordination-layer error types

use thiserror::Error;

pub type Result<T> = std::result::Result<T, SyncError>;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("unknown peer: {0}")]
    PeerUnknown(String),

    #[error("peer unreachable: {0}")]
    PeerUnreachable(String),

    #[error("codec error: {0}")]
    Codec(#[from] serde_json::Error),
}

impl SyncError {
    pub fn peer_unknown(peer: impl Into<String>) -> Self {
        Self::PeerUnknown(peer.into())
    }

    pub fn peer_unreachable(peer: impl Into<String>) -> Self {
        Self::PeerUnreachable(peer.into())
    }
}
