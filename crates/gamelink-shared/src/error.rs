//! Error types for the gamelink bridge.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// The named mutex already exists; another link instance (or a crashed
    /// one that left the object behind) presumably owns the region.
    #[error("mutex \"{0}\" already exists; is another link instance running?")]
    MutexExists(String),

    #[error("shared region \"{0}\" is not present")]
    RegionMissing(String),

    #[error("protocol version mismatch: found {found}, expected {expected}")]
    VersionMismatch { found: u32, expected: u32 },

    /// The outbound channel still holds an unacknowledged message.
    #[error("channel busy: previous message not yet acknowledged")]
    ChannelBusy,

    #[error("link is not attached")]
    NotAttached,

    #[cfg(windows)]
    #[error("Windows API error: {0}")]
    Windows(#[from] windows::core::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
