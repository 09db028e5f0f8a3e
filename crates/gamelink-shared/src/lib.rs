//! Shared wire contract for the gamelink bridge.
//!
//! A running emulator and an out-of-process companion tool communicate
//! through a single named shared memory region guarded by a named mutex:
//!
//! - [`layout::SharedMemoryMap`] - the versioned `#[repr(C)]` region header,
//!   followed in the mapping by a mirror of the emulated RAM
//! - [`MessageBuffer`] - bounded one-message-per-direction command channels
//! - [`platform`] - named mutex / named mapping capability (Windows + POSIX)
//! - [`LinkView`] - companion-side attach handle (opens an existing region)
//!
//! The emulator side of the protocol lives in `gamelink-core`.

pub mod buffer;
pub mod error;
pub mod layout;
pub mod platform;
pub mod view;

pub use buffer::MessageBuffer;
pub use error::{Error, Result};
pub use layout::{LinkFlags, SharedMemoryMap, HEADER_SIZE, PEEK_LIMIT};
pub use platform::{MutexGuard, NamedMutex, SharedMapping};
pub use view::{LinkStatus, LinkView};

/// Protocol revision written into every publish. A reader must refuse to
/// interpret the region if this does not match; 0 signals a shutdown.
pub const PROTOCOL_VERSION: u32 = 4;

/// Default name of the system-wide mutex guarding the region.
#[cfg(windows)]
pub const DEFAULT_MUTEX_NAME: &str = "GAMELINK_MUTEX_R4";
/// Default name of the system-wide mutex guarding the region.
#[cfg(unix)]
pub const DEFAULT_MUTEX_NAME: &str = "/GAMELINK_MUTEX_R4";

/// Default name of the shared memory mapping.
#[cfg(windows)]
pub const DEFAULT_MMAP_NAME: &str = "GAMELINK_MMAP_R4";
/// Default name of the shared memory mapping.
#[cfg(unix)]
pub const DEFAULT_MMAP_NAME: &str = "/GAMELINK_MMAP_R4";

/// Names of the two system-wide objects forming the link.
///
/// The defaults are the protocol constants; tests and multi-instance
/// embeddings may namespace them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkNames {
    pub mutex: String,
    pub map: String,
}

impl Default for LinkNames {
    fn default() -> Self {
        Self {
            mutex: DEFAULT_MUTEX_NAME.to_string(),
            map: DEFAULT_MMAP_NAME.to_string(),
        }
    }
}
