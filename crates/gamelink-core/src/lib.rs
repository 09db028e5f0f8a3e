//! Emulator-embedded engine for the gamelink bridge.
//!
//! The engine publishes frame/input/audio telemetry into a named shared
//! memory region once per emulated frame, and answers a small text command
//! protocol with which a companion process can search, snapshot-diff, and
//! dump the emulated RAM.
//!
//! # Architecture
//!
//! - [`transport`] - owns the named mutex and the mapping lifecycle
//! - [`telemetry`] - per-frame publish / input collection
//! - [`protocol`] - command demultiplexing (mechanical + human dialects)
//! - [`inspector`] - the cheat-search style memory inspector
//!
//! Nothing in this crate may abort the host emulator: every setup failure is
//! reported and leaves the link disabled, and the emulator runs on.

pub mod inspector;
pub mod protocol;
pub mod telemetry;
pub mod transport;

pub use gamelink_shared::{Error, LinkNames, Result};
pub use inspector::Inspector;
pub use protocol::MechCommand;
pub use telemetry::{InputState, LinkInput, TelemetryUpdate};
pub use transport::RamBase;

use tracing::info;
use transport::LinkTransport;

/// Operating mode of the link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkMode {
    /// Full external-input mode: frames published, companion input consumed.
    Full,
    /// The companion observes state only; the emulator keeps its own
    /// video/input handling.
    TrackOnly,
}

/// Control entry points the emulator exposes to mechanical commands.
///
/// These run strictly outside the region lock: a reset or shutdown may
/// re-enter subsystems that publish telemetry themselves.
pub trait MachineControl {
    fn reset(&mut self);
    fn pause(&mut self);
    fn shutdown(&mut self);
}

/// The per-emulator link context. One instance per process; explicit
/// `init` / `teardown` lifecycle, no hidden statics.
pub struct GameLink {
    mode: LinkMode,
    transport: LinkTransport,
    inspector: Option<Inspector>,
}

impl GameLink {
    /// Build a link for `mode`, publishing `system` as the host identity.
    pub fn new(mode: LinkMode, system: &str) -> Self {
        Self::with_names(mode, system, LinkNames::default())
    }

    /// Like [`GameLink::new`] with custom object names (tests, multiple
    /// instances).
    pub fn with_names(mode: LinkMode, system: &str, names: LinkNames) -> Self {
        Self {
            mode,
            transport: LinkTransport::new(names, system),
            inspector: None,
        }
    }

    pub fn mode(&self) -> LinkMode {
        self.mode
    }

    /// Create the named mutex. Idempotent; a second call is a no-op.
    ///
    /// On failure the caller should log and run with the link disabled.
    pub fn init(&mut self) -> Result<()> {
        self.transport.init()
    }

    /// Create and initialise the shared region for `ram_size` bytes of
    /// emulated RAM, and reset the inspector for the new run.
    ///
    /// The returned [`RamBase`] points at the RAM mirror inside the mapping;
    /// an emulator may use it directly as its RAM backing store.
    pub fn alloc_ram(&mut self, ram_size: u32) -> Result<RamBase> {
        let base = self.transport.alloc(ram_size)?;
        self.inspector = Some(Inspector::new(ram_size));
        let total = gamelink_shared::HEADER_SIZE + ram_size as usize;
        info!(
            "link initialised, {} MB of shared memory",
            total.div_ceil(1024 * 1024)
        );
        Ok(base)
    }

    /// True once [`GameLink::alloc_ram`] has succeeded.
    pub fn is_attached(&self) -> bool {
        self.transport.is_attached()
    }

    /// Graceful shutdown: signal abort to the companion (version 0), then
    /// destroy the region and the mutex. Each step is best-effort.
    pub fn teardown(&mut self) {
        self.transport.teardown();
        self.inspector = None;
    }
}
