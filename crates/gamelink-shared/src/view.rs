//! Companion-side attach handle.
//!
//! Opens the mutex and mapping an emulator created, checks the protocol
//! version before trusting the layout, and offers the small request/response
//! surface a companion needs. One companion at a time; nothing here
//! authenticates the peer.

use crate::buffer::MessageBuffer;
use crate::error::{Error, Result};
use crate::layout::{read_fixed_str, LinkFlags, SharedMemoryMap, HEADER_SIZE};
use crate::platform::{NamedMutex, SharedMapping};
use crate::{LinkNames, PROTOCOL_VERSION};

/// Identity and frame state read from a live region.
#[derive(Debug, Clone)]
pub struct LinkStatus {
    pub version: u32,
    pub system: String,
    pub program: String,
    pub program_hash: [u32; 4],
    pub flags: LinkFlags,
    pub frame_seq: u32,
    pub frame_width: u16,
    pub frame_height: u16,
    pub ram_size: u32,
}

impl LinkStatus {
    pub fn paused(&self) -> bool {
        self.flags.contains(LinkFlags::PAUSED)
    }
}

/// A companion's view of an emulator-owned region.
pub struct LinkView {
    mutex: NamedMutex,
    map: SharedMapping,
}

impl LinkView {
    /// Open an existing link. Refuses to attach if the region is missing,
    /// too small to hold the header, or carries a foreign protocol version.
    pub fn attach(names: &LinkNames) -> Result<Self> {
        let mutex = NamedMutex::open(&names.mutex)?;
        let map = SharedMapping::open(&names.map)?;
        if map.len() < HEADER_SIZE {
            return Err(Error::RegionMissing(names.map.clone()));
        }
        let view = Self { mutex, map };
        let version = view.with_lock(|shared| shared.version)?;
        if version != PROTOCOL_VERSION {
            return Err(Error::VersionMismatch {
                found: version,
                expected: PROTOCOL_VERSION,
            });
        }
        Ok(view)
    }

    /// Run `f` with exclusive access to the shared header.
    pub fn with_lock<R>(&self, f: impl FnOnce(&mut SharedMemoryMap) -> R) -> Result<R> {
        let _guard = self.mutex.lock()?;
        // SAFETY: attach() verified the mapping holds at least HEADER_SIZE
        // bytes and both processes agree on the layout revision.
        let shared = unsafe { &mut *(self.map.ptr() as *mut SharedMemoryMap) };
        Ok(f(shared))
    }

    /// Read the published identity and frame state.
    pub fn status(&self) -> Result<LinkStatus> {
        self.with_lock(|shared| LinkStatus {
            version: shared.version,
            system: read_fixed_str(&shared.system),
            program: read_fixed_str(&shared.program),
            program_hash: shared.program_hash,
            flags: LinkFlags::from_bits_truncate(shared.flags),
            frame_seq: shared.frame.seq,
            frame_width: shared.frame.width,
            frame_height: shared.frame.height,
            ram_size: shared.ram_size,
        })
    }

    /// Queue one command for the emulator. Fails with [`Error::ChannelBusy`]
    /// while the previous command is still unconsumed.
    pub fn send_command(&self, line: &str) -> Result<()> {
        self.with_lock(|shared| {
            if !shared.to_guest.is_empty() {
                return Err(Error::ChannelBusy);
            }
            shared.to_guest.set_bytes(line.as_bytes());
            Ok(())
        })?
    }

    /// Take the pending response, acknowledging it, if one has arrived.
    pub fn take_response(&self) -> Result<Option<String>> {
        self.with_lock(|shared| {
            if shared.to_host.is_empty() {
                return None;
            }
            let text = String::from_utf8_lossy(shared.to_host.bytes()).into_owned();
            shared.to_host.clear();
            Some(text)
        })
    }

    /// Hand fresh input to the emulator; consumed on its next frame.
    pub fn write_input(
        &self,
        mouse_dx: i32,
        mouse_dy: i32,
        mouse_buttons: u8,
        keyboard: [u8; 8],
    ) -> Result<()> {
        self.with_lock(|shared| {
            shared.input.mouse_dx = shared.input.mouse_dx.wrapping_add(mouse_dx);
            shared.input.mouse_dy = shared.input.mouse_dy.wrapping_add(mouse_dy);
            shared.input.mouse_buttons = mouse_buttons;
            shared.input.keyboard = keyboard;
            shared.input.ready = 1;
        })
    }

    /// Request byte peeks; answers land in `peek.data` on the next publish.
    pub fn request_peeks(&self, addrs: &[u32]) -> Result<()> {
        self.with_lock(|shared| {
            let count = addrs.len().min(crate::PEEK_LIMIT);
            shared.peek.addrs[..count].copy_from_slice(&addrs[..count]);
            shared.peek.addr_count = count as u32;
        })
    }

    /// Direct access to both message buffers, for polling loops.
    pub fn channels<R>(&self, f: impl FnOnce(&mut MessageBuffer, &mut MessageBuffer) -> R) -> Result<R> {
        self.with_lock(|shared| {
            let SharedMemoryMap {
                to_guest, to_host, ..
            } = shared;
            f(to_guest, to_host)
        })
    }
}
