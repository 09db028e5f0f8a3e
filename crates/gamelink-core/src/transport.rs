//! Region transport: named mutex + shared mapping lifecycle.

use gamelink_shared::layout::{write_fixed_str, FRAME_FORMAT_NONE};
use gamelink_shared::platform::{NamedMutex, SharedMapping};
use gamelink_shared::{
    Error, LinkNames, Result, SharedMemoryMap, HEADER_SIZE, PROTOCOL_VERSION,
};
use tracing::{debug, warn};

/// Base of the RAM mirror segment inside the mapping.
///
/// Advisory: an emulator may use this as its RAM backing store so the
/// companion can read guest memory directly, or ignore it and keep RAM
/// elsewhere.
pub struct RamBase {
    ptr: *mut u8,
    len: usize,
}

impl RamBase {
    pub fn as_ptr(&self) -> *mut u8 {
        self.ptr
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// View the mirror as a mutable slice.
    ///
    /// # Safety
    /// The region must still be mapped (no `teardown` yet) and the caller
    /// must be the only one touching the mirror segment.
    pub unsafe fn as_mut_slice<'a>(&self) -> &'a mut [u8] {
        core::slice::from_raw_parts_mut(self.ptr, self.len)
    }
}

pub(crate) struct LinkTransport {
    names: LinkNames,
    system: String,
    mutex: Option<NamedMutex>,
    map: Option<SharedMapping>,
}

impl LinkTransport {
    pub(crate) fn new(names: LinkNames, system: &str) -> Self {
        Self {
            names,
            system: system.to_string(),
            mutex: None,
            map: None,
        }
    }

    /// Create the named mutex. Idempotent.
    pub(crate) fn init(&mut self) -> Result<()> {
        if self.mutex.is_some() {
            debug!("ignoring link re-initialisation");
            return Ok(());
        }
        match NamedMutex::create(&self.names.mutex) {
            Ok(mutex) => {
                self.mutex = Some(mutex);
                Ok(())
            }
            Err(err) => {
                warn!("link mutex unavailable: {err}");
                Err(err)
            }
        }
    }

    /// Create the region sized `HEADER_SIZE + ram_size` and initialise every
    /// header field. Releases the mutex on failure.
    pub(crate) fn alloc(&mut self, ram_size: u32) -> Result<RamBase> {
        if self.mutex.is_none() {
            return Err(Error::NotAttached);
        }
        let total = HEADER_SIZE + ram_size as usize;
        let map = match SharedMapping::create(&self.names.map, total) {
            Ok(map) => map,
            Err(err) => {
                warn!("shared region creation failed: {err}");
                // Dropping the mutex destroys it; the emulator runs on with
                // the link disabled.
                self.mutex = None;
                return Err(err);
            }
        };

        // SAFETY: the mapping is at least HEADER_SIZE bytes and freshly
        // created; nothing else can hold the region yet.
        let shared = unsafe { &mut *(map.ptr() as *mut SharedMemoryMap) };
        init_shared(shared, ram_size, &self.system);

        // SAFETY: the mirror segment follows the header inside the mapping.
        let ram_ptr = unsafe { map.ptr().add(HEADER_SIZE) };
        self.map = Some(map);
        Ok(RamBase {
            ptr: ram_ptr,
            len: ram_size as usize,
        })
    }

    pub(crate) fn is_attached(&self) -> bool {
        self.map.is_some()
    }

    /// Run `f` with the mutex held. Blocking, no timeout; the guard releases
    /// on every exit path including panics inside `f`.
    pub(crate) fn with_lock<R>(&self, f: impl FnOnce(&mut SharedMemoryMap) -> R) -> Result<R> {
        let (mutex, map) = match (&self.mutex, &self.map) {
            (Some(mutex), Some(map)) => (mutex, map),
            _ => return Err(Error::NotAttached),
        };
        let _guard = mutex.lock()?;
        // SAFETY: alloc() established a mapping of at least HEADER_SIZE
        // bytes; the mutex serialises access with the companion.
        let shared = unsafe { &mut *(map.ptr() as *mut SharedMemoryMap) };
        Ok(f(shared))
    }

    /// Best-effort shutdown; every step is attempted independently.
    pub(crate) fn teardown(&mut self) {
        if let Some(map) = &self.map {
            // Abort signal to the companion; readers poll the version field.
            // SAFETY: mapping still valid here, unmapped just below.
            let shared = unsafe { &mut *(map.ptr() as *mut SharedMemoryMap) };
            shared.version = 0;
        }
        self.map = None;
        self.mutex = None;
    }
}

/// Default-initialise a freshly created region header.
///
/// Fresh mappings are zero-filled by the OS; only non-zero defaults need
/// explicit writes.
fn init_shared(shared: &mut SharedMemoryMap, ram_size: u32, system: &str) {
    shared.version = PROTOCOL_VERSION;
    shared.flags = 0;
    write_fixed_str(&mut shared.system, system);
    write_fixed_str(&mut shared.program, "");
    shared.program_hash = [0; 4];

    shared.input.mouse_dx = 0;
    shared.input.mouse_dy = 0;
    shared.input.mouse_buttons = 0;
    shared.input.keyboard = [0; 8];
    shared.input.ready = 0;

    shared.peek.addr_count = 0;

    shared.frame.seq = 0;
    shared.frame.format = FRAME_FORMAT_NONE;
    shared.frame.width = 0;
    shared.frame.height = 0;
    shared.frame.par_x = 1;
    shared.frame.par_y = 1;

    shared.audio.master_vol_l = 100;
    shared.audio.master_vol_r = 100;

    shared.to_guest.clear();
    shared.to_host.clear();

    shared.ram_size = ram_size;
}
