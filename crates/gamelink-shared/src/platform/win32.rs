//! Win32 implementation of the platform capability.

use windows::core::{Error as WinError, PCWSTR};
use windows::Win32::Foundation::{
    CloseHandle, HANDLE, INVALID_HANDLE_VALUE, WAIT_ABANDONED, WAIT_OBJECT_0,
};
use windows::Win32::System::Memory::{
    CreateFileMappingW, MapViewOfFile, OpenFileMappingW, UnmapViewOfFile, VirtualQuery,
    FILE_MAP_ALL_ACCESS, FILE_MAP_READ, FILE_MAP_WRITE, MEMORY_BASIC_INFORMATION,
    MEMORY_MAPPED_VIEW_ADDRESS, PAGE_READWRITE,
};
use windows::Win32::System::Threading::{
    CreateMutexW, OpenMutexW, ReleaseMutex, WaitForSingleObject, INFINITE,
};

use crate::error::{Error, Result};

/// SYNCHRONIZE standard access right.
const SYNCHRONIZE: u32 = 0x0010_0000;

fn wide(name: &str) -> Vec<u16> {
    name.encode_utf16().chain(Some(0)).collect()
}

/// A system-wide named mutex.
pub struct NamedMutex {
    handle: HANDLE,
}

// SAFETY: the handle is a process-wide kernel object reference.
unsafe impl Send for NamedMutex {}

impl NamedMutex {
    /// Create the mutex, failing with [`Error::MutexExists`] if another
    /// process already owns one of this name.
    pub fn create(name: &str) -> Result<Self> {
        let name_wide = wide(name);
        unsafe {
            // An open that succeeds means the object is already live.
            if let Ok(existing) = OpenMutexW(SYNCHRONIZE, false, PCWSTR(name_wide.as_ptr())) {
                let _ = CloseHandle(existing);
                return Err(Error::MutexExists(name.to_string()));
            }
            let handle = CreateMutexW(None, false, PCWSTR(name_wide.as_ptr()))?;
            Ok(Self { handle })
        }
    }

    /// Open a mutex another process created.
    pub fn open(name: &str) -> Result<Self> {
        let name_wide = wide(name);
        let handle = unsafe { OpenMutexW(SYNCHRONIZE, false, PCWSTR(name_wide.as_ptr()))? };
        Ok(Self { handle })
    }

    /// Block until the mutex is held. No timeout is applied.
    pub fn lock(&self) -> Result<MutexGuard<'_>> {
        let wait = unsafe { WaitForSingleObject(self.handle, INFINITE) };
        if wait == WAIT_OBJECT_0 || wait == WAIT_ABANDONED {
            Ok(MutexGuard { mutex: self })
        } else {
            Err(WinError::from_win32().into())
        }
    }
}

impl Drop for NamedMutex {
    fn drop(&mut self) {
        unsafe {
            let _ = CloseHandle(self.handle);
        }
    }
}

/// Scoped ownership of a [`NamedMutex`]; releases on every exit path.
pub struct MutexGuard<'a> {
    mutex: &'a NamedMutex,
}

impl Drop for MutexGuard<'_> {
    fn drop(&mut self) {
        unsafe {
            let _ = ReleaseMutex(self.mutex.handle);
        }
    }
}

/// A named, pagefile-backed shared memory mapping.
pub struct SharedMapping {
    handle: HANDLE,
    view: MEMORY_MAPPED_VIEW_ADDRESS,
    len: usize,
}

// SAFETY: the mapping stays valid for the lifetime of the handle.
unsafe impl Send for SharedMapping {}

impl SharedMapping {
    /// Create a mapping of exactly `len` bytes.
    pub fn create(name: &str, len: usize) -> Result<Self> {
        let name_wide = wide(name);
        unsafe {
            let handle = CreateFileMappingW(
                INVALID_HANDLE_VALUE,
                None,
                PAGE_READWRITE,
                0,
                len as u32,
                PCWSTR(name_wide.as_ptr()),
            )?;
            let view = MapViewOfFile(handle, FILE_MAP_ALL_ACCESS, 0, 0, len);
            if view.Value.is_null() {
                let err = WinError::from_win32();
                let _ = CloseHandle(handle);
                return Err(err.into());
            }
            Ok(Self { handle, view, len })
        }
    }

    /// Open and map a region another process created.
    pub fn open(name: &str) -> Result<Self> {
        let name_wide = wide(name);
        unsafe {
            let handle = OpenFileMappingW(
                (FILE_MAP_READ | FILE_MAP_WRITE).0,
                false,
                PCWSTR(name_wide.as_ptr()),
            )?;
            // Length 0 maps the whole section.
            let view = MapViewOfFile(handle, FILE_MAP_ALL_ACCESS, 0, 0, 0);
            if view.Value.is_null() {
                let err = WinError::from_win32();
                let _ = CloseHandle(handle);
                return Err(err.into());
            }
            let mut info = MEMORY_BASIC_INFORMATION::default();
            let queried = VirtualQuery(
                Some(view.Value),
                &mut info,
                core::mem::size_of::<MEMORY_BASIC_INFORMATION>(),
            );
            if queried == 0 {
                let err = WinError::from_win32();
                let _ = UnmapViewOfFile(view);
                let _ = CloseHandle(handle);
                return Err(err.into());
            }
            Ok(Self {
                handle,
                view,
                len: info.RegionSize,
            })
        }
    }

    pub fn ptr(&self) -> *mut u8 {
        self.view.Value as *mut u8
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Drop for SharedMapping {
    fn drop(&mut self) {
        unsafe {
            let _ = UnmapViewOfFile(self.view);
            let _ = CloseHandle(self.handle);
        }
    }
}
