//! POSIX implementation of the platform capability.
//!
//! The mutex is a named semaphore initialised to 1; the mapping is a
//! `shm_open` object. The creator unlinks both names on drop so a crashed
//! companion cannot wedge the next run.

use std::ffi::CString;
use std::io;
use std::ptr;

use crate::error::{Error, Result};

fn cname(name: &str) -> Result<CString> {
    CString::new(name)
        .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "NUL in object name").into())
}

/// A system-wide named mutex (POSIX named semaphore, initial value 1).
pub struct NamedMutex {
    sem: *mut libc::sem_t,
    name: CString,
    owner: bool,
}

// SAFETY: sem_t handles are process-wide; access is serialized by the
// semaphore itself.
unsafe impl Send for NamedMutex {}

impl NamedMutex {
    /// Create the mutex, failing with [`Error::MutexExists`] if another
    /// process already owns one of this name.
    pub fn create(name: &str) -> Result<Self> {
        let cstr = cname(name)?;
        unsafe {
            // An open that succeeds without O_CREAT means the name is live,
            // either another instance or debris from a crash in /dev/shm.
            let existing = libc::sem_open(cstr.as_ptr(), 0);
            if existing != libc::SEM_FAILED {
                libc::sem_close(existing);
                return Err(Error::MutexExists(name.to_string()));
            }
            let sem = libc::sem_open(
                cstr.as_ptr(),
                libc::O_CREAT | libc::O_EXCL,
                0o666 as libc::c_uint,
                1 as libc::c_uint,
            );
            if sem == libc::SEM_FAILED {
                return Err(io::Error::last_os_error().into());
            }
            Ok(Self {
                sem,
                name: cstr,
                owner: true,
            })
        }
    }

    /// Open a mutex another process created.
    pub fn open(name: &str) -> Result<Self> {
        let cstr = cname(name)?;
        let sem = unsafe { libc::sem_open(cstr.as_ptr(), 0) };
        if sem == libc::SEM_FAILED {
            return Err(io::Error::last_os_error().into());
        }
        Ok(Self {
            sem,
            name: cstr,
            owner: false,
        })
    }

    /// Block until the mutex is held. No timeout is applied.
    pub fn lock(&self) -> Result<MutexGuard<'_>> {
        loop {
            if unsafe { libc::sem_wait(self.sem) } == 0 {
                return Ok(MutexGuard { mutex: self });
            }
            let err = io::Error::last_os_error();
            if err.raw_os_error() != Some(libc::EINTR) {
                return Err(err.into());
            }
        }
    }
}

impl Drop for NamedMutex {
    fn drop(&mut self) {
        unsafe {
            libc::sem_close(self.sem);
            if self.owner {
                libc::sem_unlink(self.name.as_ptr());
            }
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
            libc::sem_post(self.mutex.sem);
        }
    }
}

// macOS rejects O_TRUNC on shm objects; stale bytes are tolerated there.
#[cfg(target_os = "macos")]
const CREATE_FLAGS: libc::c_int = libc::O_CREAT | libc::O_RDWR;
#[cfg(not(target_os = "macos"))]
const CREATE_FLAGS: libc::c_int = libc::O_CREAT | libc::O_TRUNC | libc::O_RDWR;

/// A named shared memory mapping.
pub struct SharedMapping {
    ptr: *mut u8,
    len: usize,
    fd: libc::c_int,
    name: CString,
    owner: bool,
}

// SAFETY: the mapping stays valid until munmap in drop.
unsafe impl Send for SharedMapping {}

impl SharedMapping {
    /// Create a mapping of exactly `len` bytes.
    pub fn create(name: &str, len: usize) -> Result<Self> {
        let cstr = cname(name)?;
        unsafe {
            let fd = libc::shm_open(cstr.as_ptr(), CREATE_FLAGS, 0o666 as libc::mode_t);
            if fd < 0 {
                return Err(io::Error::last_os_error().into());
            }
            if libc::ftruncate(fd, len as libc::off_t) < 0 {
                let err = io::Error::last_os_error();
                libc::close(fd);
                libc::shm_unlink(cstr.as_ptr());
                return Err(err.into());
            }
            let ptr = libc::mmap(
                ptr::null_mut(),
                len,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED,
                fd,
                0,
            );
            if ptr == libc::MAP_FAILED {
                let err = io::Error::last_os_error();
                libc::close(fd);
                libc::shm_unlink(cstr.as_ptr());
                return Err(err.into());
            }
            Ok(Self {
                ptr: ptr as *mut u8,
                len,
                fd,
                name: cstr,
                owner: true,
            })
        }
    }

    /// Open and map a region another process created.
    pub fn open(name: &str) -> Result<Self> {
        let cstr = cname(name)?;
        unsafe {
            let fd = libc::shm_open(cstr.as_ptr(), libc::O_RDWR, 0o666 as libc::mode_t);
            if fd < 0 {
                return Err(io::Error::last_os_error().into());
            }
            let mut stat = core::mem::zeroed::<libc::stat>();
            if libc::fstat(fd, &mut stat) < 0 {
                let err = io::Error::last_os_error();
                libc::close(fd);
                return Err(err.into());
            }
            let len = stat.st_size as usize;
            let ptr = libc::mmap(
                ptr::null_mut(),
                len,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED,
                fd,
                0,
            );
            if ptr == libc::MAP_FAILED {
                let err = io::Error::last_os_error();
                libc::close(fd);
                return Err(err.into());
            }
            Ok(Self {
                ptr: ptr as *mut u8,
                len,
                fd,
                name: cstr,
                owner: false,
            })
        }
    }

    pub fn ptr(&self) -> *mut u8 {
        self.ptr
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
            libc::munmap(self.ptr as *mut libc::c_void, self.len);
            libc::close(self.fd);
            if self.owner {
                libc::shm_unlink(self.name.as_ptr());
            }
        }
    }
}
