//! Platform capability: named mutex and named shared memory mapping.
//!
//! One narrow surface with two implementations selected at build time:
//! Win32 kernel objects on Windows, POSIX named semaphores plus `shm_open`
//! everywhere else. Everything above this module is platform-agnostic.
//!
//! Both types offer create-or-fail (with "already exists" detection),
//! open-existing, and destruction on drop. Only the creator unlinks the
//! POSIX names; on Windows the kernel reclaims named objects with the last
//! handle.

#[cfg(windows)]
mod win32;
#[cfg(windows)]
pub use win32::{MutexGuard, NamedMutex, SharedMapping};

#[cfg(unix)]
mod posix;
#[cfg(unix)]
pub use posix::{MutexGuard, NamedMutex, SharedMapping};
