//! Fixed-capacity message buffer, one per direction.
//!
//! `payload > 0` means "message pending, unread"; the receiver acknowledges
//! by setting `payload` back to 0. At most one message is in flight per
//! direction. Writes past the capacity are dropped, never grown: the last
//! byte is reserved so the text payload always carries a trailing NUL.

use core::fmt;

/// Byte capacity of one message buffer.
pub const BUFFER_CAPACITY: usize = 4096;

/// A bounded single-message channel inside the shared region.
#[repr(C)]
pub struct MessageBuffer {
    /// Length of the pending message; 0 when the channel is idle.
    pub payload: u16,
    pub data: [u8; BUFFER_CAPACITY],
}

impl MessageBuffer {
    pub const CAPACITY: usize = BUFFER_CAPACITY;

    pub const fn new() -> Self {
        Self {
            payload: 0,
            data: [0; BUFFER_CAPACITY],
        }
    }

    /// True when no message is pending.
    pub fn is_empty(&self) -> bool {
        self.payload == 0
    }

    /// Acknowledge the pending message. Stale bytes are left behind; only
    /// `payload` carries meaning.
    pub fn clear(&mut self) {
        self.payload = 0;
    }

    /// The pending message bytes (without the trailing NUL).
    pub fn bytes(&self) -> &[u8] {
        let len = (self.payload as usize).min(Self::CAPACITY);
        &self.data[..len]
    }

    /// Append one byte, dropping it if the buffer is full.
    pub fn push_byte(&mut self, byte: u8) {
        let len = self.payload as usize;
        if len >= Self::CAPACITY - 1 {
            return;
        }
        self.data[len] = byte;
        self.payload = (len + 1) as u16;
        self.data[len + 1] = 0;
    }

    /// Append a string, truncating at capacity.
    pub fn push_str(&mut self, text: &str) {
        for &byte in text.as_bytes() {
            let len = self.payload as usize;
            if len >= Self::CAPACITY - 1 {
                break;
            }
            self.data[len] = byte;
            self.payload = (len + 1) as u16;
        }
        self.data[self.payload as usize] = 0;
    }

    /// Replace the buffer contents with one message, truncating at capacity.
    pub fn set_bytes(&mut self, message: &[u8]) {
        let take = message.len().min(Self::CAPACITY - 1);
        self.data[..take].copy_from_slice(&message[..take]);
        self.data[take] = 0;
        self.payload = take as u16;
    }
}

impl Default for MessageBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Text responses render straight into the buffer; overflow truncates
/// silently, so formatting never fails.
impl fmt::Write for MessageBuffer {
    fn write_str(&mut self, text: &str) -> fmt::Result {
        self.push_str(text);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::fmt::Write;

    #[test]
    fn push_truncates_and_keeps_terminator() {
        let mut buf = MessageBuffer::new();
        let long = "x".repeat(BUFFER_CAPACITY * 2);
        buf.push_str(&long);
        assert_eq!(buf.payload as usize, BUFFER_CAPACITY - 1);
        assert_eq!(buf.data[BUFFER_CAPACITY - 1], 0);

        // Further writes are dropped without disturbing the terminator.
        buf.push_byte(b'y');
        buf.push_str("more");
        assert_eq!(buf.payload as usize, BUFFER_CAPACITY - 1);
        assert!(!buf.bytes().contains(&b'y'));
    }

    #[test]
    fn set_bytes_replaces_pending_message() {
        let mut buf = MessageBuffer::new();
        buf.set_bytes(b"meminfo");
        assert_eq!(buf.bytes(), b"meminfo");
        assert_eq!(buf.data[7], 0);
        buf.clear();
        assert!(buf.is_empty());
    }

    #[test]
    fn fmt_write_never_errors() {
        let mut buf = MessageBuffer::new();
        for i in 0..2000 {
            write!(buf, "{i:08X}").unwrap();
        }
        assert_eq!(buf.payload as usize, BUFFER_CAPACITY - 1);
    }
}
