//! `#[repr(C)]` layout of the shared region header.
//!
//! Both processes compile this module, so the layout is the wire format.
//! The header is followed in the mapping by `ram_size` bytes mirroring the
//! emulated RAM; the region is exactly `HEADER_SIZE + ram_size` bytes and is
//! never resized.

use bitflags::bitflags;

use crate::buffer::MessageBuffer;

/// Maximum number of peek addresses the companion may request per frame.
pub const PEEK_LIMIT: usize = 16 * 1024;

/// Widest frame the pixel buffer accepts. Oversized frames are dropped.
pub const FRAME_MAX_WIDTH: u16 = 1280;
/// Tallest frame the pixel buffer accepts.
pub const FRAME_MAX_HEIGHT: u16 = 1024;
/// Pixel buffer capacity (32-bit RGBA at the maximum dimensions).
pub const FRAME_MAX_PAYLOAD: usize =
    FRAME_MAX_WIDTH as usize * FRAME_MAX_HEIGHT as usize * 4;

/// `frame.format` value meaning "no frame published".
pub const FRAME_FORMAT_NONE: u8 = 0;
/// `frame.format` value for 32-bit RGBA pixels.
pub const FRAME_FORMAT_RGBA32: u8 = 1;

/// Capacity of the fixed host-system name field.
pub const SYSTEM_NAME_LEN: usize = 64;
/// Capacity of the fixed program name field.
pub const PROGRAM_NAME_LEN: usize = 256;

bitflags! {
    /// Flag byte published by the emulator every frame.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct LinkFlags: u8 {
        /// Tracking-only mode; the pixel buffer is not updated.
        const NO_FRAME = 1 << 0;
        /// The emulator consumes companion keyboard state.
        const WANT_KEYBOARD = 1 << 1;
        /// The emulator consumes companion mouse input.
        const WANT_MOUSE = 1 << 2;
        /// Emulation is currently paused.
        const PAUSED = 1 << 3;
    }
}

/// Companion-supplied input, consumed-and-cleared by the emulator.
#[repr(C)]
pub struct InputBlock {
    /// Accumulated mouse delta since the last consumption.
    pub mouse_dx: i32,
    pub mouse_dy: i32,
    /// Mouse button bitmap.
    pub mouse_buttons: u8,
    /// Keyboard state bitmap.
    pub keyboard: [u8; 8],
    /// Nonzero once the companion has written a fresh input set.
    pub ready: u8,
}

/// Companion peek requests and the emulator's answers.
#[repr(C)]
pub struct PeekBlock {
    /// Number of valid entries in `addrs` (capped at [`PEEK_LIMIT`]).
    pub addr_count: u32,
    pub addrs: [u32; PEEK_LIMIT],
    /// `data[i]` holds the byte at `addrs[i]`, or 0 if out of range.
    pub data: [u8; PEEK_LIMIT],
}

/// Published video frame.
#[repr(C)]
pub struct FrameBlock {
    /// Monotonic sequence number, bumped on every publish.
    pub seq: u32,
    /// [`FRAME_FORMAT_NONE`] or [`FRAME_FORMAT_RGBA32`].
    pub format: u8,
    pub width: u16,
    pub height: u16,
    /// Pixel aspect ratio as an integer pair (4096-scaled).
    pub par_x: u16,
    pub par_y: u16,
    pub buffer: [u8; FRAME_MAX_PAYLOAD],
}

/// Bidirectional master volume sync. Values above 100 mean "unset".
#[repr(C)]
pub struct AudioBlock {
    pub master_vol_l: u8,
    pub master_vol_r: u8,
}

/// Header of the shared region.
///
/// Field order is part of the wire contract; both sides must be built from
/// the same revision of this crate ([`crate::PROTOCOL_VERSION`] guards this).
#[repr(C)]
pub struct SharedMemoryMap {
    pub version: u32,
    /// [`LinkFlags`] bits.
    pub flags: u8,
    /// NUL-terminated emulator identity, e.g. the emulator's product name.
    pub system: [u8; SYSTEM_NAME_LEN],
    /// NUL-terminated name of the loaded guest program.
    pub program: [u8; PROGRAM_NAME_LEN],
    /// 128-bit content hash of the loaded guest program.
    pub program_hash: [u32; 4],
    pub input: InputBlock,
    pub peek: PeekBlock,
    pub frame: FrameBlock,
    pub audio: AudioBlock,
    /// Companion -> emulator command channel.
    pub to_guest: MessageBuffer,
    /// Emulator -> companion response channel.
    pub to_host: MessageBuffer,
    /// Size of the RAM mirror that follows this header in the mapping.
    pub ram_size: u32,
}

/// Byte size of the region header; the RAM mirror starts at this offset.
pub const HEADER_SIZE: usize = core::mem::size_of::<SharedMemoryMap>();

/// Copy `value` into a fixed NUL-terminated field, truncating as needed.
pub fn write_fixed_str(dst: &mut [u8], value: &str) {
    dst.fill(0);
    let take = value.len().min(dst.len().saturating_sub(1));
    dst[..take].copy_from_slice(&value.as_bytes()[..take]);
}

/// Read a fixed NUL-terminated field back out as text.
pub fn read_fixed_str(src: &[u8]) -> String {
    let end = src.iter().position(|&b| b == 0).unwrap_or(src.len());
    String::from_utf8_lossy(&src[..end]).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_covers_frame_and_peek_tables() {
        // The header must be large enough for the big payload tables; a
        // drastic size change means the layout (and protocol rev) changed.
        assert!(HEADER_SIZE > FRAME_MAX_PAYLOAD + PEEK_LIMIT * 5);
        assert!(HEADER_SIZE < FRAME_MAX_PAYLOAD + PEEK_LIMIT * 5 + 8 * 1024);
    }

    #[test]
    fn fixed_str_truncates_and_terminates() {
        let mut field = [0xAAu8; 8];
        write_fixed_str(&mut field, "abcdefghij");
        assert_eq!(&field[..7], b"abcdefg");
        assert_eq!(field[7], 0);
        assert_eq!(read_fixed_str(&field), "abcdefg");

        write_fixed_str(&mut field, "hi");
        assert_eq!(read_fixed_str(&field), "hi");
    }

    #[test]
    fn flags_round_trip_through_raw_byte() {
        let flags = LinkFlags::WANT_KEYBOARD | LinkFlags::PAUSED;
        assert_eq!(LinkFlags::from_bits_truncate(flags.bits()), flags);
        assert_eq!(flags.bits(), 0b1010);
    }
}
