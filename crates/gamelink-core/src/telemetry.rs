//! Per-frame publish and input collection.

use gamelink_shared::layout::{
    write_fixed_str, LinkFlags, FRAME_FORMAT_RGBA32, FRAME_MAX_HEIGHT, FRAME_MAX_WIDTH,
    PEEK_LIMIT,
};
use gamelink_shared::{Result, PROTOCOL_VERSION};
use tracing::trace;

use crate::{GameLink, LinkMode, MachineControl};

/// Everything the emulator publishes for one frame.
pub struct TelemetryUpdate<'a> {
    /// Name of the loaded guest program.
    pub program: &'a str,
    /// 128-bit content hash of the loaded guest program.
    pub program_hash: [u32; 4],
    pub frame_width: u16,
    pub frame_height: u16,
    /// Pixel aspect ratio (width of one pixel over its height).
    pub pixel_ratio: f64,
    /// Whether the emulator currently consumes companion mouse input.
    pub want_mouse: bool,
    pub paused: bool,
    /// RGBA32 pixels, row-major, `frame_width * frame_height * 4` bytes.
    pub frame_pixels: &'a [u8],
}

/// One consumed set of companion input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputState {
    pub mouse_dx: i32,
    pub mouse_dy: i32,
    pub mouse_buttons: u8,
    pub keyboard: [u8; 8],
}

/// Result of one input-collection pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinkInput {
    /// Fresh companion input, if any was marked ready.
    pub input: Option<InputState>,
    /// Requested master volume, left channel. Values above 100 mean "leave
    /// alone" and are reported as `None`.
    pub volume_left: Option<u8>,
    pub volume_right: Option<u8>,
}

impl GameLink {
    /// Publish one frame of telemetry, answer pending peek requests, and
    /// process at most one inbound command.
    ///
    /// `guest_ram` is the emulated RAM the inspector and the peek block read
    /// from. Mechanical commands run against `control` after the region lock
    /// has been released.
    pub fn publish(
        &mut self,
        update: &TelemetryUpdate<'_>,
        guest_ram: &[u8],
        control: &mut dyn MachineControl,
    ) -> Result<()> {
        let trackonly = self.mode == LinkMode::TrackOnly;
        // Quiet no-op while detached, so the emulator's frame loop can call
        // unconditionally.
        let inspector = match &mut self.inspector {
            Some(inspector) => inspector,
            None => return Ok(()),
        };

        let pending = self.transport.with_lock(|shared| {
            // Rewritten every frame, so a stomped field heals on the next
            // publish instead of wedging the link.
            shared.version = PROTOCOL_VERSION;

            let mut flags = if trackonly {
                LinkFlags::NO_FRAME
            } else if update.want_mouse {
                LinkFlags::WANT_KEYBOARD | LinkFlags::WANT_MOUSE
            } else {
                LinkFlags::WANT_KEYBOARD
            };
            if update.paused {
                flags |= LinkFlags::PAUSED;
            }
            shared.flags = flags.bits();

            write_fixed_str(&mut shared.program, update.program);
            shared.program_hash = update.program_hash;

            if !trackonly {
                shared.frame.seq = shared.frame.seq.wrapping_add(1);
                let width = update.frame_width;
                let height = update.frame_height;
                let payload = width as usize * height as usize * 4;
                // Zero-dimension and oversized frames leave the previous
                // frame metadata in place.
                if width > 0
                    && height > 0
                    && width <= FRAME_MAX_WIDTH
                    && height <= FRAME_MAX_HEIGHT
                    && update.frame_pixels.len() >= payload
                {
                    shared.frame.format = FRAME_FORMAT_RGBA32;
                    shared.frame.width = width;
                    shared.frame.height = height;
                    let (par_x, par_y) = integer_ratio(update.pixel_ratio);
                    shared.frame.par_x = par_x;
                    shared.frame.par_y = par_y;
                    shared.frame.buffer[..payload]
                        .copy_from_slice(&update.frame_pixels[..payload]);
                }
            }

            answer_peeks(shared, guest_ram);

            crate::protocol::pump(
                inspector,
                guest_ram,
                &mut shared.to_guest,
                &mut shared.to_host,
            )
        })?;

        if let Some(cmd) = pending {
            trace!(?cmd, "applying deferred machine command");
            cmd.apply(control);
        }
        Ok(())
    }

    /// Collect companion input and volume requests. Input is consume-once:
    /// the ready marker is cleared under the lock.
    pub fn collect_input(&mut self) -> Result<LinkInput> {
        // Tracking-only links never consume companion input; detached links
        // have none to offer.
        if self.mode == LinkMode::TrackOnly || !self.transport.is_attached() {
            return Ok(LinkInput::default());
        }
        self.transport.with_lock(|shared| {
            let mut collected = LinkInput::default();
            if shared.input.ready != 0 {
                collected.input = Some(InputState {
                    mouse_dx: shared.input.mouse_dx,
                    mouse_dy: shared.input.mouse_dy,
                    mouse_buttons: shared.input.mouse_buttons,
                    keyboard: shared.input.keyboard,
                });
                shared.input.mouse_dx = 0;
                shared.input.mouse_dy = 0;
                shared.input.ready = 0;
            }
            if shared.audio.master_vol_l <= 100 {
                collected.volume_left = Some(shared.audio.master_vol_l);
            }
            if shared.audio.master_vol_r <= 100 {
                collected.volume_right = Some(shared.audio.master_vol_r);
            }
            collected
        })
    }
}

/// Answer every pending peek request from the guest RAM; out-of-range
/// addresses read as 0.
fn answer_peeks(shared: &mut gamelink_shared::SharedMemoryMap, ram: &[u8]) {
    let count = (shared.peek.addr_count as usize).min(PEEK_LIMIT);
    for i in 0..count {
        let addr = shared.peek.addrs[i] as usize;
        shared.peek.data[i] = ram.get(addr).copied().unwrap_or(0);
    }
}

/// Render a pixel aspect ratio as the 4096-scaled integer pair the region
/// carries: the side the ratio scales up gets the scaled value, the other
/// side pins to 4096. Extreme ratios saturate; non-positive (or non-finite)
/// ratios fall back to square pixels.
pub(crate) fn integer_ratio(ratio: f64) -> (u16, u16) {
    if !ratio.is_finite() || ratio <= 0.0 {
        return (1, 1);
    }
    if ratio >= 1.0 {
        (4096, scaled(ratio * 4096.0))
    } else {
        (scaled(4096.0 / ratio), 4096)
    }
}

fn scaled(value: f64) -> u16 {
    value.round().clamp(1.0, f64::from(u16::MAX)) as u16
}
