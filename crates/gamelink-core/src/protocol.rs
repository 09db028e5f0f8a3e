//! Command demultiplexing over the two message channels.
//!
//! Commands starting with `':'` form the mechanical dialect: terse
//! machine-to-machine verbs with no textual response, mapped onto the
//! emulator's control entry points. Everything else is the human dialect,
//! dispatched to the memory inspector with a printable-text reply.
//!
//! Mechanical commands may re-enter the publish path (a reset republishes
//! telemetry), so they are returned to the caller as a queued value and run
//! strictly after the region lock is released.

use gamelink_shared::MessageBuffer;

use crate::inspector::Inspector;
use crate::MachineControl;

/// Longest accepted mechanical command, in bytes.
const MECH_MAX: usize = 128;

/// A deferred machine-dialect action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MechCommand {
    Reset,
    Pause,
    Shutdown,
}

impl MechCommand {
    /// Invoke the matching emulator control entry point.
    pub fn apply(self, control: &mut dyn MachineControl) {
        match self {
            MechCommand::Reset => control.reset(),
            MechCommand::Pause => control.pause(),
            MechCommand::Shutdown => control.shutdown(),
        }
    }
}

/// One protocol tick: consume a pending inbound command, if any, and write
/// the response. Returns a mechanical command for the caller to run after
/// the lock is dropped.
///
/// Backpressure: nothing is consumed while the previous response sits
/// unacknowledged in `to_host`.
pub(crate) fn pump(
    inspector: &mut Inspector,
    ram: &[u8],
    to_guest: &mut MessageBuffer,
    to_host: &mut MessageBuffer,
) -> Option<MechCommand> {
    if to_guest.is_empty() {
        return None;
    }
    if !to_host.is_empty() {
        return None;
    }

    if to_guest.bytes().first() == Some(&b':') {
        let mut scratch = [0u8; MECH_MAX];
        let len = to_guest.bytes().len().min(MECH_MAX);
        scratch[..len].copy_from_slice(&to_guest.bytes()[..len]);
        let payload = to_guest.payload as usize;
        // Acknowledge before acting, so a control action that re-enters the
        // publish path never reprocesses the same command.
        to_guest.clear();
        return parse_mech(&scratch[..len], payload);
    }

    // Human dialect: printable ASCII only.
    let mut line = String::with_capacity(to_guest.bytes().len());
    for &byte in to_guest.bytes() {
        line.push(if (32..=127).contains(&byte) {
            byte as char
        } else {
            '?'
        });
    }
    to_guest.clear();

    dispatch(inspector, ram, &line, to_host);
    None
}

/// Decode a mechanical command. Null, oversized, and unrecognised commands
/// are silently ignored.
fn parse_mech(bytes: &[u8], payload: usize) -> Option<MechCommand> {
    if payload <= 1 || payload > MECH_MAX {
        return None;
    }
    let verb: &[u8] = match bytes.iter().position(|&b| b == 0) {
        Some(end) => &bytes[..end],
        None => bytes,
    };
    match verb {
        b":reset" => Some(MechCommand::Reset),
        b":pause" => Some(MechCommand::Pause),
        b":shutdown" => Some(MechCommand::Shutdown),
        _ => None,
    }
}

/// Dispatch a human-dialect line: first token is the verb, the remainder is
/// the argument string.
fn dispatch(inspector: &mut Inspector, ram: &[u8], line: &str, out: &mut MessageBuffer) {
    // A pending filter prompt consumes the whole line as the choice.
    if inspector.awaiting_filter_choice() {
        inspector.apply_filter_choice(line, ram, out);
        return;
    }

    let line = line.trim_start_matches(' ');
    let (verb, arg) = match line.split_once(' ') {
        Some((verb, rest)) => (verb, rest.trim_start_matches(' ')),
        None => (line, ""),
    };

    match verb {
        "" => {}
        "help" | "?" => inspector.help(out),
        "cls" => inspector.cls(out),
        "findb" => inspector.findb(arg, ram, out),
        "findw" => inspector.findw(arg, ram, out),
        "findd" => inspector.findd(arg, ram, out),
        "finds" => inspector.finds(arg, ram, out),
        "list" => inspector.list(ram, out),
        "meminfo" => inspector.meminfo(ram, out),
        "mem" => inspector.mem(arg, ram, out),
        "page" => inspector.page(arg, ram, out),
        "peek" => inspector.peek(arg, ram, out),
        "peekw" => inspector.peekw(arg, ram, out),
        "ramdump" => inspector.ramdump(arg, ram, out),
        "range" => inspector.range(arg, out),
        "rangelo" => inspector.rangelo(arg, out),
        "rangehi" => inspector.rangehi(arg, out),
        "reset" => inspector.reset(out),
        "setd" => inspector.setd(arg, out),
        "setx" => inspector.setx(arg, out),
        "snap" => inspector.snap(ram, out),
        _ => out.push_str("Bad command\n"),
    }
}
