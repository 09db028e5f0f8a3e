//! Cheat-search style memory inspector.
//!
//! Operates on the emulated RAM the telemetry writer hands it each frame.
//! Keeps a snapshot buffer and an ignore mask sized to the RAM, a compare
//! register, and a search range; supports pattern/value/string searches and
//! multi-pass differential filtering. All responses are rendered as
//! terminal-flavoured text into the outbound channel, which truncates
//! silently at capacity.

use core::fmt::Write;

use gamelink_shared::MessageBuffer;

/// Searches and the lead list stop after this many reported rows.
const RESULT_CAP: usize = 100;

/// Fresh links search DOS conventional memory by default.
const DEFAULT_RANGE_END: u32 = 640 * 1024;

const ONE_MEG: usize = 1024 * 1024;

/// Reverse-video highlight for the requested byte in a dump row.
const VID_REVERSE: &str = "\x1b[7m";
const VID_NORMAL: &str = "\x1b[0m";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FilterState {
    /// Snapshot holds a baseline; `snap` prompts for a filter.
    Idle,
    /// Next `snap` copies live RAM as the baseline.
    AwaitingBaseline,
    /// A filter prompt is showing; the next line is the choice.
    AwaitingFilterChoice,
}

/// Process-local inspector state; lifetime = one emulator run.
pub struct Inspector {
    ram_size: u32,
    range_start: u32,
    /// End exclusive, clamped to `ram_size`.
    range_end: u32,
    /// Lazily allocated, `ram_size` bytes.
    snapshot: Option<Vec<u8>>,
    /// Lazily allocated, `ram_size` bytes; 1 = excluded from result sets.
    /// Exclusions only ever accumulate until the next `reset`.
    ignore: Option<Vec<u8>>,
    cmp_value: u8,
    state: FilterState,
    /// Addresses still in play after the last filter pass.
    leads: u32,
}

impl Inspector {
    pub fn new(ram_size: u32) -> Self {
        Self {
            ram_size,
            range_start: 0,
            range_end: DEFAULT_RANGE_END.min(ram_size),
            snapshot: None,
            ignore: None,
            cmp_value: 0,
            state: FilterState::AwaitingBaseline,
            leads: ram_size,
        }
    }

    pub(crate) fn awaiting_filter_choice(&self) -> bool {
        self.state == FilterState::AwaitingFilterChoice
    }

    /// Allocate (on first use) and return the snapshot and ignore buffers.
    /// The ignore mask starts with everything outside the range excluded.
    fn buffers(&mut self) -> (&mut [u8], &mut [u8]) {
        let size = self.ram_size as usize;
        if self.snapshot.is_none() {
            self.snapshot = Some(vec![0u8; size]);
        }
        if self.ignore.is_none() {
            let mut mask = vec![0u8; size];
            let lo = (self.range_start as usize).min(size);
            let hi = (self.range_end as usize).min(size);
            mask[..lo].fill(1);
            mask[hi..].fill(1);
            self.ignore = Some(mask);
        }
        match (&mut self.snapshot, &mut self.ignore) {
            (Some(snapshot), Some(ignore)) => (snapshot, ignore),
            _ => unreachable!("buffers allocated above"),
        }
    }

    // ------------------------------------------------------------------
    // Range control
    // ------------------------------------------------------------------

    pub(crate) fn range(&mut self, arg: &str, out: &mut MessageBuffer) {
        let mut vals = [0u32; 3];
        let mut count = 0;
        for token in arg.split_whitespace() {
            if count == vals.len() {
                break;
            }
            match parse_hex(token) {
                Some(value) => {
                    vals[count] = value;
                    count += 1;
                }
                None => break,
            }
        }

        if count != 2 {
            out.push_str("range <addr-lo> <addr-hi>\n");
            let _ = write!(
                out,
                "Current: 0x{:05X} - 0x{:05X}\n",
                self.range_start, self.range_end
            );
            return;
        }

        self.range_start = vals[0];
        self.range_end = vals[1].min(self.ram_size);
        if self.range_end < self.range_start {
            self.range_start = self.range_end;
        }
        let _ = write!(
            out,
            "Changed find address range to 0x{:05X} - 0x{:05X}\n",
            self.range_start, self.range_end
        );
    }

    pub(crate) fn rangelo(&mut self, arg: &str, out: &mut MessageBuffer) {
        let value = match arg.split_whitespace().next().and_then(parse_hex) {
            Some(value) => value,
            None => {
                out.push_str("rangelo <addr>\n");
                return;
            }
        };
        self.range_start = value.min(self.range_end).min(self.ram_size);
        let _ = write!(
            out,
            "Changed find start address to 0x{:05X}\n",
            self.range_start
        );
    }

    pub(crate) fn rangehi(&mut self, arg: &str, out: &mut MessageBuffer) {
        let value = match arg.split_whitespace().next().and_then(parse_hex) {
            Some(value) => value,
            None => {
                out.push_str("rangehi <addr>\n");
                return;
            }
        };
        self.range_end = value.max(self.range_start).min(self.ram_size);
        let _ = write!(
            out,
            "Changed find end address to 0x{:05X}\n",
            self.range_end
        );
    }

    // ------------------------------------------------------------------
    // Snapshot filtering
    // ------------------------------------------------------------------

    pub(crate) fn reset(&mut self, out: &mut MessageBuffer) {
        // Drop and reallocate so the mask picks up the current range.
        self.snapshot = None;
        self.ignore = None;
        self.buffers();
        self.state = FilterState::AwaitingBaseline;
        self.leads = self.ram_size;
        let _ = write!(
            out,
            "Reset snapshot. Using range: 0x{:05X} - 0x{:05X}\n",
            self.range_start,
            self.range_end.saturating_sub(1)
        );
    }

    pub(crate) fn snap(&mut self, ram: &[u8], out: &mut MessageBuffer) {
        if self.state == FilterState::AwaitingBaseline {
            let (snapshot, _) = self.buffers();
            copy_ram(snapshot, ram);
            out.push_str("Initial memory snapshot taken. Snap again to compare.\n");
            self.state = FilterState::Idle;
        } else {
            let _ = write!(
                out,
                "\nSelect Filter: 1.EQ 2.NE 3.LT 4.GT 5.EQ:{:02x} 6.NE:{:02x} (0.CANCEL) ?",
                self.cmp_value, self.cmp_value
            );
            self.state = FilterState::AwaitingFilterChoice;
        }
    }

    /// Run one filter pass over every not-yet-excluded address. Addresses
    /// failing the predicate are excluded permanently (until `reset`);
    /// choice 0 (or anything unparseable) only recounts. The snapshot is
    /// refreshed afterwards either way.
    pub(crate) fn apply_filter_choice(&mut self, line: &str, ram: &[u8], out: &mut MessageBuffer) {
        // atoi-style: leading digits only, trailing junk ignored.
        let trimmed = line.trim();
        let digits = trimmed
            .find(|c: char| !c.is_ascii_digit())
            .map_or(trimmed, |end| &trimmed[..end]);
        let choice = digits.parse::<u32>().unwrap_or(0);
        let size = self.ram_size as usize;
        let cmp_value = self.cmp_value;
        let (snapshot, ignore) = self.buffers();

        let mut leads = 0u32;
        for addr in 0..size {
            if ignore[addr] != 0 {
                continue;
            }
            let live = ram.get(addr).copied().unwrap_or(0);
            let keep = match choice {
                1 => live == snapshot[addr],
                2 => live != snapshot[addr],
                3 => live < snapshot[addr],
                4 => live > snapshot[addr],
                5 => live == cmp_value,
                6 => live != cmp_value,
                _ => true,
            };
            if keep {
                leads += 1;
            } else {
                ignore[addr] = 1;
            }
        }

        copy_ram(snapshot, ram);
        self.leads = leads;
        self.state = FilterState::Idle;
        let _ = write!(out, "  ... {leads} results.\n");
    }

    pub(crate) fn setd(&mut self, arg: &str, out: &mut MessageBuffer) {
        self.cmp_value = arg.trim().parse::<i64>().unwrap_or(0) as u8;
        let _ = write!(out, "Snap compare register = 0x{:02X}\n", self.cmp_value);
    }

    pub(crate) fn setx(&mut self, arg: &str, out: &mut MessageBuffer) {
        self.cmp_value = arg
            .split_whitespace()
            .next()
            .and_then(parse_hex)
            .unwrap_or(0) as u8;
        let _ = write!(out, "Snap compare register = 0x{:02X}\n", self.cmp_value);
    }

    pub(crate) fn list(&mut self, ram: &[u8], out: &mut MessageBuffer) {
        let size = self.ram_size as usize;
        let leads = self.leads;
        let (snapshot, ignore) = self.buffers();

        if leads == 0 {
            out.push_str("No results. Use snap command.\n");
            return;
        }

        let mut count = 0;
        for addr in 0..size {
            if ignore[addr] != 0 {
                continue;
            }
            let live = ram.get(addr).copied().unwrap_or(0);
            let old = snapshot[addr];
            let _ = write!(
                out,
                " {addr:8X} | mem = {live:3} (0x{live:02X}), snap = {old:3} (0x{old:02X}) \n"
            );
            count += 1;
            if count == RESULT_CAP {
                out.push_str("  ... stopping at 100 results.\n");
                return;
            }
        }
        let _ = write!(out, "  ... {leads} results.\n");
    }

    // ------------------------------------------------------------------
    // Peeks and dumps
    // ------------------------------------------------------------------

    pub(crate) fn peek(&mut self, arg: &str, ram: &[u8], out: &mut MessageBuffer) {
        let ram_size = self.ram_size;
        let (snapshot, _) = self.buffers();
        for token in arg.split_whitespace() {
            let addr = match parse_hex(token) {
                Some(addr) if addr < ram_size => addr,
                _ => break,
            };
            let live = byte_at(ram, addr);
            let old = snapshot.get(addr as usize).copied().unwrap_or(0);
            let _ = write!(
                out,
                " {addr:8X} | mem = {live:3} (0x{live:02X}), snap = {old:3} (0x{old:02X})\n"
            );
        }
    }

    pub(crate) fn peekw(&mut self, arg: &str, ram: &[u8], out: &mut MessageBuffer) {
        let ram_size = self.ram_size;
        let (snapshot, _) = self.buffers();
        for token in arg.split_whitespace() {
            let addr = match parse_hex(token) {
                Some(addr) if addr < ram_size => addr,
                _ => break,
            };
            let live = word_at(ram, addr);
            let old = word_at(snapshot, addr);
            let _ = write!(
                out,
                " addr:{addr:05x} | mem = {live:5} (0x{live:04x}), snap = {old:5} (0x{old:04x}) \n"
            );
        }
    }

    pub(crate) fn mem(&mut self, arg: &str, ram: &[u8], out: &mut MessageBuffer) {
        for token in arg.split_whitespace() {
            let addr = match parse_hex(token) {
                Some(addr) if addr < self.ram_size => addr,
                _ => break,
            };
            dump_row(ram, addr & !0xF, addr, out);
        }
    }

    pub(crate) fn page(&mut self, arg: &str, ram: &[u8], out: &mut MessageBuffer) {
        for token in arg.split_whitespace() {
            let addr = match parse_hex(token) {
                Some(addr) if addr < self.ram_size => addr,
                _ => break,
            };
            let mut row = addr & !0xF;
            for _ in 0..16 {
                dump_row(ram, row, addr, out);
                row = row.wrapping_add(16);
            }
        }
    }

    // ------------------------------------------------------------------
    // Searches
    // ------------------------------------------------------------------

    pub(crate) fn findb(&mut self, arg: &str, ram: &[u8], out: &mut MessageBuffer) {
        if arg.is_empty() {
            out.push_str("findb <value> [<value> ...]\n");
            return;
        }

        let mut needle = Vec::new();
        for token in arg.split_whitespace() {
            match parse_hex(token) {
                Some(value) if value < 256 => {
                    needle.push(value as u8);
                    if needle.len() > 255 {
                        break;
                    }
                }
                _ => break,
            }
        }

        let mut found = false;
        if !needle.is_empty() {
            let mut count = 0;
            for addr in self.search_window(ram, needle.len()) {
                if ram[addr..addr + needle.len()] == needle[..] {
                    found = true;
                    let _ = write!(out, " found at 0x{addr:05X}\n");
                    count += 1;
                    if count >= RESULT_CAP {
                        out.push_str(" ... stopping at 100 results.\n");
                        break;
                    }
                }
            }
        }

        if !found {
            out.push_str("Not found\n");
        }
    }

    pub(crate) fn findw(&mut self, arg: &str, ram: &[u8], out: &mut MessageBuffer) {
        let value = match arg.split_whitespace().next().and_then(parse_hex) {
            Some(value) => value as u16,
            None => {
                out.push_str("findw <value>\n");
                return;
            }
        };

        let mut found = false;
        let mut count = 0;
        for addr in self.search_window(ram, 2) {
            if word_at(ram, addr as u32) == value {
                // The value is named once; further hits list addresses only.
                if !found {
                    let _ = write!(out, "Found 0x{value:04X}");
                    found = true;
                }
                let _ = write!(out, " at 0x{addr:05X}\n");
                count += 1;
                if count >= RESULT_CAP {
                    out.push_str(" ... stopping at 100 results.\n");
                    break;
                }
            }
        }

        if !found {
            out.push_str("Not found\n");
        }
    }

    pub(crate) fn findd(&mut self, arg: &str, ram: &[u8], out: &mut MessageBuffer) {
        let value = match arg.split_whitespace().next().and_then(parse_hex) {
            Some(value) => value,
            None => {
                out.push_str("findd <value>\n");
                return;
            }
        };

        let mut found = false;
        let mut count = 0;
        for addr in self.search_window(ram, 4) {
            let live = u32::from_le_bytes([
                ram[addr],
                ram[addr + 1],
                ram[addr + 2],
                ram[addr + 3],
            ]);
            if live == value {
                let _ = write!(out, "Found 0x{value:08X} at 0x{addr:05X}\n");
                found = true;
                count += 1;
                if count >= RESULT_CAP {
                    out.push_str(" ... stopping at 100 results.\n");
                    break;
                }
            }
        }

        if !found {
            out.push_str("Not found\n");
        }
    }

    pub(crate) fn finds(&mut self, arg: &str, ram: &[u8], out: &mut MessageBuffer) {
        if arg.is_empty() {
            out.push_str("finds <string>\n");
            return;
        }

        let needle = arg.as_bytes();
        let mut found = false;
        let mut count = 0;
        for addr in self.search_window(ram, needle.len()) {
            if &ram[addr..addr + needle.len()] == needle {
                let _ = write!(out, "Found \"{arg}\" at 0x{addr:05X}\n");
                found = true;
                count += 1;
                if count >= RESULT_CAP {
                    out.push_str(" ... stopping at 100 results.\n");
                    break;
                }
            }
        }

        if !found {
            out.push_str("Not found\n");
        }
    }

    /// Start addresses inside `[range_start, range_end)` from which a match
    /// of `needle_len` bytes fits entirely inside the range and the RAM.
    fn search_window(&self, ram: &[u8], needle_len: usize) -> core::ops::Range<usize> {
        let lo = self.range_start as usize;
        let hi = (self.range_end as usize).min(ram.len());
        if needle_len == 0 || hi < lo + needle_len {
            return 0..0;
        }
        lo..hi - needle_len + 1
    }

    // ------------------------------------------------------------------
    // Misc
    // ------------------------------------------------------------------

    pub(crate) fn ramdump(&mut self, arg: &str, ram: &[u8], out: &mut MessageBuffer) {
        let path = arg.trim();
        if path.is_empty() {
            out.push_str("ramdump <filename>\n");
            return;
        }
        match std::fs::write(path, ram) {
            Ok(()) => {
                let mb = ram.len().div_ceil(ONE_MEG);
                let _ = write!(out, "Wrote \"{path}\" ({mb}Mb)\n");
            }
            Err(_) => out.push_str("Error: Write failed.\n"),
        }
    }

    pub(crate) fn meminfo(&mut self, ram: &[u8], out: &mut MessageBuffer) {
        let mb = (self.ram_size as usize).div_ceil(ONE_MEG);
        let _ = write!(
            out,
            "&MemBase = 0x{:08X}; MemBaseSize = {} ({}MB)\n",
            ram.as_ptr() as usize,
            self.ram_size,
            mb
        );
    }

    pub(crate) fn cls(&mut self, out: &mut MessageBuffer) {
        out.push_str("\x1b[2J");
    }

    pub(crate) fn help(&mut self, out: &mut MessageBuffer) {
        out.push_str("\n");
        out.push_str("  help     ... This help.\n");
        out.push_str("  cls      ... Clear screen.\n");
        out.push_str("  finds    ... Find a given string in the set range.\n");
        out.push_str("  findb    ... Find a pattern of hexadecimal byte value(s).\n");
        out.push_str("  findw    ... Find the given 16-bit hexadecimal value.\n");
        out.push_str("  findd    ... Find the given 32-bit hexadecimal value.\n");
        out.push_str("  list     ... List relevant snapshot values.\n");
        out.push_str("  mem      ... Print 16 bytes around the given addr(s).\n");
        out.push_str("  meminfo  ... Print base address and size of emulated RAM.\n");
        out.push_str("  page     ... Print 256 bytes around the given addr(s).\n");
        out.push_str("  peek     ... Peek byte(s) from specific addresses (space delimited).\n");
        out.push_str("  peekw    ... Peek 16-bit words(s) from specific addresses (space delimited).\n");
        out.push_str("  ramdump  ... Write the current contents of all RAM to a file.\n");
        let _ = write!(
            out,
            "  range    ... Set address range for searches [0x{:05X} - 0x{:05X}]\n",
            self.range_start, self.range_end
        );
        out.push_str("  rangelo  ... Set search start address.\n");
        out.push_str("  rangehi  ... Set search end address.\n");
        out.push_str("  reset    ... Reset snapshot. Start over and update for new range.\n");
        out.push_str("  setd     ... Set the snap compare register (as decimal byte).\n");
        out.push_str("  setx     ... Set the snap compare register (as hex byte).\n");
        out.push_str("  snap     ... Memory snapshot and compare functions.\n");
    }
}

/// Hex numeral, with or without a `0x` prefix.
fn parse_hex(token: &str) -> Option<u32> {
    let digits = token
        .strip_prefix("0x")
        .or_else(|| token.strip_prefix("0X"))
        .unwrap_or(token);
    u32::from_str_radix(digits, 16).ok()
}

fn byte_at(ram: &[u8], addr: u32) -> u8 {
    ram.get(addr as usize).copied().unwrap_or(0)
}

/// Little-endian 16-bit read; bytes past the end read as 0.
fn word_at(ram: &[u8], addr: u32) -> u16 {
    let lo = byte_at(ram, addr) as u16;
    let hi = byte_at(ram, addr.wrapping_add(1)) as u16;
    lo | (hi << 8)
}

fn copy_ram(dst: &mut [u8], ram: &[u8]) {
    let len = dst.len().min(ram.len());
    dst[..len].copy_from_slice(&ram[..len]);
}

/// One 16-byte hex+ASCII row with the requested address highlighted.
fn dump_row(ram: &[u8], row_base: u32, highlight: u32, out: &mut MessageBuffer) {
    let _ = write!(out, " {row_base:8X} |");
    for offset in 0..16u32 {
        let addr = row_base.wrapping_add(offset);
        if addr == highlight {
            out.push_str(" ");
            out.push_str(VID_REVERSE);
        } else {
            out.push_str(" ");
        }
        let _ = write!(out, "{:02X}", byte_at(ram, addr));
        if addr == highlight {
            out.push_str(VID_NORMAL);
        }
    }
    out.push_str(" ");
    for offset in 0..16u32 {
        let addr = row_base.wrapping_add(offset);
        let ch = byte_at(ram, addr);
        if addr == highlight {
            out.push_str(VID_REVERSE);
        }
        out.push_byte(if (32..127).contains(&ch) { ch } else { b'.' });
        if addr == highlight {
            out.push_str(VID_NORMAL);
        }
    }
    out.push_str("\n");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(out: &MessageBuffer) -> String {
        String::from_utf8_lossy(out.bytes()).into_owned()
    }

    fn out() -> MessageBuffer {
        MessageBuffer::new()
    }

    #[test]
    fn reset_excludes_everything_outside_the_range() {
        let mut ins = Inspector::new(1024);
        let mut buf = out();
        ins.range("64 C8", &mut buf); // 0x64..0xC8
        buf.clear();
        ins.reset(&mut buf);

        let ignore = ins.ignore.as_ref().unwrap();
        for addr in 0..1024usize {
            let inside = (0x64..0xC8).contains(&addr);
            assert_eq!(ignore[addr] == 0, inside, "addr {addr:#x}");
        }
        assert_eq!(ins.leads, 1024);
        assert!(text(&buf).starts_with("Reset snapshot."));
    }

    #[test]
    fn eq_filter_on_unchanged_ram_keeps_the_whole_range() {
        let ram = vec![0u8; 1024];
        let mut ins = Inspector::new(1024);
        let mut buf = out();

        ins.reset(&mut buf);
        ins.snap(&ram, &mut buf); // baseline
        assert_eq!(ins.state, FilterState::Idle);
        ins.snap(&ram, &mut buf); // prompt
        assert!(ins.awaiting_filter_choice());
        buf.clear();
        ins.apply_filter_choice("1", &ram, &mut buf);

        assert_eq!(ins.leads, 1024);
        assert_eq!(ins.state, FilterState::Idle);
        assert_eq!(text(&buf), "  ... 1024 results.\n");
    }

    #[test]
    fn ne_filter_isolates_a_single_changed_byte() {
        let mut ram = vec![0u8; 1024];
        ram[100] = 0x7F;
        let mut ins = Inspector::new(1024);
        let mut buf = out();

        ins.reset(&mut buf);
        ins.snap(&ram, &mut buf); // baseline with 0x7F at 100
        ram[100] = 0x00;
        ins.snap(&ram, &mut buf);
        ins.apply_filter_choice("2", &ram, &mut buf);

        assert_eq!(ins.leads, 1);
        let ignore = ins.ignore.as_ref().unwrap();
        assert_eq!(ignore[100], 0);
        assert!(ignore
            .iter()
            .enumerate()
            .all(|(addr, &masked)| addr == 100 || masked == 1));
    }

    #[test]
    fn exclusions_are_monotonic_across_passes() {
        let mut ram = vec![0u8; 256];
        let mut ins = Inspector::new(256);
        let mut buf = out();

        ins.reset(&mut buf);
        ins.snap(&ram, &mut buf);
        ram[5] = 1;
        ins.snap(&ram, &mut buf);
        ins.apply_filter_choice("2", &ram, &mut buf); // only addr 5 survives
        assert_eq!(ins.leads, 1);

        // A recount (choice 0) must not resurrect excluded addresses.
        ins.snap(&ram, &mut buf);
        buf.clear();
        ins.apply_filter_choice("0", &ram, &mut buf);
        assert_eq!(ins.leads, 1);
        assert_eq!(text(&buf), "  ... 1 results.\n");
    }

    #[test]
    fn filter_pass_refreshes_the_snapshot() {
        let mut ram = vec![0u8; 64];
        let mut ins = Inspector::new(64);
        let mut buf = out();

        ins.reset(&mut buf);
        ins.snap(&ram, &mut buf);
        ram[3] = 9;
        ins.snap(&ram, &mut buf);
        ins.apply_filter_choice("0", &ram, &mut buf);
        assert_eq!(ins.snapshot.as_ref().unwrap()[3], 9);
    }

    #[test]
    fn filter_choice_reads_leading_digits_only() {
        let mut ram = vec![5u8; 64];
        let mut ins = Inspector::new(64);
        let mut buf = out();

        ins.reset(&mut buf);
        ins.snap(&ram, &mut buf);
        ram[2] = 1;
        ins.snap(&ram, &mut buf);
        // "3x" reads as choice 3 (LT), not a cancelled pass.
        ins.apply_filter_choice("3x", &ram, &mut buf);
        assert_eq!(ins.leads, 1);
        assert_eq!(ins.ignore.as_ref().unwrap()[2], 0);
    }

    #[test]
    fn garbled_filter_choice_recounts_without_excluding() {
        let ram = vec![0u8; 64];
        let mut ins = Inspector::new(64);
        let mut buf = out();

        ins.reset(&mut buf);
        ins.snap(&ram, &mut buf);
        ins.snap(&ram, &mut buf);
        ins.apply_filter_choice("bananas", &ram, &mut buf);
        assert_eq!(ins.leads, 64);
        assert_eq!(ins.state, FilterState::Idle);
    }

    #[test]
    fn compare_register_filters_against_live_values() {
        let mut ram = vec![0u8; 16];
        ram[4] = 0x2A;
        ram[9] = 0x2A;
        let mut ins = Inspector::new(16);
        let mut buf = out();

        ins.setx("2A", &mut buf);
        assert!(text(&buf).contains("0x2A"));
        ins.reset(&mut buf);
        ins.snap(&ram, &mut buf);
        ins.snap(&ram, &mut buf);
        ins.apply_filter_choice("5", &ram, &mut buf);
        assert_eq!(ins.leads, 2);
    }

    #[test]
    fn setd_parses_decimal() {
        let mut ins = Inspector::new(16);
        let mut buf = out();
        ins.setd("127", &mut buf);
        assert_eq!(ins.cmp_value, 0x7F);
        assert!(text(&buf).contains("0x7F"));
    }

    #[test]
    fn findb_reports_a_byte_pattern_hit() {
        let mut ram = vec![0u8; 4096];
        ram[0x200] = 0x41;
        ram[0x201] = 0x42;
        let mut ins = Inspector::new(4096);
        let mut buf = out();
        ins.findb("41 42", &ram, &mut buf);
        let report = text(&buf);
        assert_eq!(report, " found at 0x00200\n");
    }

    #[test]
    fn findb_stops_at_the_first_malformed_token() {
        let mut ram = vec![0u8; 256];
        ram[10] = 0xAB;
        let mut ins = Inspector::new(256);
        let mut buf = out();
        // "zz" ends parsing; the needle is just AB.
        ins.findb("AB zz CD", &ram, &mut buf);
        assert!(text(&buf).contains("found at 0x0000A"));
    }

    #[test]
    fn findw_and_findd_scan_little_endian_values() {
        let mut ram = vec![0u8; 512];
        ram[0x40] = 0x34;
        ram[0x41] = 0x12;
        ram[0x80..0x84].copy_from_slice(&0xDEADBEEFu32.to_le_bytes());
        let mut ins = Inspector::new(512);

        let mut buf = out();
        ins.findw("1234", &ram, &mut buf);
        assert!(text(&buf).contains("Found 0x1234 at 0x00040"));

        let mut buf = out();
        ins.findd("DEADBEEF", &ram, &mut buf);
        assert!(text(&buf).contains("Found 0xDEADBEEF at 0x00080"));
    }

    #[test]
    fn findw_names_the_value_once_across_hits() {
        let mut ram = vec![0u8; 512];
        ram[0x40] = 0x34;
        ram[0x41] = 0x12;
        ram[0x80] = 0x34;
        ram[0x81] = 0x12;
        let mut ins = Inspector::new(512);
        let mut buf = out();
        ins.findw("1234", &ram, &mut buf);
        assert_eq!(text(&buf), "Found 0x1234 at 0x00040\n at 0x00080\n");
    }

    #[test]
    fn finds_locates_ascii_strings() {
        let mut ram = vec![0u8; 512];
        ram[0x100..0x105].copy_from_slice(b"HELLO");
        let mut ins = Inspector::new(512);
        let mut buf = out();
        ins.finds("HELLO", &ram, &mut buf);
        assert!(text(&buf).contains("Found \"HELLO\" at 0x00100"));
    }

    #[test]
    fn searches_respect_the_range() {
        let mut ram = vec![0u8; 512];
        ram[0x10] = 0x55;
        ram[0x180] = 0x55;
        let mut ins = Inspector::new(512);
        let mut buf = out();
        ins.range("100 200", &mut buf);
        buf.clear();
        ins.findb("55", &ram, &mut buf);
        assert_eq!(text(&buf), " found at 0x00180\n");
    }

    #[test]
    fn search_misses_report_not_found() {
        let ram = vec![0u8; 64];
        let mut ins = Inspector::new(64);
        let mut buf = out();
        ins.findw("BEEF", &ram, &mut buf);
        assert_eq!(text(&buf), "Not found\n");
    }

    #[test]
    fn range_reports_and_clamps() {
        let mut ins = Inspector::new(0x1000);
        let mut buf = out();
        ins.range("", &mut buf);
        assert!(text(&buf).contains("Current: 0x00000 - 0x01000"));

        let mut buf = out();
        ins.range("200 FFFFF", &mut buf);
        assert_eq!(ins.range_start, 0x200);
        assert_eq!(ins.range_end, 0x1000);

        // hi below lo drags lo down.
        let mut buf = out();
        ins.range("300 100", &mut buf);
        assert_eq!(ins.range_start, 0x100);
        assert_eq!(ins.range_end, 0x100);
        let _ = buf;
    }

    #[test]
    fn range_bounds_clamp_against_each_other() {
        let mut ins = Inspector::new(0x1000);
        let mut buf = out();
        ins.range("100 200", &mut buf);

        ins.rangehi("80", &mut buf); // below lo, clamps up to lo
        assert_eq!(ins.range_end, 0x100);
        ins.rangelo("180", &mut buf); // above hi, clamps down to hi
        assert_eq!(ins.range_start, 0x100);
        ins.rangehi("FFFFFF", &mut buf);
        assert_eq!(ins.range_end, 0x1000);
    }

    #[test]
    fn peek_stops_at_out_of_range_addresses() {
        let mut ram = vec![0u8; 256];
        ram[0x10] = 5;
        ram[0x20] = 7;
        let mut ins = Inspector::new(256);
        let mut buf = out();
        ins.peek("10 FFFF 20", &ram, &mut buf);
        let report = text(&buf);
        assert!(report.contains("mem =   5"));
        assert!(!report.contains("mem =   7"));
    }

    #[test]
    fn peekw_prints_words() {
        let mut ram = vec![0u8; 256];
        ram[0x30] = 0x10;
        ram[0x31] = 0x20;
        let mut ins = Inspector::new(256);
        let mut buf = out();
        ins.peekw("30", &ram, &mut buf);
        assert!(text(&buf).contains("mem =  8208 (0x2010)"));
    }

    #[test]
    fn mem_dumps_one_aligned_row_with_highlight() {
        let mut ram = vec![0u8; 256];
        for (i, slot) in ram.iter_mut().enumerate() {
            *slot = i as u8;
        }
        let mut ins = Inspector::new(256);
        let mut buf = out();
        ins.mem("17", &ram, &mut buf);
        let report = text(&buf);
        assert!(report.starts_with("       10 |"));
        assert!(report.contains(VID_REVERSE));
        assert_eq!(report.matches('\n').count(), 1);
    }

    #[test]
    fn page_dumps_sixteen_rows() {
        let ram = vec![0u8; 4096];
        let mut ins = Inspector::new(4096);
        let mut buf = out();
        ins.page("100", &ram, &mut buf);
        assert_eq!(text(&buf).matches('\n').count(), 16);
    }

    #[test]
    fn list_caps_at_one_hundred_rows() {
        let ram = vec![0u8; 512];
        let mut ins = Inspector::new(512);
        let mut buf = out();
        ins.reset(&mut buf);
        ins.snap(&ram, &mut buf);
        ins.snap(&ram, &mut buf);
        ins.apply_filter_choice("1", &ram, &mut buf);
        buf.clear();
        ins.list(&ram, &mut buf);
        let report = text(&buf);
        assert_eq!(report.matches('|').count(), 100);
        assert!(report.ends_with("  ... stopping at 100 results.\n"));
    }

    #[test]
    fn list_without_leads_suggests_snap() {
        let ram = vec![0u8; 64];
        let mut ins = Inspector::new(64);
        ins.leads = 0;
        let mut buf = out();
        ins.list(&ram, &mut buf);
        assert_eq!(text(&buf), "No results. Use snap command.\n");
    }

    #[test]
    fn ramdump_writes_the_whole_image() {
        let ram: Vec<u8> = (0..2048u32).map(|i| i as u8).collect();
        let mut ins = Inspector::new(2048);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ram.bin");
        let mut buf = out();
        ins.ramdump(path.to_str().unwrap(), &ram, &mut buf);
        assert!(text(&buf).starts_with("Wrote "));
        assert!(text(&buf).contains("(1Mb)"));
        assert_eq!(std::fs::read(&path).unwrap(), ram);
    }

    #[test]
    fn ramdump_reports_write_failures() {
        let ram = vec![0u8; 64];
        let mut ins = Inspector::new(64);
        let mut buf = out();
        ins.ramdump("/nonexistent-dir/ram.bin", &ram, &mut buf);
        assert_eq!(text(&buf), "Error: Write failed.\n");
    }

    #[test]
    fn meminfo_reports_base_and_size() {
        let ram = vec![0u8; 1 << 20];
        let mut ins = Inspector::new(1 << 20);
        let mut buf = out();
        ins.meminfo(&ram, &mut buf);
        let report = text(&buf);
        assert!(report.contains("MemBaseSize = 1048576 (1MB)"));
    }
}
