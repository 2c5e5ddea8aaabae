/// Scan session state: the in-progress flag and the per-cycle device list.
///
/// Exactly one session exists, owned by the [`Beacon`](crate::beacon::Beacon).
/// The list is cleared when a cycle begins (not when it ends), so the last
/// cycle's identifiers stay readable until the next trigger.
use heapless::Vec;

use crate::defaults::{DEFAULT_SCAN_SECS, MAX_DEVICES};
use crate::protocol::DeviceId;

/// Effective scan duration in whole seconds. Always positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanTime(u32);

impl ScanTime {
    /// Coerce a requested duration: anything ≤ 0 becomes the default.
    pub fn from_requested(requested: i64) -> Self {
        if requested <= 0 {
            Self::default()
        } else {
            Self(u32::try_from(requested).unwrap_or(u32::MAX))
        }
    }

    /// Coerce a raw `scanTime` parameter. Reads an optional sign followed by
    /// the leading digits, so `"7s"` is 7 and `"abc"` falls back to the default.
    pub fn parse(raw: &str) -> Self {
        Self::from_requested(leading_int(raw))
    }

    pub fn secs(self) -> u32 {
        self.0
    }

    pub fn millis(self) -> u64 {
        u64::from(self.0) * 1000
    }
}

impl Default for ScanTime {
    fn default() -> Self {
        Self(DEFAULT_SCAN_SECS)
    }
}

/// Parse the leading integer of `raw`, ignoring surrounding whitespace.
/// Returns 0 when no digits lead the string. Saturates instead of overflowing.
fn leading_int(raw: &str) -> i64 {
    let s = raw.trim();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };

    let mut value: i64 = 0;
    for b in digits.bytes().take_while(u8::is_ascii_digit) {
        value = value.saturating_mul(10).saturating_add(i64::from(b - b'0'));
    }

    if negative {
        -value
    } else {
        value
    }
}

/// Why a cycle could not begin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BeginError {
    /// Another cycle holds the session
    AlreadyScanning,
}

/// One discovery cycle's worth of state.
pub struct ScanSession {
    scanning: bool,
    devices: Vec<DeviceId, MAX_DEVICES>,
    /// Observations that arrived after the list was full
    dropped: u16,
    /// Devices reported by the last completed cycle
    last_count: u16,
}

impl ScanSession {
    pub const fn new() -> Self {
        Self {
            scanning: false,
            devices: Vec::new(),
            dropped: 0,
            last_count: 0,
        }
    }

    /// Take the session for a new cycle. Clears the previous cycle's devices.
    ///
    /// Fails without touching the list if a cycle is already in progress.
    pub fn begin(&mut self) -> Result<(), BeginError> {
        if self.scanning {
            return Err(BeginError::AlreadyScanning);
        }
        self.scanning = true;
        self.devices.clear();
        self.dropped = 0;
        Ok(())
    }

    /// Append one observed identifier. Ignored outside an active cycle.
    pub fn record(&mut self, id: DeviceId) {
        if !self.scanning {
            log::warn!("Device {} observed outside a scan cycle, ignored", id);
            return;
        }
        if self.devices.push(id).is_err() {
            self.dropped = self.dropped.saturating_add(1);
        }
    }

    /// Count observations the radio lost before they reached [`record`].
    ///
    /// [`record`]: ScanSession::record
    pub fn note_lost(&mut self, count: u16) {
        if self.scanning {
            self.dropped = self.dropped.saturating_add(count);
        }
    }

    /// Release the session. The device list is left as collected.
    pub fn finish(&mut self) {
        self.scanning = false;
        self.last_count = self.devices.len() as u16;
    }

    pub fn is_scanning(&self) -> bool {
        self.scanning
    }

    pub fn devices(&self) -> &[DeviceId] {
        &self.devices
    }

    pub fn dropped(&self) -> u16 {
        self.dropped
    }

    pub fn last_count(&self) -> u16 {
        self.last_count
    }
}

impl Default for ScanSession {
    fn default() -> Self {
        Self::new()
    }
}
