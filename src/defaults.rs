/// Compiled-in defaults for the attendance beacon.
///
/// Credentials and the report URL are injected by the firmware build script;
/// the values here are the fallbacks and the fixed protocol constants.

/// Scan duration used when the trigger omits `scanTime` or sends a value ≤ 0.
pub const DEFAULT_SCAN_SECS: u32 = 5;

/// Upper bound on identifiers collected in one cycle.
///
/// A busy room can produce hundreds of advertisements in a few seconds
/// (devices re-advertise, duplicates are kept), so the list is capped to a
/// fixed-capacity buffer. Overflow is counted and logged, not reported.
pub const MAX_DEVICES: usize = 128;

/// Collection endpoint used when the build does not provide `REPORT_URL`.
pub const REPORT_URL: &str = "http://192.168.4.2:5000/api/attendance";

/// Control server port
pub const HTTP_PORT: u16 = 80;

/// Trigger route for the advertisement-scan variant
pub const SCAN_TRIGGER_PATH: &str = "/api/start-attendance";

/// Trigger route for the access-point roster variant
pub const ROSTER_TRIGGER_PATH: &str = "/start-attendance";

/// Device health route (both variants)
pub const STATUS_PATH: &str = "/status";

/// Informational page route (roster variant)
pub const INFO_PATH: &str = "/";

/// Delay between station join attempts, in milliseconds.
pub const JOIN_RETRY_MS: u64 = 500;

/// Longest request body read by the control server. Anything beyond is ignored.
pub const MAX_REQUEST_BODY: usize = 128;

/// Soft-AP name used when the build does not provide `AP_SSID`.
pub const AP_SSID: &str = "Attendance-Beacon";
