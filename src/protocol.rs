/// JSON wire formats for the beacon.
///
/// Two directions: the outbound attendance report posted to the collection
/// endpoint, and the small JSON bodies the control surface answers with.
/// Uses `heapless` types for no_std/no-alloc operation.
use heapless::String;
use serde::{Deserialize, Serialize};

/// Maximum length for MAC address strings ("aa:bb:cc:dd:ee:ff")
pub type MacString = String<18>;

/// A discovered device, identified only by its hardware address.
///
/// Lowercase, colon-separated hex octets. Compared by string equality;
/// no vendor decoding or deduplication.
pub type DeviceId = MacString;

/// Body posted to the collection endpoint: `{"devices":[...]}`.
///
/// Built straight from the session's device list at send time, never stored.
#[derive(Debug, Serialize)]
pub struct ReportPayload<'a> {
    pub devices: &'a [DeviceId],
}

/// Acknowledgment returned by the trigger route before the cycle runs.
#[derive(Debug, Serialize)]
pub struct StartAck<'a> {
    pub status: &'static str,
    pub message: &'a str,
    /// Effective scan duration; omitted by strategies that take no duration
    #[serde(rename = "scanTime", skip_serializing_if = "Option::is_none")]
    pub scan_time: Option<u32>,
}

/// Error body for wrong-method requests on the trigger route.
#[derive(Debug, Serialize)]
pub struct ErrorBody<'a> {
    pub status: &'static str,
    pub message: &'a str,
}

/// Device health snapshot served on `GET /status`.
#[derive(Debug, Serialize)]
pub struct StatusBody {
    pub status: &'static str,
    pub scanning: bool,
    /// Discovery strategy compiled in: "ble" or "ap"
    pub strategy: &'static str,
    /// Uptime in seconds
    pub uptime: u32,
    /// Devices reported by the last completed cycle
    #[serde(rename = "lastCount")]
    pub last_count: u16,
    /// Board identifier
    pub board: &'static str,
    /// Firmware version
    pub version: &'static str,
}

/// JSON trigger body as sent by the attendance dashboard: `{"scanTime": 5}`.
///
/// Generic over the field's JSON shape: `serde-json-core` cannot deserialize
/// an untagged value, so callers try an integer, a float, then a string.
/// The field is optional; unknown fields are ignored.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct StartRequestBody<T> {
    #[serde(rename = "scanTime", default)]
    pub scan_time: Option<T>,
}

/// Firmware version string
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Longest serialized report: 128 quoted addresses plus separators and envelope.
pub const MAX_REPORT_LEN: usize = crate::defaults::MAX_DEVICES * 20 + 16;

/// Maximum size of a control-surface JSON body
pub const MAX_MSG_LEN: usize = 256;

/// Buffer type for serialized control-surface JSON bodies
pub type MsgBuffer = heapless::Vec<u8, MAX_MSG_LEN>;

#[cfg(test)]
mod tests {
    use super::*;

    fn to_json<T: Serialize>(value: &T) -> std::string::String {
        let mut buf = [0u8; MAX_REPORT_LEN];
        let len = serde_json_core::to_slice(value, &mut buf).unwrap();
        core::str::from_utf8(&buf[..len]).unwrap().into()
    }

    // ── ReportPayload ───────────────────────────────────────────────

    #[test]
    fn report_payload_three_devices() {
        let devices = [
            DeviceId::try_from("aa:bb:cc:dd:ee:01").unwrap(),
            DeviceId::try_from("aa:bb:cc:dd:ee:02").unwrap(),
            DeviceId::try_from("aa:bb:cc:dd:ee:03").unwrap(),
        ];
        let json = to_json(&ReportPayload { devices: &devices });
        assert_eq!(
            json,
            r#"{"devices":["aa:bb:cc:dd:ee:01","aa:bb:cc:dd:ee:02","aa:bb:cc:dd:ee:03"]}"#
        );
    }

    #[test]
    fn report_payload_keeps_duplicates_in_order() {
        let devices = [
            DeviceId::try_from("aa:bb:cc:dd:ee:02").unwrap(),
            DeviceId::try_from("aa:bb:cc:dd:ee:01").unwrap(),
            DeviceId::try_from("aa:bb:cc:dd:ee:02").unwrap(),
        ];
        let json = to_json(&ReportPayload { devices: &devices });
        assert_eq!(
            json,
            r#"{"devices":["aa:bb:cc:dd:ee:02","aa:bb:cc:dd:ee:01","aa:bb:cc:dd:ee:02"]}"#
        );
    }

    #[test]
    fn max_report_len_fits_full_device_list() {
        let devices: heapless::Vec<DeviceId, { crate::defaults::MAX_DEVICES }> = (0
            ..crate::defaults::MAX_DEVICES)
            .map(|_| DeviceId::try_from("ff:ff:ff:ff:ff:ff").unwrap())
            .collect();
        let mut buf = [0u8; MAX_REPORT_LEN];
        assert!(serde_json_core::to_slice(&ReportPayload { devices: &devices }, &mut buf).is_ok());
    }

    // ── Control bodies ──────────────────────────────────────────────

    #[test]
    fn start_ack_with_scan_time() {
        let json = to_json(&StartAck {
            status: "success",
            message: "Attendance scan started",
            scan_time: Some(5),
        });
        assert_eq!(
            json,
            r#"{"status":"success","message":"Attendance scan started","scanTime":5}"#
        );
    }

    #[test]
    fn start_ack_without_scan_time_omits_field() {
        let json = to_json(&StartAck {
            status: "success",
            message: "Attendance snapshot started",
            scan_time: None,
        });
        assert!(!json.contains("scanTime"));
    }

    #[test]
    fn status_body_field_names() {
        let json = to_json(&StatusBody {
            status: "ok",
            scanning: false,
            strategy: "ble",
            uptime: 42,
            last_count: 3,
            board: "test_board",
            version: "0.1.0",
        });
        assert!(json.contains(r#""scanning":false"#));
        assert!(json.contains(r#""strategy":"ble""#));
        assert!(json.contains(r#""lastCount":3"#));
        assert!(json.contains(r#""board":"test_board""#));
    }

    // ── StartRequestBody ────────────────────────────────────────────

    #[test]
    fn start_request_body_reads_scan_time() {
        let (body, _) =
            serde_json_core::from_slice::<StartRequestBody<i64>>(br#"{"scanTime":12}"#).unwrap();
        assert_eq!(body.scan_time, Some(12));
    }

    #[test]
    fn start_request_body_field_is_optional() {
        let (body, _) = serde_json_core::from_slice::<StartRequestBody<i64>>(b"{}").unwrap();
        assert_eq!(body.scan_time, None);
    }

    #[test]
    fn start_request_body_shapes_are_distinct() {
        type AsInt = StartRequestBody<i64>;
        assert!(serde_json_core::from_slice::<AsInt>(br#"{"scanTime":7.5}"#).is_err());
        assert!(serde_json_core::from_slice::<AsInt>(br#"{"scanTime":"7"}"#).is_err());

        let (body, _) =
            serde_json_core::from_slice::<StartRequestBody<f64>>(br#"{"scanTime":7.5}"#).unwrap();
        assert_eq!(body.scan_time, Some(7.5));

        let (body, _) =
            serde_json_core::from_slice::<StartRequestBody<&str>>(br#"{"scanTime":"7"}"#).unwrap();
        assert_eq!(body.scan_time, Some("7"));
    }

    // ── Version constant ────────────────────────────────────────────

    #[test]
    fn version_is_semver() {
        let parts: heapless::Vec<&str, 4> = VERSION.split('.').collect();
        assert_eq!(
            parts.len(),
            3,
            "VERSION should be semver (major.minor.patch)"
        );
        for part in &parts {
            assert!(part.parse::<u32>().is_ok(), "'{part}' is not a number");
        }
    }
}
