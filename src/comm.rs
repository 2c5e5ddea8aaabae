/// Communication layer — HTTP control surface, transport independent.
///
/// The firmware's HTTP server hands every request to [`route`] and writes back
/// the [`Reply`] it is given. Parameter extraction and response rendering live
/// here so they can be tested without a socket.
use serde::Serialize;

use crate::defaults::{INFO_PATH, STATUS_PATH};
use crate::protocol::{ErrorBody, MsgBuffer, StartRequestBody, MAX_MSG_LEN};
use crate::scanner::DiscoveryStrategy;
use crate::session::ScanTime;

pub const CONTENT_TYPE_JSON: &str = "application/json";
pub const CONTENT_TYPE_TEXT: &str = "text/plain";
pub const CONTENT_TYPE_HTML: &str = "text/html";

/// Request method, reduced to what the control surface distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Other,
}

/// Where a request lands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// `POST` on the strategy's trigger path
    Start,
    /// `GET /status`
    Status,
    /// `GET /` (roster variant only)
    Info,
    /// `GET` on the trigger path (roster variant only)
    MethodNotAllowed,
    NotFound,
}

/// Resolve a request line to a route. `uri` may carry a query string.
pub fn route<D: DiscoveryStrategy>(method: Method, uri: &str) -> Route {
    let path = split_uri(uri).0;

    match (method, path) {
        (Method::Post, p) if p == D::TRIGGER_PATH => Route::Start,
        (Method::Get, p) if p == D::TRIGGER_PATH && D::SERVES_INFO_PAGE => {
            Route::MethodNotAllowed
        }
        (Method::Get, p) if p == STATUS_PATH => Route::Status,
        (Method::Get, p) if p == INFO_PATH && D::SERVES_INFO_PAGE => Route::Info,
        _ => Route::NotFound,
    }
}

/// Split a request target into path and optional query string.
pub fn split_uri(uri: &str) -> (&str, Option<&str>) {
    match uri.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (uri, None),
    }
}

/// Find `scanTime` in the query string, then in the body.
///
/// A JSON body (by content type, or by a leading `{`) is read as
/// `{"scanTime": n}`; anything else is read as a form-urlencoded body.
/// Returns `None` when no source carries the parameter.
pub fn scan_time_param(
    query: Option<&str>,
    content_type: Option<&str>,
    body: &[u8],
) -> Option<ScanTime> {
    if let Some(raw) = query.and_then(|q| form_value(q, "scanTime")) {
        return Some(ScanTime::parse(raw));
    }

    let body = trim_whitespace(body);
    if body.is_empty() {
        return None;
    }

    let is_json = content_type.is_some_and(|ct| ct.starts_with(CONTENT_TYPE_JSON))
        || body.first() == Some(&b'{');
    if is_json {
        return json_scan_time(body).unwrap_or_else(|e| {
            log::warn!("Unreadable JSON trigger body ({:?}), using default scan time", e);
            Some(ScanTime::default())
        });
    }

    let form = core::str::from_utf8(body).ok()?;
    form_value(form, "scanTime").map(ScanTime::parse)
}

/// `scanTime` from a JSON body, whether sent as an integer, a float
/// (truncated) or a string (leading digits).
fn json_scan_time(body: &[u8]) -> Result<Option<ScanTime>, serde_json_core::de::Error> {
    if let Ok((parsed, _)) = serde_json_core::from_slice::<StartRequestBody<i64>>(body) {
        return Ok(parsed.scan_time.map(ScanTime::from_requested));
    }
    if let Ok((parsed, _)) = serde_json_core::from_slice::<StartRequestBody<f64>>(body) {
        // `as` truncates toward zero and saturates
        return Ok(parsed.scan_time.map(|secs| ScanTime::from_requested(secs as i64)));
    }
    let (parsed, _) = serde_json_core::from_slice::<StartRequestBody<&str>>(body)?;
    Ok(parsed.scan_time.map(ScanTime::parse))
}

/// First value for `key` in an `a=1&b=2` string. A bare key yields `""`.
fn form_value<'a>(pairs: &'a str, key: &str) -> Option<&'a str> {
    pairs
        .split('&')
        .map(|pair| pair.split_once('=').unwrap_or((pair, "")))
        .find(|(k, _)| *k == key)
        .map(|(_, v)| v)
}

// ── Replies ────────────────────────────────────────────────────────────

/// Response body storage
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Body {
    Json(MsgBuffer),
    Static(&'static str),
}

impl Body {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Body::Json(buf) => buf.as_slice(),
            Body::Static(s) => s.as_bytes(),
        }
    }
}

/// A rendered HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub status: u16,
    pub content_type: &'static str,
    pub body: Body,
}

impl Reply {
    /// JSON reply. Falls back to a bare 500 if the body does not fit.
    pub fn json<T: Serialize>(status: u16, value: &T) -> Self {
        let mut buf = MsgBuffer::new();
        buf.resize_default(MAX_MSG_LEN).ok();
        match serialize_json(value, &mut buf) {
            Some(len) => {
                buf.truncate(len);
                Self {
                    status,
                    content_type: CONTENT_TYPE_JSON,
                    body: Body::Json(buf),
                }
            }
            None => Self {
                status: 500,
                content_type: CONTENT_TYPE_TEXT,
                body: Body::Static("Internal Server Error"),
            },
        }
    }

    pub fn not_found() -> Self {
        Self {
            status: 404,
            content_type: CONTENT_TYPE_TEXT,
            body: Body::Static("Not Found"),
        }
    }

    pub fn method_not_allowed() -> Self {
        Self::json(
            405,
            &ErrorBody {
                status: "error",
                message: "Method not allowed. Use POST to start attendance.",
            },
        )
    }

    pub fn info_page() -> Self {
        Self {
            status: 200,
            content_type: CONTENT_TYPE_HTML,
            body: Body::Static(INFO_PAGE),
        }
    }

    /// Reason phrase for the status line
    pub fn reason(&self) -> &'static str {
        match self.status {
            200 => "OK",
            404 => "Not Found",
            405 => "Method Not Allowed",
            _ => "Internal Server Error",
        }
    }
}

const INFO_PAGE: &str = "<!DOCTYPE html>\
<html><head><meta charset=\"utf-8\"><title>Attendance Beacon</title></head>\
<body><h1>Attendance Beacon</h1>\
<p>Connect to this access point, then send <code>POST /start-attendance</code> \
to report every connected station to the attendance server.</p>\
<p>Device health: <a href=\"/status\">/status</a></p>\
</body></html>";

// ── Serialization helpers ──────────────────────────────────────────────

/// Serialize a value to JSON bytes in `buf`.
/// Returns the number of bytes written, or None if serialization failed.
pub fn serialize_json<T: Serialize>(value: &T, buf: &mut [u8]) -> Option<usize> {
    serde_json_core::to_slice(value, buf).ok()
}

fn trim_whitespace(data: &[u8]) -> &[u8] {
    let start = data
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(data.len());
    let end = data
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(start, |i| i + 1);
    &data[start..end]
}
