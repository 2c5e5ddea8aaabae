/// Reporting client — posts the cycle's device list to the collection endpoint.
///
/// One blocking POST per cycle, `Content-Type: application/json`. The response
/// code is logged and otherwise ignored; there is no retry. Sending is skipped
/// outright when the station link is down or nothing was found.
use core::fmt;

use crate::comm::serialize_json;
use crate::protocol::{DeviceId, ReportPayload, MAX_REPORT_LEN};

/// Station link state as seen by the reporter.
pub trait Uplink {
    fn is_connected(&self) -> bool;
}

/// Blocking HTTP POST of a JSON body. Returns the response status code.
pub trait JsonPoster {
    type Error: fmt::Debug;

    fn post_json(&mut self, url: &str, body: &[u8]) -> Result<u16, Self::Error>;
}

/// What happened to one report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportOutcome {
    /// Station not associated; nothing sent
    SkippedDisconnected,
    /// Empty device list; nothing sent
    SkippedEmpty,
    /// Payload did not fit the report buffer; nothing sent
    Unserializable,
    /// Request completed with this status code (any code, 2xx or not)
    Sent(u16),
    /// Transport failed before a status code was received
    TransportFailed,
}

/// Posts device lists to a fixed URL.
pub struct Reporter<U, P> {
    url: &'static str,
    uplink: U,
    poster: P,
}

impl<U: Uplink, P: JsonPoster> Reporter<U, P> {
    pub fn new(url: &'static str, uplink: U, poster: P) -> Self {
        Self { url, uplink, poster }
    }

    pub fn url(&self) -> &'static str {
        self.url
    }

    /// Send `devices` if the link is up and the list is non-empty.
    pub fn report(&mut self, devices: &[DeviceId]) -> ReportOutcome {
        if !self.uplink.is_connected() {
            log::warn!("WiFi not connected, report skipped");
            return ReportOutcome::SkippedDisconnected;
        }
        if devices.is_empty() {
            log::warn!("No devices found, report skipped");
            return ReportOutcome::SkippedEmpty;
        }

        let mut buf = [0u8; MAX_REPORT_LEN];
        let Some(len) = serialize_json(&ReportPayload { devices }, &mut buf) else {
            log::error!("Report payload for {} devices did not serialize", devices.len());
            return ReportOutcome::Unserializable;
        };
        let body = &buf[..len];

        match self.poster.post_json(self.url, body) {
            Ok(code) => {
                log::info!("POST {} -> {}", self.url, code);
                if let Ok(s) = core::str::from_utf8(body) {
                    log::info!("Payload: {}", s);
                }
                ReportOutcome::Sent(code)
            }
            Err(e) => {
                log::error!("POST {} failed: {:?}", self.url, e);
                ReportOutcome::TransportFailed
            }
        }
    }

    #[cfg(test)]
    pub(crate) fn parts_mut(&mut self) -> (&mut U, &mut P) {
        (&mut self.uplink, &mut self.poster)
    }
}

#[cfg(test)]
pub(crate) mod fakes {
    use super::*;
    use std::string::String;
    use std::vec::Vec;

    pub struct FakeUplink(pub bool);

    impl Uplink for FakeUplink {
        fn is_connected(&self) -> bool {
            self.0
        }
    }

    /// Records every request; answers with a scripted result.
    pub struct RecordingPoster {
        pub requests: Vec<(String, String)>,
        pub answer: Result<u16, &'static str>,
    }

    impl RecordingPoster {
        pub fn answering(code: u16) -> Self {
            Self {
                requests: Vec::new(),
                answer: Ok(code),
            }
        }
    }

    impl JsonPoster for RecordingPoster {
        type Error = &'static str;

        fn post_json(&mut self, url: &str, body: &[u8]) -> Result<u16, &'static str> {
            self.requests
                .push((url.into(), String::from_utf8(body.to_vec()).unwrap()));
            self.answer
        }
    }
}
