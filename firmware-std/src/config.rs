//! Build-time configuration.
//!
//! `build.rs` exports the credentials and report URL (from the environment or
//! `.env`); this module is the only place that reads them.

use attendance_beacon::defaults;

#[derive(Debug, Clone, Copy)]
pub struct BeaconConfig {
    pub wifi_ssid: &'static str,
    pub wifi_password: &'static str,
    pub ap_ssid: &'static str,
    /// Empty means an open access point
    pub ap_password: &'static str,
    pub report_url: &'static str,
}

impl BeaconConfig {
    pub fn from_build_env() -> Self {
        Self {
            wifi_ssid: env!("WIFI_SSID"),
            wifi_password: env!("WIFI_PASSWORD"),
            ap_ssid: non_empty(env!("AP_SSID")).unwrap_or(defaults::AP_SSID),
            ap_password: env!("AP_PASSWORD"),
            report_url: non_empty(env!("REPORT_URL")).unwrap_or(defaults::REPORT_URL),
        }
    }
}

fn non_empty(value: &'static str) -> Option<&'static str> {
    (!value.is_empty()).then_some(value)
}
