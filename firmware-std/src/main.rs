//! Attendance beacon — ESP-IDF std firmware
//!
//! Joins the configured Wi-Fi network, then serves a small HTTP control
//! surface. A `POST` on the trigger route runs one discovery cycle (BLE
//! advertisement scan, or the soft-AP station table in `ap-roster` builds)
//! and posts the device list to the collection endpoint.

#[cfg(all(feature = "ble-scan", feature = "ap-roster"))]
compile_error!("features `ble-scan` and `ap-roster` are mutually exclusive");
#[cfg(not(any(feature = "ble-scan", feature = "ap-roster")))]
compile_error!("enable one discovery strategy: `ble-scan` or `ap-roster`");
#[cfg(not(any(feature = "devkit", feature = "xiao")))]
compile_error!("enable a board feature: `devkit` or `xiao`");

#[cfg(feature = "ble-scan")]
mod ble;
mod config;
mod http;
mod indicator;
mod network;

use std::thread;
use std::time::{Duration, Instant};

use attendance_beacon::beacon::Beacon;
use attendance_beacon::board;
use attendance_beacon::protocol::VERSION;
use attendance_beacon::report::Reporter;
#[cfg(feature = "ap-roster")]
use attendance_beacon::scanner::InstantRosterSnapshot;
#[cfg(feature = "ble-scan")]
use attendance_beacon::scanner::TimedAdvertisementScan;
use esp_idf_svc::hal::peripherals::Peripherals;
use esp_idf_svc::wifi::{BlockingWifi, EspWifi};
use esp_idf_svc::{eventloop::EspSystemEventLoop, nvs::EspDefaultNvsPartition};

use config::BeaconConfig;
use indicator::Indicator;

fn main() -> anyhow::Result<()> {
    esp_idf_svc::sys::link_patches();
    // Bind the ESP-IDF logger to the `log` facade
    esp_idf_svc::log::EspLogger::initialize_default();

    let boot = Instant::now();
    let config = BeaconConfig::from_build_env();

    log::info!("Attendance beacon v{} starting on {}", VERSION, board::BOARD_NAME);

    // ── Peripherals ──────────────────────────────────────────────────

    let peripherals = Peripherals::take()?;
    let sys_loop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;

    let indicator = Indicator::new()?;

    // ── Network bootstrap (blocks until the station is up) ───────────

    let mut wifi = BlockingWifi::wrap(
        EspWifi::new(peripherals.modem, sys_loop.clone(), Some(nvs))?,
        sys_loop,
    )?;
    network::bootstrap(&mut wifi, &config)?;

    // ── Discovery strategy ───────────────────────────────────────────

    #[cfg(feature = "ble-scan")]
    let strategy = {
        let strategy = TimedAdvertisementScan::new(ble::NimbleRadio::spawn()?);
        log::info!("BLE scanner initialized");
        strategy
    };
    #[cfg(feature = "ap-roster")]
    let strategy = InstantRosterSnapshot::new(network::ApRoster);

    let reporter = Reporter::new(config.report_url, network::StationLink, http::HttpPoster);
    let beacon = Beacon::new(strategy, reporter, board::BOARD_NAME);

    // ── Control surface ──────────────────────────────────────────────

    let _server = http::start(beacon, indicator, boot)?;

    #[cfg(feature = "ble-scan")]
    log::info!("POST body or query parameter: scanTime (in seconds)");

    // Requests are served on the httpd task; keep Wi-Fi and the server alive.
    loop {
        thread::sleep(Duration::from_secs(60));
        log::debug!(
            "Alive {}s, WiFi connected: {}",
            boot.elapsed().as_secs(),
            wifi.is_connected().unwrap_or(false)
        );
    }
}
