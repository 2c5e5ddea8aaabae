/// Device discovery strategies.
///
/// Two interchangeable ways to enumerate nearby devices, picked at build time:
/// - [`TimedAdvertisementScan`]: listen for BLE advertisements for a
///   caller-chosen window. The radio calls back once per advertisement.
/// - [`InstantRosterSnapshot`]: read the soft-AP's associated-station table.
///   No window, no duration.
///
/// Both sit behind [`DiscoveryStrategy`]. Their parameter shapes stay
/// distinct through the associated `Params` type.
use core::fmt::{self, Write};

use crate::defaults::{ROSTER_TRIGGER_PATH, SCAN_TRIGGER_PATH};
use crate::protocol::{DeviceId, MacString};
use crate::session::ScanTime;

/// Radio contract for a blocking advertisement scan.
///
/// `scan` returns only after `duration` has elapsed. The stack invokes
/// `on_advertisement` zero or more times in between, once per received
/// advertisement, duplicates included.
pub trait AdvertisementRadio {
    type Error: fmt::Debug;

    fn scan(
        &mut self,
        duration: ScanTime,
        on_advertisement: &mut dyn FnMut(&[u8; 6]),
    ) -> Result<(), Self::Error>;

    /// Advertisements received during the last scan but never passed to
    /// `on_advertisement` (e.g. a full event queue). Resets the count.
    fn take_lost(&mut self) -> u16 {
        0
    }
}

/// Radio contract for reading the soft-AP station table.
pub trait StationRoster {
    type Error: fmt::Debug;

    /// Call `on_station` once per associated station, in table order.
    fn for_each_station(&mut self, on_station: &mut dyn FnMut(&[u8; 6])) -> Result<(), Self::Error>;
}

/// A discovery step: one bounded enumeration feeding a device sink.
pub trait DiscoveryStrategy {
    /// Per-trigger parameters. A duration for timed scans, nothing for snapshots.
    type Params: Copy + fmt::Debug;
    type Error: fmt::Debug;

    /// Short label used in logs and `GET /status`
    const LABEL: &'static str;

    /// Route answering the start trigger
    const TRIGGER_PATH: &'static str;

    /// Whether `GET /` serves the informational page
    const SERVES_INFO_PAGE: bool;

    /// Acknowledgment message for the start trigger
    const STARTED_MESSAGE: &'static str;

    /// Build the parameters from the trigger's coerced `scanTime`, when present.
    fn params(scan_time: Option<ScanTime>) -> Self::Params;

    /// Duration to echo back in the acknowledgment, if this strategy has one.
    fn reported_scan_time(params: Self::Params) -> Option<u32>;

    /// Run one enumeration, handing each observed device to `sink`.
    fn discover(
        &mut self,
        params: Self::Params,
        sink: &mut dyn FnMut(DeviceId),
    ) -> Result<(), Self::Error>;

    /// Observations lost below the sink during the last `discover`.
    fn take_lost(&mut self) -> u16 {
        0
    }
}

/// Timed BLE advertisement scan.
pub struct TimedAdvertisementScan<R> {
    radio: R,
}

impl<R: AdvertisementRadio> TimedAdvertisementScan<R> {
    pub fn new(radio: R) -> Self {
        Self { radio }
    }

    #[cfg(test)]
    pub(crate) fn radio_mut(&mut self) -> &mut R {
        &mut self.radio
    }
}

impl<R: AdvertisementRadio> DiscoveryStrategy for TimedAdvertisementScan<R> {
    type Params = ScanTime;
    type Error = R::Error;

    const LABEL: &'static str = "ble";
    const TRIGGER_PATH: &'static str = SCAN_TRIGGER_PATH;
    const SERVES_INFO_PAGE: bool = false;
    const STARTED_MESSAGE: &'static str = "Attendance scan started";

    fn params(scan_time: Option<ScanTime>) -> ScanTime {
        scan_time.unwrap_or_default()
    }

    fn reported_scan_time(params: ScanTime) -> Option<u32> {
        Some(params.secs())
    }

    fn discover(
        &mut self,
        params: ScanTime,
        sink: &mut dyn FnMut(DeviceId),
    ) -> Result<(), R::Error> {
        log::info!("Scanning BLE devices for {}s...", params.secs());
        self.radio.scan(params, &mut |addr: &[u8; 6]| {
            let id = format_mac(addr);
            log::debug!("Advertisement from {}", id);
            sink(id);
        })
    }

    fn take_lost(&mut self) -> u16 {
        self.radio.take_lost()
    }
}

/// Instant read of the soft-AP's associated stations.
pub struct InstantRosterSnapshot<R> {
    roster: R,
}

impl<R: StationRoster> InstantRosterSnapshot<R> {
    pub fn new(roster: R) -> Self {
        Self { roster }
    }
}

impl<R: StationRoster> DiscoveryStrategy for InstantRosterSnapshot<R> {
    type Params = ();
    type Error = R::Error;

    const LABEL: &'static str = "ap";
    const TRIGGER_PATH: &'static str = ROSTER_TRIGGER_PATH;
    const SERVES_INFO_PAGE: bool = true;
    const STARTED_MESSAGE: &'static str = "Attendance snapshot started";

    fn params(_scan_time: Option<ScanTime>) {}

    fn reported_scan_time(_params: ()) -> Option<u32> {
        None
    }

    fn discover(&mut self, _params: (), sink: &mut dyn FnMut(DeviceId)) -> Result<(), R::Error> {
        log::info!("Reading access point station table");
        self.roster.for_each_station(&mut |addr: &[u8; 6]| {
            let id = format_mac(addr);
            log::debug!("Station {}", id);
            sink(id);
        })
    }
}

/// Format a 6-byte MAC address as "aa:bb:cc:dd:ee:ff"
pub fn format_mac(mac: &[u8; 6]) -> MacString {
    let mut buf = MacString::new();
    let _ = write!(
        buf,
        "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
        mac[0], mac[1], mac[2], mac[3], mac[4], mac[5]
    );
    buf
}
