//! NimBLE advertisement scanning.
//!
//! The NimBLE handles are not `Send`, so the scanner lives on its own thread
//! and the HTTP task talks to it over channels. [`NimbleRadio::scan`] blocks
//! the caller for the whole window, forwarding each advertisement as the
//! scan thread receives it.

use std::sync::mpsc::{self, Receiver, SyncSender};
use std::thread;

use attendance_beacon::scanner::AdvertisementRadio;
use attendance_beacon::session::ScanTime;
use esp32_nimble::{BLEDevice, BLEScan};
use esp_idf_svc::hal::task::block_on;

/// Messages from the scan thread for one scan window.
enum ScanEvent {
    Advertisement([u8; 6]),
    /// Window closed. `ok` is `false` if the NimBLE stack reported an error;
    /// `lost` counts advertisements that did not fit in the event queue.
    Done { ok: bool, lost: u16 },
}

#[derive(Debug)]
pub enum ScanFailure {
    /// NimBLE returned an error; advertisements seen before it were forwarded
    Stack,
    /// The scan thread is gone
    Disconnected,
}

pub struct NimbleRadio {
    requests: SyncSender<ScanTime>,
    events: Receiver<ScanEvent>,
    lost: u16,
}

impl NimbleRadio {
    /// Initialize NimBLE on a dedicated scan thread.
    pub fn spawn() -> anyhow::Result<Self> {
        let (request_tx, request_rx) = mpsc::sync_channel::<ScanTime>(1);
        let (event_tx, event_rx) = mpsc::sync_channel::<ScanEvent>(64);

        thread::Builder::new()
            .name("blescan".into())
            .stack_size(4096)
            .spawn(move || {
                ble_scan_thread(request_rx, event_tx);
            })?;
        log::info!("BLE scan thread spawned");

        Ok(Self {
            requests: request_tx,
            events: event_rx,
            lost: 0,
        })
    }
}

impl AdvertisementRadio for NimbleRadio {
    type Error = ScanFailure;

    fn scan(
        &mut self,
        duration: ScanTime,
        on_advertisement: &mut dyn FnMut(&[u8; 6]),
    ) -> Result<(), ScanFailure> {
        self.requests
            .send(duration)
            .map_err(|_| ScanFailure::Disconnected)?;

        loop {
            match self.events.recv() {
                Ok(ScanEvent::Advertisement(addr)) => on_advertisement(&addr),
                Ok(ScanEvent::Done { ok, lost }) => {
                    self.lost = self.lost.saturating_add(lost);
                    return if ok { Ok(()) } else { Err(ScanFailure::Stack) };
                }
                Err(_) => return Err(ScanFailure::Disconnected),
            }
        }
    }

    fn take_lost(&mut self) -> u16 {
        std::mem::take(&mut self.lost)
    }
}

// ── BLE scan thread ──────────────────────────────────────────────────

fn ble_scan_thread(requests: Receiver<ScanTime>, events: SyncSender<ScanEvent>) {
    log::info!("BLE scan thread started");

    let ble_device = BLEDevice::take();
    let mut scan = BLEScan::new();
    // Active scanning: more info per device, more power
    scan.active_scan(true).interval(100).window(99);

    while let Ok(duration) = requests.recv() {
        let window_ms = i32::try_from(duration.millis()).unwrap_or(i32::MAX);
        let mut lost: u16 = 0;
        let result = block_on(scan.start(ble_device, window_ms, |device, _data| {
            let addr = device.addr().as_be_bytes();
            if events.try_send(ScanEvent::Advertisement(addr)).is_err() {
                lost = lost.saturating_add(1);
                log::debug!("BLE event queue full, advertisement dropped");
            }
            None::<()> // Continue scanning
        }));

        if let Err(ref e) = result {
            log::error!("BLE scan failed: {:?}", e);
        }
        let done = ScanEvent::Done {
            ok: result.is_ok(),
            lost,
        };
        if events.send(done).is_err() {
            break;
        }
    }

    log::info!("BLE scan thread stopped");
}
