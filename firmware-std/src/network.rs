//! Wi-Fi bootstrap and the network-side collaborators.
//!
//! - [`bootstrap`] joins the configured station network, optionally hosting
//!   the soft-AP alongside it, and blocks until the station is up.
//! - [`StationLink`] answers "is the station associated?" for the reporter.
//! - [`ApRoster`] reads the soft-AP's associated-station table.

use std::thread;
use std::time::Duration;

use anyhow::anyhow;
use attendance_beacon::defaults::JOIN_RETRY_MS;
use attendance_beacon::report::Uplink;
#[cfg(feature = "ap-roster")]
use attendance_beacon::scanner::StationRoster;
#[cfg(feature = "ap-roster")]
use esp_idf_svc::sys::{esp_wifi_ap_get_sta_list, wifi_sta_list_t, EspError};
use esp_idf_svc::sys::{esp, esp_wifi_sta_get_ap_info, wifi_ap_record_t};
#[cfg(feature = "ap-roster")]
use esp_idf_svc::wifi::AccessPointConfiguration;
use esp_idf_svc::wifi::{AuthMethod, BlockingWifi, ClientConfiguration, Configuration, EspWifi};

use crate::config::BeaconConfig;

/// Bring up Wi-Fi and block until the station has an IP.
///
/// In `ap-roster` builds the soft-AP is configured in the same step and is
/// reachable as soon as the driver starts, whether or not the station ever
/// joins. The join itself retries forever.
pub fn bootstrap(wifi: &mut BlockingWifi<EspWifi<'static>>, config: &BeaconConfig) -> anyhow::Result<()> {
    let client = ClientConfiguration {
        ssid: config
            .wifi_ssid
            .try_into()
            .map_err(|_| anyhow!("WIFI_SSID too long"))?,
        password: config
            .wifi_password
            .try_into()
            .map_err(|_| anyhow!("WIFI_PASSWORD too long"))?,
        auth_method: if config.wifi_password.is_empty() {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        },
        ..Default::default()
    };

    #[cfg(feature = "ap-roster")]
    let wifi_config = Configuration::Mixed(client, access_point(config)?);
    #[cfg(not(feature = "ap-roster"))]
    let wifi_config = Configuration::Client(client);

    wifi.set_configuration(&wifi_config)?;
    wifi.start()?;

    #[cfg(feature = "ap-roster")]
    log::info!(
        "Access point '{}' up ({})",
        config.ap_ssid,
        if config.ap_password.is_empty() { "open" } else { "WPA2" }
    );

    log::info!("Connecting to WiFi '{}'", config.wifi_ssid);
    let mut attempt: u32 = 0;
    loop {
        attempt += 1;
        match wifi.connect().and_then(|()| wifi.wait_netif_up()) {
            Ok(()) => break,
            Err(e) => {
                log::info!("WiFi join attempt {} failed ({}), retrying", attempt, e);
                let _ = wifi.disconnect();
                thread::sleep(Duration::from_millis(JOIN_RETRY_MS));
            }
        }
    }

    let ip_info = wifi.wifi().sta_netif().get_ip_info()?;
    log::info!("WiFi connected, IP {}", ip_info.ip);

    #[cfg(feature = "ap-roster")]
    {
        let ap_ip = wifi.wifi().ap_netif().get_ip_info()?;
        log::info!("Access point IP {}", ap_ip.ip);
    }

    Ok(())
}

#[cfg(feature = "ap-roster")]
fn access_point(config: &BeaconConfig) -> anyhow::Result<AccessPointConfiguration> {
    Ok(AccessPointConfiguration {
        ssid: config
            .ap_ssid
            .try_into()
            .map_err(|_| anyhow!("AP_SSID too long"))?,
        password: config
            .ap_password
            .try_into()
            .map_err(|_| anyhow!("AP_PASSWORD too long"))?,
        auth_method: if config.ap_password.is_empty() {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        },
        channel: 1,
        ..Default::default()
    })
}

/// Station association state, read straight from the driver.
pub struct StationLink;

impl Uplink for StationLink {
    fn is_connected(&self) -> bool {
        // Safety: plain-old-data record, fully written by the driver on success
        let mut record: wifi_ap_record_t = unsafe { core::mem::zeroed() };
        esp!(unsafe { esp_wifi_sta_get_ap_info(&mut record) }).is_ok()
    }
}

/// Soft-AP associated-station table.
#[cfg(feature = "ap-roster")]
pub struct ApRoster;

#[cfg(feature = "ap-roster")]
impl StationRoster for ApRoster {
    type Error = EspError;

    fn for_each_station(&mut self, on_station: &mut dyn FnMut(&[u8; 6])) -> Result<(), EspError> {
        // Safety: plain-old-data table, `num` entries filled by the driver
        let mut list: wifi_sta_list_t = unsafe { core::mem::zeroed() };
        esp!(unsafe { esp_wifi_ap_get_sta_list(&mut list) })?;

        let count = usize::try_from(list.num).unwrap_or(0).min(list.sta.len());
        log::info!("{} stations associated", count);
        for station in &list.sta[..count] {
            on_station(&station.mac);
        }
        Ok(())
    }
}
