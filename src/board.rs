/// Board identity, selected at compile time via feature flags.
///
/// The beacon only needs a radio with BLE and Wi-Fi, so boards differ in
/// name and status LED only.

#[cfg(feature = "board-xiao")]
mod hw {
    pub const LED_PIN: u8 = 21; // User LED, active low
    pub const LED_ACTIVE_LOW: bool = true;
    pub const BOARD_NAME: &str = "xiao_esp32s3";
}

#[cfg(all(feature = "board-devkit", not(feature = "board-xiao")))]
mod hw {
    pub const LED_PIN: u8 = 2; // Blue LED on most ESP32 DevKitC clones
    pub const LED_ACTIVE_LOW: bool = false;
    pub const BOARD_NAME: &str = "esp32_devkitc";
}

#[cfg(not(any(feature = "board-devkit", feature = "board-xiao")))]
mod hw {
    pub const BOARD_NAME: &str = "unknown";
}

pub use hw::*;
