//! Status LED, lit while a discovery cycle runs.

use attendance_beacon::board;
use esp_idf_svc::hal::gpio::{AnyOutputPin, Output, PinDriver};

pub struct Indicator {
    led: PinDriver<'static, AnyOutputPin, Output>,
}

impl Indicator {
    pub fn new() -> anyhow::Result<Self> {
        // Safety: the board LED pin is not handed out anywhere else
        let pin = unsafe { AnyOutputPin::new(i32::from(board::LED_PIN)) };
        let mut indicator = Self {
            led: PinDriver::output(pin)?,
        };
        indicator.set(false);
        Ok(indicator)
    }

    pub fn set(&mut self, on: bool) {
        let high = on != board::LED_ACTIVE_LOW;
        let result = if high {
            self.led.set_high()
        } else {
            self.led.set_low()
        };
        if let Err(e) = result {
            log::warn!("Status LED write failed: {:?}", e);
        }
    }
}
