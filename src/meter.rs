use std::time::Duration;

use reqwest::blocking::Client;
use tracing::debug;

use crate::config::MeterConfig;

/// Where smoothed readings go. One call per cycle; implementations write the
/// uplink channel first, then the downlink channel.
pub trait MeterSink {
    fn update(&mut self, up: i64, down: i64) -> Result<(), MeterError>;
}

#[derive(Debug, thiserror::Error)]
pub enum MeterError {
    #[error("meter endpoint returned status {status} for pin {pin}")]
    Status {
        pin: u8,
        status: reqwest::StatusCode,
    },
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// The pair of analog panel meters, one HTTP GET per pin write.
pub struct MeterPanel {
    client: Client,
    address: String,
    pin_up: u8,
    pin_down: u8,
}

impl MeterPanel {
    pub fn new(config: &MeterConfig, timeout: Duration) -> Result<Self, MeterError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            address: config.address.clone(),
            pin_up: config.pin_up,
            pin_down: config.pin_down,
        })
    }

    fn write_pin(&self, pin: u8, value: i64) -> Result<(), MeterError> {
        let url = channel_url(&self.address, pin, value);
        debug!(%url, "Writing meter pin");
        let response = self.client.get(&url).send()?;
        if !response.status().is_success() {
            return Err(MeterError::Status {
                pin,
                status: response.status(),
            });
        }
        Ok(())
    }
}

impl MeterSink for MeterPanel {
    fn update(&mut self, up: i64, down: i64) -> Result<(), MeterError> {
        self.write_pin(self.pin_up, up)?;
        self.write_pin(self.pin_down, down)
    }
}

/// `http://<addr>/<pin>/<value>` is the meter controller's whole protocol.
pub fn channel_url(address: &str, pin: u8, value: i64) -> String {
    format!("http://{address}/{pin}/{value}")
}
