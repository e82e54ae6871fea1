//! Test data builders for creating test objects

use ocdplot_rs::config::AppConfig;
use ocdplot_rs::types::Representation;

/// Builder for session configurations pointing at a local server
pub struct ConfigBuilder {
    port: u16,
    address: String,
    representation: Representation,
    interval_ms: u64,
    horizon: u64,
    reset_on_start: bool,
}

impl ConfigBuilder {
    pub fn new(port: u16) -> Self {
        Self {
            port,
            address: "0x20000000".to_string(),
            representation: Representation::Float32,
            interval_ms: 5,
            horizon: 30,
            reset_on_start: true,
        }
    }

    pub fn address(mut self, address: &str) -> Self {
        self.address = address.to_string();
        self
    }

    pub fn representation(mut self, representation: Representation) -> Self {
        self.representation = representation;
        self
    }

    pub fn interval_ms(mut self, interval_ms: u64) -> Self {
        self.interval_ms = interval_ms;
        self
    }

    pub fn horizon(mut self, horizon: u64) -> Self {
        self.horizon = horizon;
        self
    }

    pub fn reset_on_start(mut self, reset: bool) -> Self {
        self.reset_on_start = reset;
        self
    }

    pub fn build(self) -> AppConfig {
        let mut config = AppConfig::default();
        config.target.host = "127.0.0.1".to_string();
        config.target.port = self.port;
        config.target.connect_timeout_ms = 500;
        config.target.read_timeout_ms = 2000;
        config.variable.address = self.address;
        config.variable.representation = self.representation;
        config.sampling.interval_ms = self.interval_ms;
        config.sampling.horizon = self.horizon;
        config.sampling.reset_on_start = self.reset_on_start;
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = ConfigBuilder::new(4444)
            .address("0x20001000")
            .representation(Representation::Int32)
            .horizon(10)
            .build();

        assert_eq!(config.target.port, 4444);
        assert_eq!(config.variable.address, "0x20001000");
        assert_eq!(config.variable.representation, Representation::Int32);
        assert_eq!(config.sampling.horizon, 10);
        assert!(config.validate().is_ok());
    }
}
