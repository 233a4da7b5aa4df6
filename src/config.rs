use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub router: RouterConfig,
    pub meters: MeterConfig,
    pub runtime: RuntimeConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RouterConfig {
    /// Host or host:port of the router's web interface.
    pub address: String,
    /// Interface whose counters are polled, e.g. "wan".
    pub if_name: String,
    pub username: String,
    pub password: String,
    /// Link maxima in bytes per second, the full-scale deflection points.
    pub down_max_cps: f64,
    pub up_max_cps: f64,
    /// Seconds between login renewals.
    pub login_refresh_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MeterConfig {
    /// Host or host:port of the meter controller.
    pub address: String,
    pub pin_up: u8,
    pub pin_down: u8,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RuntimeConfig {
    /// Averaging window depth.
    pub num_points: usize,
    /// Seconds between samples.
    pub interval_secs: f64,
    /// Request timeout for router and meter calls.
    #[serde(default = "default_http_timeout_secs")]
    pub http_timeout_secs: u64,
}

fn default_http_timeout_secs() -> u64 {
    DEFAULT_HTTP_TIMEOUT_SECS
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("could not parse config file {path}: {source}")]
    Parse {
        path: String,
        source: serde_json::Error,
    },
    #[error("invalid config: {0}")]
    Invalid(&'static str),
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let display = path.display().to_string();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: display.clone(),
            source,
        })?;
        let config: Config = serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: display,
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    // Comparisons are written negated so NaN fails them too.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.runtime.num_points == 0 {
            return Err(ConfigError::Invalid("runtime.num_points must be at least 1"));
        }
        if !(self.runtime.interval_secs > 0.0)
            || Duration::try_from_secs_f64(self.runtime.interval_secs).is_err()
        {
            return Err(ConfigError::Invalid(
                "runtime.interval_secs must be a positive number of seconds",
            ));
        }
        if !(self.router.down_max_cps > 0.0) || !(self.router.up_max_cps > 0.0) {
            return Err(ConfigError::Invalid(
                "router byte-rate maxima must be positive",
            ));
        }
        Ok(())
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs_f64(self.runtime.interval_secs)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.runtime.http_timeout_secs)
    }

    pub fn login_refresh(&self) -> Duration {
        Duration::from_secs(self.router.login_refresh_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_json() -> &'static str {
        r#"{
            "router": {
                "address": "192.168.1.1",
                "if_name": "wan",
                "username": "meters",
                "password": "hunter2",
                "down_max_cps": 1250000.0,
                "up_max_cps": 250000.0,
                "login_refresh_secs": 3600
            },
            "meters": {
                "address": "192.168.1.40",
                "pin_up": 9,
                "pin_down": 10
            },
            "runtime": {
                "num_points": 5,
                "interval_secs": 2.0
            }
        }"#
    }

    fn parsed() -> Config {
        serde_json::from_str(sample_json()).unwrap()
    }

    #[test]
    fn load_reads_and_validates_a_file() {
        let path = std::env::temp_dir().join("bandmeter-config-load-test.json");
        fs::write(&path, sample_json()).unwrap();
        let config = Config::load(&path).unwrap();
        let _ = fs::remove_file(&path);

        assert_eq!(config.router.address, "192.168.1.1");
        assert_eq!(config.router.if_name, "wan");
        assert_eq!(config.meters.pin_up, 9);
        assert_eq!(config.runtime.num_points, 5);
        assert_eq!(config.interval(), Duration::from_secs(2));
        assert_eq!(config.login_refresh(), Duration::from_secs(3600));
    }

    #[test]
    fn http_timeout_defaults_when_absent() {
        let config = parsed();
        assert_eq!(config.http_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn load_reports_a_missing_file() {
        let err = Config::load(Path::new("/nonexistent/bandmeter.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn parse_error_on_missing_fields() {
        let err = serde_json::from_str::<Config>(r#"{"router": {}}"#).unwrap_err();
        assert!(err.to_string().contains("missing field"));
    }

    #[test]
    fn rejects_zero_window_depth() {
        let mut config = parsed();
        config.runtime.num_points = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn rejects_non_positive_interval() {
        let mut config = parsed();
        config.runtime.interval_secs = 0.0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        config.runtime.interval_secs = f64::NAN;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn rejects_interval_too_large_for_a_duration() {
        let mut config = parsed();
        config.runtime.interval_secs = 1e20;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        config.runtime.interval_secs = f64::INFINITY;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn rejects_non_positive_rate_maxima() {
        let mut config = parsed();
        config.router.up_max_cps = -1.0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }
}
