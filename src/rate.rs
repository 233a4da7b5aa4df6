/// Native range of the meter PWM output.
pub const PWM_RANGE: f64 = 255.0;

/// One reading of the router's cumulative traffic counters. The timestamp is
/// the router's own clock, in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawSample {
    pub timestamp: f64,
    pub down_bytes: f64,
    pub up_bytes: f64,
}

/// Per-direction rates rescaled into the meter range. Not clamped: values can
/// exceed 255 when traffic exceeds the configured maximum, and go negative
/// when a router counter resets.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaledPair {
    pub down: f64,
    pub up: f64,
}

impl ScaledPair {
    pub const ZERO: ScaledPair = ScaledPair { down: 0.0, up: 0.0 };
}

/// Turns consecutive counter samples into scaled per-second rates.
pub struct RateConverter {
    previous: Option<RawSample>,
    down_max_cps: f64,
    up_max_cps: f64,
}

impl RateConverter {
    pub fn new(down_max_cps: f64, up_max_cps: f64) -> Self {
        Self {
            previous: None,
            down_max_cps,
            up_max_cps,
        }
    }

    /// Scaled rate pair between `current` and the sample before it.
    ///
    /// The stored baseline advances to `current` unconditionally, before any
    /// branch: the first sample ever seen and any `dt <= 0` anomaly both
    /// yield `(0, 0)` but still become the baseline for the next call.
    pub fn convert(&mut self, current: RawSample) -> ScaledPair {
        let Some(previous) = self.previous.replace(current) else {
            return ScaledPair::ZERO;
        };

        let dt = current.timestamp - previous.timestamp;
        if dt <= 0.0 {
            return ScaledPair::ZERO;
        }

        let down_per_sec = (current.down_bytes - previous.down_bytes) / dt;
        let up_per_sec = (current.up_bytes - previous.up_bytes) / dt;
        ScaledPair {
            down: down_per_sec / self.down_max_cps * PWM_RANGE,
            up: up_per_sec / self.up_max_cps * PWM_RANGE,
        }
    }
}
