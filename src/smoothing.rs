use std::collections::VecDeque;

use crate::rate::ScaledPair;

/// Fixed-size FIFO window over scaled rates for one traffic direction.
struct RateWindow {
    values: VecDeque<f64>,
}

impl RateWindow {
    fn seeded(values: &[f64]) -> Self {
        Self {
            values: values.iter().copied().collect(),
        }
    }

    fn push(&mut self, value: f64) {
        self.values.pop_front();
        self.values.push_back(value);
    }

    /// Arithmetic mean of the window, truncated toward zero.
    fn average(&self) -> i64 {
        if self.values.is_empty() {
            return 0;
        }
        let sum: f64 = self.values.iter().sum();
        (sum / self.values.len() as f64) as i64
    }
}

/// The per-direction averaging windows. Constructed pre-seeded, so every
/// push and every average runs over a full window.
pub struct Smoother {
    down: RateWindow,
    up: RateWindow,
}

impl Smoother {
    pub fn seeded(seeds: &[ScaledPair]) -> Self {
        let down: Vec<f64> = seeds.iter().map(|pair| pair.down).collect();
        let up: Vec<f64> = seeds.iter().map(|pair| pair.up).collect();
        Self {
            down: RateWindow::seeded(&down),
            up: RateWindow::seeded(&up),
        }
    }

    /// Appends one scaled pair, evicting the oldest value in each window.
    pub fn push(&mut self, pair: ScaledPair) {
        self.down.push(pair.down);
        self.up.push(pair.up);
    }

    /// `(down, up)` integer averages of the current windows.
    pub fn averages(&self) -> (i64, i64) {
        (self.down.average(), self.up.average())
    }
}
