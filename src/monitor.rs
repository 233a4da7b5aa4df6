use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::config::Config;
use crate::meter::MeterSink;
use crate::rate::{RateConverter, ScaledPair};
use crate::router::RouterLink;
use crate::smoothing::Smoother;

/// Responsiveness of the stop flag while sleeping between samples.
const STOP_POLL_SLICE: Duration = Duration::from_millis(200);

#[derive(Debug, Clone)]
pub struct MonitorSettings {
    pub num_points: usize,
    pub interval: Duration,
    pub login_refresh: Duration,
    pub down_max_cps: f64,
    pub up_max_cps: f64,
}

impl MonitorSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            num_points: config.runtime.num_points,
            interval: config.interval(),
            login_refresh: config.login_refresh(),
            down_max_cps: config.router.down_max_cps,
            up_max_cps: config.router.up_max_cps,
        }
    }
}

/// Runs the sample, convert, smooth, emit loop until `stop` is raised.
///
/// The averaging windows are seeded before the first meter write, so the
/// meters never see a partial average. A graceful stop parks both meters at
/// zero; a failed login renewal aborts without touching the meters again.
pub fn run_monitor<R, M>(
    router: &mut R,
    meters: &mut M,
    settings: &MonitorSettings,
    stop: &AtomicBool,
) -> Result<()>
where
    R: RouterLink,
    M: MeterSink,
{
    let mut converter = RateConverter::new(settings.down_max_cps, settings.up_max_cps);
    // Measured from the startup login; seeding time counts toward the first
    // renewal.
    let mut last_renewal = Instant::now();

    info!(points = settings.num_points, "Filling initial data for averaging");
    let Some(seeds) = collect_seeds(router, &mut converter, settings, stop) else {
        zero_meters(meters);
        return Ok(());
    };
    let mut smoother = Smoother::seeded(&seeds);

    info!(
        points = settings.num_points,
        interval_secs = settings.interval.as_secs_f64(),
        "Starting monitor loop"
    );
    while !stop.load(Ordering::Relaxed) {
        match router.fetch_counters() {
            Ok(sample) => {
                smoother.push(converter.convert(sample));
                let (down, up) = smoother.averages();
                if let Err(e) = meters.update(up, down) {
                    warn!(?e, "Meter update failed");
                }
            }
            Err(e) => warn!(?e, "Sample fetch failed, skipping this cycle"),
        }

        sleep_until_stop(settings.interval, stop);

        if last_renewal.elapsed() >= settings.login_refresh {
            info!("Renewing router login");
            router.renew_login().context("Renewing router login")?;
            last_renewal = Instant::now();
        }
    }

    info!("Zeroing meters and exiting");
    zero_meters(meters);
    Ok(())
}

/// Takes the baseline sample plus the `num_points` window-seeding samples,
/// all one interval apart. A failed fetch retries the slot on the next tick.
/// Returns `None` when the stop flag is raised mid-seeding.
fn collect_seeds<R: RouterLink>(
    router: &mut R,
    converter: &mut RateConverter,
    settings: &MonitorSettings,
    stop: &AtomicBool,
) -> Option<Vec<ScaledPair>> {
    // The baseline is consumed by the converter and never enters the windows.
    loop {
        if stop.load(Ordering::Relaxed) {
            return None;
        }
        match router.fetch_counters() {
            Ok(sample) => {
                converter.convert(sample);
                break;
            }
            Err(e) => warn!(?e, "Baseline fetch failed, retrying"),
        }
        sleep_until_stop(settings.interval, stop);
    }
    sleep_until_stop(settings.interval, stop);

    let mut seeds = Vec::with_capacity(settings.num_points);
    while seeds.len() < settings.num_points {
        if stop.load(Ordering::Relaxed) {
            return None;
        }
        match router.fetch_counters() {
            Ok(sample) => seeds.push(converter.convert(sample)),
            Err(e) => warn!(?e, "Seed fetch failed, retrying"),
        }
        sleep_until_stop(settings.interval, stop);
    }
    Some(seeds)
}

fn zero_meters<M: MeterSink>(meters: &mut M) {
    if let Err(e) = meters.update(0, 0) {
        warn!(?e, "Failed to zero meters on shutdown");
    }
}

/// Sleeps for `total`, waking early when the stop flag is raised. The flag is
/// only ever observed here and between loop stages, never mid-request.
fn sleep_until_stop(total: Duration, stop: &AtomicBool) {
    let deadline = Instant::now() + total;
    while !stop.load(Ordering::Relaxed) {
        let now = Instant::now();
        if now >= deadline {
            break;
        }
        thread::sleep((deadline - now).min(STOP_POLL_SLICE));
    }
}
