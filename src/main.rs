mod cli;
mod config;
mod meter;
mod monitor;
mod rate;
mod router;
mod smoothing;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;
use crate::config::{Config, ConfigError};
use crate::meter::MeterPanel;
use crate::monitor::{run_monitor, MonitorSettings};
use crate::router::{RouterError, RouterSession};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .try_init()
        .ok();

    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        // Map to stable exit codes
        let code = exit_code_for_error(&err);
        eprintln!("error: {err:?}");
        std::process::exit(code);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = Config::load(&cli.config)?;

    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = stop.clone();
        let _ = ctrlc::set_handler(move || {
            stop.store(true, Ordering::Relaxed);
        });
    }

    let mut router = RouterSession::new(&config.router, config.http_timeout())?;
    info!(address = %config.router.address, "Logging in to router");
    router.login().context("Initial router login")?;

    let mut meters = MeterPanel::new(&config.meters, config.http_timeout())?;
    let settings = MonitorSettings::from_config(&config);
    run_monitor(&mut router, &mut meters, &settings, &stop)
}

pub(crate) fn exit_code_for_error(err: &anyhow::Error) -> i32 {
    // 2: config error, 3: login rejected, 4: transport failure, 1: other
    for cause in err.chain() {
        if cause.is::<ConfigError>() {
            return 2;
        }
        if let Some(router_err) = cause.downcast_ref::<RouterError>() {
            return match router_err {
                RouterError::LoginRejected(_) => 3,
                RouterError::Http(_) => 4,
                RouterError::Parse(_) => 1,
            };
        }
        if cause.is::<reqwest::Error>() {
            return 4;
        }
    }
    1
}

#[cfg(test)]
mod tests {
    use super::*;

    // A URL with an empty host fails at request build time, no network
    // involved.
    fn transport_error() -> reqwest::Error {
        reqwest::blocking::Client::new()
            .get("http://")
            .send()
            .unwrap_err()
    }

    #[test]
    fn exit_code_config_error() {
        let err = anyhow::Error::from(ConfigError::Invalid("runtime.num_points must be at least 1"));
        assert_eq!(exit_code_for_error(&err), 2);
    }

    #[test]
    fn exit_code_login_rejected() {
        let err = anyhow::Error::from(RouterError::LoginRejected(
            reqwest::StatusCode::UNAUTHORIZED,
        ));
        assert_eq!(exit_code_for_error(&err), 3);
    }

    #[test]
    fn exit_code_login_rejected_behind_context() {
        let err = anyhow::Error::from(RouterError::LoginRejected(reqwest::StatusCode::FORBIDDEN))
            .context("Renewing router login");
        assert_eq!(exit_code_for_error(&err), 3);
    }

    #[test]
    fn exit_code_router_transport_failure() {
        let err = anyhow::Error::from(RouterError::Http(transport_error()));
        assert_eq!(exit_code_for_error(&err), 4);
    }

    #[test]
    fn exit_code_bare_transport_failure() {
        let err = anyhow::Error::from(transport_error());
        assert_eq!(exit_code_for_error(&err), 4);
    }

    #[test]
    fn exit_code_other() {
        let err = anyhow::anyhow!("other");
        assert_eq!(exit_code_for_error(&err), 1);
    }
}
