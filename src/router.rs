use std::time::Duration;

use reqwest::blocking::Client;
use tracing::debug;

use crate::config::RouterConfig;
use crate::rate::RawSample;

/// The authenticated link to the router: counter samples plus login renewal.
/// The monitor loop only sees this trait, so tests can script the router.
pub trait RouterLink {
    fn fetch_counters(&mut self) -> Result<RawSample, RouterError>;
    fn renew_login(&mut self) -> Result<(), RouterError>;
}

#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    #[error("router rejected the login (status {0})")]
    LoginRejected(reqwest::StatusCode),
    #[error("malformed counter response: {0}")]
    Parse(String),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// HTTP session against a pfSense-style web interface. Login is a form POST
/// to the index page; the session cookie lands in the client's cookie store
/// and rides along on every later request.
pub struct RouterSession {
    client: Client,
    login_url: String,
    data_url: String,
    username: String,
    password: String,
}

impl RouterSession {
    pub fn new(config: &RouterConfig, timeout: Duration) -> Result<Self, RouterError> {
        let client = Client::builder().cookie_store(true).timeout(timeout).build()?;
        Ok(Self {
            client,
            login_url: format!("http://{}/index.php", config.address),
            data_url: format!("http://{}/ifstats.php?if={}", config.address, config.if_name),
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    pub fn login(&mut self) -> Result<(), RouterError> {
        let form = [
            ("login", "Login"),
            ("usernamefld", self.username.as_str()),
            ("passwordfld", self.password.as_str()),
        ];
        let response = self.client.post(&self.login_url).form(&form).send()?;
        if !response.status().is_success() {
            return Err(RouterError::LoginRejected(response.status()));
        }
        debug!("Router login ok");
        Ok(())
    }
}

impl RouterLink for RouterSession {
    fn fetch_counters(&mut self) -> Result<RawSample, RouterError> {
        debug!(url = %self.data_url, "Fetching counters");
        let body = self.client.get(&self.data_url).send()?.text()?;
        parse_ifstats(&body)
    }

    fn renew_login(&mut self) -> Result<(), RouterError> {
        self.login()
    }
}

/// Parses the counter endpoint's `timestamp|down_bytes|up_bytes` record.
pub fn parse_ifstats(body: &str) -> Result<RawSample, RouterError> {
    let fields: Vec<&str> = body.trim().split('|').collect();
    if fields.len() != 3 {
        return Err(RouterError::Parse(format!(
            "expected 3 '|'-separated fields, got {}",
            fields.len()
        )));
    }
    let number = |raw: &str| {
        raw.trim()
            .parse::<f64>()
            .map_err(|_| RouterError::Parse(format!("bad numeric field {raw:?}")))
    };
    Ok(RawSample {
        timestamp: number(fields[0])?,
        down_bytes: number(fields[1])?,
        up_bytes: number(fields[2])?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_counter_record() {
        let sample = parse_ifstats("1361742824|472807961|92174826").unwrap();
        assert_eq!(sample.timestamp, 1361742824.0);
        assert_eq!(sample.down_bytes, 472807961.0);
        assert_eq!(sample.up_bytes, 92174826.0);
    }

    #[test]
    fn tolerates_surrounding_whitespace() {
        let sample = parse_ifstats("1361742824|100|50\n").unwrap();
        assert_eq!(sample.down_bytes, 100.0);
        assert_eq!(sample.up_bytes, 50.0);
    }

    #[test]
    fn rejects_a_field_count_mismatch() {
        assert!(matches!(parse_ifstats("1|2"), Err(RouterError::Parse(_))));
        assert!(matches!(parse_ifstats("1|2|3|4"), Err(RouterError::Parse(_))));
        assert!(matches!(parse_ifstats(""), Err(RouterError::Parse(_))));
    }

    #[test]
    fn rejects_non_numeric_fields() {
        assert!(matches!(parse_ifstats("abc|2|3"), Err(RouterError::Parse(_))));
        assert!(matches!(
            parse_ifstats("1|<html>login</html>|3"),
            Err(RouterError::Parse(_))
        ));
    }

    #[test]
    fn builds_router_urls_from_the_config() {
        let config = RouterConfig {
            address: "192.168.1.1".into(),
            if_name: "wan".into(),
            username: "admin".into(),
            password: "pfsense".into(),
            down_max_cps: 1000.0,
            up_max_cps: 500.0,
            login_refresh_secs: 3600,
        };
        let session = RouterSession::new(&config, Duration::from_secs(5)).unwrap();
        assert_eq!(session.login_url, "http://192.168.1.1/index.php");
        assert_eq!(session.data_url, "http://192.168.1.1/ifstats.php?if=wan");
    }
}
