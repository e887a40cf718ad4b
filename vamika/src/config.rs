//! Daemon configuration from the environment.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::sos::AlertConfig;

/// Default address of the HTTP API.
pub const DEFAULT_API_ADDR: &str = "127.0.0.1:7786";

/// File under the data directory holding the contact mirror.
const CONTACTS_FILE: &str = "contacts.json";

#[derive(Debug, Clone)]
pub struct DaemonConfig {
    /// `VAMIKA_API_ADDR`
    pub api_addr: SocketAddr,

    /// `VAMIKA_NOTIFY_WEBHOOK`: SMS/messaging gateway receiving one POST
    /// per contact on dispatch. Dispatches are only logged when unset.
    pub notify_webhook: Option<String>,

    /// `VAMIKA_DATA_DIR`: where contacts are mirrored. In memory only
    /// when unset.
    pub data_dir: Option<PathBuf>,

    /// `VAMIKA_SOS_COUNTDOWN` and `VAMIKA_SOS_EXPIRY_SECS`.
    pub alert: AlertConfig,
}

impl DaemonConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let api_addr = parse(
            "VAMIKA_API_ADDR",
            &get("VAMIKA_API_ADDR").unwrap_or_else(|| DEFAULT_API_ADDR.into()),
        )?;

        let notify_webhook = get("VAMIKA_NOTIFY_WEBHOOK");
        if let Some(url) = &notify_webhook
            && !(url.starts_with("http://") || url.starts_with("https://"))
        {
            return Err(Error::Config(format!(
                "VAMIKA_NOTIFY_WEBHOOK must be an http(s) URL, got {url:?}"
            )));
        }

        let mut alert = AlertConfig::default();
        if let Some(value) = get("VAMIKA_SOS_COUNTDOWN") {
            alert.initial_count = parse("VAMIKA_SOS_COUNTDOWN", &value)?;
            if alert.initial_count == 0 {
                return Err(Error::Config("VAMIKA_SOS_COUNTDOWN must be at least 1".into()));
            }
        }
        if let Some(value) = get("VAMIKA_SOS_EXPIRY_SECS") {
            alert.auto_expiry = Duration::from_secs(parse("VAMIKA_SOS_EXPIRY_SECS", &value)?);
        }
        if alert.auto_expiry <= alert.countdown() {
            return Err(Error::Config(format!(
                "SOS expiry ({}s) must be longer than the countdown ({}s)",
                alert.auto_expiry.as_secs(),
                alert.countdown().as_secs()
            )));
        }

        Ok(Self {
            api_addr,
            notify_webhook,
            data_dir: get("VAMIKA_DATA_DIR").map(PathBuf::from),
            alert,
        })
    }

    /// Path of the contact mirror, if persistence is enabled.
    pub fn contacts_file(&self) -> Option<PathBuf> {
        self.data_dir.as_ref().map(|dir| dir.join(CONTACTS_FILE))
    }
}

fn parse<T>(key: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| Error::Config(format!("{key}={value:?}: {e}")))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use test_case::test_case;

    use super::*;
    use crate::sos::config::{AUTO_EXPIRY, INITIAL_COUNT};

    fn config(vars: &[(&str, &str)]) -> Result<DaemonConfig> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        DaemonConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults() {
        let config = config(&[]).unwrap();

        assert_eq!(config.api_addr, DEFAULT_API_ADDR.parse().unwrap());
        assert!(config.notify_webhook.is_none());
        assert!(config.contacts_file().is_none());
        assert_eq!(config.alert.initial_count, INITIAL_COUNT);
        assert_eq!(config.alert.auto_expiry, AUTO_EXPIRY);
    }

    #[test]
    fn overrides() {
        let config = config(&[
            ("VAMIKA_API_ADDR", "0.0.0.0:8080"),
            ("VAMIKA_NOTIFY_WEBHOOK", "https://sms.example.com/send"),
            ("VAMIKA_DATA_DIR", "/var/lib/vamika"),
            ("VAMIKA_SOS_COUNTDOWN", "5"),
            ("VAMIKA_SOS_EXPIRY_SECS", "30"),
        ])
        .unwrap();

        assert_eq!(config.api_addr.port(), 8080);
        assert_eq!(
            config.notify_webhook.as_deref(),
            Some("https://sms.example.com/send")
        );
        assert_eq!(
            config.contacts_file(),
            Some(PathBuf::from("/var/lib/vamika/contacts.json"))
        );
        assert_eq!(config.alert.initial_count, 5);
        assert_eq!(config.alert.auto_expiry, Duration::from_secs(30));
    }

    #[test]
    fn blank_values_fall_back_to_defaults() {
        let config = config(&[("VAMIKA_API_ADDR", "  "), ("VAMIKA_DATA_DIR", "")]).unwrap();

        assert_eq!(config.api_addr, DEFAULT_API_ADDR.parse().unwrap());
        assert!(config.data_dir.is_none());
    }

    #[test_case("VAMIKA_API_ADDR", "localhost" ; "address without port")]
    #[test_case("VAMIKA_SOS_COUNTDOWN", "0" ; "zero countdown")]
    #[test_case("VAMIKA_SOS_COUNTDOWN", "three" ; "non-numeric countdown")]
    #[test_case("VAMIKA_SOS_EXPIRY_SECS", "-1" ; "negative expiry")]
    #[test_case("VAMIKA_NOTIFY_WEBHOOK", "sms.example.com" ; "webhook without scheme")]
    #[test_case("VAMIKA_SOS_EXPIRY_SECS", "0" ; "zero expiry")]
    #[test_case("VAMIKA_SOS_EXPIRY_SECS", "3" ; "expiry at the end of the default countdown")]
    #[test_case("VAMIKA_SOS_COUNTDOWN", "10" ; "countdown reaching the default expiry")]
    fn rejects(key: &str, value: &str) {
        assert!(matches!(config(&[(key, value)]), Err(Error::Config(_))));
    }

    #[test]
    fn expiry_must_outlast_the_countdown() {
        let error = config(&[
            ("VAMIKA_SOS_COUNTDOWN", "5"),
            ("VAMIKA_SOS_EXPIRY_SECS", "4"),
        ])
        .unwrap_err();
        assert!(error.to_string().contains("longer than the countdown"), "{error}");

        let config = config(&[
            ("VAMIKA_SOS_COUNTDOWN", "5"),
            ("VAMIKA_SOS_EXPIRY_SECS", "6"),
        ])
        .unwrap();
        assert_eq!(config.alert.countdown(), Duration::from_secs(5));
    }
}
