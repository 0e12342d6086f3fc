use std::str::FromStr;
use std::time::Duration;

/// Reader hardware backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReaderBackend {
    /// In-memory field, no hardware
    Simulated,
    /// ACR122U over PC/SC (needs the `acr122u` feature)
    Acr122u,
}

impl ReaderBackend {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "sim" | "simulated" => Some(Self::Simulated),
            "acr122u" | "pcsc" => Some(Self::Acr122u),
            _ => None,
        }
    }
}

impl Default for ReaderBackend {
    fn default() -> Self {
        if cfg!(feature = "acr122u") {
            Self::Acr122u
        } else {
            Self::Simulated
        }
    }
}

/// Bridge configuration
///
/// # Environment variables
///
/// | Variable | Default | Meaning |
/// |----------|---------|---------|
/// | NFC_READER | acr122u (feature) / simulated | Reader backend |
/// | NFC_READER_NAME | - | PC/SC reader name, first reader if unset |
/// | MOONRAKER_URL | http://localhost:7125 | Moonraker base URL |
/// | MOONRAKER_TIMEOUT_SECS | 10 | Notification timeout |
/// | HTTP_PORT | 5001 | Bridge API port |
/// | WRITE_TIMEOUT_SECS | 30 | Tag write timeout |
/// | POLL_INTERVAL_MS | 10000 | Wait while a tag is present |
/// | ABSENT_RETRY_MS | 200 | Wait while no tag is present |
/// | EVENT_QUEUE_CAPACITY | 16 | Tag event queue bound |
/// | LOG_LEVEL | info | Log filter (RUST_LOG wins) |
/// | LOG_JSON | false | JSON console logs |
/// | LOG_DIR | - | Daily rotating log files |
///
/// # Example
///
/// ```ignore
/// MOONRAKER_URL=http://192.168.0.125:7125 NFC_READER=simulated cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    pub reader: ReaderBackend,
    pub reader_name: Option<String>,
    pub moonraker_url: String,
    pub moonraker_timeout_secs: u64,
    pub http_port: u16,
    pub write_timeout: Duration,
    pub poll_interval: Duration,
    pub absent_retry: Duration,
    pub event_queue_capacity: usize,
    pub log_level: String,
    pub log_json: bool,
    pub log_dir: Option<String>,
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Unset or unparsable variables fall back to their defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        Self {
            reader: lookup("NFC_READER")
                .and_then(|v| ReaderBackend::parse(&v))
                .unwrap_or_default(),
            reader_name: lookup("NFC_READER_NAME").filter(|v| !v.is_empty()),
            moonraker_url: lookup("MOONRAKER_URL")
                .unwrap_or_else(|| "http://localhost:7125".into()),
            moonraker_timeout_secs: parse_var(&lookup, "MOONRAKER_TIMEOUT_SECS").unwrap_or(10),
            http_port: parse_var(&lookup, "HTTP_PORT").unwrap_or(5001),
            write_timeout: Duration::from_secs(
                parse_var(&lookup, "WRITE_TIMEOUT_SECS").unwrap_or(30),
            ),
            poll_interval: Duration::from_millis(
                parse_var(&lookup, "POLL_INTERVAL_MS").unwrap_or(10_000),
            ),
            absent_retry: Duration::from_millis(
                parse_var(&lookup, "ABSENT_RETRY_MS").unwrap_or(200),
            ),
            event_queue_capacity: parse_var::<usize>(&lookup, "EVENT_QUEUE_CAPACITY")
                .filter(|&c| c > 0)
                .unwrap_or(16),
            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".into()),
            log_json: parse_var(&lookup, "LOG_JSON").unwrap_or(false),
            log_dir: lookup("LOG_DIR").filter(|v| !v.is_empty()),
        }
    }

    /// Reader loop timing from this configuration
    pub fn poll_timing(&self) -> spool_nfc::PollTiming {
        spool_nfc::PollTiming::default()
            .with_absent_retry(self.absent_retry)
            .with_present_interval(self.poll_interval)
    }

    /// Moonraker client configuration
    pub fn moonraker(&self) -> moonraker_client::MoonrakerConfig {
        moonraker_client::MoonrakerConfig::new(self.moonraker_url.clone())
            .with_timeout(self.moonraker_timeout_secs)
    }
}

fn parse_var<T: FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    lookup(key).and_then(|v| v.trim().parse().ok())
}

impl Default for Config {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Config {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.moonraker_url, "http://localhost:7125");
        assert_eq!(config.http_port, 5001);
        assert_eq!(config.write_timeout, Duration::from_secs(30));
        assert_eq!(config.poll_interval, Duration::from_secs(10));
        assert_eq!(config.absent_retry, Duration::from_millis(200));
        assert_eq!(config.event_queue_capacity, 16);
        assert_eq!(config.reader, ReaderBackend::default());
        assert!(!config.log_json);
        assert!(config.log_dir.is_none());
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("NFC_READER", "SIM"),
            ("MOONRAKER_URL", "http://192.168.0.125:7125"),
            ("HTTP_PORT", "8080"),
            ("WRITE_TIMEOUT_SECS", "5"),
            ("POLL_INTERVAL_MS", "500"),
            ("LOG_JSON", "true"),
            ("LOG_DIR", "/tmp/logs"),
        ]);
        assert_eq!(config.reader, ReaderBackend::Simulated);
        assert_eq!(config.moonraker_url, "http://192.168.0.125:7125");
        assert_eq!(config.http_port, 8080);
        assert_eq!(config.write_timeout, Duration::from_secs(5));
        assert_eq!(config.poll_timing().present_interval, Duration::from_millis(500));
        assert!(config.log_json);
        assert_eq!(config.log_dir.as_deref(), Some("/tmp/logs"));
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = config_from(&[
            ("NFC_READER", "floppy"),
            ("HTTP_PORT", "not-a-port"),
            ("EVENT_QUEUE_CAPACITY", "0"),
            ("NFC_READER_NAME", ""),
        ]);
        assert_eq!(config.reader, ReaderBackend::default());
        assert_eq!(config.http_port, 5001);
        assert_eq!(config.event_queue_capacity, 16);
        assert!(config.reader_name.is_none());
    }

    #[test]
    fn test_moonraker_config() {
        let config = config_from(&[("MOONRAKER_TIMEOUT_SECS", "3")]);
        let moonraker = config.moonraker();
        assert_eq!(moonraker.timeout, 3);
        assert_eq!(moonraker.base_url, "http://localhost:7125");
    }
}
