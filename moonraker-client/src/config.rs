//! Client configuration

/// Default Moonraker API port
pub const DEFAULT_PORT: u16 = 7125;

/// Configuration for connecting to Moonraker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoonrakerConfig {
    /// Server base URL (e.g., "http://192.168.0.125:7125")
    pub base_url: String,

    /// Request timeout in seconds
    pub timeout: u64,
}

impl MoonrakerConfig {
    /// Create a new configuration with the default 10 s timeout
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: 10,
        }
    }

    /// Configuration for `http://<host>:<port>`
    pub fn from_host(host: &str, port: u16) -> Self {
        Self::new(format!("http://{}:{}", host, port))
    }

    /// Set the request timeout
    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout = seconds;
        self
    }

    /// Create a client from this configuration
    pub fn build_client(&self) -> super::MoonrakerResult<super::MoonrakerClient> {
        super::MoonrakerClient::new(self)
    }
}

impl Default for MoonrakerConfig {
    fn default() -> Self {
        Self::from_host("localhost", DEFAULT_PORT)
    }
}
