//! HTTP client for the Moonraker API

use crate::{MoonrakerConfig, MoonrakerError, MoonrakerResult};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, instrument, warn};

/// Body of `/printer/gcode/script`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GcodeScript {
    pub script: String,
}

impl GcodeScript {
    /// Select the next spool in the MMU gate map
    pub fn next_spool(spool: u64) -> Self {
        Self {
            script: format!("MMU_GATE_MAP NEXT_SPOOLID={}", spool),
        }
    }
}

/// Client making single, unretried requests to Moonraker
#[derive(Debug, Clone)]
pub struct MoonrakerClient {
    client: Client,
    base_url: String,
}

impl MoonrakerClient {
    /// Create a new client from configuration
    pub fn new(config: &MoonrakerConfig) -> MoonrakerResult<Self> {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
            return Err(MoonrakerError::InvalidConfig(format!(
                "Invalid base URL: {}",
                config.base_url
            )));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout))
            .build()?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Tell Moonraker which spool is now loaded
    ///
    /// Only the spool id is sent; the filament id is carried for logging.
    #[instrument(skip(self))]
    pub async fn set_spool_and_filament(&self, spool: u64, filament: u64) -> MoonrakerResult<()> {
        self.run_gcode(&GcodeScript::next_spool(spool)).await?;
        info!(spool, filament, "Moonraker notified of active spool");
        Ok(())
    }

    /// Run a G-code script
    ///
    /// Sent as GET with a JSON body, which the printer side accepts; any
    /// status other than 200 is an error.
    pub async fn run_gcode(&self, script: &GcodeScript) -> MoonrakerResult<()> {
        let response = self
            .client
            .get(self.url("/printer/gcode/script"))
            .json(script)
            .send()
            .await?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), body = %body, "Moonraker rejected request");
            return Err(MoonrakerError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(())
    }

    /// Check if Moonraker answers `/server/info`
    #[instrument(skip(self), fields(base_url = %self.base_url))]
    pub async fn is_online(&self) -> bool {
        match self.client.get(self.url("/server/info")).send().await {
            Ok(response) if response.status().is_success() => true,
            Ok(response) => {
                warn!(status = response.status().as_u16(), "Moonraker not ready");
                false
            }
            Err(e) => {
                warn!(error = %e, "Moonraker offline");
                false
            }
        }
    }
}
