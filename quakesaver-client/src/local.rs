use tracing::debug;

use crate::error::{ClientError, Result};
use crate::models::sensor::SensorState;
use crate::session::validate_host;

/// Client for sensors reachable on the local network.
///
/// A local sensor needs no authentication; its `/state` endpoint serves
/// the same document the backend mirrors.
#[derive(Clone)]
pub struct LocalClient {
    http: reqwest::Client,
}

impl LocalClient {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
        }
    }

    /// Fetch the state snapshot of a sensor at `host[:port]`.
    pub async fn sensor(&self, host: &str) -> Result<SensorState> {
        validate_host(host)?;
        debug!(host, "requesting sensor state");
        let response = self.http.get(format!("http://{host}/state")).send().await?;
        response
            .json()
            .await
            .map_err(|e| ClientError::CorruptedData(e.to_string()))
    }
}

impl Default for LocalClient {
    fn default() -> Self {
        Self::new()
    }
}
