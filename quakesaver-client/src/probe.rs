use std::time::Duration;

use serde::Deserialize;
use tracing::debug;

use crate::connection::Connection;
use crate::error::{ClientError, Result};

/// Port the sensor control endpoint listens on.
pub const DEFAULT_CONTROL_PORT: u16 = 5533;

/// Configuration for [`LivenessProber`].
#[derive(Clone, Debug)]
pub struct ProbeConfig {
    /// Deadline for the liveness round-trip. Default: 1 second.
    pub timeout: Duration,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(1),
        }
    }
}

/// Identity snapshot reported by a sensor's `/state` endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct SensorIdentity {
    pub uid: String,
    pub software_version: String,
}

/// Outcome of probing one candidate host.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProbeReport {
    /// The probed `host:port`.
    pub host: String,
    /// Whether the sensor answered the control round-trip in time.
    pub alive: bool,
    /// Identity snapshot, when the separate state fetch succeeded.
    pub identity: Option<SensorIdentity>,
}

/// Best-effort reachability probe for sensors on the local network.
///
/// Opens a short-lived control connection, sends a ping, and closes.
/// Any connection error, timeout, or unexpected failure reduces to
/// `alive: false` — a probe never propagates an error to the caller.
/// Many probes may be driven concurrently; this is how the scanning
/// workflow parallelizes across candidate hosts.
#[derive(Clone)]
pub struct LivenessProber {
    config: ProbeConfig,
    http: reqwest::Client,
}

impl LivenessProber {
    pub fn new() -> Self {
        Self::with_config(ProbeConfig::default())
    }

    pub fn with_config(config: ProbeConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    /// Probe one `host:port` for a running sensor.
    ///
    /// The identity fetch is a distinct request and does not affect the
    /// liveness verdict: a sensor can be alive with no identity.
    pub async fn probe(&self, host: &str) -> ProbeReport {
        let alive = match tokio::time::timeout(self.config.timeout, self.ping(host)).await {
            Ok(Ok(())) => true,
            Ok(Err(e)) => {
                debug!(host, error = %e, "no running sensor");
                false
            }
            Err(_) => {
                debug!(host, "probe timed out");
                false
            }
        };

        if !alive {
            return ProbeReport {
                host: host.to_owned(),
                alive: false,
                identity: None,
            };
        }

        let identity = match self.fetch_identity(host).await {
            Ok(identity) => Some(identity),
            Err(e) => {
                debug!(host, error = %e, "state snapshot unavailable");
                None
            }
        };

        ProbeReport {
            host: host.to_owned(),
            alive: true,
            identity,
        }
    }

    async fn ping(&self, host: &str) -> Result<()> {
        let mut connection = Connection::open(host, self.config.timeout).await?;
        connection.ping().await?;
        connection.close().await;
        Ok(())
    }

    async fn fetch_identity(&self, host: &str) -> Result<SensorIdentity> {
        let response = self
            .http
            .get(format!("http://{host}/state"))
            .timeout(self.config.timeout)
            .send()
            .await?;
        response
            .json()
            .await
            .map_err(|e| ClientError::CorruptedData(e.to_string()))
    }
}

impl Default for LivenessProber {
    fn default() -> Self {
        Self::new()
    }
}

/// Expand a scan target into candidate hosts.
///
/// A bare host expands to itself; a `/24` CIDR range expands to the
/// addresses `.1` through `.255` of that network.
pub fn expand_hosts(target: &str) -> Result<Vec<String>> {
    let Some((base, prefix)) = target.split_once('/') else {
        return Ok(vec![target.to_owned()]);
    };

    if prefix != "24" {
        return Err(ClientError::InvalidHost(format!(
            "{target}: only /24 ranges are supported"
        )));
    }
    let octets: Vec<&str> = base.split('.').collect();
    if octets.len() != 4 {
        return Err(ClientError::InvalidHost(target.to_owned()));
    }
    let network = octets[..3].join(".");
    Ok((1..=255).map(|i| format!("{network}.{i}")).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockSensor, MockSensorConfig};
    use std::time::Instant;

    #[tokio::test]
    async fn unreachable_host_is_not_alive() {
        let prober = LivenessProber::with_config(ProbeConfig {
            timeout: Duration::from_millis(500),
        });

        let started = Instant::now();
        let report = prober.probe("127.0.0.1:1").await;

        assert!(!report.alive);
        assert!(report.identity.is_none());
        // Bounded by the configured timeout, not hanging.
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn garbage_host_never_panics() {
        let prober = LivenessProber::with_config(ProbeConfig {
            timeout: Duration::from_millis(200),
        });
        let report = prober.probe("definitely..not%%a-host:99999").await;
        assert!(!report.alive);
    }

    #[tokio::test]
    async fn alive_sensor_with_identity() {
        let config = MockSensorConfig {
            state_body: Some(
                serde_json::json!({
                    "uid": "QSX-1234",
                    "software_version": "1.4.2",
                    "hardware_revision": "rev3",
                })
                .to_string(),
            ),
            ..MockSensorConfig::single(vec![])
        };
        let sensor = MockSensor::start(config).await;

        let prober = LivenessProber::new();
        let report = prober.probe(&sensor.host()).await;

        assert!(report.alive);
        assert_eq!(
            report.identity,
            Some(SensorIdentity {
                uid: "QSX-1234".to_owned(),
                software_version: "1.4.2".to_owned(),
            })
        );
    }

    #[tokio::test]
    async fn alive_sensor_without_state_is_still_alive() {
        // The mock answers /state with an empty object; identity parsing
        // fails but the liveness verdict stands.
        let sensor = MockSensor::start(MockSensorConfig::single(vec![])).await;

        let prober = LivenessProber::new();
        let report = prober.probe(&sensor.host()).await;

        assert!(report.alive);
        assert!(report.identity.is_none());
    }

    #[test]
    fn expand_single_host() {
        assert_eq!(
            expand_hosts("192.168.1.17").unwrap(),
            vec!["192.168.1.17".to_owned()]
        );
    }

    #[test]
    fn expand_slash_24() {
        let hosts = expand_hosts("10.0.3.0/24").unwrap();
        assert_eq!(hosts.len(), 255);
        assert_eq!(hosts[0], "10.0.3.1");
        assert_eq!(hosts[254], "10.0.3.255");
    }

    #[test]
    fn expand_rejects_other_prefixes() {
        assert!(matches!(
            expand_hosts("10.0.3.0/16"),
            Err(ClientError::InvalidHost(_))
        ));
    }

    #[test]
    fn expand_rejects_short_base() {
        assert!(expand_hosts("10.0/24").is_err());
    }
}
