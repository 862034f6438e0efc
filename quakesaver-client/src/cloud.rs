use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, CONTENT_DISPOSITION};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{ClientError, Result};
use crate::models::data_product::{DataProductPage, DataProductQuery};
use crate::models::fdsn::StationQuery;
use crate::models::measurement::{MeasurementQuery, MeasurementQueryFull, MeasurementResult};
use crate::models::sensor::{CloudSensor, Token};

/// Base domain of the hosted QuakeSaver network.
pub const DEFAULT_BASE_DOMAIN: &str = "network.quakesaver.net";

const DEFAULT_WAVEFORM_FILENAME: &str = "qsdata.mseed";

/// Client for the QuakeSaver backend.
///
/// Authenticates lazily: the first call that needs authorization
/// fetches a bearer token and caches it for the lifetime of the
/// client. All query methods are thin request/validate/deserialize
/// calls with no retry logic.
pub struct CloudClient {
    email: String,
    password: String,
    api_base_url: String,
    fdsn_base_url: String,
    http: reqwest::Client,
    token: Option<Token>,
}

impl CloudClient {
    /// Create a client against the hosted QuakeSaver network.
    pub fn new(email: &str, password: &str) -> Self {
        Self::with_domain(email, password, DEFAULT_BASE_DOMAIN)
    }

    /// Create a client against a different deployment domain.
    pub fn with_domain(email: &str, password: &str, base_domain: &str) -> Self {
        Self::with_base_urls(
            email,
            password,
            &format!("https://api.{base_domain}/api/v1"),
            &format!("https://fdsnws.{base_domain}/fdsnws"),
        )
    }

    /// Create a client with explicit API and FDSN base URLs.
    pub fn with_base_urls(
        email: &str,
        password: &str,
        api_base_url: &str,
        fdsn_base_url: &str,
    ) -> Self {
        Self {
            email: email.to_owned(),
            password: password.to_owned(),
            api_base_url: api_base_url.trim_end_matches('/').to_owned(),
            fdsn_base_url: fdsn_base_url.trim_end_matches('/').to_owned(),
            http: reqwest::Client::new(),
            token: None,
        }
    }

    // -- Sensors --

    /// Fetch all sensor UIDs the user has access to.
    pub async fn sensor_ids(&mut self) -> Result<Vec<String>> {
        debug!("requesting sensor ids");
        let auth = self.authorization_header().await?;
        let response = self
            .http
            .get(format!("{}/user/me/sensors", self.api_base_url))
            .header(AUTHORIZATION, auth)
            .send()
            .await?;
        let value = handle_response(response).await?;
        match value {
            serde_json::Value::Object(map) => Ok(map.keys().cloned().collect()),
            _ => Err(ClientError::CorruptedData(
                "sensor listing is not an object".into(),
            )),
        }
    }

    /// Fetch the backend document of one sensor.
    pub async fn sensor(&mut self, uid: &str) -> Result<CloudSensor> {
        debug!(uid, "requesting sensor");
        let auth = self.authorization_header().await?;
        let response = self
            .http
            .get(format!("{}/sensors/{uid}", self.api_base_url))
            .header(AUTHORIZATION, auth)
            .send()
            .await?;
        parse_body(handle_response(response).await?)
    }

    // -- Measurements --

    /// Peak ground acceleration time series.
    pub async fn peak_horizontal_acceleration(
        &mut self,
        uid: &str,
        query: MeasurementQuery,
    ) -> Result<MeasurementResult> {
        query.validate()?;
        self.measurement(uid, query.into_full("rt_peak_ground_motion", "pga"))
            .await
    }

    /// JMA intensity time series.
    pub async fn jma_intensity(
        &mut self,
        uid: &str,
        query: MeasurementQuery,
    ) -> Result<MeasurementResult> {
        query.validate()?;
        self.measurement(uid, query.into_full("rt_jma_intensity", "intensity"))
            .await
    }

    /// RMS amplitude time series.
    pub async fn rms_amplitude(
        &mut self,
        uid: &str,
        query: MeasurementQuery,
    ) -> Result<MeasurementResult> {
        query.validate()?;
        self.measurement(uid, query.into_full("rms_amplitude", "rms_amplitude"))
            .await
    }

    /// Spectral intensity time series.
    pub async fn spectral_intensity(
        &mut self,
        uid: &str,
        query: MeasurementQuery,
    ) -> Result<MeasurementResult> {
        query.validate()?;
        self.measurement(
            uid,
            query.into_full("rt_spectral_intensity", "spectral_intensity"),
        )
        .await
    }

    /// Clock RMS offset time series.
    pub async fn rms_offset(
        &mut self,
        uid: &str,
        query: MeasurementQuery,
    ) -> Result<MeasurementResult> {
        query.validate()?;
        self.measurement(uid, query.into_full("chrony", "rms_offset"))
            .await
    }

    async fn measurement(
        &mut self,
        uid: &str,
        query: MeasurementQueryFull,
    ) -> Result<MeasurementResult> {
        debug!(uid, measurement = %query.measurement, "requesting measurement");
        let auth = self.authorization_header().await?;
        let response = self
            .http
            .post(format!("{}/sensors/{uid}/measurements", self.api_base_url))
            .header(AUTHORIZATION, auth)
            .json(&query)
            .send()
            .await?;
        parse_body(handle_response(response).await?)
    }

    // -- Data products --

    /// Event records recorded by the sensor.
    pub async fn event_records(
        &mut self,
        uid: &str,
        query: &DataProductQuery,
    ) -> Result<DataProductPage> {
        self.data_product(uid, "EventRecord", query).await
    }

    /// Horizontal/vertical spectral ratios computed by the sensor.
    pub async fn hv_spectra(
        &mut self,
        uid: &str,
        query: &DataProductQuery,
    ) -> Result<DataProductPage> {
        self.data_product(uid, "HVSpectra", query).await
    }

    /// Noise autocorrelations computed by the sensor.
    pub async fn noise_autocorrelations(
        &mut self,
        uid: &str,
        query: &DataProductQuery,
    ) -> Result<DataProductPage> {
        self.data_product(uid, "NoiseAutocorrelation", query).await
    }

    async fn data_product(
        &mut self,
        uid: &str,
        name: &str,
        query: &DataProductQuery,
    ) -> Result<DataProductPage> {
        query.validate()?;
        debug!(uid, name, "requesting data products");
        let auth = self.authorization_header().await?;
        let response = self
            .http
            .post(format!(
                "{}/sensors/{uid}/data_products/{name}",
                self.api_base_url
            ))
            .header(AUTHORIZATION, auth)
            .query(query)
            .send()
            .await?;
        parse_body(handle_response(response).await?)
    }

    // -- FDSN downloads --

    /// Download miniSEED waveform data for a sensor and time window.
    ///
    /// The file lands in `location` (created if absent), named from the
    /// response's `Content-Disposition` header. Returns the written path.
    pub async fn waveform_data(
        &mut self,
        uid: &str,
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        location: &Path,
    ) -> Result<PathBuf> {
        debug!(uid, "requesting waveform data");
        let auth = self.authorization_header().await?;
        let response = self
            .http
            .get(format!(
                "{}/dataselect/1/queryauth_jwt_by_id",
                self.fdsn_base_url
            ))
            .header(AUTHORIZATION, auth)
            .query(&[
                ("starttime", start_time.to_rfc3339()),
                ("endtime", end_time.to_rfc3339()),
                ("sensor_uids", uid.to_owned()),
            ])
            .send()
            .await?;

        if response.status() != StatusCode::OK {
            return Err(ClientError::CorruptedData(
                response.text().await.unwrap_or_default(),
            ));
        }

        let filename = disposition_filename(&response)
            .unwrap_or_else(|| DEFAULT_WAVEFORM_FILENAME.to_owned());
        self.save_body(response, location, &filename).await
    }

    /// Download StationXML metadata for a sensor.
    pub async fn station_xml(
        &mut self,
        uid: &str,
        query: &StationQuery,
        location: &Path,
    ) -> Result<PathBuf> {
        debug!(uid, "requesting stationxml");
        let auth = self.authorization_header().await?;
        let response = self
            .http
            .get(format!(
                "{}/station/1/queryauth_jwt_by_id",
                self.fdsn_base_url
            ))
            .header(AUTHORIZATION, auth)
            .query(query)
            .query(&[("sensor_uids", uid)])
            .send()
            .await?;

        if response.status() != StatusCode::OK {
            return Err(ClientError::CorruptedData(
                response.text().await.unwrap_or_default(),
            ));
        }

        let filename = disposition_filename(&response).ok_or_else(|| {
            ClientError::CorruptedData("response carries no Content-Disposition".into())
        })?;
        self.save_body(response, location, &filename).await
    }

    async fn save_body(
        &self,
        response: reqwest::Response,
        location: &Path,
        filename: &str,
    ) -> Result<PathBuf> {
        tokio::fs::create_dir_all(location).await?;
        let path = location.join(filename);
        let bytes = response.bytes().await?;
        tokio::fs::write(&path, &bytes).await?;
        debug!(path = %path.display(), bytes = bytes.len(), "saved");
        Ok(path)
    }

    // -- Authentication --

    async fn authorization_header(&mut self) -> Result<String> {
        if self.token.is_none() {
            debug!("requesting user token");
            let response = self
                .http
                .post(format!("{}/user/get_token", self.api_base_url))
                .form(&[
                    ("username", self.email.as_str()),
                    ("password", self.password.as_str()),
                ])
                .send()
                .await?;
            let token: Token = parse_body(handle_response(response).await?)?;
            self.token = Some(token);
        }
        let token = self
            .token
            .as_ref()
            .ok_or(ClientError::WrongAuthentication)?;
        Ok(format!("{} {}", token.token_type, token.access_token))
    }
}

/// Map a backend response to the client error taxonomy and return the
/// parsed JSON body on success.
async fn handle_response(response: reqwest::Response) -> Result<serde_json::Value> {
    let status = response.status();

    if status == StatusCode::UNAUTHORIZED {
        let detail = response
            .json::<serde_json::Value>()
            .await
            .ok()
            .and_then(|value| {
                value
                    .get("detail")
                    .and_then(|detail| detail.as_str())
                    .map(str::to_owned)
            })
            .unwrap_or_default();
        return Err(match detail.as_str() {
            "Insufficient permissions." => ClientError::InsufficientPermission,
            "Session expired, please log in again." => ClientError::SessionExpired,
            _ => ClientError::WrongAuthentication,
        });
    }

    if status == StatusCode::UNPROCESSABLE_ENTITY {
        return Err(ClientError::CorruptedData(
            response.text().await.unwrap_or_default(),
        ));
    }

    if !status.is_success() {
        return Err(ClientError::UnexpectedStatus {
            status: status.as_u16(),
            body: response.text().await.unwrap_or_default(),
        });
    }

    response
        .json()
        .await
        .map_err(|_| ClientError::CorruptedData("response body is not valid JSON".into()))
}

fn parse_body<T: DeserializeOwned>(value: serde_json::Value) -> Result<T> {
    serde_json::from_value(value).map_err(|e| ClientError::CorruptedData(e.to_string()))
}

fn disposition_filename(response: &reqwest::Response) -> Option<String> {
    response
        .headers()
        .get(CONTENT_DISPOSITION)?
        .to_str()
        .ok()?
        .rsplit_once('=')
        .map(|(_, name)| name.trim_matches('"').to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::measurement::InfluxAggregator;
    use chrono::TimeZone;
    use std::net::SocketAddr;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    struct Reply {
        status: u16,
        headers: Vec<String>,
        body: String,
    }

    impl Reply {
        fn json(status: u16, body: serde_json::Value) -> Self {
            Self {
                status,
                headers: vec!["Content-Type: application/json".to_owned()],
                body: body.to_string(),
            }
        }
    }

    /// Serve a scripted sequence of replies, capturing request heads.
    async fn spawn_backend(replies: Vec<Reply>) -> (SocketAddr, Arc<Mutex<Vec<String>>>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));

        let captured = requests.clone();
        tokio::spawn(async move {
            for reply in replies {
                let Ok((mut tcp, _)) = listener.accept().await else {
                    return;
                };
                // Drain the request; head and body may arrive in
                // separate packets.
                let mut request = Vec::new();
                let mut buf = [0u8; 4096];
                while let Ok(Ok(n)) =
                    tokio::time::timeout(Duration::from_millis(100), tcp.read(&mut buf)).await
                {
                    if n == 0 {
                        break;
                    }
                    request.extend_from_slice(&buf[..n]);
                }
                captured
                    .lock()
                    .unwrap()
                    .push(String::from_utf8_lossy(&request).to_string());

                let reason = match reply.status {
                    200 => "OK",
                    401 => "Unauthorized",
                    422 => "Unprocessable Entity",
                    _ => "Error",
                };
                let mut head = format!("HTTP/1.1 {} {reason}\r\n", reply.status);
                for header in &reply.headers {
                    head.push_str(header);
                    head.push_str("\r\n");
                }
                head.push_str(&format!(
                    "Content-Length: {}\r\nConnection: close\r\n\r\n",
                    reply.body.len()
                ));
                let _ = tcp.write_all(head.as_bytes()).await;
                let _ = tcp.write_all(reply.body.as_bytes()).await;
                let _ = tcp.shutdown().await;
            }
        });

        (addr, requests)
    }

    fn client_for(addr: SocketAddr) -> CloudClient {
        let base = format!("http://{addr}");
        CloudClient::with_base_urls("user@example.com", "hunter2", &base, &base)
    }

    fn token_reply() -> Reply {
        Reply::json(
            200,
            serde_json::json!({ "access_token": "abc123", "token_type": "bearer" }),
        )
    }

    #[tokio::test]
    async fn token_fetched_once_and_reused() {
        let (addr, requests) = spawn_backend(vec![
            token_reply(),
            Reply::json(200, serde_json::json!({ "QS1": {}, "QS2": {} })),
            Reply::json(200, serde_json::json!({ "QS1": {} })),
        ])
        .await;

        let mut client = client_for(addr);

        let ids = client.sensor_ids().await.unwrap();
        assert_eq!(ids, vec!["QS1".to_owned(), "QS2".to_owned()]);

        // Second call reuses the cached token: no further token request.
        let ids = client.sensor_ids().await.unwrap();
        assert_eq!(ids, vec!["QS1".to_owned()]);

        let requests = requests.lock().unwrap();
        assert_eq!(requests.len(), 3);
        assert!(requests[0].starts_with("POST /user/get_token"));
        assert!(requests[0].contains("username=user%40example.com"));
        assert!(requests[1].starts_with("GET /user/me/sensors"));
        assert!(requests[1].contains("authorization: bearer abc123"));
        assert!(requests[2].starts_with("GET /user/me/sensors"));
    }

    #[tokio::test]
    async fn insufficient_permissions_mapped() {
        let (addr, _) = spawn_backend(vec![Reply::json(
            401,
            serde_json::json!({ "detail": "Insufficient permissions." }),
        )])
        .await;

        let err = client_for(addr).sensor_ids().await.unwrap_err();
        assert!(matches!(err, ClientError::InsufficientPermission));
    }

    #[tokio::test]
    async fn session_expired_mapped() {
        let (addr, _) = spawn_backend(vec![Reply::json(
            401,
            serde_json::json!({ "detail": "Session expired, please log in again." }),
        )])
        .await;

        let err = client_for(addr).sensor_ids().await.unwrap_err();
        assert!(matches!(err, ClientError::SessionExpired));
    }

    #[tokio::test]
    async fn other_unauthorized_is_wrong_authentication() {
        let (addr, _) = spawn_backend(vec![Reply::json(
            401,
            serde_json::json!({ "detail": "nope" }),
        )])
        .await;

        let err = client_for(addr).sensor_ids().await.unwrap_err();
        assert!(matches!(err, ClientError::WrongAuthentication));
    }

    #[tokio::test]
    async fn unprocessable_is_corrupted_data() {
        let (addr, _) = spawn_backend(vec![Reply::json(422, serde_json::json!({}))]).await;

        let err = client_for(addr).sensor_ids().await.unwrap_err();
        assert!(matches!(err, ClientError::CorruptedData(_)));
    }

    #[tokio::test]
    async fn server_error_is_unexpected_status() {
        let (addr, _) = spawn_backend(vec![Reply::json(500, serde_json::json!({}))]).await;

        let err = client_for(addr).sensor_ids().await.unwrap_err();
        assert!(matches!(
            err,
            ClientError::UnexpectedStatus { status: 500, .. }
        ));
    }

    #[tokio::test]
    async fn measurement_request_round_trip() {
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 5, 2, 0, 0, 0).unwrap();

        let result_body = serde_json::json!({
            "sensor_uid": "QS1",
            "query_time_seconds": 0.02,
            "query": {
                "start_time": start.to_rfc3339(),
                "end_time": end.to_rfc3339(),
                "measurement": "rt_peak_ground_motion",
                "field": "pga",
                "interval": 60.0,
                "aggregator": "mean",
            },
            "data": {
                "times": [start.to_rfc3339()],
                "values": [0.25],
            },
        });
        let (addr, requests) =
            spawn_backend(vec![token_reply(), Reply::json(200, result_body)]).await;

        let mut client = client_for(addr);
        let query = MeasurementQuery::aggregated(start, end, 60.0, InfluxAggregator::Mean);
        let result = client
            .peak_horizontal_acceleration("QS1", query)
            .await
            .unwrap();

        assert_eq!(result.sensor_uid, "QS1");
        assert_eq!(result.data.values, vec![0.25]);

        let requests = requests.lock().unwrap();
        assert!(requests[1].starts_with("POST /sensors/QS1/measurements"));
        assert!(requests[1].contains("\"measurement\":\"rt_peak_ground_motion\""));
    }

    #[tokio::test]
    async fn invalid_measurement_query_fails_before_any_request() {
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 5, 2, 0, 0, 0).unwrap();

        // Nothing listens here; validation must reject the query first.
        let mut client =
            CloudClient::with_base_urls("u", "p", "http://127.0.0.1:1", "http://127.0.0.1:1");
        let query = MeasurementQuery {
            aggregator: Some(InfluxAggregator::Mean),
            ..MeasurementQuery::new(start, end)
        };

        let err = client.jma_intensity("QS1", query).await.unwrap_err();
        assert!(matches!(err, ClientError::InvalidQuery(_)));
    }

    #[tokio::test]
    async fn data_products_paged() {
        let (addr, requests) = spawn_backend(vec![
            token_reply(),
            Reply::json(
                200,
                serde_json::json!({
                    "count": 1,
                    "ttl_seconds": 600,
                    "limit": 100,
                    "skip": 0,
                    "query_time_seconds": 0.01,
                    "data_products": [ { "kind": "event" } ],
                }),
            ),
        ])
        .await;

        let mut client = client_for(addr);
        let page = client
            .event_records("QS1", &DataProductQuery::default())
            .await
            .unwrap();

        assert_eq!(page.count, 1);
        assert_eq!(page.data_products.len(), 1);

        let requests = requests.lock().unwrap();
        assert!(requests[1].starts_with("POST /sensors/QS1/data_products/EventRecord"));
        assert!(requests[1].contains("limit=100"));
    }

    #[tokio::test]
    async fn waveform_download_saves_named_file() {
        let (addr, requests) = spawn_backend(vec![
            token_reply(),
            Reply {
                status: 200,
                headers: vec![
                    "Content-Type: application/octet-stream".to_owned(),
                    "Content-Disposition: attachment; filename=QS1-20240501.mseed".to_owned(),
                ],
                body: "MSEEDBYTES".to_owned(),
            },
        ])
        .await;

        let location = std::env::temp_dir().join(format!("qs-client-test-{}", addr.port()));
        let mut client = client_for(addr);
        let path = client
            .waveform_data(
                "QS1",
                Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2024, 5, 2, 0, 0, 0).unwrap(),
                &location,
            )
            .await
            .unwrap();

        assert_eq!(path, location.join("QS1-20240501.mseed"));
        assert_eq!(tokio::fs::read(&path).await.unwrap(), b"MSEEDBYTES");

        let requests = requests.lock().unwrap();
        assert!(requests[1].starts_with("GET /dataselect/1/queryauth_jwt_by_id?"));
        assert!(requests[1].contains("sensor_uids=QS1"));

        let _ = tokio::fs::remove_dir_all(&location).await;
    }

    #[tokio::test]
    async fn waveform_download_error_status() {
        let (addr, _) = spawn_backend(vec![
            token_reply(),
            Reply {
                status: 404,
                headers: vec![],
                body: "no data".to_owned(),
            },
        ])
        .await;

        let location = std::env::temp_dir().join(format!("qs-client-test-err-{}", addr.port()));
        let mut client = client_for(addr);
        let err = client
            .waveform_data(
                "QS1",
                Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2024, 5, 2, 0, 0, 0).unwrap(),
                &location,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::CorruptedData(_)));
    }
}
