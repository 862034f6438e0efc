use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ClientError, Result};

/// Aggregator applied server-side to a measurement time series.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InfluxAggregator {
    Median,
    Mean,
    First,
    Last,
    Min,
    Max,
    Count,
    Unique,
}

/// Query parameters for a measurement request.
///
/// `aggregator` and `interval_seconds` are only valid together; the
/// pairing is checked by [`validate`](Self::validate) before a request
/// is sent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MeasurementQuery {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// Aggregation window in seconds.
    #[serde(rename = "interval", skip_serializing_if = "Option::is_none", default)]
    pub interval_seconds: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub aggregator: Option<InfluxAggregator>,
}

impl MeasurementQuery {
    pub fn new(start_time: DateTime<Utc>, end_time: DateTime<Utc>) -> Self {
        Self {
            start_time,
            end_time,
            interval_seconds: None,
            aggregator: None,
        }
    }

    pub fn aggregated(
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        interval_seconds: f64,
        aggregator: InfluxAggregator,
    ) -> Self {
        Self {
            start_time,
            end_time,
            interval_seconds: Some(interval_seconds),
            aggregator: Some(aggregator),
        }
    }

    pub fn validate(&self) -> Result<()> {
        match (self.aggregator, self.interval_seconds) {
            (Some(_), None) => Err(ClientError::InvalidQuery(
                "aggregators need an interval".into(),
            )),
            (None, Some(_)) => Err(ClientError::InvalidQuery(
                "intervals only work with aggregators".into(),
            )),
            _ => Ok(()),
        }
    }

    pub(crate) fn into_full(self, measurement: &str, field: &str) -> MeasurementQueryFull {
        MeasurementQueryFull {
            start_time: self.start_time,
            end_time: self.end_time,
            measurement: measurement.to_owned(),
            field: field.to_owned(),
            interval_seconds: self.interval_seconds,
            aggregator: self.aggregator,
        }
    }
}

/// The full query the measurements endpoint expects, naming the influx
/// measurement and field.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MeasurementQueryFull {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub measurement: String,
    pub field: String,
    #[serde(rename = "interval", skip_serializing_if = "Option::is_none", default)]
    pub interval_seconds: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub aggregator: Option<InfluxAggregator>,
}

/// Time series data points. The field naming follows the backend's
/// charting conventions.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InfluxData {
    pub times: Vec<DateTime<Utc>>,
    pub values: Vec<f64>,
}

/// Measurement endpoint response including data and query metadata.
#[derive(Clone, Debug, Deserialize)]
pub struct MeasurementResult {
    pub sensor_uid: String,
    pub query_time_seconds: f64,
    pub query: MeasurementQueryFull,
    pub data: InfluxData,
}
