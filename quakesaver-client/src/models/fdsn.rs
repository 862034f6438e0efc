use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Detail level of a StationXML request.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StationDetailLevel {
    Network,
    #[default]
    Station,
    Channel,
    Response,
}

/// Query parameters for StationXML metadata downloads.
///
/// Field names follow the FDSN station service convention; the bounding
/// box defaults to the whole earth.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StationQuery {
    #[serde(rename = "starttime")]
    pub start_time: DateTime<Utc>,
    #[serde(rename = "endtime")]
    pub end_time: DateTime<Utc>,
    #[serde(rename = "minlatitude")]
    pub min_latitude: f64,
    #[serde(rename = "maxlatitude")]
    pub max_latitude: f64,
    #[serde(rename = "minlongitude")]
    pub min_longitude: f64,
    #[serde(rename = "maxlongitude")]
    pub max_longitude: f64,
    pub level: StationDetailLevel,
}

impl StationQuery {
    pub fn new(start_time: DateTime<Utc>, end_time: DateTime<Utc>) -> Self {
        Self {
            start_time,
            end_time,
            min_latitude: -90.0,
            max_latitude: 90.0,
            min_longitude: -180.0,
            max_longitude: 180.0,
            level: StationDetailLevel::default(),
        }
    }
}
