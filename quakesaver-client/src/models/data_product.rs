use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ClientError, Result};

/// Query parameters for data product requests (event records, HV
/// spectra, noise autocorrelations).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DataProductQuery {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub start_time: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub end_time: Option<DateTime<Utc>>,
    pub skip: u32,
    /// Page size, 1 through 100.
    pub limit: u32,
}

impl Default for DataProductQuery {
    fn default() -> Self {
        Self {
            start_time: None,
            end_time: None,
            skip: 0,
            limit: 100,
        }
    }
}

impl DataProductQuery {
    pub fn validate(&self) -> Result<()> {
        if self.limit < 1 || self.limit > 100 {
            return Err(ClientError::InvalidQuery(format!(
                "limit must be within 1..=100, got {}",
                self.limit
            )));
        }
        if let (Some(start), Some(end)) = (self.start_time, self.end_time)
            && start > end
        {
            return Err(ClientError::InvalidQuery(
                "end time must be after start time".into(),
            ));
        }
        Ok(())
    }
}

/// One page of data products plus paging metadata.
///
/// Product payloads are domain-specific documents the client passes
/// through untyped.
#[derive(Clone, Debug, Deserialize)]
pub struct DataProductPage {
    pub count: i64,
    pub ttl_seconds: i64,
    pub limit: i64,
    pub skip: i64,
    pub query_time_seconds: f64,
    pub data_products: Vec<serde_json::Value>,
}
