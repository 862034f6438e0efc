use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Bearer token issued by the backend's `get_token` endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    pub token_type: String,
}

/// Access level of a subject on an object, a bit set of
/// read (1), edit (2), and own (4).
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PermissionLevel(pub u8);

impl PermissionLevel {
    pub const NONE: Self = Self(0);
    pub const READ: Self = Self(1);
    pub const EDIT: Self = Self(2);
    pub const OWN: Self = Self(4);
    pub const ALL: Self = Self(7);

    pub fn can_read(self) -> bool {
        self.0 & Self::READ.0 != 0
    }

    pub fn can_edit(self) -> bool {
        self.0 & Self::EDIT.0 != 0
    }

    pub fn owns(self) -> bool {
        self.0 & Self::OWN.0 != 0
    }
}

/// Permissions of the authenticated user on a sensor.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Permission {
    pub groups: BTreeMap<String, PermissionLevel>,
    #[serde(default)]
    pub primary_group: Option<String>,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WarningLevel {
    #[default]
    Warning,
    Error,
    Critical,
}

/// One warning raised by a sensor.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct SensorWarning {
    pub created: DateTime<Utc>,
    pub message: String,
    pub title: String,
    #[serde(default)]
    pub level: WarningLevel,
}

/// Warnings for a sensor, keyed by warning id.
#[derive(Clone, Debug, Default, Deserialize, Serialize)]
pub struct SensorWarnings {
    #[serde(default)]
    pub data: BTreeMap<String, SensorWarning>,
}

/// State snapshot a sensor serves on its `/state` endpoint.
///
/// Sensors report many firmware-dependent fields beyond the identity
/// core; those are preserved in `extra` rather than dropped.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct SensorState {
    pub uid: String,
    pub software_version: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Sensor document as served by the backend.
#[derive(Clone, Debug, Deserialize)]
pub struct CloudSensor {
    pub hardware_revision: String,
    pub first_seen: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    pub permission: Permission,
    pub warnings: SensorWarnings,
    pub max_data_product_count: i64,
    #[serde(flatten)]
    pub state: SensorState,
}
