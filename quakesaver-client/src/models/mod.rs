//! Schemas exchanged with the QuakeSaver backend and local sensors.

pub mod data_product;
pub mod fdsn;
pub mod measurement;
pub mod sensor;

pub use data_product::{DataProductPage, DataProductQuery};
pub use fdsn::{StationDetailLevel, StationQuery};
pub use measurement::{InfluxAggregator, InfluxData, MeasurementQuery, MeasurementResult};
pub use sensor::{
    CloudSensor, Permission, PermissionLevel, SensorState, SensorWarning, SensorWarnings, Token,
    WarningLevel,
};
