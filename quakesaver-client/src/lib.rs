//! Async client for QuakeSaver seismic sensors.
//!
//! Stream live waveform data from sensors on the local network, probe
//! for reachable sensors, and query the QuakeSaver backend for sensor
//! metadata, measurements, and waveform files.

pub mod cloud;
mod connection;
pub mod error;
pub mod local;
pub mod mock;
pub mod models;
pub mod probe;
mod session;
mod state;
mod stream;
mod supervisor;

pub use cloud::CloudClient;
pub use error::{ClientError, Result};
pub use local::LocalClient;
pub use probe::{LivenessProber, ProbeConfig, ProbeReport, SensorIdentity};
pub use session::StreamSession;
pub use state::{SessionConfig, SessionState};
pub use stream::frame_stream;
pub use supervisor::{StreamSupervisor, SupervisorConfig};
