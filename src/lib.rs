pub mod config;
pub mod context;
pub mod core;
pub mod datatypes;
pub mod error;
pub mod gps;
pub mod hub;
pub mod sampling;
pub mod sensors;
pub mod ubx;

pub use context::DaqContext;
pub use error::DaqError;
pub use hub::SensorHub;
pub use sampling::{SampleSink, SamplingLoop, StepResult};
