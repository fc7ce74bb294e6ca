use nalgebra::Vector3;
use thiserror::Error;
use uom::si::f64::{Length, Pressure, ThermodynamicTemperature};

use crate::config::{BarometerConfig, GpsConfig, ImuConfig};

pub mod bench;
pub mod ideal;
pub mod serial_gps;

pub use bench::{BenchBackend, GpsLink};

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("I/O error")]
    Io(#[from] std::io::Error),

    #[error("Serial port error")]
    Serial(#[from] serialport::Error),

    #[error("Device not responding: {0}")]
    NotResponding(String),

    #[error("Invalid device parameter: {0}")]
    InvalidParameter(String),
}

/// Pressure / temperature sensor (BMP280 class).
pub trait Barometer {
    fn temperature(&mut self) -> Result<ThermodynamicTemperature, DriverError>;

    fn pressure(&mut self) -> Result<Pressure, DriverError>;

    /// Barometric altitude relative to the configured sea-level pressure.
    fn altitude(&mut self) -> Result<Length, DriverError>;
}

/// 9-axis inertial unit (MPU9250 class).
pub trait Imu {
    fn acceleration(&mut self) -> Result<Vector3<f64>, DriverError>;

    fn angular_rate(&mut self) -> Result<Vector3<f64>, DriverError>;

    fn magnetic_field(&mut self) -> Result<Vector3<f64>, DriverError>;
}

/// Serial GPS receiver (NEO-6M class).
pub trait Gps {
    /// Sends raw command bytes to the receiver in a single write.
    fn write_commands(&mut self, bytes: &[u8]) -> Result<(), DriverError>;

    /// Next NMEA line from the receiver, or `None` if nothing arrived in time.
    fn read_sentence(&mut self) -> Result<Option<String>, DriverError>;
}

/// Opens and configures drivers. Each call acquires the device it returns;
/// dropping the driver releases it.
pub trait SensorBackend {
    fn barometer(&mut self, config: &BarometerConfig) -> Result<Box<dyn Barometer>, DriverError>;

    fn imu(&mut self, config: &ImuConfig) -> Result<Box<dyn Imu>, DriverError>;

    fn gps(&mut self, config: &GpsConfig) -> Result<Box<dyn Gps>, DriverError>;
}
