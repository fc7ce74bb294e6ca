use strum::Display;
use thiserror::Error;

use crate::{config::ConfigError, sensors::DriverError, ubx::UbxError};

/// Physical sensor a failure is attributed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum SensorKind {
    #[strum(serialize = "BMP280")]
    Barometer,
    #[strum(serialize = "MPU9250")]
    Imu,
    #[strum(serialize = "NEO6M")]
    Gps,
}

/// Quantity requested from the sensor hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Quantity {
    Acceleration,
    AngularRate,
    MagneticField,
    Temperature,
    Pressure,
    Altitude,
    NmeaSentence,
}

impl Quantity {
    pub fn sensor(&self) -> SensorKind {
        match self {
            Quantity::Acceleration | Quantity::AngularRate | Quantity::MagneticField => {
                SensorKind::Imu
            }
            Quantity::Temperature | Quantity::Pressure | Quantity::Altitude => {
                SensorKind::Barometer
            }
            Quantity::NmeaSentence => SensorKind::Gps,
        }
    }
}

#[derive(Debug, Error)]
pub enum DaqError {
    #[error("Configuration error")]
    Configuration(#[from] ConfigError),

    #[error("Failed to initialize {sensor}")]
    DriverInit {
        sensor: SensorKind,
        #[source]
        source: DriverError,
    },

    #[error("Failed to read {quantity} from {sensor}")]
    Read {
        sensor: SensorKind,
        quantity: Quantity,
        #[source]
        source: DriverError,
    },

    #[error("Cannot encode GPS command")]
    Protocol(#[from] UbxError),

    #[error("GPS accessor called, but no GPS was initialized")]
    GpsUnavailable,

    #[error("Sample rate must be a positive number of Hz, got {0}")]
    InvalidSampleRate(f64),
}

impl DaqError {
    pub(crate) fn read(quantity: Quantity, source: DriverError) -> Self {
        DaqError::Read {
            sensor: quantity.sensor(),
            quantity,
            source,
        }
    }

    pub(crate) fn init(sensor: SensorKind, source: DriverError) -> Self {
        DaqError::DriverInit { sensor, source }
    }
}
