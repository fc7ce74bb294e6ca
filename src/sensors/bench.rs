use log::debug;

use super::{
    Barometer, DriverError, Gps, Imu, SensorBackend,
    ideal::{GpsWriteLog, IdealBarometer, IdealGps, IdealImu},
    serial_gps::SerialGps,
};
use crate::config::{BarometerConfig, GpsConfig, ImuConfig};

/// Where the bench backend finds its GPS.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GpsLink {
    Serial,
    Ideal,
}

/// Backend for bench runs: ideal IMU and barometer, GPS either on the
/// configured serial port or ideal.
#[derive(Debug)]
pub struct BenchBackend {
    gps_link: GpsLink,
    field_altitude_m: f64,
    gps_log: GpsWriteLog,
}

impl BenchBackend {
    pub fn new(gps_link: GpsLink, field_altitude_m: f64) -> Self {
        BenchBackend {
            gps_link,
            field_altitude_m,
            gps_log: GpsWriteLog::default(),
        }
    }

    /// Commands written to the ideal GPS, if one was opened.
    pub fn gps_log(&self) -> &GpsWriteLog {
        &self.gps_log
    }
}

impl SensorBackend for BenchBackend {
    fn barometer(&mut self, config: &BarometerConfig) -> Result<Box<dyn Barometer>, DriverError> {
        debug!(
            "Opening ideal barometer at {:.1} m field altitude",
            self.field_altitude_m
        );
        Ok(Box::new(IdealBarometer::new(config, self.field_altitude_m)))
    }

    fn imu(&mut self, config: &ImuConfig) -> Result<Box<dyn Imu>, DriverError> {
        debug!("Opening ideal IMU on bus {}", config.bus);
        Ok(Box::new(IdealImu::new(config)?))
    }

    fn gps(&mut self, config: &GpsConfig) -> Result<Box<dyn Gps>, DriverError> {
        match self.gps_link {
            GpsLink::Serial => Ok(Box::new(SerialGps::open(config)?)),
            GpsLink::Ideal => {
                let gps = IdealGps::new();
                self.gps_log = gps.write_log();
                Ok(Box::new(gps))
            }
        }
    }
}
