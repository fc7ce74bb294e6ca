use std::{cell::RefCell, f64::consts::PI, rc::Rc};

use nalgebra::Vector3;
use uom::si::{
    f64::{Length, Pressure, ThermodynamicTemperature},
    length::meter,
    pressure::pascal,
    thermodynamic_temperature::kelvin,
};

use super::{Barometer, DriverError, Gps, Imu};
use crate::config::{BarometerConfig, ImuConfig};

pub const STANDARD_GRAVITY: f64 = 9.80665;

/// International Standard Atmosphere, troposphere only.
#[derive(Debug, Clone)]
pub struct AtmosphereIsa {
    pressure_0: f64,
    temperature_0: f64,
    g_0: f64,
    specific_gas_constant: f64,
    a: f64,
}

impl Default for AtmosphereIsa {
    fn default() -> Self {
        AtmosphereIsa {
            pressure_0: 101325.0,
            temperature_0: 288.15,
            g_0: STANDARD_GRAVITY,
            specific_gas_constant: 287.052874,
            a: -0.0065,
        }
    }
}

impl AtmosphereIsa {
    pub fn pressure_pa(&self, alt_m: f64) -> f64 {
        let exponent = -self.g_0 / (self.a * self.specific_gas_constant);
        let t = self.temperature_k(alt_m);
        (t / self.temperature_0).powf(exponent) * self.pressure_0
    }

    pub fn temperature_k(&self, alt_m: f64) -> f64 {
        self.temperature_0 + self.a * alt_m
    }
}

/// Altitude from static pressure, international barometric formula.
pub fn barometric_altitude(pressure: Pressure, sea_level_pressure: Pressure) -> Length {
    let ratio = pressure.get::<pascal>() / sea_level_pressure.get::<pascal>();
    Length::new::<meter>(44330.0 * (1.0 - ratio.powf(0.1903)))
}

/// Stationary IMU: Z axis up, so it measures +1 g on Z, no rotation and a
/// constant local magnetic field (µT). Readings saturate at the configured
/// full scale like the real part does.
#[derive(Debug, Clone)]
pub struct IdealImu {
    specific_force_m_s2: Vector3<f64>,
    angular_rate_deg_s: Vector3<f64>,
    magnetic_field_ut: Vector3<f64>,
    accel_limit_m_s2: f64,
    gyro_limit_deg_s: f64,
}

impl IdealImu {
    pub fn new(config: &ImuConfig) -> Result<Self, DriverError> {
        if config.address_master == config.address_slave {
            return Err(DriverError::InvalidParameter(format!(
                "master and slave share address 0x{:02X}",
                config.address_master.value()
            )));
        }

        Ok(IdealImu {
            specific_force_m_s2: Vector3::new(0.0, 0.0, STANDARD_GRAVITY),
            angular_rate_deg_s: Vector3::zeros(),
            magnetic_field_ut: Vector3::new(22.0, 1.5, -42.0),
            accel_limit_m_s2: config.afs.full_scale_g() * STANDARD_GRAVITY,
            gyro_limit_deg_s: config.gfs.full_scale_dps(),
        })
    }

    pub fn with_motion(mut self, specific_force_m_s2: Vector3<f64>, rate_deg_s: Vector3<f64>) -> Self {
        self.specific_force_m_s2 = specific_force_m_s2;
        self.angular_rate_deg_s = rate_deg_s;
        self
    }
}

impl Imu for IdealImu {
    fn acceleration(&mut self) -> Result<Vector3<f64>, DriverError> {
        let limit = self.accel_limit_m_s2;
        Ok(self.specific_force_m_s2.map(|v| v.clamp(-limit, limit)))
    }

    fn angular_rate(&mut self) -> Result<Vector3<f64>, DriverError> {
        let limit = self.gyro_limit_deg_s;
        Ok(self.angular_rate_deg_s.map(|v| v.clamp(-limit, limit) * PI / 180.0))
    }

    fn magnetic_field(&mut self) -> Result<Vector3<f64>, DriverError> {
        Ok(self.magnetic_field_ut)
    }
}

/// Barometer at a fixed field altitude in the standard atmosphere.
#[derive(Debug, Clone)]
pub struct IdealBarometer {
    atmosphere: AtmosphereIsa,
    field_altitude_m: f64,
    sea_level_pressure: Pressure,
}

impl IdealBarometer {
    pub fn new(config: &BarometerConfig, field_altitude_m: f64) -> Self {
        IdealBarometer {
            atmosphere: AtmosphereIsa::default(),
            field_altitude_m,
            sea_level_pressure: config.sea_level_pressure,
        }
    }
}

impl Barometer for IdealBarometer {
    fn temperature(&mut self) -> Result<ThermodynamicTemperature, DriverError> {
        Ok(ThermodynamicTemperature::new::<kelvin>(
            self.atmosphere.temperature_k(self.field_altitude_m),
        ))
    }

    fn pressure(&mut self) -> Result<Pressure, DriverError> {
        Ok(Pressure::new::<pascal>(
            self.atmosphere.pressure_pa(self.field_altitude_m),
        ))
    }

    fn altitude(&mut self) -> Result<Length, DriverError> {
        let pressure = self.pressure()?;
        Ok(barometric_altitude(pressure, self.sea_level_pressure))
    }
}

/// Bytes written to an [`IdealGps`], one entry per write call.
#[derive(Debug, Clone, Default)]
pub struct GpsWriteLog(Rc<RefCell<Vec<Vec<u8>>>>);

impl GpsWriteLog {
    pub fn writes(&self) -> Vec<Vec<u8>> {
        self.0.borrow().clone()
    }
}

/// GPS that accepts any command and replays a fixed GGA sentence.
#[derive(Debug, Default)]
pub struct IdealGps {
    log: GpsWriteLog,
}

impl IdealGps {
    pub const SENTENCE: &'static str =
        "$GPGGA,120000.00,3546.12345,N,07838.12345,W,1,08,0.9,120.0,M,-33.0,M,,*5B";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_log(&self) -> GpsWriteLog {
        self.log.clone()
    }
}

impl Gps for IdealGps {
    fn write_commands(&mut self, bytes: &[u8]) -> Result<(), DriverError> {
        self.log.0.borrow_mut().push(bytes.to_vec());
        Ok(())
    }

    fn read_sentence(&mut self) -> Result<Option<String>, DriverError> {
        Ok(Some(Self::SENTENCE.to_string()))
    }
}
