use log::info;
use nalgebra::Vector3;
use uom::si::{
    f64::{Length, Pressure, ThermodynamicTemperature},
    pressure::pascal,
};

use crate::{
    config::{BarometerConfig, GpsConfig, ImuConfig},
    context::DaqContext,
    core::time::Clock,
    error::{DaqError, Quantity, SensorKind},
    gps::GpsConfigurator,
    sensors::{Barometer, Gps, Imu, SensorBackend},
};

/// Owns one driver per sensor. GPS is optional.
pub struct SensorHub {
    barometer: Box<dyn Barometer>,
    imu: Box<dyn Imu>,
    gps: Option<Box<dyn Gps>>,
}

impl SensorHub {
    /// Resolves every sensor's configuration, then opens the drivers in the
    /// order barometer, IMU, GPS. The GPS receiver is configured right after
    /// it is opened. The first failure aborts initialization.
    pub fn initialize<C: Clock>(
        ctx: &DaqContext<C>,
        backend: &mut dyn SensorBackend,
    ) -> Result<Self, DaqError> {
        let config = ctx.config();
        let baro_config = BarometerConfig::from_configuration(config)?;
        let imu_config = ImuConfig::from_configuration(config)?;
        let gps_config = GpsConfig::from_configuration(config)?;

        info!("Initializing {}", SensorKind::Barometer);
        let barometer = backend
            .barometer(&baro_config)
            .map_err(|e| DaqError::init(SensorKind::Barometer, e))?;
        info!(
            "Set sea level pressure as {} Pa",
            baro_config.sea_level_pressure.get::<pascal>()
        );

        info!("Initializing {}", SensorKind::Imu);
        let imu = backend
            .imu(&imu_config)
            .map_err(|e| DaqError::init(SensorKind::Imu, e))?;
        info!(
            "AFS Mode: {} GFS Mode: {} MFS Mode: {}",
            imu_config.afs, imu_config.gfs, imu_config.mfs
        );

        let gps = match gps_config {
            Some(gps_config) => {
                info!("Initializing {}", SensorKind::Gps);
                let configurator = GpsConfigurator::new(&gps_config);

                let mut gps = backend
                    .gps(&gps_config)
                    .map_err(|e| DaqError::init(SensorKind::Gps, e))?;
                configurator
                    .transmit(gps.as_mut())
                    .map_err(|e| DaqError::init(SensorKind::Gps, e))?;

                Some(gps)
            }
            None => {
                info!("{} not configured or disabled, skipping", SensorKind::Gps);
                None
            }
        };

        Ok(SensorHub {
            barometer,
            imu,
            gps,
        })
    }

    /// Hub over drivers that were opened and configured elsewhere.
    pub fn from_drivers(
        barometer: Box<dyn Barometer>,
        imu: Box<dyn Imu>,
        gps: Option<Box<dyn Gps>>,
    ) -> Self {
        SensorHub {
            barometer,
            imu,
            gps,
        }
    }

    pub fn has_gps(&self) -> bool {
        self.gps.is_some()
    }

    pub fn acceleration(&mut self) -> Result<Vector3<f64>, DaqError> {
        self.imu
            .acceleration()
            .map_err(|e| DaqError::read(Quantity::Acceleration, e))
    }

    pub fn angular_rate(&mut self) -> Result<Vector3<f64>, DaqError> {
        self.imu
            .angular_rate()
            .map_err(|e| DaqError::read(Quantity::AngularRate, e))
    }

    pub fn magnetic_field(&mut self) -> Result<Vector3<f64>, DaqError> {
        self.imu
            .magnetic_field()
            .map_err(|e| DaqError::read(Quantity::MagneticField, e))
    }

    pub fn temperature(&mut self) -> Result<ThermodynamicTemperature, DaqError> {
        self.barometer
            .temperature()
            .map_err(|e| DaqError::read(Quantity::Temperature, e))
    }

    pub fn pressure(&mut self) -> Result<Pressure, DaqError> {
        self.barometer
            .pressure()
            .map_err(|e| DaqError::read(Quantity::Pressure, e))
    }

    pub fn altitude(&mut self) -> Result<Length, DaqError> {
        self.barometer
            .altitude()
            .map_err(|e| DaqError::read(Quantity::Altitude, e))
    }

    /// Next raw NMEA sentence. Fails with [`DaqError::GpsUnavailable`] when
    /// the hub was initialized without a GPS.
    pub fn gps_sentence(&mut self) -> Result<Option<String>, DaqError> {
        let gps = self.gps.as_mut().ok_or(DaqError::GpsUnavailable)?;

        gps.read_sentence()
            .map_err(|e| DaqError::read(Quantity::NmeaSentence, e))
    }
}
