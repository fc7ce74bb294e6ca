use std::{collections::BTreeMap, path::PathBuf, str::FromStr};

use log::debug;
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};
use uom::si::{f64::Pressure, pressure::pascal};

use super::{ConfigError, ConfigSection, Configuration};
use crate::{error::SensorKind, ubx::NmeaSentence};

pub const DEFAULT_GPS_BAUD_RATE: u32 = 9600;
pub const DEFAULT_I2C_BUS: u8 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
pub enum I2cAddress {
    #[strum(serialize = "AK8963_ADDRESS")]
    Ak8963,
    #[strum(serialize = "MPU9050_ADDRESS_68")]
    Mpu68,
    #[strum(serialize = "MPU9050_ADDRESS_69")]
    Mpu69,
}

impl I2cAddress {
    pub fn value(&self) -> u8 {
        match self {
            I2cAddress::Ak8963 => 0x0C,
            I2cAddress::Mpu68 => 0x68,
            I2cAddress::Mpu69 => 0x69,
        }
    }
}

/// Gyroscope full scale, degrees per second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
pub enum GyroScale {
    #[strum(serialize = "GFS_250")]
    Dps250,
    #[strum(serialize = "GFS_500")]
    Dps500,
    #[strum(serialize = "GFS_1000")]
    Dps1000,
    #[strum(serialize = "GFS_2000")]
    Dps2000,
}

impl GyroScale {
    pub fn value(&self) -> u8 {
        match self {
            GyroScale::Dps250 => 0x00,
            GyroScale::Dps500 => 0x01,
            GyroScale::Dps1000 => 0x02,
            GyroScale::Dps2000 => 0x03,
        }
    }

    pub fn full_scale_dps(&self) -> f64 {
        match self {
            GyroScale::Dps250 => 250.0,
            GyroScale::Dps500 => 500.0,
            GyroScale::Dps1000 => 1000.0,
            GyroScale::Dps2000 => 2000.0,
        }
    }
}

/// Accelerometer full scale, in g.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
pub enum AccelScale {
    #[strum(serialize = "AFS_2G")]
    G2,
    #[strum(serialize = "AFS_4G")]
    G4,
    #[strum(serialize = "AFS_8G")]
    G8,
    #[strum(serialize = "AFS_16G")]
    G16,
}

impl AccelScale {
    pub fn value(&self) -> u8 {
        match self {
            AccelScale::G2 => 0x00,
            AccelScale::G4 => 0x01,
            AccelScale::G8 => 0x02,
            AccelScale::G16 => 0x03,
        }
    }

    pub fn full_scale_g(&self) -> f64 {
        match self {
            AccelScale::G2 => 2.0,
            AccelScale::G4 => 4.0,
            AccelScale::G8 => 8.0,
            AccelScale::G16 => 16.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
pub enum MagResolution {
    #[strum(serialize = "AK8963_BIT_14")]
    Bits14,
    #[strum(serialize = "AK8963_BIT_16")]
    Bits16,
}

impl MagResolution {
    pub fn value(&self) -> u8 {
        match self {
            MagResolution::Bits14 => 0x00,
            MagResolution::Bits16 => 0x01,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
pub enum MagMode {
    #[strum(serialize = "AK8963_MODE_POWERDOWN")]
    PowerDown,
    #[strum(serialize = "AK8963_MODE_SN")]
    Single,
    #[strum(serialize = "AK8963_MODE_C8HZ")]
    Continuous8Hz,
    #[strum(serialize = "AK8963_MODE_C100HZ")]
    Continuous100Hz,
    #[strum(serialize = "AK8963_MODE_FUSEROM")]
    FuseRom,
}

impl MagMode {
    pub fn value(&self) -> u8 {
        match self {
            MagMode::PowerDown => 0x00,
            MagMode::Single => 0x01,
            MagMode::Continuous8Hz => 0x02,
            MagMode::Continuous100Hz => 0x06,
            MagMode::FuseRom => 0x0F,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BarometerConfig {
    pub sea_level_pressure: Pressure,
}

impl BarometerConfig {
    pub fn from_configuration(cfg: &Configuration) -> Result<Self, ConfigError> {
        Self::from_section(cfg.section(&SensorKind::Barometer.to_string())?)
    }

    pub fn from_section(section: &ConfigSection) -> Result<Self, ConfigError> {
        let option = section.get("SEALEVEL_PA")?;
        let sea_level_pa = option.value_float()?;

        if !sea_level_pa.is_finite() || sea_level_pa <= 0.0 {
            return Err(ConfigError::OutOfRange {
                path: option.path().to_string(),
                reason: format!("{sea_level_pa} is not a positive pressure"),
            });
        }

        Ok(BarometerConfig {
            sea_level_pressure: Pressure::new::<pascal>(sea_level_pa),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImuConfig {
    pub bus: u8,
    pub address_ak: I2cAddress,
    pub address_master: I2cAddress,
    pub address_slave: I2cAddress,
    pub gfs: GyroScale,
    pub afs: AccelScale,
    pub mfs: MagResolution,
    pub mode: MagMode,
}

impl ImuConfig {
    pub fn from_configuration(cfg: &Configuration) -> Result<Self, ConfigError> {
        Self::from_section(cfg.section(&SensorKind::Imu.to_string())?)
    }

    pub fn from_section(section: &ConfigSection) -> Result<Self, ConfigError> {
        let bus = match section.get_opt("BUS") {
            Some(option) => {
                let bus = option.value_int()?;
                u8::try_from(bus).map_err(|_| ConfigError::OutOfRange {
                    path: option.path().to_string(),
                    reason: format!("{bus} is not a valid I2C bus number"),
                })?
            }
            None => DEFAULT_I2C_BUS,
        };

        Ok(ImuConfig {
            bus,
            address_ak: symbol(section, "ADDRESS_AK")?,
            address_master: symbol(section, "ADDRESS_MASTER")?,
            address_slave: symbol(section, "ADDRESS_SLAVE")?,
            gfs: symbol(section, "GFS")?,
            afs: symbol(section, "AFS")?,
            mfs: symbol(section, "MFS")?,
            mode: symbol(section, "MODE")?,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GpsConfig {
    pub port: String,
    pub baud_rate: u32,
    disable_flags: BTreeMap<NmeaSentence, bool>,
    /// Raw `REFRESH_RATE` text. Resolution (and the fallback to 1 Hz) is
    /// left to the GPS configurator.
    pub refresh_rate: Option<String>,
    pub cmd_config: Option<PathBuf>,
}

impl GpsConfig {
    /// Returns `None` when the `NEO6M` section is absent or `ENABLED = false`.
    pub fn from_configuration(cfg: &Configuration) -> Result<Option<Self>, ConfigError> {
        match cfg.section_opt(&SensorKind::Gps.to_string()) {
            Some(section) => Self::from_section(section),
            None => Ok(None),
        }
    }

    pub fn from_section(section: &ConfigSection) -> Result<Option<Self>, ConfigError> {
        if let Some(enabled) = section.get_opt("ENABLED") {
            if !enabled.value_bool()? {
                return Ok(None);
            }
        }

        let port = section.get("PORT")?.value_string()?;

        let baud_rate = match section.get_opt("BAUDRATE") {
            Some(option) => {
                let baud = option.value_int()?;
                match u32::try_from(baud) {
                    Ok(baud) if baud > 0 => baud,
                    _ => {
                        return Err(ConfigError::OutOfRange {
                            path: option.path().to_string(),
                            reason: format!("{baud} is not a valid baud rate"),
                        });
                    }
                }
            }
            None => DEFAULT_GPS_BAUD_RATE,
        };

        let mut disable_flags = BTreeMap::new();
        for sentence in NmeaSentence::iter() {
            let flag = match section.get_opt(&format!("DISABLE_{sentence}")) {
                Some(option) => option.value_bool()?,
                None => false,
            };
            disable_flags.insert(sentence, flag);
        }

        let refresh_rate = section.get_opt("REFRESH_RATE").map(|o| o.value_text());

        let cmd_config = match section.get_opt("CMD_CONFIG") {
            Some(option) => {
                let path = PathBuf::from(option.value_string()?);
                debug!(
                    "Ignoring {}='{}': GPS command constants are built in",
                    option.path(),
                    path.display()
                );
                Some(path)
            }
            None => None,
        };

        Ok(Some(GpsConfig {
            port,
            baud_rate,
            disable_flags,
            refresh_rate,
            cmd_config,
        }))
    }

    pub fn new(port: &str, baud_rate: u32) -> Self {
        GpsConfig {
            port: port.to_string(),
            baud_rate,
            disable_flags: NmeaSentence::iter().map(|s| (s, false)).collect(),
            refresh_rate: None,
            cmd_config: None,
        }
    }

    pub fn with_disabled(mut self, sentence: NmeaSentence) -> Self {
        self.disable_flags.insert(sentence, true);
        self
    }

    pub fn with_refresh_rate(mut self, rate: &str) -> Self {
        self.refresh_rate = Some(rate.to_string());
        self
    }

    pub fn disable_flag(&self, sentence: NmeaSentence) -> bool {
        self.disable_flags.get(&sentence).copied().unwrap_or(false)
    }
}

fn symbol<T: FromStr>(section: &ConfigSection, key: &str) -> Result<T, ConfigError> {
    let option = section.get(key)?;
    let name = option.value_string()?;

    T::from_str(name.trim()).map_err(|_| ConfigError::UnknownSymbol {
        path: option.path().to_string(),
        value: name,
    })
}
