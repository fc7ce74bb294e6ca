use std::{collections::BTreeSet, fmt};

use itertools::Itertools;
use log::{debug, info, warn};
use strum::IntoEnumIterator;

use crate::{
    config::GpsConfig,
    sensors::{DriverError, Gps},
    ubx::{self, NmeaSentence, RefreshRate, UbxFrame},
};

/// NMEA sentences to suppress. Each sentence appears at most once and the set
/// is fixed after construction.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NmeaSentenceMask {
    disabled: BTreeSet<NmeaSentence>,
}

impl NmeaSentenceMask {
    pub fn from_config(config: &GpsConfig) -> Self {
        NmeaSentenceMask {
            disabled: NmeaSentence::iter()
                .filter(|s| config.disable_flag(*s))
                .collect(),
        }
    }

    pub fn contains(&self, sentence: NmeaSentence) -> bool {
        self.disabled.contains(&sentence)
    }

    /// Disabled sentences in command order.
    pub fn iter(&self) -> impl Iterator<Item = NmeaSentence> + '_ {
        self.disabled.iter().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.disabled.is_empty()
    }
}

impl fmt::Display for NmeaSentenceMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.disabled.is_empty() {
            write!(f, "none")
        } else {
            write!(f, "{}", self.iter().join(", "))
        }
    }
}

/// Problems in the GPS options that were worked around rather than rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigWarning {
    RefreshRateMissing,
    RefreshRateUnrecognized(String),
}

impl fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigWarning::RefreshRateMissing => {
                write!(f, "No refresh rate specified in config, using 1 Hz")
            }
            ConfigWarning::RefreshRateUnrecognized(value) => write!(
                f,
                "Unrecognized refresh rate '{value}' (expected 1, 5 or 10), using 1 Hz"
            ),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GpsConfigurator {
    mask: NmeaSentenceMask,
    rate: RefreshRate,
    warnings: Vec<ConfigWarning>,
}

impl GpsConfigurator {
    pub fn new(config: &GpsConfig) -> Self {
        let mask = NmeaSentenceMask::from_config(config);
        let mut warnings = vec![];

        let rate = match config.refresh_rate.as_deref() {
            None => {
                warnings.push(ConfigWarning::RefreshRateMissing);
                RefreshRate::default()
            }
            Some(value) => value.parse::<RefreshRate>().unwrap_or_else(|_| {
                warnings.push(ConfigWarning::RefreshRateUnrecognized(value.to_string()));
                RefreshRate::default()
            }),
        };

        for warning in warnings.iter() {
            warn!("{warning}");
        }

        GpsConfigurator {
            mask,
            rate,
            warnings,
        }
    }

    pub fn mask(&self) -> &NmeaSentenceMask {
        &self.mask
    }

    pub fn rate(&self) -> RefreshRate {
        self.rate
    }

    pub fn warnings(&self) -> &[ConfigWarning] {
        &self.warnings
    }

    /// Disable commands in sentence order, then the rate command.
    pub fn commands(&self) -> Vec<UbxFrame> {
        self.mask
            .iter()
            .map(ubx::disable_sentence)
            .chain(std::iter::once(ubx::set_refresh_rate(self.rate)))
            .collect()
    }

    /// All commands concatenated, as sent on the wire.
    pub fn burst(&self) -> Vec<u8> {
        self.commands()
            .iter()
            .flat_map(|frame| frame.as_bytes().iter().copied())
            .collect()
    }

    /// Sends the whole command burst in one write.
    pub fn transmit(&self, gps: &mut dyn Gps) -> Result<(), DriverError> {
        let burst = self.burst();

        gps.write_commands(&burst)?;

        info!("Disabled NMEA messages: {}", self.mask);
        info!("Set GPS refresh rate to {}", self.rate);
        debug!("Sent {} bytes of UBX commands", burst.len());

        Ok(())
    }
}
