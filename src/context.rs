use crate::{
    config::{ConfigError, Configuration},
    core::time::Clock,
};

pub const DAQ_SECTION: &str = "DAQ";
pub const DEFAULT_SAMPLE_RATE_HZ: f64 = 100.0;

/// Everything the acquisition needs from start-up: the loaded configuration
/// and the clock that paces sampling. Built once and passed by reference.
#[derive(Debug, Clone)]
pub struct DaqContext<C> {
    config: Configuration,
    clock: C,
}

impl<C: Clock> DaqContext<C> {
    pub fn new(config: Configuration, clock: C) -> Self {
        DaqContext { config, clock }
    }

    pub fn config(&self) -> &Configuration {
        &self.config
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// `DAQ.SAMPLE_RATE_HZ`, or 100 Hz when not set.
    pub fn sample_rate_hz(&self) -> Result<f64, ConfigError> {
        match self
            .config
            .section_opt(DAQ_SECTION)
            .and_then(|s| s.get_opt("SAMPLE_RATE_HZ"))
        {
            Some(option) => option.value_float(),
            None => Ok(DEFAULT_SAMPLE_RATE_HZ),
        }
    }
}
