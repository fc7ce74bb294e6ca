//! Fixed-rate acquisition loop.
//!
//! Every tick the loop reads one [`SampleSet`] from the hub, hands it to the
//! sink and then sleeps until `previous tick + period`. The period is fixed,
//! the deadline is not: an iteration that overruns starts the next one right
//! away and the schedule is re-anchored to that moment, so there is never a
//! burst of catch-up ticks.

use chrono::TimeDelta;
use log::{debug, info};

use crate::{
    context::DaqContext,
    core::time::{Clock, Instant},
    datatypes::SampleSet,
    error::DaqError,
    hub::SensorHub,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepResult {
    Continue,
    Stop,
}

/// Consumer of the samples produced by [`SamplingLoop::run`].
pub trait SampleSink {
    fn on_sample(&mut self, sample: &SampleSet) -> StepResult;
}

impl<F> SampleSink for F
where
    F: FnMut(&SampleSet) -> StepResult,
{
    fn on_sample(&mut self, sample: &SampleSet) -> StepResult {
        self(sample)
    }
}

pub struct SamplingLoop<C> {
    clock: C,
    period: TimeDelta,
    tick_start: Option<Instant>,
    overruns: u64,
}

impl<C: Clock> SamplingLoop<C> {
    pub fn new(rate_hz: f64, clock: C) -> Result<Self, DaqError> {
        if !rate_hz.is_finite() || rate_hz <= 0.0 {
            return Err(DaqError::InvalidSampleRate(rate_hz));
        }

        let period = TimeDelta::nanoseconds((1.0e9 / rate_hz).round() as i64);
        if period <= TimeDelta::zero() {
            return Err(DaqError::InvalidSampleRate(rate_hz));
        }

        Ok(SamplingLoop {
            clock,
            period,
            tick_start: None,
            overruns: 0,
        })
    }

    pub fn period(&self) -> TimeDelta {
        self.period
    }

    /// Start of the current tick, once the first sample was taken.
    pub fn tick_start(&self) -> Option<Instant> {
        self.tick_start
    }

    /// Number of iterations that took longer than one period.
    pub fn overrun_count(&self) -> u64 {
        self.overruns
    }

    /// Reads one sample, in order: acceleration, angular rate, magnetic field,
    /// temperature, pressure, altitude. The first call starts the first tick.
    pub fn step(&mut self, hub: &mut SensorHub) -> Result<SampleSet, DaqError> {
        if self.tick_start.is_none() {
            self.tick_start = Some(self.clock.monotonic());
        }

        Ok(SampleSet {
            acceleration: hub.acceleration()?,
            angular_rate: hub.angular_rate()?,
            magnetic_field: hub.magnetic_field()?,
            temperature: hub.temperature()?,
            pressure: hub.pressure()?,
            altitude: hub.altitude()?,
        })
    }

    /// Blocks until the next tick boundary and returns the new tick start.
    pub fn wait_next_tick(&mut self) -> Instant {
        let now = self.clock.monotonic();
        let boundary = *self.tick_start.get_or_insert(now) + self.period;

        let next = if now > boundary {
            self.overruns += 1;
            debug!(
                "Sampling overran the period by {} us",
                (now - boundary).num_microseconds().unwrap_or(i64::MAX)
            );
            now
        } else {
            let mut now = now;
            // Sleep may wake up early, keep going until the boundary is reached
            while now < boundary {
                self.clock.sleep(boundary - now);
                now = self.clock.monotonic();
            }
            boundary
        };

        self.tick_start = Some(next);
        next
    }

    /// Samples until the sink asks to stop or a read fails. Returns the number
    /// of samples delivered to the sink.
    pub fn run<S>(&mut self, hub: &mut SensorHub, sink: &mut S) -> Result<u64, DaqError>
    where
        S: SampleSink + ?Sized,
    {
        info!(
            "Sampling at {:.1} Hz (period {} us)",
            1.0e6 / self.period.num_microseconds().unwrap_or(i64::MAX) as f64,
            self.period.num_microseconds().unwrap_or(i64::MAX)
        );

        let mut delivered = 0;
        loop {
            let sample = self.step(hub)?;
            delivered += 1;

            if sink.on_sample(&sample) == StepResult::Stop {
                info!(
                    "Sampling stopped after {delivered} samples, {} overruns",
                    self.overruns
                );
                return Ok(delivered);
            }

            self.wait_next_tick();
        }
    }
}

impl<C: Clock + Clone> SamplingLoop<C> {
    /// Loop at `DAQ.SAMPLE_RATE_HZ` on the context's clock.
    pub fn from_context(ctx: &DaqContext<C>) -> Result<Self, DaqError> {
        Self::new(ctx.sample_rate_hz()?, ctx.clock().clone())
    }
}

#[cfg(test)]
mod tests {
    use std::{cell::Cell, rc::Rc};

    use approx::assert_relative_eq;
    use nalgebra::Vector3;
    use pretty_assertions::assert_eq;
    use uom::si::{
        f64::{Length, Pressure, ThermodynamicTemperature},
        length::meter,
        pressure::pascal,
        thermodynamic_temperature::kelvin,
    };

    use super::*;
    use crate::{
        config::parse_str,
        core::time::{SimulatedClock, TD, WallClock},
        error::Quantity,
        sensors::{Barometer, DriverError, Imu},
    };

    /// IMU whose reads cost time on a shared simulated clock.
    struct TimedImu {
        clock: SimulatedClock,
        calls: Rc<Cell<usize>>,
        latency: Box<dyn Fn(usize) -> TimeDelta>,
    }

    impl Imu for TimedImu {
        fn acceleration(&mut self) -> Result<Vector3<f64>, DriverError> {
            let call = self.calls.get();
            self.calls.set(call + 1);
            self.clock.step((self.latency)(call));
            Ok(Vector3::new(0.0, 0.0, 9.81))
        }

        fn angular_rate(&mut self) -> Result<Vector3<f64>, DriverError> {
            Ok(Vector3::zeros())
        }

        fn magnetic_field(&mut self) -> Result<Vector3<f64>, DriverError> {
            Ok(Vector3::zeros())
        }
    }

    /// Barometer that fails its pressure read on the given call.
    struct FlakyBarometer {
        fail_on: Option<usize>,
        calls: usize,
    }

    impl Barometer for FlakyBarometer {
        fn temperature(&mut self) -> Result<ThermodynamicTemperature, DriverError> {
            Ok(ThermodynamicTemperature::new::<kelvin>(293.15))
        }

        fn pressure(&mut self) -> Result<Pressure, DriverError> {
            let call = self.calls;
            self.calls += 1;

            if Some(call) == self.fail_on {
                Err(DriverError::NotResponding("bus timeout".to_string()))
            } else {
                Ok(Pressure::new::<pascal>(101325.0))
            }
        }

        fn altitude(&mut self) -> Result<Length, DriverError> {
            Ok(Length::new::<meter>(0.0))
        }
    }

    fn hub(
        clock: &SimulatedClock,
        latency: impl Fn(usize) -> TimeDelta + 'static,
        fail_on: Option<usize>,
    ) -> (SensorHub, Rc<Cell<usize>>) {
        let calls = Rc::new(Cell::new(0));
        let imu = TimedImu {
            clock: clock.clone(),
            calls: calls.clone(),
            latency: Box::new(latency),
        };
        let baro = FlakyBarometer { fail_on, calls: 0 };

        (
            SensorHub::from_drivers(Box::new(baro), Box::new(imu), None),
            calls,
        )
    }

    #[test]
    fn test_invalid_rates() {
        for rate in [0.0, -100.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                SamplingLoop::new(rate, SimulatedClock::default()),
                Err(DaqError::InvalidSampleRate(_))
            ));
        }
    }

    #[test]
    fn test_period() {
        let sl = SamplingLoop::new(100.0, SimulatedClock::default()).unwrap();
        assert_eq!(sl.period(), TimeDelta::milliseconds(10));

        let sl = SamplingLoop::new(3.0, SimulatedClock::default()).unwrap();
        assert_eq!(sl.period(), TimeDelta::nanoseconds(333_333_333));
    }

    #[test]
    fn test_from_context() {
        let cfg = parse_str("[DAQ]\nSAMPLE_RATE_HZ = 250").unwrap();
        let ctx = DaqContext::new(cfg, SimulatedClock::default());
        let sl = SamplingLoop::from_context(&ctx).unwrap();
        assert_eq!(sl.period(), TimeDelta::milliseconds(4));

        let cfg = parse_str("[DAQ]\nSAMPLE_RATE_HZ = 0").unwrap();
        let ctx = DaqContext::new(cfg, SimulatedClock::default());
        assert!(matches!(
            SamplingLoop::from_context(&ctx),
            Err(DaqError::InvalidSampleRate(_))
        ));
    }

    #[test]
    fn test_1000_iterations_span_10s() {
        let clock = SimulatedClock::default();
        let (mut hub, _) = hub(&clock, |_| TimeDelta::zero(), None);
        let mut sl = SamplingLoop::new(100.0, clock.clone()).unwrap();

        let mut starts: Vec<Instant> = vec![];
        let mut sink = |_: &SampleSet| {
            starts.push(clock.monotonic());
            if starts.len() > 1000 {
                StepResult::Stop
            } else {
                StepResult::Continue
            }
        };

        assert_eq!(sl.run(&mut hub, &mut sink).unwrap(), 1001);

        let span = TD(starts[1000] - starts[0]).seconds();
        assert_relative_eq!(span, 10.0, epsilon = 1e-6);

        let tolerance = TimeDelta::microseconds(1);
        for (prev, next) in starts.iter().zip(starts.iter().skip(1)) {
            assert!(*next - *prev >= sl.period() - tolerance);
        }
        assert_eq!(sl.overrun_count(), 0);
    }

    #[test]
    fn test_read_latency_absorbed() {
        let clock = SimulatedClock::default();
        let (mut hub, _) = hub(&clock, |_| TimeDelta::milliseconds(3), None);
        let mut sl = SamplingLoop::new(100.0, clock.clone()).unwrap();

        let mut ends: Vec<Instant> = vec![];
        let mut sink = |_: &SampleSet| {
            ends.push(clock.monotonic());
            if ends.len() == 5 {
                StepResult::Stop
            } else {
                StepResult::Continue
            }
        };
        sl.run(&mut hub, &mut sink).unwrap();

        let ms: Vec<i64> = ends.iter().map(|t| t.elapsed().num_milliseconds()).collect();
        assert_eq!(ms, vec![3, 13, 23, 33, 43]);
        assert_eq!(sl.overrun_count(), 0);
    }

    #[test]
    fn test_overrun_fires_next_tick_immediately() {
        let clock = SimulatedClock::default();
        let slow = |call: usize| {
            if call == 1 {
                TimeDelta::milliseconds(25)
            } else {
                TimeDelta::zero()
            }
        };
        let (mut hub, _) = hub(&clock, slow, None);
        let mut sl = SamplingLoop::new(100.0, clock.clone()).unwrap();

        let mut times: Vec<i64> = vec![];
        let mut sink = |_: &SampleSet| {
            times.push(clock.monotonic().elapsed().num_milliseconds());
            if times.len() == 5 {
                StepResult::Stop
            } else {
                StepResult::Continue
            }
        };
        sl.run(&mut hub, &mut sink).unwrap();

        // Second read ends at 35 ms, so the third tick starts there, with no
        // extra ticks to make up for the missed 20 and 30 ms boundaries.
        assert_eq!(times, vec![0, 35, 35, 45, 55]);
        assert_eq!(sl.overrun_count(), 1);
    }

    #[test]
    fn test_read_error_stops_loop() {
        let clock = SimulatedClock::default();
        let (mut hub, imu_calls) = hub(&clock, |_| TimeDelta::zero(), Some(4));
        let mut sl = SamplingLoop::new(100.0, clock.clone()).unwrap();

        let mut delivered = 0;
        let mut sink = |_: &SampleSet| {
            delivered += 1;
            StepResult::Continue
        };
        let res = sl.run(&mut hub, &mut sink);

        assert!(matches!(
            res,
            Err(DaqError::Read {
                quantity: Quantity::Pressure,
                ..
            })
        ));
        assert_eq!(delivered, 4);
        // Iteration 4 started (IMU was read) but nothing after it.
        assert_eq!(imu_calls.get(), 5);
        assert_eq!(clock.monotonic().elapsed(), TimeDelta::milliseconds(40));
    }

    #[test]
    fn test_step_order_and_wall_clock() {
        let clock = WallClock::new();
        let (mut hub, _) = hub(&SimulatedClock::default(), |_| TimeDelta::zero(), None);
        let mut sl = SamplingLoop::new(200.0, &clock).unwrap();

        let start = clock.monotonic();
        for _ in 0..5 {
            let sample = sl.step(&mut hub).unwrap();
            assert_eq!(sample.acceleration, Vector3::new(0.0, 0.0, 9.81));
            assert_eq!(sample.pressure, Pressure::new::<pascal>(101325.0));
            sl.wait_next_tick();
        }

        assert!(clock.monotonic() - start >= TimeDelta::milliseconds(25));
    }
}
