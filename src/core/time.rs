use std::{
    cell::Cell,
    ops::{Add, AddAssign, Sub},
    rc::Rc,
    thread,
};

use chrono::TimeDelta;

pub trait Clock {
    fn monotonic(&self) -> Instant;

    /// Suspends the caller for `delta`. Non-positive durations return immediately.
    fn sleep(&self, delta: TimeDelta);
}

impl<C: Clock + ?Sized> Clock for &C {
    fn monotonic(&self) -> Instant {
        (**self).monotonic()
    }

    fn sleep(&self, delta: TimeDelta) {
        (**self).sleep(delta)
    }
}

/// Point on a monotonic timeline, measured from the clock's origin.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Ord, Eq, Hash, Default)]
pub struct Instant {
    delta: TimeDelta,
}

impl Instant {
    pub fn from_elapsed(delta: TimeDelta) -> Instant {
        Instant { delta }
    }

    pub fn elapsed(&self) -> TimeDelta {
        self.delta
    }

    pub fn elapsed_seconds(&self) -> f64 {
        TD(self.elapsed()).seconds()
    }

    pub fn duration_since(&self, other: &Instant) -> TimeDelta {
        self.delta - other.delta
    }
}

impl Add<TimeDelta> for Instant {
    type Output = Instant;

    fn add(self, rhs: TimeDelta) -> Self::Output {
        Instant {
            delta: self.delta + rhs,
        }
    }
}

impl AddAssign<TimeDelta> for Instant {
    fn add_assign(&mut self, rhs: TimeDelta) {
        self.delta += rhs;
    }
}

impl Sub<Instant> for Instant {
    type Output = TimeDelta;

    fn sub(self, rhs: Instant) -> Self::Output {
        self.delta - rhs.delta
    }
}

/// Monotonic host clock. Time is counted from the moment the clock was created.
#[derive(Debug, Clone)]
pub struct WallClock {
    origin: std::time::Instant,
}

impl WallClock {
    pub fn new() -> Self {
        WallClock {
            origin: std::time::Instant::now(),
        }
    }
}

impl Default for WallClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for WallClock {
    fn monotonic(&self) -> Instant {
        // A process would need to run for ~292 years to overflow TimeDelta.
        Instant {
            delta: TimeDelta::from_std(self.origin.elapsed()).unwrap_or(TimeDelta::MAX),
        }
    }

    fn sleep(&self, delta: TimeDelta) {
        if let Ok(duration) = delta.to_std() {
            thread::sleep(duration);
        }
    }
}

/// Clock that only moves when told to. Clones share the same timeline, so a
/// test can hand one copy to the sampling loop and step another from a mock
/// driver to model read latency.
#[derive(Debug, Clone, Default)]
pub struct SimulatedClock {
    elapsed: Rc<Cell<TimeDelta>>,
}

impl SimulatedClock {
    pub fn new(elapsed: TimeDelta) -> SimulatedClock {
        SimulatedClock {
            elapsed: Rc::new(Cell::new(elapsed)),
        }
    }

    pub fn step(&self, delta: TimeDelta) {
        self.elapsed.set(self.elapsed.get() + delta)
    }
}

impl Clock for SimulatedClock {
    fn monotonic(&self) -> Instant {
        Instant {
            delta: self.elapsed.get(),
        }
    }

    fn sleep(&self, delta: TimeDelta) {
        if delta > TimeDelta::zero() {
            self.step(delta);
        }
    }
}

pub struct TD(pub TimeDelta);

impl TD {
    pub fn seconds(&self) -> f64 {
        self.0.num_seconds() as f64 + (self.0.subsec_nanos() as f64) / 1000000000.0
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_simulated_clock_shared() {
        let clock = SimulatedClock::default();
        let other = clock.clone();

        other.step(TimeDelta::milliseconds(15));
        assert_eq!(clock.monotonic().elapsed(), TimeDelta::milliseconds(15));

        clock.sleep(TimeDelta::milliseconds(-5));
        assert_eq!(other.monotonic().elapsed(), TimeDelta::milliseconds(15));

        clock.sleep(TimeDelta::microseconds(2500));
        assert_relative_eq!(other.monotonic().elapsed_seconds(), 0.0175, epsilon = 1e-12);
    }

    #[test]
    fn test_instant_arithmetic() {
        let a = Instant::from_elapsed(TimeDelta::milliseconds(10));
        let b = a + TimeDelta::milliseconds(5);

        assert!(b > a);
        assert_eq!(b - a, TimeDelta::milliseconds(5));
        assert_eq!(a.duration_since(&b), TimeDelta::milliseconds(-5));
    }

    #[test]
    fn test_wall_clock_monotonic() {
        let clock = WallClock::new();
        let t0 = clock.monotonic();
        clock.sleep(TimeDelta::milliseconds(2));
        let t1 = clock.monotonic();

        assert!(t1 - t0 >= TimeDelta::milliseconds(2));
    }

    #[test]
    fn test_td_seconds() {
        assert_relative_eq!(TD(TimeDelta::milliseconds(1500)).seconds(), 1.5);
    }
}
