use nalgebra::Vector3;
use uom::si::f64::{Length, Pressure, ThermodynamicTemperature};

/// One reading of every quantity, taken in a single sampling iteration.
///
/// Values are passed through exactly as the drivers report them.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleSet {
    pub acceleration: Vector3<f64>,
    pub angular_rate: Vector3<f64>,
    pub magnetic_field: Vector3<f64>,
    pub temperature: ThermodynamicTemperature,
    pub pressure: Pressure,
    pub altitude: Length,
}
