// sltm-core/src/units.rs

use uom::si::f64::{Frequency as UomFrequency, Length as UomLength};

// Flow rates are counts per unit time, which uom models as a frequency.
pub type FlowRate = UomFrequency;
pub type Length = UomLength;

const SECONDS_PER_HOUR: f64 = 3600.0;

/// Flow rate from passenger car units per hour.
#[inline]
pub fn pcu_per_hour(v: f64) -> FlowRate {
    use uom::si::frequency::hertz;
    FlowRate::new::<hertz>(v / SECONDS_PER_HOUR)
}

/// Flow rate expressed in passenger car units per hour.
#[inline]
pub fn as_pcu_per_hour(f: FlowRate) -> f64 {
    use uom::si::frequency::hertz;
    f.get::<hertz>() * SECONDS_PER_HOUR
}

#[inline]
pub fn km(v: f64) -> Length {
    use uom::si::length::kilometer;
    Length::new::<kilometer>(v)
}

#[inline]
pub fn as_km(l: Length) -> f64 {
    use uom::si::length::kilometer;
    l.get::<kilometer>()
}

pub mod constants {
    /// Capacity handed to virtual connector segments (pcu/h).
    pub const CONNECTOR_CAPACITY_PCU_H: f64 = 1.0e7;
}
