use crate::quantity::{energy::KilowattHours, time::Hours};

quantity!(Kilowatts, suffix: "kW", precision: 2);

implement_mul!(Kilowatts, Hours, KilowattHours);

impl From<KilowattHours> for Kilowatts {
    /// Average power of the energy delivered over a single hour.
    fn from(energy: KilowattHours) -> Self {
        Self(energy.0 / Hours::ONE.0)
    }
}
