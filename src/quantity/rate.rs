use crate::quantity::{currency::Dollars, power::Kilowatts};

quantity!(
    /// Energy price, also used for hourly regulation capacity prices.
    KilowattHourRate, suffix: "$/kWh", precision: 4
);

quantity!(
    /// Demand charge rate applied to the billed peak.
    KilowattRate, suffix: "$/kW", precision: 2
);

implement_mul!(KilowattRate, Kilowatts, Dollars);

impl KilowattHourRate {
    /// Convert a market price quoted per megawatt-hour.
    pub fn from_megawatt_hour_price(price: f64) -> Self {
        Self(price / 1000.0)
    }
}
