use crate::quantity::{currency::Dollars, rate::KilowattHourRate};

quantity!(KilowattHours, suffix: "kWh", precision: 2);

implement_mul!(KilowattHours, KilowattHourRate, Dollars);
