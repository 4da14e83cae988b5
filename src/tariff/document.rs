use std::collections::BTreeMap;

use serde::Deserialize;

use crate::quantity::rate::{KilowattHourRate, KilowattRate};

/// Rate structure as stored on disk.
///
/// Converted into [`super::RateStructure`], which performs the validation.
#[derive(Deserialize)]
pub struct RateDocument {
    #[serde(rename = "energy rate structure")]
    pub(super) energy: EnergyDocument,

    #[serde(rename = "demand rate structure")]
    pub(super) demand: DemandDocument,

    #[serde(rename = "net metering")]
    pub(super) net_metering: NetMeteringDocument,
}

#[derive(Deserialize)]
pub struct EnergyDocument {
    /// 12 months × 24 hours of period ids.
    #[serde(rename = "weekday schedule")]
    pub weekday: Vec<Vec<usize>>,

    #[serde(rename = "weekend schedule")]
    pub weekend: Vec<Vec<usize>>,

    #[serde(rename = "energy rates")]
    pub rates: BTreeMap<usize, KilowattHourRate>,
}

#[derive(Deserialize)]
pub struct DemandDocument {
    #[serde(rename = "weekday schedule")]
    pub weekday: Vec<Vec<usize>>,

    #[serde(rename = "weekend schedule")]
    pub weekend: Vec<Vec<usize>>,

    #[serde(rename = "time of use rates")]
    pub time_of_use_rates: BTreeMap<usize, KilowattRate>,

    /// Keyed by month abbreviation.
    #[serde(rename = "flat rates")]
    pub flat_rates: BTreeMap<String, KilowattRate>,
}

#[derive(Deserialize)]
pub struct NetMeteringDocument {
    /// `true` nets exports against the buy rate, `false` credits them at the sell price.
    #[serde(rename = "type")]
    pub is_netted: bool,

    #[serde(rename = "energy sell price", default)]
    pub sell_price: Option<KilowattHourRate>,
}
