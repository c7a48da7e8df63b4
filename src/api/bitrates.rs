use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Bitrate file: an object keyed by bitrate-as-string (Gbps), each value an
/// array of single-entry `{ modulation_name: parameters }` objects.
pub type BitratesFileDto = BTreeMap<String, Vec<BTreeMap<String, ModulationSpecDto>>>;

/// Modulation parameters: either the C-band shorthand or a single-element
/// array carrying per-band entries.
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(untagged)]
pub enum ModulationSpecDto {
    SingleBand(BandSpecDto),
    MultiBand(Vec<BTreeMap<String, BandSpecDto>>),
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct BandSpecDto {
    pub slots: i64,
    pub reach: f64,
}
