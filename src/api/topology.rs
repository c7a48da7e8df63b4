use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Top-level topology file: optional name plus node and link arrays.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct NetworkDto {
    #[serde(default = "default_network_name")]
    pub name: String,

    #[serde(default)]
    pub nodes: Vec<NodeDto>,

    #[serde(default)]
    pub links: Vec<LinkDto>,
}

fn default_network_name() -> String {
    "Unnamed Network".to_string()
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct NodeDto {
    pub id: i64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    #[serde(rename = "DC", skip_serializing_if = "Option::is_none")]
    pub dc: Option<i64>,

    #[serde(rename = "IXP", skip_serializing_if = "Option::is_none")]
    pub ixp: Option<i64>,

    #[serde(rename = "pop", skip_serializing_if = "Option::is_none")]
    pub population: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub param1: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub param2: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct LinkDto {
    pub id: i64,
    pub src: i64,
    pub dst: i64,
    pub length: f64,

    /// Single-fiber configuration. Mutually exclusive with `fibers`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slots: Option<SlotsDto>,

    /// Heterogeneous multi-fiber configuration.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fibers: Option<Vec<FiberDto>>,

    /// Explicit fiber-class override; only honored for single-fiber links.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub fiber_type: Option<String>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct FiberDto {
    pub slots: SlotsDto,

    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub fiber_type: Option<String>,
}

/// All accepted `"slots"` shapes:
///
/// - `320` — SSMF, C band
/// - `[80, 90, 70]` — MCF (one mode per core)
/// - `[[80, 60], [90, 70]]` — FMMCF; `[[80, 60, 40]]` — FMF
/// - `{"C": 320, "L": 240}` and nested per-band forms — multi-band
#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(untagged)]
pub enum SlotsDto {
    Count(u64),
    Cores(Vec<CoreSlotsDto>),
    Bands(BTreeMap<String, BandSlotsDto>),
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(untagged)]
pub enum CoreSlotsDto {
    SingleMode(u64),
    Modes(Vec<u64>),
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(untagged)]
pub enum BandSlotsDto {
    Count(u64),
    Cores(Vec<CoreSlotsDto>),
}
