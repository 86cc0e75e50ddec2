//! Scenario schema definitions.

use serde::{Deserialize, Serialize};
use sltm_loading::StaticLtmSettings;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Scenario {
    pub version: u32,
    pub name: String,
    /// Capacity of virtual connectors (pcu/h); the network default when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connector_capacity_pcu_h: Option<f64>,
    #[serde(default)]
    pub nodes: Vec<NodeDef>,
    #[serde(default)]
    pub link_segments: Vec<LinkSegmentDef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub paths: Vec<PathDef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bushes: Vec<BushDef>,
    #[serde(default)]
    pub settings: StaticLtmSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NodeDef {
    pub id: String,
    #[serde(default)]
    pub centroid: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LinkSegmentDef {
    pub id: String,
    pub from: String,
    pub to: String,
    /// Required for physical segments, ignored for connectors.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capacity_pcu_h: Option<f64>,
    #[serde(default)]
    pub length_km: f64,
    #[serde(default)]
    pub connector: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PathDef {
    pub id: String,
    pub flow_pcu_h: f64,
    pub segments: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BushDef {
    pub origin: String,
    pub demand_pcu_h: f64,
    /// Shares of the demand leaving the origin per segment.
    pub root: Vec<RootSplitDef>,
    #[serde(default)]
    pub turns: Vec<TurnSplitDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RootSplitDef {
    pub segment: String,
    pub rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TurnSplitDef {
    pub from: String,
    pub to: String,
    pub rate: f64,
}
