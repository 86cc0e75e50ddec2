//! Turn a validated scenario into loading inputs.

use crate::schema::Scenario;
use crate::validate::{ValidationError, validate_scenario};
use crate::ScenarioResult;
use sltm_core::{LinkSegmentId, NodeId, km, pcu_per_hour};
use sltm_loading::{
    BushFlowUpdate, FlowUpdateStrategy, OriginBush, Path, PathFlowUpdate, StaticLtmSettings,
};
use sltm_network::{Network, NetworkBuilder};
use std::collections::HashMap;

/// Network, route-choice structure and settings ready for a loading.
#[derive(Debug, Clone)]
pub struct CompiledScenario {
    pub name: String,
    pub network: Network,
    pub flow_update: FlowUpdateStrategy,
    pub settings: StaticLtmSettings,
    node_ids: HashMap<String, NodeId>,
    segment_ids: HashMap<String, LinkSegmentId>,
}

impl CompiledScenario {
    pub fn node_id(&self, id: &str) -> Option<NodeId> {
        self.node_ids.get(id).copied()
    }

    pub fn segment_id(&self, id: &str) -> Option<LinkSegmentId> {
        self.segment_ids.get(id).copied()
    }
}

fn lookup<T: Copy>(map: &HashMap<String, T>, id: &str, context: &str) -> Result<T, ValidationError> {
    map.get(id)
        .copied()
        .ok_or_else(|| ValidationError::MissingReference {
            id: id.to_string(),
            context: context.to_string(),
        })
}

pub fn compile(scenario: &Scenario) -> ScenarioResult<CompiledScenario> {
    validate_scenario(scenario)?;

    let mut builder = NetworkBuilder::new();
    if let Some(c) = scenario.connector_capacity_pcu_h {
        builder = builder.with_connector_capacity(pcu_per_hour(c));
    }

    let mut node_ids = HashMap::new();
    for node in &scenario.nodes {
        let id = if node.centroid {
            builder.add_centroid(node.id.clone())
        } else {
            builder.add_node(node.id.clone())
        };
        node_ids.insert(node.id.clone(), id);
    }

    let mut segment_ids = HashMap::new();
    for segment in &scenario.link_segments {
        let context = format!("link segment '{}'", segment.id);
        let from = lookup(&node_ids, &segment.from, &context)?;
        let to = lookup(&node_ids, &segment.to, &context)?;
        let id = match segment.capacity_pcu_h {
            Some(capacity) if !segment.connector => builder.add_link_segment(
                segment.id.clone(),
                from,
                to,
                pcu_per_hour(capacity),
                km(segment.length_km),
            ),
            _ => builder.add_connector(segment.id.clone(), from, to),
        };
        segment_ids.insert(segment.id.clone(), id);
    }
    let network = builder.build()?;

    let flow_update = if scenario.bushes.is_empty() {
        let mut paths = Vec::with_capacity(scenario.paths.len());
        for path in &scenario.paths {
            let context = format!("path '{}'", path.id);
            let segments = path
                .segments
                .iter()
                .map(|s| lookup(&segment_ids, s, &context))
                .collect::<Result<Vec<_>, _>>()?;
            paths.push(Path::new(path.id.clone(), segments, path.flow_pcu_h));
        }
        FlowUpdateStrategy::from(PathFlowUpdate::new(paths))
    } else {
        let mut bushes = Vec::with_capacity(scenario.bushes.len());
        for bush in &scenario.bushes {
            let context = format!("bush '{}'", bush.origin);
            let origin = lookup(&node_ids, &bush.origin, &context)?;
            let root = bush
                .root
                .iter()
                .map(|r| Ok((lookup(&segment_ids, &r.segment, &context)?, r.rate)))
                .collect::<Result<Vec<_>, ValidationError>>()?;
            let turns = bush
                .turns
                .iter()
                .map(|t| {
                    Ok((
                        lookup(&segment_ids, &t.from, &context)?,
                        lookup(&segment_ids, &t.to, &context)?,
                        t.rate,
                    ))
                })
                .collect::<Result<Vec<_>, ValidationError>>()?;
            bushes.push(OriginBush::new(
                &network,
                origin,
                bush.demand_pcu_h,
                root,
                turns,
            )?);
        }
        FlowUpdateStrategy::from(BushFlowUpdate::new(bushes))
    };

    Ok(CompiledScenario {
        name: scenario.name.clone(),
        network,
        flow_update,
        settings: scenario.settings.clone(),
        node_ids,
        segment_ids,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{BushDef, LinkSegmentDef, NodeDef, RootSplitDef, TurnSplitDef};
    use sltm_loading::FlowUpdate;

    fn node(id: &str, centroid: bool) -> NodeDef {
        NodeDef {
            id: id.to_string(),
            centroid,
        }
    }

    fn segment(id: &str, from: &str, to: &str, capacity: Option<f64>) -> LinkSegmentDef {
        LinkSegmentDef {
            id: id.to_string(),
            from: from.to_string(),
            to: to.to_string(),
            capacity_pcu_h: capacity,
            length_km: 1.0,
            connector: capacity.is_none(),
        }
    }

    fn bush_scenario(rate: f64) -> Scenario {
        Scenario {
            version: 1,
            name: "bush".to_string(),
            connector_capacity_pcu_h: Some(50_000.0),
            nodes: vec![node("O", true), node("A", false), node("B", false), node("D", true)],
            link_segments: vec![
                segment("O-A", "O", "A", None),
                segment("A-B", "A", "B", Some(1200.0)),
                segment("B-D", "B", "D", None),
            ],
            paths: vec![],
            bushes: vec![BushDef {
                origin: "O".to_string(),
                demand_pcu_h: 900.0,
                root: vec![RootSplitDef {
                    segment: "O-A".to_string(),
                    rate: 1.0,
                }],
                turns: vec![
                    TurnSplitDef {
                        from: "O-A".to_string(),
                        to: "A-B".to_string(),
                        rate,
                    },
                    TurnSplitDef {
                        from: "A-B".to_string(),
                        to: "B-D".to_string(),
                        rate: 1.0,
                    },
                ],
            }],
            settings: StaticLtmSettings::default(),
        }
    }

    #[test]
    fn compiles_bushes_and_connectors() {
        let compiled = compile(&bush_scenario(1.0)).unwrap();
        assert_eq!(compiled.network.link_segment_count(), 3);
        assert!(matches!(compiled.flow_update, FlowUpdateStrategy::Bushes(_)));
        compiled.flow_update.validate(&compiled.network).unwrap();

        let oa = compiled.segment_id("O-A").unwrap();
        assert!((compiled.network.capacity_pcu_h(oa) - 50_000.0).abs() < 1e-6);
        assert!(compiled.network.link_segment(oa).unwrap().connector);
        assert!(compiled.network.node(compiled.node_id("O").unwrap()).unwrap().centroid);
    }

    #[test]
    fn inconsistent_bush_rates_fail_compilation() {
        let err = compile(&bush_scenario(0.5)).unwrap_err();
        assert!(matches!(err, crate::ScenarioError::Loading(_)));
    }
}
