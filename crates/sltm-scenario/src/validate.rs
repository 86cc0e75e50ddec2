//! Scenario validation logic.

use crate::schema::{BushDef, LinkSegmentDef, PathDef, Scenario};
use std::collections::{HashMap, HashSet};

pub const LATEST_VERSION: u32 = 1;

#[derive(thiserror::Error, Debug)]
pub enum ValidationError {
    #[error("Duplicate ID: {id} in {context}")]
    DuplicateId { id: String, context: String },

    #[error("Missing reference: {id} in {context}")]
    MissingReference { id: String, context: String },

    #[error("Invalid value: {field} = {value} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Unsupported version: {version}")]
    UnsupportedVersion { version: u32 },
}

fn check_unique<'a>(
    ids: impl IntoIterator<Item = &'a String>,
    context: &str,
) -> Result<HashSet<&'a String>, ValidationError> {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(ValidationError::DuplicateId {
                id: id.clone(),
                context: context.to_string(),
            });
        }
    }
    Ok(seen)
}

pub fn validate_scenario(scenario: &Scenario) -> Result<(), ValidationError> {
    if scenario.version > LATEST_VERSION {
        return Err(ValidationError::UnsupportedVersion {
            version: scenario.version,
        });
    }

    if let Some(c) = scenario.connector_capacity_pcu_h
        && (!c.is_finite() || c <= 0.0)
    {
        return Err(ValidationError::InvalidValue {
            field: "connector_capacity_pcu_h".to_string(),
            value: c.to_string(),
            reason: "must be positive and finite".to_string(),
        });
    }

    let node_ids = check_unique(scenario.nodes.iter().map(|n| &n.id), "nodes")?;
    let centroids: HashSet<&String> = scenario
        .nodes
        .iter()
        .filter(|n| n.centroid)
        .map(|n| &n.id)
        .collect();

    check_unique(scenario.link_segments.iter().map(|s| &s.id), "link_segments")?;
    for segment in &scenario.link_segments {
        validate_link_segment(segment, &node_ids)?;
    }
    let segments: HashMap<&String, &LinkSegmentDef> = scenario
        .link_segments
        .iter()
        .map(|s| (&s.id, s))
        .collect();

    match (scenario.paths.is_empty(), scenario.bushes.is_empty()) {
        (true, true) => {
            return Err(ValidationError::InvalidValue {
                field: "paths/bushes".to_string(),
                value: "none".to_string(),
                reason: "a scenario needs either paths or bushes".to_string(),
            });
        }
        (false, false) => {
            return Err(ValidationError::InvalidValue {
                field: "paths/bushes".to_string(),
                value: "both".to_string(),
                reason: "paths and bushes cannot be mixed".to_string(),
            });
        }
        _ => {}
    }

    check_unique(scenario.paths.iter().map(|p| &p.id), "paths")?;
    for path in &scenario.paths {
        validate_path(path, &segments)?;
    }

    check_unique(scenario.bushes.iter().map(|b| &b.origin), "bush origins")?;
    for bush in &scenario.bushes {
        validate_bush(bush, &centroids, &segments)?;
    }

    scenario
        .settings
        .check()
        .map_err(|reason| ValidationError::InvalidValue {
            field: "settings".to_string(),
            value: "invalid".to_string(),
            reason,
        })?;

    Ok(())
}

fn validate_link_segment(
    segment: &LinkSegmentDef,
    node_ids: &HashSet<&String>,
) -> Result<(), ValidationError> {
    for endpoint in [&segment.from, &segment.to] {
        if !node_ids.contains(endpoint) {
            return Err(ValidationError::MissingReference {
                id: endpoint.clone(),
                context: format!("link segment '{}'", segment.id),
            });
        }
    }

    if !segment.connector {
        match segment.capacity_pcu_h {
            None => {
                return Err(ValidationError::InvalidValue {
                    field: format!("link segment '{}' capacity_pcu_h", segment.id),
                    value: "missing".to_string(),
                    reason: "physical link segments need a capacity".to_string(),
                });
            }
            Some(c) if !c.is_finite() || c <= 0.0 => {
                return Err(ValidationError::InvalidValue {
                    field: format!("link segment '{}' capacity_pcu_h", segment.id),
                    value: c.to_string(),
                    reason: "must be positive and finite".to_string(),
                });
            }
            Some(_) => {}
        }
    }

    if !segment.length_km.is_finite() || segment.length_km < 0.0 {
        return Err(ValidationError::InvalidValue {
            field: format!("link segment '{}' length_km", segment.id),
            value: segment.length_km.to_string(),
            reason: "must be non-negative and finite".to_string(),
        });
    }

    Ok(())
}

fn validate_path(
    path: &PathDef,
    segments: &HashMap<&String, &LinkSegmentDef>,
) -> Result<(), ValidationError> {
    if !path.flow_pcu_h.is_finite() || path.flow_pcu_h < 0.0 {
        return Err(ValidationError::InvalidValue {
            field: format!("path '{}' flow_pcu_h", path.id),
            value: path.flow_pcu_h.to_string(),
            reason: "must be non-negative and finite".to_string(),
        });
    }
    if path.segments.is_empty() {
        return Err(ValidationError::InvalidValue {
            field: format!("path '{}' segments", path.id),
            value: "[]".to_string(),
            reason: "a path needs at least one link segment".to_string(),
        });
    }

    let mut previous: Option<&LinkSegmentDef> = None;
    for id in &path.segments {
        let segment = segments
            .get(id)
            .ok_or_else(|| ValidationError::MissingReference {
                id: id.clone(),
                context: format!("path '{}'", path.id),
            })?;
        if let Some(prev) = previous
            && prev.to != segment.from
        {
            return Err(ValidationError::InvalidValue {
                field: format!("path '{}' segments", path.id),
                value: format!("{} -> {}", prev.id, segment.id),
                reason: "consecutive segments must share a node".to_string(),
            });
        }
        previous = Some(segment);
    }
    Ok(())
}

fn validate_bush(
    bush: &BushDef,
    centroids: &HashSet<&String>,
    segments: &HashMap<&String, &LinkSegmentDef>,
) -> Result<(), ValidationError> {
    if !centroids.contains(&bush.origin) {
        return Err(ValidationError::MissingReference {
            id: bush.origin.clone(),
            context: "bush origin (must be a centroid)".to_string(),
        });
    }
    if !bush.demand_pcu_h.is_finite() || bush.demand_pcu_h < 0.0 {
        return Err(ValidationError::InvalidValue {
            field: format!("bush '{}' demand_pcu_h", bush.origin),
            value: bush.demand_pcu_h.to_string(),
            reason: "must be non-negative and finite".to_string(),
        });
    }

    let referenced = bush
        .root
        .iter()
        .map(|r| &r.segment)
        .chain(bush.turns.iter().flat_map(|t| [&t.from, &t.to]));
    for id in referenced {
        if !segments.contains_key(id) {
            return Err(ValidationError::MissingReference {
                id: id.clone(),
                context: format!("bush '{}'", bush.origin),
            });
        }
    }

    let rates = bush
        .root
        .iter()
        .map(|r| r.rate)
        .chain(bush.turns.iter().map(|t| t.rate));
    for rate in rates {
        if !rate.is_finite() || !(0.0..=1.0).contains(&rate) {
            return Err(ValidationError::InvalidValue {
                field: format!("bush '{}' splitting rate", bush.origin),
                value: rate.to_string(),
                reason: "must lie in [0, 1]".to_string(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{NodeDef, PathDef};
    use sltm_loading::StaticLtmSettings;

    fn scenario() -> Scenario {
        Scenario {
            version: 1,
            name: "corridor".to_string(),
            connector_capacity_pcu_h: None,
            nodes: vec![
                NodeDef {
                    id: "O".to_string(),
                    centroid: true,
                },
                NodeDef {
                    id: "A".to_string(),
                    centroid: false,
                },
            ],
            link_segments: vec![LinkSegmentDef {
                id: "O-A".to_string(),
                from: "O".to_string(),
                to: "A".to_string(),
                capacity_pcu_h: Some(1000.0),
                length_km: 1.0,
                connector: false,
            }],
            paths: vec![PathDef {
                id: "p".to_string(),
                flow_pcu_h: 500.0,
                segments: vec!["O-A".to_string()],
            }],
            bushes: vec![],
            settings: StaticLtmSettings::default(),
        }
    }

    #[test]
    fn valid_scenario_passes() {
        validate_scenario(&scenario()).unwrap();
    }

    #[test]
    fn duplicate_node_is_rejected() {
        let mut s = scenario();
        s.nodes.push(s.nodes[1].clone());
        assert!(matches!(
            validate_scenario(&s),
            Err(ValidationError::DuplicateId { .. })
        ));
    }

    #[test]
    fn missing_capacity_is_rejected() {
        let mut s = scenario();
        s.link_segments[0].capacity_pcu_h = None;
        assert!(matches!(
            validate_scenario(&s),
            Err(ValidationError::InvalidValue { .. })
        ));
        s.link_segments[0].connector = true;
        validate_scenario(&s).unwrap();
    }

    #[test]
    fn unknown_path_segment_is_rejected() {
        let mut s = scenario();
        s.paths[0].segments.push("A-B".to_string());
        assert!(matches!(
            validate_scenario(&s),
            Err(ValidationError::MissingReference { .. })
        ));
    }

    #[test]
    fn route_choice_is_required() {
        let mut s = scenario();
        s.paths.clear();
        assert!(validate_scenario(&s).is_err());
    }

    #[test]
    fn future_version_is_rejected() {
        let mut s = scenario();
        s.version = LATEST_VERSION + 1;
        assert!(matches!(
            validate_scenario(&s),
            Err(ValidationError::UnsupportedVersion { .. })
        ));
    }
}
