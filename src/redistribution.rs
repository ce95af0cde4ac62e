//! Lateral snow redistribution between hydro-units.
//!
//! Applied once per step, as a cross-unit barrier run after every unit has
//! completed its solver step and before outlet aggregation and logging: a
//! fixed fraction of a donor unit's snow water equivalent is moved to a
//! receiver unit every step, independently of the per-unit ODE integration.
//! Depths are converted through each unit's area so that the transferred
//! mass (not depth) is conserved when donor and receiver unit areas differ.

use crate::spec::{RedistributionSpec, SnowRedistributionConnection};
use crate::unit::UnitVec;
use crate::HydroError;

/// One connection resolved to direct unit/brick indices.
#[derive(Debug, Clone)]
pub struct ResolvedConnection {
    pub donor_unit: crate::unit::UnitIndex,
    pub receiver_unit: crate::unit::UnitIndex,
    pub fraction: f64,
}

/// The snow-slide transport eligibility rule: a donor transports nothing
/// at all, regardless of its connections' fractions, below a slope or a
/// SWE holding threshold.
#[derive(Debug, Clone, Copy)]
pub struct SnowSlideRule {
    pub slope_holding_threshold_deg: f64,
    pub swe_holding_threshold_mm: f64,
}

impl SnowSlideRule {
    pub fn from_spec(spec: &RedistributionSpec) -> Self {
        Self {
            slope_holding_threshold_deg: spec.slope_holding_threshold_deg,
            swe_holding_threshold_mm: spec.swe_holding_threshold_mm,
        }
    }

    fn is_eligible(&self, donor_slope_deg: Option<f64>, donor_snow_content: f64) -> bool {
        if donor_snow_content < self.swe_holding_threshold_mm {
            return false;
        }
        match donor_slope_deg {
            Some(slope) => slope >= self.slope_holding_threshold_deg,
            None => true,
        }
    }
}

pub fn resolve_connections(units: &UnitVec, connections: &[SnowRedistributionConnection]) -> Result<Vec<ResolvedConnection>, HydroError> {
    connections
        .iter()
        .map(|c| {
            let donor_unit = units
                .index_by_id(&c.donor_unit)
                .ok_or_else(|| HydroError::UnknownTarget(c.donor_unit.clone(), "basin".to_string()))?;
            let receiver_unit = units
                .index_by_id(&c.receiver_unit)
                .ok_or_else(|| HydroError::UnknownTarget(c.receiver_unit.clone(), "basin".to_string()))?;
            Ok(ResolvedConnection {
                donor_unit,
                receiver_unit,
                fraction: c.fraction,
            })
        })
        .collect()
}

/// Applies every connection's transfer to every snowpack brick shared by
/// name between the donor and receiver unit's own brick instances.
///
/// Both units are expected to carry the same set of brick template names
/// (the builder instantiates every brick for every unit), so brick `i` in
/// the donor lines up positionally with brick `i` in the receiver whenever
/// both have a snow compartment.
pub fn apply(
    connections: &[ResolvedConnection],
    rule: &SnowSlideRule,
    units: &UnitVec,
    bricks: &mut crate::brick::BrickVec,
) -> Result<(), HydroError> {
    for connection in connections {
        let donor = units.get(connection.donor_unit)?;
        let receiver = units.get(connection.receiver_unit)?;
        let donor_slope_deg = donor.slope_deg;
        let donor_bricks = donor.bricks.clone();
        let receiver_bricks = receiver.bricks.clone();
        let donor_area = donor.area_m2;
        let receiver_area = receiver.area_m2;

        for (donor_brick_index, receiver_brick_index) in donor_bricks.iter().zip(receiver_bricks.iter()) {
            let donor_snow_content = match &bricks.get(*donor_brick_index)?.snow {
                Some(c) => c.content,
                None => continue,
            };
            if bricks.get(*receiver_brick_index)?.snow.is_none() {
                continue;
            }
            if !rule.is_eligible(donor_slope_deg, donor_snow_content) {
                continue;
            }

            let transferred_depth_at_donor = donor_snow_content * connection.fraction;
            let transferred_mass = transferred_depth_at_donor * donor_area;
            let transferred_depth_at_receiver = transferred_mass / receiver_area;

            if let Some(c) = &mut bricks.get_mut(*donor_brick_index)?.snow {
                c.content = (c.content - transferred_depth_at_donor).max(0.0);
            }
            if let Some(c) = &mut bricks.get_mut(*receiver_brick_index)?.snow {
                c.content += transferred_depth_at_receiver;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::brick::{Brick, BrickKind, Capabilities, BrickVec, WaterContainer};
    use crate::unit::UnitVec;

    fn snow_brick(content: f64) -> Brick {
        Brick {
            index: Default::default(),
            name: "snowpack".to_string(),
            kind: BrickKind::LandCover(crate::brick::LandCoverKind::Snowpack),
            capabilities: Capabilities {
                has_container: true,
                needs_solver: true,
                is_snowpack: true,
                is_glacier: false,
            },
            container: Some(WaterContainer::new(None)),
            ice: None,
            snow: Some(WaterContainer::new(None).with_initial_content(content)),
            liquid_water: 0.0,
            fraction: Some(1.0),
            processes: Vec::new(),
            incoming_fluxes: Vec::new(),
            unlimited_supply: false,
            no_melt_when_snow_cover: false,
            gating_snowpack: None,
        }
    }

    fn no_gating() -> SnowSlideRule {
        SnowSlideRule {
            slope_holding_threshold_deg: 0.0,
            swe_holding_threshold_mm: 0.0,
        }
    }

    #[test]
    fn transfers_mass_conserving_fraction_between_equal_area_units() {
        let mut units = UnitVec::default();
        let donor = units.push("donor", 1.0);
        let receiver = units.push("receiver", 1.0);

        let mut bricks = BrickVec::default();
        let donor_brick = bricks.push(snow_brick(100.0));
        let receiver_brick = bricks.push(snow_brick(0.0));
        units.get_mut(donor).unwrap().bricks.push(donor_brick);
        units.get_mut(receiver).unwrap().bricks.push(receiver_brick);

        let connections = vec![ResolvedConnection {
            donor_unit: donor,
            receiver_unit: receiver,
            fraction: 0.1,
        }];
        apply(&connections, &no_gating(), &units, &mut bricks).unwrap();

        assert_eq!(bricks.get(donor_brick).unwrap().snow.as_ref().unwrap().content, 90.0);
        assert_eq!(bricks.get(receiver_brick).unwrap().snow.as_ref().unwrap().content, 10.0);
    }

    #[test]
    fn scales_by_area_ratio_when_units_differ_in_size() {
        let mut units = UnitVec::default();
        let donor = units.push("donor", 2.0);
        let receiver = units.push("receiver", 1.0);

        let mut bricks = BrickVec::default();
        let donor_brick = bricks.push(snow_brick(100.0));
        let receiver_brick = bricks.push(snow_brick(0.0));
        units.get_mut(donor).unwrap().bricks.push(donor_brick);
        units.get_mut(receiver).unwrap().bricks.push(receiver_brick);

        let connections = vec![ResolvedConnection {
            donor_unit: donor,
            receiver_unit: receiver,
            fraction: 0.1,
        }];
        apply(&connections, &no_gating(), &units, &mut bricks).unwrap();

        // 10mm over 2 area units of donor mass spreads over 1 area unit at the receiver: 20mm there.
        assert_eq!(bricks.get(receiver_brick).unwrap().snow.as_ref().unwrap().content, 20.0);
    }

    #[test]
    fn flat_donor_below_slope_threshold_transports_nothing() {
        let mut units = UnitVec::default();
        let donor = units.push("donor", 1.0);
        let receiver = units.push("receiver", 1.0);
        units.get_mut(donor).unwrap().slope_deg = Some(5.0);

        let mut bricks = BrickVec::default();
        let donor_brick = bricks.push(snow_brick(100.0));
        let receiver_brick = bricks.push(snow_brick(0.0));
        units.get_mut(donor).unwrap().bricks.push(donor_brick);
        units.get_mut(receiver).unwrap().bricks.push(receiver_brick);

        let connections = vec![ResolvedConnection {
            donor_unit: donor,
            receiver_unit: receiver,
            fraction: 0.5,
        }];
        let rule = SnowSlideRule {
            slope_holding_threshold_deg: 10.0,
            swe_holding_threshold_mm: 0.0,
        };
        apply(&connections, &rule, &units, &mut bricks).unwrap();

        assert_eq!(bricks.get(donor_brick).unwrap().snow.as_ref().unwrap().content, 100.0);
        assert_eq!(bricks.get(receiver_brick).unwrap().snow.as_ref().unwrap().content, 0.0);
    }

    #[test]
    fn thin_snowpack_below_swe_threshold_transports_nothing() {
        let mut units = UnitVec::default();
        let donor = units.push("donor", 1.0);
        let receiver = units.push("receiver", 1.0);
        units.get_mut(donor).unwrap().slope_deg = Some(45.0);

        let mut bricks = BrickVec::default();
        let donor_brick = bricks.push(snow_brick(2.0));
        let receiver_brick = bricks.push(snow_brick(0.0));
        units.get_mut(donor).unwrap().bricks.push(donor_brick);
        units.get_mut(receiver).unwrap().bricks.push(receiver_brick);

        let connections = vec![ResolvedConnection {
            donor_unit: donor,
            receiver_unit: receiver,
            fraction: 0.5,
        }];
        let rule = SnowSlideRule {
            slope_holding_threshold_deg: 0.0,
            swe_holding_threshold_mm: 5.0,
        };
        apply(&connections, &rule, &units, &mut bricks).unwrap();

        assert_eq!(bricks.get(donor_brick).unwrap().snow.as_ref().unwrap().content, 2.0);
        assert_eq!(bricks.get(receiver_brick).unwrap().snow.as_ref().unwrap().content, 0.0);
    }
}
