//! Fixture builders for small, hand-built models.
//!
//! Mirrors the teacher's `test_utils.rs` role: every test module reaches for
//! one of these instead of repeating the same `ModelSpec`/`BasinSpec` wiring.
//! None of these read a file; they build the in-memory spec types directly.

use crate::forcing::{ForcingSeriesSet, TimeSeries, VariableKind};
use crate::mjd::Mjd;
use crate::parameter::ParameterValue;
use crate::spec::{BasinSpec, BrickDef, FluxTargetDef, LandCoverFractionDef, ModelSpec, ParameterDef, ParameterRef, ProcessDef, RedistributionSpec, SnowRedistributionConnection, SplitterDef, UnitDef};
use crate::unit::AspectClass;

pub fn start_date() -> Mjd {
    Mjd::from_ymd(2020, 1, 1)
}

/// `[start, start + n_days - 1]` at a daily step, matching the uniform daily
/// forcing series every scenario fixture below uses.
pub fn daily_window(n_days: u64) -> (Mjd, Mjd) {
    let start = start_date();
    let end = start + (n_days as f64 - 1.0);
    (start, end)
}

fn target(s: &str) -> FluxTargetDef {
    FluxTargetDef {
        target: s.to_string(),
        kind: "water".to_string(),
    }
}

fn snow_target(s: &str) -> FluxTargetDef {
    FluxTargetDef {
        target: s.to_string(),
        kind: "snow".to_string(),
    }
}

/// Builds a [`ForcingSeriesSet`] with one daily precipitation and/or
/// temperature series shared by every unit.
pub fn uniform_forcing(n_days: u64, precipitation: Option<Vec<f64>>, temperature: Option<Vec<f64>>) -> ForcingSeriesSet {
    let (start, end) = daily_window(n_days);
    ForcingSeriesSet {
        precipitation: precipitation.map(|v| TimeSeries::uniform(start, end, 1.0, VariableKind::Precipitation, v).expect("length matches window")),
        temperature: temperature.map(|v| TimeSeries::uniform(start, end, 1.0, VariableKind::Temperature, v).expect("length matches window")),
        pet: None,
        radiation: None,
    }
}

fn single_unit(area_m2: f64) -> UnitDef {
    UnitDef {
        id: "u0".to_string(),
        area_m2,
        elevation_m: None,
        slope_deg: None,
        aspect_class: None,
        land_covers: vec![],
    }
}

/// One unit, one storage brick draining through a single `linear_storage`
/// process straight to the outlet (spec §8 scenarios 1-2).
pub fn linear_storage_model(solver: &str, k: f64, n_days: u64) -> (ModelSpec, BasinSpec) {
    let (start, end) = daily_window(n_days);
    let model = ModelSpec {
        solver: solver.to_string(),
        start,
        end,
        step: 1,
        step_unit: "day".to_string(),
        bricks: vec![BrickDef {
            name: "store".to_string(),
            kind: "storage".to_string(),
            capacity: None,
            initial_content: 0.0,
            has_snow_compartment: false,
            initial_snow_content: 0.0,
            unlimited_supply: false,
            no_melt_when_snow_cover: false,
            gating_snowpack: None,
            receives_precipitation: true,
        }],
        processes: vec![ProcessDef {
            name: "outflow".to_string(),
            brick: "store".to_string(),
            kind: "linear_storage".to_string(),
            parameters: vec![ParameterRef::Literal(k)],
            outputs: vec![target("outlet")],
        }],
        splitters: vec![],
        parameters: vec![],
    };
    let basin = BasinSpec {
        units: vec![single_unit(100.0)],
        redistribution: RedistributionSpec::default(),
    };
    (model, basin)
}

/// Two linear stores in series: `store1` receives precipitation and drains
/// into `store2`, which drains to the outlet (spec §8 scenario 6).
pub fn cascade_linear_storage_model(solver: &str, k1: f64, k2: f64, n_days: u64) -> (ModelSpec, BasinSpec) {
    let (start, end) = daily_window(n_days);
    let model = ModelSpec {
        solver: solver.to_string(),
        start,
        end,
        step: 1,
        step_unit: "day".to_string(),
        bricks: vec![
            BrickDef {
                name: "store1".to_string(),
                kind: "storage".to_string(),
                capacity: None,
                initial_content: 0.0,
                has_snow_compartment: false,
                initial_snow_content: 0.0,
                unlimited_supply: false,
                no_melt_when_snow_cover: false,
                gating_snowpack: None,
                receives_precipitation: true,
            },
            BrickDef {
                name: "store2".to_string(),
                kind: "storage".to_string(),
                capacity: None,
                initial_content: 0.0,
                has_snow_compartment: false,
                initial_snow_content: 0.0,
                unlimited_supply: false,
                no_melt_when_snow_cover: false,
                gating_snowpack: None,
                receives_precipitation: false,
            },
        ],
        processes: vec![
            ProcessDef {
                name: "outflow1".to_string(),
                brick: "store1".to_string(),
                kind: "linear_storage".to_string(),
                parameters: vec![ParameterRef::Literal(k1)],
                outputs: vec![target("store2")],
            },
            ProcessDef {
                name: "outflow2".to_string(),
                brick: "store2".to_string(),
                kind: "linear_storage".to_string(),
                parameters: vec![ParameterRef::Literal(k2)],
                outputs: vec![target("outlet")],
            },
        ],
        splitters: vec![],
        parameters: vec![],
    };
    let basin = BasinSpec {
        units: vec![single_unit(100.0)],
        redistribution: RedistributionSpec::default(),
    };
    (model, basin)
}

/// One unit, a snowpack brick fed by a `snow_rain` splitter, melting through
/// `melt_degree_day` straight to the outlet (spec §8 scenario 3).
pub fn snowpack_degree_day_model(n_days: u64, ddf: f64, melt_temp: f64, transition_start_c: f64, transition_end_c: f64) -> (ModelSpec, BasinSpec) {
    let (start, end) = daily_window(n_days);
    let model = ModelSpec {
        solver: "euler_explicit".to_string(),
        start,
        end,
        step: 1,
        step_unit: "day".to_string(),
        bricks: vec![BrickDef {
            name: "snowpack".to_string(),
            kind: "snowpack".to_string(),
            capacity: None,
            initial_content: 0.0,
            has_snow_compartment: true,
            initial_snow_content: 0.0,
            unlimited_supply: false,
            no_melt_when_snow_cover: false,
            gating_snowpack: None,
            receives_precipitation: false,
        }],
        processes: vec![ProcessDef {
            name: "melt".to_string(),
            brick: "snowpack".to_string(),
            kind: "melt_degree_day".to_string(),
            parameters: vec![ParameterRef::Literal(ddf), ParameterRef::Literal(melt_temp)],
            outputs: vec![target("outlet")],
        }],
        splitters: vec![SplitterDef {
            name: "snow_rain_split".to_string(),
            kind: "snow_rain".to_string(),
            input: "precipitation".to_string(),
            outputs: vec![target("outlet"), snow_target("snowpack:snow")],
            transition_start_c: Some(transition_start_c),
            transition_end_c: Some(transition_end_c),
            weights: None,
        }],
        parameters: vec![],
    };
    let mut unit = single_unit(100.0);
    unit.land_covers = vec![LandCoverFractionDef {
        brick_name: "snowpack".to_string(),
        fraction: 1.0,
    }];
    let basin = BasinSpec {
        units: vec![unit],
        redistribution: RedistributionSpec::default(),
    };
    (model, basin)
}

/// Four hydro-units, one per [`AspectClass`], each a bare `snowpack` melting
/// through `melt_degree_day_aspect`; `south` carries `area_scale` times the
/// area of the other three (spec §8 scenario 4).
pub fn aspect_snowpack_model(n_days: u64, factor_n: f64, factor_e: f64, factor_w: f64, factor_s: f64, melt_temp: f64, south_area_scale: f64) -> (ModelSpec, BasinSpec) {
    let (start, end) = daily_window(n_days);
    let model = ModelSpec {
        solver: "euler_explicit".to_string(),
        start,
        end,
        step: 1,
        step_unit: "day".to_string(),
        bricks: vec![BrickDef {
            name: "snowpack".to_string(),
            kind: "snowpack".to_string(),
            capacity: None,
            initial_content: 0.0,
            has_snow_compartment: true,
            initial_snow_content: 0.0,
            unlimited_supply: false,
            no_melt_when_snow_cover: false,
            gating_snowpack: None,
            receives_precipitation: false,
        }],
        processes: vec![ProcessDef {
            name: "melt".to_string(),
            brick: "snowpack".to_string(),
            kind: "melt_degree_day_aspect".to_string(),
            parameters: vec![
                ParameterRef::Literal(factor_n),
                ParameterRef::Literal(factor_e),
                ParameterRef::Literal(factor_w),
                ParameterRef::Literal(factor_s),
                ParameterRef::Literal(melt_temp),
            ],
            outputs: vec![target("outlet")],
        }],
        splitters: vec![SplitterDef {
            name: "snow_rain_split".to_string(),
            kind: "snow_rain".to_string(),
            input: "precipitation".to_string(),
            outputs: vec![target("outlet"), snow_target("snowpack:snow")],
            transition_start_c: Some(0.0),
            transition_end_c: Some(2.0),
            weights: None,
        }],
        parameters: vec![],
    };
    let mut units = Vec::new();
    for (id, aspect, area) in [
        ("n", AspectClass::N, 100.0),
        ("e", AspectClass::E, 100.0),
        ("w", AspectClass::W, 100.0),
        ("s", AspectClass::S, 100.0 * south_area_scale),
    ] {
        let mut unit = single_unit(area);
        unit.id = id.to_string();
        unit.aspect_class = Some(aspect);
        unit.land_covers = vec![LandCoverFractionDef {
            brick_name: "snowpack".to_string(),
            fraction: 1.0,
        }];
        units.push(unit);
    }
    let basin = BasinSpec {
        units,
        redistribution: RedistributionSpec::default(),
    };
    (model, basin)
}

/// One unit, a bare glacier brick (`unlimited_supply`) melting through
/// `melt_degree_day` straight to the outlet, no precipitation (spec §8
/// scenario 5).
pub fn glacier_unlimited_supply_model(n_days: u64, ddf: f64, melt_temp: f64) -> (ModelSpec, BasinSpec) {
    let (start, end) = daily_window(n_days);
    let model = ModelSpec {
        solver: "euler_explicit".to_string(),
        start,
        end,
        step: 1,
        step_unit: "day".to_string(),
        bricks: vec![BrickDef {
            name: "glacier".to_string(),
            kind: "glacier".to_string(),
            capacity: None,
            initial_content: 0.0,
            has_snow_compartment: false,
            initial_snow_content: 0.0,
            unlimited_supply: true,
            no_melt_when_snow_cover: false,
            gating_snowpack: None,
            receives_precipitation: false,
        }],
        processes: vec![ProcessDef {
            name: "melt".to_string(),
            brick: "glacier".to_string(),
            kind: "melt_degree_day".to_string(),
            parameters: vec![ParameterRef::Literal(ddf), ParameterRef::Literal(melt_temp)],
            outputs: vec![target("outlet")],
        }],
        splitters: vec![],
        parameters: vec![],
    };
    let mut unit = single_unit(100.0);
    unit.land_covers = vec![LandCoverFractionDef {
        brick_name: "glacier".to_string(),
        fraction: 1.0,
    }];
    let basin = BasinSpec {
        units: vec![unit],
        redistribution: RedistributionSpec::default(),
    };
    (model, basin)
}

/// Five equal-area units chained `1 -> 2 -> 3 -> 4 -> 5` with full
/// (`fraction = 1.0`) lateral snow transfer, each independently fed by the
/// same daily snow input, no melt (spec §8 snow-redistribution scenario).
pub fn snow_redistribution_chain_model(n_days: u64) -> (ModelSpec, BasinSpec) {
    let (start, end) = daily_window(n_days);
    let model = ModelSpec {
        solver: "euler_explicit".to_string(),
        start,
        end,
        step: 1,
        step_unit: "day".to_string(),
        bricks: vec![BrickDef {
            name: "snowpack".to_string(),
            kind: "snowpack".to_string(),
            capacity: None,
            initial_content: 0.0,
            has_snow_compartment: true,
            initial_snow_content: 0.0,
            unlimited_supply: false,
            no_melt_when_snow_cover: false,
            gating_snowpack: None,
            receives_precipitation: false,
        }],
        processes: vec![],
        splitters: vec![SplitterDef {
            name: "snow_rain_split".to_string(),
            kind: "snow_rain".to_string(),
            input: "precipitation".to_string(),
            outputs: vec![target("outlet"), snow_target("snowpack:snow")],
            transition_start_c: Some(0.0),
            transition_end_c: Some(0.0),
            weights: None,
        }],
        parameters: vec![],
    };
    let ids = ["unit1", "unit2", "unit3", "unit4", "unit5"];
    let slopes = [80.0, 60.0, 40.0, 20.0, 0.0];
    let elevations = [2400.0, 2300.0, 2200.0, 2100.0, 2000.0];
    let mut units = Vec::new();
    for i in 0..5 {
        let mut unit = single_unit(100.0);
        unit.id = ids[i].to_string();
        unit.slope_deg = Some(slopes[i]);
        unit.elevation_m = Some(elevations[i]);
        unit.land_covers = vec![LandCoverFractionDef {
            brick_name: "snowpack".to_string(),
            fraction: 1.0,
        }];
        units.push(unit);
    }
    let connections = (0..4)
        .map(|i| SnowRedistributionConnection {
            donor_unit: ids[i].to_string(),
            receiver_unit: ids[i + 1].to_string(),
            fraction: 1.0,
        })
        .collect();
    let basin = BasinSpec {
        units,
        redistribution: RedistributionSpec {
            connections,
            slope_holding_threshold_deg: 0.0,
            swe_holding_threshold_mm: 0.0,
        },
    };
    (model, basin)
}

/// One unit, a capped storage brick draining through `linear_storage` with a
/// bound `overflow` process also targeting the outlet, so forcing above
/// capacity spills out immediately instead of accumulating past it (spec
/// §4.C "Capacity", §4.D "Overflow").
pub fn capped_storage_with_overflow_model(solver: &str, k: f64, capacity: f64, n_days: u64) -> (ModelSpec, BasinSpec) {
    let (start, end) = daily_window(n_days);
    let model = ModelSpec {
        solver: solver.to_string(),
        start,
        end,
        step: 1,
        step_unit: "day".to_string(),
        bricks: vec![BrickDef {
            name: "store".to_string(),
            kind: "storage".to_string(),
            capacity: Some(capacity),
            initial_content: 0.0,
            has_snow_compartment: false,
            initial_snow_content: 0.0,
            unlimited_supply: false,
            no_melt_when_snow_cover: false,
            gating_snowpack: None,
            receives_precipitation: true,
        }],
        processes: vec![
            ProcessDef {
                name: "outflow".to_string(),
                brick: "store".to_string(),
                kind: "linear_storage".to_string(),
                parameters: vec![ParameterRef::Literal(k)],
                outputs: vec![target("outlet")],
            },
            ProcessDef {
                name: "spill".to_string(),
                brick: "store".to_string(),
                kind: "overflow".to_string(),
                parameters: vec![ParameterRef::Literal(capacity)],
                outputs: vec![target("outlet")],
            },
        ],
        splitters: vec![],
        parameters: vec![],
    };
    let basin = BasinSpec {
        units: vec![single_unit(100.0)],
        redistribution: RedistributionSpec::default(),
    };
    (model, basin)
}

/// Same as [`capped_storage_with_overflow_model`] but with no bound overflow
/// process, so a step that would push the container past capacity has no
/// way to resolve the excess (spec §4.C, §7 `ConceptionIssue`).
pub fn capped_storage_without_overflow_model(solver: &str, k: f64, capacity: f64, n_days: u64) -> (ModelSpec, BasinSpec) {
    let (start, end) = daily_window(n_days);
    let model = ModelSpec {
        solver: solver.to_string(),
        start,
        end,
        step: 1,
        step_unit: "day".to_string(),
        bricks: vec![BrickDef {
            name: "store".to_string(),
            kind: "storage".to_string(),
            capacity: Some(capacity),
            initial_content: 0.0,
            has_snow_compartment: false,
            initial_snow_content: 0.0,
            unlimited_supply: false,
            no_melt_when_snow_cover: false,
            gating_snowpack: None,
            receives_precipitation: true,
        }],
        processes: vec![ProcessDef {
            name: "outflow".to_string(),
            brick: "store".to_string(),
            kind: "linear_storage".to_string(),
            parameters: vec![ParameterRef::Literal(k)],
            outputs: vec![target("outlet")],
        }],
        splitters: vec![],
        parameters: vec![],
    };
    let basin = BasinSpec {
        units: vec![single_unit(100.0)],
        redistribution: RedistributionSpec::default(),
    };
    (model, basin)
}

/// A lone named constant parameter, for exercising [`ParameterRef::Named`] wiring.
pub fn constant_parameter(name: &str, value: f64) -> ParameterDef {
    ParameterDef {
        name: name.to_string(),
        value: ParameterValue::Constant(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::Builder;

    #[test]
    fn linear_storage_model_builds() {
        let (model, basin) = linear_storage_model("euler_explicit", 0.3, 5);
        let graph = Builder::new(model, basin).build().unwrap();
        assert_eq!(graph.units.len(), 1);
        assert_eq!(graph.bricks.len(), 1);
    }

    #[test]
    fn cascade_model_builds() {
        let (model, basin) = cascade_linear_storage_model("runge_kutta", 0.5, 0.3, 5);
        let graph = Builder::new(model, basin).build().unwrap();
        assert_eq!(graph.bricks.len(), 2);
    }

    #[test]
    fn snowpack_model_builds() {
        let (model, basin) = snowpack_degree_day_model(10, 3.0, 2.0, 0.0, 2.0);
        let graph = Builder::new(model, basin).build().unwrap();
        assert_eq!(graph.splitters.len(), 1);
    }

    #[test]
    fn aspect_model_builds_four_units() {
        let (model, basin) = aspect_snowpack_model(10, 3.0, 3.0, 3.0, 3.5, 2.0, 2.0);
        let graph = Builder::new(model, basin).build().unwrap();
        assert_eq!(graph.units.len(), 4);
    }

    #[test]
    fn redistribution_chain_builds_five_units() {
        let (model, basin) = snow_redistribution_chain_model(10);
        let graph = Builder::new(model, basin).build().unwrap();
        assert_eq!(graph.units.len(), 5);
    }

    #[test]
    fn capped_storage_with_overflow_binds_the_overflow_process_to_the_container() {
        let (model, basin) = capped_storage_with_overflow_model("euler_explicit", 0.05, 10.0, 5);
        let graph = Builder::new(model, basin).build().unwrap();
        let store = graph.bricks.index_by_name("store").unwrap();
        let brick = graph.bricks.get(store).unwrap();
        assert_eq!(brick.processes.len(), 2);
        assert!(brick.container.as_ref().unwrap().overflow.is_some());
    }
}
