//! Turns a [`ModelSpec`] + [`BasinSpec`] into a runnable object graph.
//!
//! Construction happens in two passes, mirroring the teacher's
//! instantiate-then-resolve network construction: pass one creates every
//! hydro-unit's own copy of every declared brick, process and splitter;
//! pass two resolves each declaration's string targets (`"outlet"`,
//! `"<brick>"`, `"<brick>:<compartment>"`) into direct indices, now that
//! every brick in every unit has a stable [`BrickIndex`]. Every problem
//! found along the way is collected into a [`BuildReport`] instead of
//! aborting at the first (spec §4.B).

use std::collections::{HashMap, HashSet};

use crate::brick::{Brick, BrickIndex, BrickKind, Capabilities, CompartmentKind, LandCoverKind, WaterContainer};
use crate::flux::{FluxCategory, FluxKind, FluxTarget, FluxVec};
use crate::forcing::VariableKind;
use crate::mjd::{TimeUnit, Timestepper};
use crate::parameter::{Parameter, ParameterIndex, ParameterStore, ParameterValue};
use crate::process::{Process, ProcessCategory, ProcessVec};
use crate::processes::ProcessKind;
use crate::solver::SolverMethod;
use crate::spec::model_spec::ParameterRef;
use crate::spec::{BasinSpec, FluxTargetDef, ModelSpec};
use crate::splitter::{SplitterContext, SplitterInstance, SplitterVec};
use crate::splitters::{MultiFluxesSplitter, SnowRainSplitter};
use crate::unit::UnitVec;
use crate::HydroError;

/// Accumulates every build-time problem instead of stopping at the first.
#[derive(Debug, Default)]
pub struct BuildReport {
    pub errors: Vec<HydroError>,
}

impl BuildReport {
    fn push(&mut self, error: HydroError) {
        self.errors.push(error);
    }

    fn into_result<T>(self, value: T) -> Result<T, HydroError> {
        if self.errors.is_empty() {
            Ok(value)
        } else {
            Err(HydroError::Build(self.errors))
        }
    }
}

/// The fully resolved, ready-to-run object graph.
#[derive(Debug)]
pub struct ModelGraph {
    pub units: UnitVec,
    pub bricks: crate::brick::BrickVec,
    pub fluxes: FluxVec,
    pub processes: ProcessVec,
    pub splitters: SplitterVec,
    pub parameters: ParameterStore,
    pub solver: SolverMethod,
    pub timestepper: Timestepper,
}

/// Resolves a brick template name to its per-unit instance within a single
/// unit's slice of the global brick vector.
struct UnitScope {
    brick_by_name: HashMap<String, BrickIndex>,
}

pub struct Builder {
    model: ModelSpec,
    basin: BasinSpec,
}

impl Builder {
    pub fn new(model: ModelSpec, basin: BasinSpec) -> Self {
        Self { model, basin }
    }

    pub fn build(self) -> Result<ModelGraph, HydroError> {
        let mut report = BuildReport::default();
        let model = &self.model;
        let basin = &self.basin;

        let solver = SolverMethod::parse(&model.solver).unwrap_or_else(|e| {
            report.push(e);
            SolverMethod::Euler
        });
        let step_unit = TimeUnit::parse(&model.step_unit).unwrap_or_else(|e| {
            report.push(e);
            TimeUnit::Day
        });
        let timestepper = Timestepper::new(model.start, model.end, model.step, step_unit);

        let mut parameters = ParameterStore::default();
        let mut parameter_by_name: HashMap<String, ParameterIndex> = HashMap::new();
        for def in &model.parameters {
            if let Err(e) = def.value.validate(&def.name) {
                report.push(e);
                continue;
            }
            let idx = parameters.push(Parameter::new(def.name.clone(), def.value.clone()));
            parameter_by_name.insert(def.name.clone(), idx);
        }

        let mut units = UnitVec::default();
        let mut bricks = crate::brick::BrickVec::default();
        let mut fluxes = FluxVec::default();
        let mut processes = ProcessVec::default();
        let mut splitters = SplitterVec::default();

        // Pass 1: instantiate every unit's own copy of every brick/process/splitter.
        let mut scopes: Vec<UnitScope> = Vec::with_capacity(basin.units.len());
        for unit_def in &basin.units {
            let unit_index = units.push(unit_def.id.clone(), unit_def.area_m2);
            {
                let unit = units.get_mut(unit_index).expect("just pushed");
                unit.elevation_m = unit_def.elevation_m;
                unit.slope_deg = unit_def.slope_deg;
                unit.aspect_class = unit_def.aspect_class;
            }

            let mut scope = UnitScope {
                brick_by_name: HashMap::new(),
            };

            let mut land_cover_fraction_sum = 0.0;
            let mut any_land_cover = false;
            for brick_def in &model.bricks {
                if scope.brick_by_name.contains_key(&brick_def.name) {
                    report.push(HydroError::DuplicateBrickName(brick_def.name.clone(), unit_def.id.clone()));
                    continue;
                }
                let kind = if brick_def.kind == "storage" {
                    BrickKind::Storage
                } else {
                    // Spec §6: `generic_land_cover`/`ground`/`generic` are synonyms.
                    match brick_def.kind.as_str() {
                        "generic" | "generic_land_cover" | "ground" => BrickKind::LandCover(LandCoverKind::Generic),
                        "glacier" => BrickKind::LandCover(LandCoverKind::Glacier),
                        "snowpack" => BrickKind::LandCover(LandCoverKind::Snowpack),
                        "vegetation" => BrickKind::LandCover(LandCoverKind::Vegetation),
                        "urban" => BrickKind::LandCover(LandCoverKind::Urban),
                        other => {
                            report.push(HydroError::UnknownBrickType(other.to_string()));
                            BrickKind::Storage
                        }
                    }
                };
                let is_land_cover = matches!(kind, BrickKind::LandCover(_));
                let is_glacier = matches!(kind, BrickKind::LandCover(LandCoverKind::Glacier));
                let is_snowpack = matches!(kind, BrickKind::LandCover(LandCoverKind::Snowpack)) || brick_def.has_snow_compartment;

                let fraction = if is_land_cover {
                    let fraction = unit_def
                        .land_covers
                        .iter()
                        .find(|lc| lc.brick_name == brick_def.name)
                        .map(|lc| lc.fraction)
                        .unwrap_or(0.0);
                    land_cover_fraction_sum += fraction;
                    any_land_cover = true;
                    Some(fraction)
                } else {
                    None
                };

                let container = WaterContainer::new(brick_def.capacity).with_initial_content(brick_def.initial_content);
                let snow = if is_snowpack {
                    Some(WaterContainer::new(None).with_initial_content(brick_def.initial_snow_content))
                } else {
                    None
                };
                let ice = if is_glacier { Some(WaterContainer::infinite()) } else { None };

                let brick = Brick {
                    index: BrickIndex::default(),
                    name: brick_def.name.clone(),
                    kind,
                    capabilities: Capabilities {
                        has_container: true,
                        needs_solver: true,
                        is_snowpack,
                        is_glacier,
                    },
                    container: Some(container),
                    ice,
                    snow,
                    liquid_water: 0.0,
                    fraction,
                    processes: Vec::new(),
                    incoming_fluxes: Vec::new(),
                    unlimited_supply: is_glacier && brick_def.unlimited_supply,
                    no_melt_when_snow_cover: brick_def.no_melt_when_snow_cover,
                    gating_snowpack: None,
                };
                let brick_index = bricks.push(brick);
                scope.brick_by_name.insert(brick_def.name.clone(), brick_index);
                units.get_mut(unit_index).expect("exists").bricks.push(brick_index);

                if brick_def.receives_precipitation {
                    let flux_index = fluxes.push(None, FluxTarget::Container(brick_index), FluxKind::Water, FluxCategory::Forcing);
                    bricks.get_mut(brick_index).expect("exists").incoming_fluxes.push(flux_index);
                }
            }

            if any_land_cover && (land_cover_fraction_sum - 1.0).abs() > 1e-6 {
                report.push(HydroError::LandCoverFractionMismatch(unit_def.id.clone(), land_cover_fraction_sum));
            }

            scopes.push(scope);
        }

        // Pass 1b: wire gating_snowpack now that every brick in every unit exists.
        for (unit_pos, unit_def) in basin.units.iter().enumerate() {
            let scope = &scopes[unit_pos];
            for brick_def in &model.bricks {
                let Some(gating_name) = &brick_def.gating_snowpack else { continue };
                let Some(&brick_index) = scope.brick_by_name.get(&brick_def.name) else { continue };
                match scope.brick_by_name.get(gating_name) {
                    Some(&gating_index) => bricks.get_mut(brick_index).expect("exists").gating_snowpack = Some(gating_index),
                    None => report.push(HydroError::UnknownTarget(gating_name.clone(), unit_def.id.clone())),
                }
            }
        }

        // Pass 2: instantiate + resolve processes, per unit.
        for (unit_pos, unit_def) in basin.units.iter().enumerate() {
            let unit_index = units[unit_pos].index;
            let scope = &scopes[unit_pos];

            for process_def in &model.processes {
                let Some(&brick_index) = scope.brick_by_name.get(&process_def.brick) else {
                    report.push(HydroError::UnknownTarget(process_def.brick.clone(), unit_def.id.clone()));
                    continue;
                };
                let kind = match ProcessKind::parse(&process_def.kind) {
                    Ok(k) => k,
                    Err(e) => {
                        report.push(e);
                        continue;
                    }
                };

                if process_def.parameters.len() < kind.expected_parameter_count() {
                    report.push(HydroError::MissingParameter(process_def.name.clone(), process_def.kind.clone()));
                }

                let mut parameter_indices = Vec::new();
                for p in &process_def.parameters {
                    match p {
                        ParameterRef::Literal(value) => {
                            let idx = parameters.push(Parameter::new(format!("{}#{}", process_def.name, parameter_indices.len()), ParameterValue::Constant(*value)));
                            parameter_indices.push(idx);
                        }
                        ParameterRef::Named(name) => match parameter_by_name.get(name) {
                            Some(&idx) => parameter_indices.push(idx),
                            None => report.push(HydroError::MissingParameter(name.clone(), process_def.name.clone())),
                        },
                    }
                }

                // spec §4.B point 5: a flux leaving a land-cover brick carries that
                // land-cover's fraction of the unit's area, so its rate is expressed
                // relative to the whole unit once it crosses the brick's boundary.
                let source_fraction = bricks.get(brick_index).expect("resolved above").fraction_or_one();

                let mut output_indices = Vec::new();
                for target_def in &process_def.outputs {
                    match resolve_target(target_def, scope, unit_def) {
                        Ok(target) => {
                            let flux_kind = parse_flux_kind(&target_def.kind);
                            let category = match kind.category() {
                                ProcessCategory::Ode | ProcessCategory::Overflow => FluxCategory::Dynamic,
                                ProcessCategory::Instantaneous => FluxCategory::Static,
                            };
                            let idx = fluxes.push(None, target, flux_kind, category);
                            fluxes.get_mut(idx).expect("just pushed").area_weight = source_fraction;
                            if let FluxTarget::Container(b) | FluxTarget::Compartment(b, _) = target {
                                bricks.get_mut(b).expect("exists").incoming_fluxes.push(idx);
                            }
                            output_indices.push(idx);
                        }
                        Err(e) => report.push(e),
                    }
                }

                let process = Process {
                    index: Default::default(),
                    name: process_def.name.clone(),
                    category: kind.category(),
                    brick: brick_index,
                    source_compartment: kind.source_compartment_for(bricks.get(brick_index).expect("resolved above")),
                    is_et: kind.is_et(),
                    rate_law: kind.build_rate_law(),
                    parameters: parameter_indices,
                    forcings: kind.required_forcings().to_vec(),
                    outputs: output_indices.clone(),
                    last_rates: vec![0.0; output_indices.len()],
                };
                let process_index = processes.push(process);
                for idx in &output_indices {
                    if let Ok(flux) = fluxes.get_mut(*idx) {
                        flux.source = Some(process_index);
                    }
                }
                let owning_brick = bricks.get_mut(brick_index).expect("exists");
                owning_brick.processes.push(process_index);

                // spec §4.B point 6 / §9 "overflow process discovery by name": the
                // string `"overflow"` is only a parse hint consumed once here; the
                // binding itself lives on the container as an explicit field.
                if matches!(kind, ProcessKind::Overflow) {
                    if let Some(container) = &mut owning_brick.container {
                        container.overflow = Some(process_index);
                    }
                }
            }

            for splitter_def in &model.splitters {
                let rule: Box<dyn crate::splitter::Splitter + Send + Sync> = match splitter_def.kind.as_str() {
                    "snow_rain" => Box::new(SnowRainSplitter::new(
                        splitter_def.transition_start_c.unwrap_or(0.0),
                        splitter_def.transition_end_c.unwrap_or(0.0),
                    )),
                    "multi_fluxes" => match MultiFluxesSplitter::new(splitter_def.weights.clone().unwrap_or_default()) {
                        Ok(rule) => Box::new(rule),
                        Err(e) => {
                            report.push(e);
                            continue;
                        }
                    },
                    other => {
                        report.push(HydroError::ConceptionIssue(format!("unknown splitter kind `{other}`")));
                        continue;
                    }
                };

                let mut output_indices = Vec::new();
                for target_def in &splitter_def.outputs {
                    match resolve_target(target_def, scope, unit_def) {
                        Ok(target) => {
                            let flux_kind = parse_flux_kind(&target_def.kind);
                            let idx = fluxes.push(None, target, flux_kind, FluxCategory::Static);
                            if let FluxTarget::Container(b) | FluxTarget::Compartment(b, _) = target {
                                bricks.get_mut(b).expect("exists").incoming_fluxes.push(idx);
                            }
                            output_indices.push(idx);
                        }
                        Err(e) => report.push(e),
                    }
                }

                let input = match VariableKind::parse(&splitter_def.input) {
                    Ok(kind) => kind,
                    Err(e) => {
                        report.push(e);
                        continue;
                    }
                };

                let instance = SplitterInstance {
                    index: Default::default(),
                    name: splitter_def.name.clone(),
                    rule,
                    parameters: Vec::new(),
                    outputs: output_indices,
                    input,
                };
                let splitter_index = splitters.push(instance);
                units.get_mut(unit_index).expect("exists").splitters.push(splitter_index);
            }
        }

        check_brick_has_incoming_input(&bricks, &units, &mut report);
        check_circular_instantaneous_dependency(&bricks, &processes, &mut report);

        let graph = ModelGraph {
            units,
            bricks,
            fluxes,
            processes,
            splitters,
            parameters,
            solver,
            timestepper,
        };
        report.into_result(graph)
    }
}

fn parse_flux_kind(kind: &str) -> FluxKind {
    match kind {
        "snow" => FluxKind::Snow,
        "ice" => FluxKind::Ice,
        _ => FluxKind::Water,
    }
}

fn resolve_target(target_def: &FluxTargetDef, scope: &UnitScope, unit_def: &crate::spec::UnitDef) -> Result<FluxTarget, HydroError> {
    if target_def.target == "outlet" {
        return Ok(FluxTarget::Outlet);
    }
    if let Some((brick_name, compartment)) = target_def.target.split_once(':') {
        let brick_index = scope
            .brick_by_name
            .get(brick_name)
            .copied()
            .ok_or_else(|| HydroError::UnknownTarget(target_def.target.clone(), unit_def.id.clone()))?;
        let compartment = match compartment {
            "snow" => CompartmentKind::Snow,
            "ice" => CompartmentKind::Ice,
            other => return Err(HydroError::UnknownTarget(format!("{brick_name}:{other}"), unit_def.id.clone())),
        };
        return Ok(FluxTarget::Compartment(brick_index, compartment));
    }
    scope
        .brick_by_name
        .get(&target_def.target)
        .copied()
        .map(FluxTarget::Container)
        .ok_or_else(|| HydroError::UnknownTarget(target_def.target.clone(), unit_def.id.clone()))
}

/// Every brick must receive at least one incoming flux, unless it is an
/// unlimited-supply glacier ice compartment (spec §4.C "glacier exception").
fn check_brick_has_incoming_input(bricks: &crate::brick::BrickVec, units: &UnitVec, report: &mut BuildReport) {
    for unit in units.iter() {
        for &brick_index in &unit.bricks {
            let Ok(brick) = bricks.get(brick_index) else { continue };
            if brick.unlimited_supply {
                continue;
            }
            if brick.incoming_fluxes.is_empty() {
                report.push(HydroError::BrickWithoutIncomingInput(brick.name.clone()));
            }
        }
    }
}

/// Detects cycles among bricks connected purely by `Instantaneous` or
/// `Overflow` process outputs: those processes execute in an implied order
/// within a step (or a single stage, for `Overflow`), so a genuine cycle
/// among them has no well-defined evaluation order. `Ode` processes may
/// freely form cycles (the ODE solver integrates coupled bricks
/// simultaneously), so their edges are excluded.
fn check_circular_instantaneous_dependency(bricks: &crate::brick::BrickVec, processes: &ProcessVec, report: &mut BuildReport) {
    // Build adjacency from bricks' incoming_fluxes, matching each flux's
    // source process to its owning brick.
    let mut adjacency: HashMap<BrickIndex, Vec<BrickIndex>> = HashMap::new();
    for target_brick in bricks.iter() {
        for &flux_index in &target_brick.incoming_fluxes {
            for process in processes.iter() {
                let scheduled_eagerly = matches!(process.category, ProcessCategory::Instantaneous | ProcessCategory::Overflow);
                if scheduled_eagerly && process.outputs.contains(&flux_index) {
                    adjacency.entry(process.brick).or_default().push(target_brick.index);
                }
            }
        }
    }

    let mut visited: HashSet<BrickIndex> = HashSet::new();
    let mut stack: HashSet<BrickIndex> = HashSet::new();
    for &start in adjacency.keys() {
        if visit(start, &adjacency, &mut visited, &mut stack, bricks, report) {
            break;
        }
    }
}

fn visit(
    node: BrickIndex,
    adjacency: &HashMap<BrickIndex, Vec<BrickIndex>>,
    visited: &mut HashSet<BrickIndex>,
    stack: &mut HashSet<BrickIndex>,
    bricks: &crate::brick::BrickVec,
    report: &mut BuildReport,
) -> bool {
    if stack.contains(&node) {
        let name = bricks.get(node).map(|b| b.name.clone()).unwrap_or_default();
        report.push(HydroError::CircularDependency(name));
        return true;
    }
    if visited.contains(&node) {
        return false;
    }
    visited.insert(node);
    stack.insert(node);
    if let Some(neighbours) = adjacency.get(&node) {
        for &next in neighbours {
            if visit(next, adjacency, visited, stack, bricks, report) {
                return true;
            }
        }
    }
    stack.remove(&node);
    false
}
