//! The explicit ODE stepper driving one hydro-unit forward by one time-step.
//!
//! Every process's rate law depends only on its own brick's content, but a
//! process's *output* flux may target a different brick; the state vector
//! is therefore the flat set of every brick's container/snow/ice contents
//! plus the unit outlet accumulator, and a classic explicit Runge-Kutta
//! tableau (Euler / Heun / RK4) is applied to the whole vector at once, so
//! coupled bricks (e.g. a two-store cascade, spec §8 scenario 6) integrate
//! correctly. Forcing and instantaneous ("static") rates are evaluated once
//! per step from the pre-step content and folded into every stage's
//! derivative as a constant term: because the Runge-Kutta weights used here
//! always sum to `1`, a constant term nets to exactly `rate * dt` under any
//! of the three methods, matching spec §4.C's "added directly... not
//! integrated" description while still letting dynamic rate laws see the
//! right provisional content at later stages (see [`crate::flux::FluxCategory`]).

pub mod constraints;

use std::collections::HashMap;

use crate::brick::{BrickIndex, CompartmentKind};
use crate::builder::ModelGraph;
use crate::flux::{FluxCategory, FluxTarget};
use crate::mjd::Timestep;
use crate::process::{ProcessCategory, ProcessIndex, RateContext};
use crate::splitter::SplitterContext;
use crate::unit::UnitIndex;
use crate::HydroError;

/// Which explicit Runge-Kutta tableau drives the solver (spec §3 "Solver").
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum SolverMethod {
    Euler,
    Heun,
    Rk4,
}

impl SolverMethod {
    /// Recognised (case-insensitive) names, per spec §6: `euler_explicit`,
    /// `heun_explicit`, `runge_kutta`/`rk4`. The bare `euler`/`heun` forms are
    /// accepted too, matching how the teacher's config layer tolerates both
    /// the long and short spellings of a solver name.
    pub fn parse(value: &str) -> Result<Self, HydroError> {
        match value.to_ascii_lowercase().as_str() {
            "euler" | "euler_explicit" => Ok(Self::Euler),
            "heun" | "heun_explicit" => Ok(Self::Heun),
            "rk4" | "runge_kutta" => Ok(Self::Rk4),
            other => Err(HydroError::UnrecognisedSolver(other.to_string())),
        }
    }

    /// Explicit Butcher tableau: `a[stage][j]` is the weight of stage `j`'s
    /// derivative in stage `stage`'s provisional content; `b` combines every
    /// stage's derivative into the final increment.
    fn tableau(&self) -> (&'static [&'static [f64]], &'static [f64]) {
        match self {
            SolverMethod::Euler => (&[&[]], &[1.0]),
            SolverMethod::Heun => (&[&[], &[1.0]], &[0.5, 0.5]),
            SolverMethod::Rk4 => (&[&[], &[0.5], &[0.0, 0.5], &[0.0, 0.0, 1.0]], &[1.0 / 6.0, 1.0 / 3.0, 1.0 / 3.0, 1.0 / 6.0]),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum StateKey {
    Container(BrickIndex),
    Compartment(BrickIndex, CompartmentKind),
    Outlet,
    /// Accumulates the amounts drained by processes tagged
    /// [`crate::process::Process::is_et`], combined by the same
    /// Runge-Kutta weights as every other state slot so the logged total
    /// reflects the actually-integrated ET, not a single-stage estimate.
    Et,
}

type StateMap = HashMap<StateKey, f64>;

/// What one step produced, for the logger to record (spec §6).
#[derive(Debug, Clone, Copy, Default)]
pub struct StepOutcome {
    pub outlet: f64,
    pub et: f64,
}

/// Advances one hydro-unit's state by one time-step, mutating every brick's
/// content and every flux's logged `rate`, and returns the unit's outlet
/// discharge and evapotranspiration total for this step (mm).
pub fn step_unit(graph: &mut ModelGraph, unit_index: UnitIndex, timestep: Timestep) -> Result<StepOutcome, HydroError> {
    let dt = timestep.dt_days;

    let mut y0: StateMap = HashMap::new();
    for &brick_index in graph.units.get(unit_index)?.bricks.clone().iter() {
        let brick = graph.bricks.get(brick_index)?;
        if let Some(c) = &brick.container {
            y0.insert(StateKey::Container(brick_index), c.content);
        }
        if let Some(c) = &brick.snow {
            y0.insert(StateKey::Compartment(brick_index, CompartmentKind::Snow), c.content);
        }
        if let Some(c) = &brick.ice {
            y0.insert(StateKey::Compartment(brick_index, CompartmentKind::Ice), c.content);
        }
    }
    y0.insert(StateKey::Outlet, 0.0);

    let external = evaluate_external(graph, unit_index, &y0, dt)?;

    let (a, b) = graph.solver.tableau();
    let mut stage_derivatives: Vec<StateMap> = Vec::with_capacity(b.len());

    for row in a.iter() {
        let mut y_stage = y0.clone();
        for (j, coeff) in row.iter().enumerate() {
            if *coeff == 0.0 {
                continue;
            }
            for (key, rate) in &stage_derivatives[j] {
                *y_stage.entry(*key).or_insert(0.0) += dt * coeff * rate;
            }
        }
        let k_stage = evaluate_ode(graph, unit_index, &y_stage, &external, dt)?;
        stage_derivatives.push(k_stage);
    }

    let mut y1 = y0.clone();
    for (stage_index, k_stage) in stage_derivatives.iter().enumerate() {
        let weight = b[stage_index];
        for (key, rate) in k_stage {
            *y1.entry(*key).or_insert(0.0) += dt * weight * rate;
        }
    }

    let outlet_amount = y1.get(&StateKey::Outlet).copied().unwrap_or(0.0);
    let et_amount = y1.get(&StateKey::Et).copied().unwrap_or(0.0);
    graph.units.get_mut(unit_index)?.outlet_amount = outlet_amount;

    for &brick_index in graph.units.get(unit_index)?.bricks.clone().iter() {
        let brick = graph.bricks.get_mut(brick_index)?;
        if let Some(c) = &mut brick.container {
            let target = y1.get(&StateKey::Container(brick_index)).copied().unwrap_or(c.content);
            c.content_change = target - c.content;
        }
        if let Some(c) = &mut brick.snow {
            let target = y1
                .get(&StateKey::Compartment(brick_index, CompartmentKind::Snow))
                .copied()
                .unwrap_or(c.content);
            c.content_change = target - c.content;
        }
        if let Some(c) = &mut brick.ice {
            let target = y1
                .get(&StateKey::Compartment(brick_index, CompartmentKind::Ice))
                .copied()
                .unwrap_or(c.content);
            c.content_change = target - c.content;
        }
        brick.commit_all();
        brick.check_invariants_or_log(timestep.index);
    }

    Ok(StepOutcome {
        outlet: outlet_amount,
        et: et_amount,
    })
}

/// Computes the constant-for-the-step contribution of forcing fluxes and
/// `Instantaneous` processes/splitters, from the pre-step committed content.
fn evaluate_external(graph: &ModelGraph, unit_index: UnitIndex, y0: &StateMap, dt: f64) -> Result<StateMap, HydroError> {
    let mut external: StateMap = HashMap::new();
    let unit = graph.units.get(unit_index)?;

    for &brick_index in &unit.bricks {
        let brick = graph.bricks.get(brick_index)?;
        for &flux_index in &brick.incoming_fluxes {
            let flux = graph.fluxes.get(flux_index)?;
            if flux.category != FluxCategory::Forcing {
                continue;
            }
            let rate = unit.forcings.get(crate::forcing::VariableKind::Precipitation);
            add_to_target(&mut external, flux.target, rate * flux.area_weight);
        }
    }

    let in_static_so_far = external.clone();
    run_constrained_pass(graph, unit, ProcessCategory::Instantaneous, y0, &in_static_so_far, dt, &mut external)?;

    for &splitter_index in &unit.splitters {
        let splitter = graph.splitters.get(splitter_index)?;
        let input_rate = unit.forcings.get(splitter.input);
        let ctx = SplitterContext {
            input_amount: input_rate * dt,
            temperature: Some(unit.forcings.get(crate::forcing::VariableKind::Temperature)),
            parameters: &[],
        };
        let amounts = splitter.rule.split(&ctx)?;
        for (amount, &flux_index) in amounts.iter().zip(splitter.outputs.iter()) {
            let flux = graph.fluxes.get(flux_index)?;
            add_to_target(&mut external, flux.target, (amount / dt) * flux.area_weight);
        }
    }

    Ok(external)
}

/// Re-evaluates every `Ode` process's rate from the stage's provisional
/// content and folds in the precomputed external (constant) contribution.
fn evaluate_ode(graph: &ModelGraph, unit_index: UnitIndex, y_stage: &StateMap, external: &StateMap, dt: f64) -> Result<StateMap, HydroError> {
    let mut k = external.clone();
    let unit = graph.units.get(unit_index)?;
    run_constrained_pass(graph, unit, ProcessCategory::Ode, y_stage, external, dt, &mut k)?;
    Ok(k)
}

fn state_key_for(brick_index: BrickIndex, compartment: Option<CompartmentKind>) -> StateKey {
    match compartment {
        Some(c) => StateKey::Compartment(brick_index, c),
        None => StateKey::Container(brick_index),
    }
}

fn flux_target_key(target: FluxTarget) -> Option<StateKey> {
    match target {
        FluxTarget::Outlet => None,
        FluxTarget::Container(b) => Some(StateKey::Container(b)),
        FluxTarget::Compartment(b, c) => Some(StateKey::Compartment(b, c)),
    }
}

/// A process's raw (uncapped) rates for this stage, before constraint
/// enforcement; mutated in place by [`apply_constraints_to_pending`].
struct PendingProcess {
    process_index: ProcessIndex,
    brick_index: BrickIndex,
    compartment: Option<CompartmentKind>,
    rates: Vec<f64>,
}

/// Runs every process of `category` on this unit's bricks for one stage:
/// computes raw rates from `content_map`, enforces non-negativity and
/// capacity per brick (spec §4.C), then folds the (possibly adjusted)
/// rates into `k`.
fn run_constrained_pass(
    graph: &ModelGraph,
    unit: &crate::unit::HydroUnit,
    category: ProcessCategory,
    content_map: &StateMap,
    in_static_map: &StateMap,
    dt: f64,
    k: &mut StateMap,
) -> Result<(), HydroError> {
    let mut pending: Vec<PendingProcess> = Vec::new();
    for &brick_index in &unit.bricks {
        let brick = graph.bricks.get(brick_index)?;
        for &process_index in &brick.processes {
            let process = graph.processes.get(process_index)?;
            if process.category != category {
                continue;
            }
            let rates = compute_process_rates(graph, unit, process_index, content_map, dt)?;
            pending.push(PendingProcess {
                process_index,
                brick_index,
                compartment: process.source_compartment,
                rates,
            });
        }
    }

    apply_constraints_to_pending(graph, unit, content_map, in_static_map, dt, &mut pending)?;

    for p in &pending {
        apply_process_rates(k, graph, p.process_index, &p.rates, p.brick_index)?;
    }
    Ok(())
}

/// Sums, over every pending process, the raw outgoing rate sourced from
/// `key` (`out`) and the raw rate of every *other* process's output that
/// targets `key` (`in_dyn`), always read fresh from `pending` so earlier
/// adjustments in the same pass are already reflected.
fn aggregate_out_and_in_dyn(graph: &ModelGraph, pending: &[PendingProcess], key: StateKey) -> Result<(f64, f64), HydroError> {
    let mut out = 0.0;
    let mut in_dyn = 0.0;
    for p in pending {
        let source_key = state_key_for(p.brick_index, p.compartment);
        if source_key == key {
            out += p.rates.iter().sum::<f64>();
            continue;
        }
        let process = graph.processes.get(p.process_index)?;
        for (&rate, &flux_index) in p.rates.iter().zip(process.outputs.iter()) {
            let flux = graph.fluxes.get(flux_index)?;
            if flux_target_key(flux.target) == Some(key) {
                in_dyn += rate * flux.area_weight;
            }
        }
    }
    Ok((out, in_dyn))
}

/// Spec §4.C: for every non-`unlimited_supply` brick's water containers
/// (main, snow, ice), enforces non-negativity then capacity, in that
/// order, against the aggregate of every pending process's raw rate —
/// never a single process in isolation — and folds in a bound overflow
/// process's rate when a capped container would exceed capacity.
fn apply_constraints_to_pending(
    graph: &ModelGraph,
    unit: &crate::unit::HydroUnit,
    content_map: &StateMap,
    in_static_map: &StateMap,
    dt: f64,
    pending: &mut Vec<PendingProcess>,
) -> Result<(), HydroError> {
    for &brick_index in &unit.bricks {
        let brick = graph.bricks.get(brick_index)?;
        if brick.unlimited_supply {
            continue;
        }

        let mut compartments: Vec<(StateKey, Option<f64>, Option<ProcessIndex>)> = Vec::new();
        if let Some(c) = &brick.container {
            compartments.push((StateKey::Container(brick_index), c.capacity, c.overflow));
        }
        if let Some(c) = &brick.snow {
            compartments.push((StateKey::Compartment(brick_index, CompartmentKind::Snow), c.capacity, c.overflow));
        }
        if let Some(c) = &brick.ice {
            compartments.push((StateKey::Compartment(brick_index, CompartmentKind::Ice), c.capacity, c.overflow));
        }

        for (key, capacity, overflow_process) in compartments {
            let content = content_map.get(&key).copied().unwrap_or(0.0);
            let in_static = in_static_map.get(&key).copied().unwrap_or(0.0);

            let (out, in_dyn) = aggregate_out_and_in_dyn(graph, pending, key)?;
            if let Some(scale) = constraints::non_negativity_scale(content, in_static, in_dyn, out, dt) {
                for p in pending.iter_mut() {
                    if state_key_for(p.brick_index, p.compartment) == key {
                        for r in p.rates.iter_mut() {
                            *r *= scale;
                        }
                    }
                }
            }

            let Some(capacity) = capacity else { continue };
            let (out, in_dyn) = aggregate_out_and_in_dyn(graph, pending, key)?;
            match constraints::capacity_outcome(content, in_static, in_dyn, out, dt, capacity, overflow_process.is_some()) {
                constraints::CapacityOutcome::WithinCapacity => {}
                constraints::CapacityOutcome::Overflow { projected } => {
                    let overflow_index = overflow_process.expect("has_overflow true implies Some");
                    let mut overlay = content_map.clone();
                    overlay.insert(key, projected);
                    let rates = compute_process_rates(graph, unit, overflow_index, &overlay, dt)?;
                    let process = graph.processes.get(overflow_index)?;
                    pending.push(PendingProcess {
                        process_index: overflow_index,
                        brick_index,
                        compartment: process.source_compartment,
                        rates,
                    });
                }
                constraints::CapacityOutcome::ScaleIncoming(scale) => {
                    for p in pending.iter_mut() {
                        let source_key = state_key_for(p.brick_index, p.compartment);
                        if source_key == key {
                            continue;
                        }
                        let process = graph.processes.get(p.process_index)?;
                        for (r, &flux_index) in p.rates.iter_mut().zip(process.outputs.iter()) {
                            let flux = graph.fluxes.get(flux_index)?;
                            if flux_target_key(flux.target) == Some(key) {
                                *r *= scale;
                            }
                        }
                    }
                }
                constraints::CapacityOutcome::ConfigError => {
                    return Err(HydroError::ConceptionIssue(format!(
                        "brick `{}` would exceed capacity {capacity} from forcing/static inflow alone, with no overflow process bound",
                        brick.name
                    )));
                }
            }
        }
    }
    Ok(())
}

fn compute_process_rates(
    graph: &ModelGraph,
    unit: &crate::unit::HydroUnit,
    process_index: ProcessIndex,
    content_map: &StateMap,
    dt: f64,
) -> Result<Vec<f64>, HydroError> {
    let process = graph.processes.get(process_index)?;
    let brick = graph.bricks.get(process.brick)?;

    let content = content_map.get(&state_key_for(process.brick, process.source_compartment)).copied().unwrap_or(0.0);
    let snow_content = brick
        .snow
        .as_ref()
        .map(|_| content_map.get(&StateKey::Compartment(process.brick, CompartmentKind::Snow)).copied().unwrap_or(0.0));
    let glacier_ice_content = brick
        .ice
        .as_ref()
        .map(|_| content_map.get(&StateKey::Compartment(process.brick, CompartmentKind::Ice)).copied().unwrap_or(0.0));
    let gating_snow_nonzero = match brick.gating_snowpack {
        Some(gating_index) => {
            let gating_snow = content_map.get(&StateKey::Compartment(gating_index, CompartmentKind::Snow)).copied().unwrap_or(0.0);
            Some(gating_snow > 1e-9)
        }
        None => None,
    };

    let parameters: Vec<f64> = process.parameters.iter().map(|&idx| graph.parameters.value(idx)).collect();
    let forcings: Vec<f64> = process.forcings.iter().map(|&kind| unit.forcings.get(kind)).collect();

    let ctx = RateContext {
        content,
        glacier_ice_content,
        snow_content,
        dt_days: dt,
        unit,
        parameters: &parameters,
        forcings: &forcings,
        gating_snow_nonzero,
    };
    process.rate_law.compute_rates(&ctx)
}

fn apply_process_rates(k: &mut StateMap, graph: &ModelGraph, process_index: ProcessIndex, rates: &[f64], source_brick: BrickIndex) -> Result<(), HydroError> {
    let process = graph.processes.get(process_index)?;
    let source_key = state_key_for(source_brick, process.source_compartment);
    for (&rate, &flux_index) in rates.iter().zip(process.outputs.iter()) {
        *k.entry(source_key).or_insert(0.0) -= rate;
        let flux = graph.fluxes.get(flux_index)?;
        add_to_target(k, flux.target, rate * flux.area_weight);
        if process.is_et {
            *k.entry(StateKey::Et).or_insert(0.0) += rate * flux.area_weight;
        }
    }
    Ok(())
}

fn add_to_target(k: &mut StateMap, target: FluxTarget, rate: f64) {
    let key = match target {
        FluxTarget::Outlet => StateKey::Outlet,
        FluxTarget::Container(b) => StateKey::Container(b),
        FluxTarget::Compartment(b, c) => StateKey::Compartment(b, c),
    };
    *k.entry(key).or_insert(0.0) += rate;
}

impl crate::brick::Brick {
    fn check_invariants_or_log(&self, step: usize) {
        for (label, container) in [("container", &self.container), ("snow", &self.snow), ("ice", &self.ice)] {
            if let Some(c) = container {
                if let Err(e) = c.check_invariants() {
                    tracing::warn!(step, brick = %self.name, compartment = label, error = %e, "water container invariant violated");
                }
            }
        }
    }
}
