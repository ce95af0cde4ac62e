//! Rate-law processes attached to a brick.

use std::fmt;
use std::ops::{Deref, DerefMut};

use crate::brick::{BrickIndex, CompartmentKind};
use crate::flux::FluxIndex;
use crate::forcing::VariableKind;
use crate::parameter::ParameterIndex;
use crate::unit::HydroUnit;
use crate::HydroError;

#[derive(Debug, Default, Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash)]
pub struct ProcessIndex(usize);

impl Deref for ProcessIndex {
    type Target = usize;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl fmt::Display for ProcessIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Whether a process contributes state variables to the solver.
///
/// `Instantaneous` processes (direct outflow, splitters) produce fluxes
/// that are evaluated once per step and do not participate in stage
/// evaluation; `Ode` processes are re-evaluated at every solver stage from
/// the provisional content (spec §3 "Process"). `Overflow` processes are
/// never scheduled by the generic dispatch loops at all: the per-brick
/// capacity handler invokes a bound overflow process's rate law directly,
/// once it has determined a container would exceed capacity (spec §4.C,
/// §4.D "Overflow").
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ProcessCategory {
    Instantaneous,
    Ode,
    Overflow,
}

/// Read-only context handed to a rate law at one solver stage: the content
/// of the owning brick's relevant compartment plus resolved parameter and
/// forcing values.
pub struct RateContext<'a> {
    pub content: f64,
    pub glacier_ice_content: Option<f64>,
    pub snow_content: Option<f64>,
    pub dt_days: f64,
    pub unit: &'a HydroUnit,
    pub parameters: &'a [f64],
    pub forcings: &'a [f64],
    pub gating_snow_nonzero: Option<bool>,
}

/// A rate law: given the current stage content and resolved
/// parameters/forcings, computes one raw (uncapped) rate per output flux,
/// expressed as mm per day regardless of the model's actual time-step
/// length -- the solver scales by `dt_days` when forming a stage increment
/// (spec §4.C). Capping against available content/capacity is the
/// responsibility of the generic constraint stage, not of the rate law
/// itself. Instantaneous processes (e.g. [`crate::processes::DirectRule`])
/// return `content / dt_days` so that `rate * dt_days` reproduces the whole
/// incoming amount in one step.
pub trait RateLaw: fmt::Debug {
    fn compute_rates(&self, ctx: &RateContext) -> Result<Vec<f64>, HydroError>;
}

/// A process: a rate law bound to one brick, with its own parameter/forcing
/// references and output fluxes.
#[derive(Debug)]
pub struct Process {
    pub index: ProcessIndex,
    pub name: String,
    pub category: ProcessCategory,
    pub brick: BrickIndex,
    /// Which of the brick's compartments this process draws content from;
    /// `None` means the main container (spec §4.D default).
    pub source_compartment: Option<CompartmentKind>,
    pub rate_law: Box<dyn RateLaw + Send + Sync>,
    pub parameters: Vec<ParameterIndex>,
    pub forcings: Vec<VariableKind>,
    pub outputs: Vec<FluxIndex>,
    /// Last computed raw rates, one per output, refreshed every stage.
    pub last_rates: Vec<f64>,
    /// Tags this as an evapotranspiration process, so the solver can fold its
    /// contribution into the logged total-ET state slot without the logger
    /// needing to know process kinds (spec §6 "get_total_et").
    pub is_et: bool,
}

impl Process {
    pub fn is_ode(&self) -> bool {
        self.category == ProcessCategory::Ode
    }
}

#[derive(Default, Debug)]
pub struct ProcessVec {
    processes: Vec<Process>,
}

impl Deref for ProcessVec {
    type Target = Vec<Process>;
    fn deref(&self) -> &Self::Target {
        &self.processes
    }
}

impl DerefMut for ProcessVec {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.processes
    }
}

impl ProcessVec {
    pub fn get(&self, index: ProcessIndex) -> Result<&Process, HydroError> {
        self.processes
            .get(*index)
            .ok_or_else(|| HydroError::NotFound(format!("process index {index}")))
    }

    pub fn get_mut(&mut self, index: ProcessIndex) -> Result<&mut Process, HydroError> {
        self.processes
            .get_mut(*index)
            .ok_or_else(|| HydroError::NotFound(format!("process index {index}")))
    }

    pub fn push(&mut self, mut process: Process) -> ProcessIndex {
        let index = ProcessIndex(self.processes.len());
        process.index = index;
        self.processes.push(process);
        index
    }

    pub fn index_by_name(&self, name: &str) -> Option<ProcessIndex> {
        self.processes.iter().find(|p| p.name == name).map(|p| p.index)
    }
}
