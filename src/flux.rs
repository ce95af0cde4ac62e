//! Directed flux edges between processes, bricks and the unit outlet.

use std::fmt;
use std::ops::{Deref, DerefMut};

use crate::brick::{BrickIndex, CompartmentKind};
use crate::process::ProcessIndex;
use crate::HydroError;

#[derive(Debug, Default, Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash)]
pub struct FluxIndex(usize);

impl Deref for FluxIndex {
    type Target = usize;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl fmt::Display for FluxIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The substance a flux carries.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FluxKind {
    Water,
    Snow,
    Ice,
}

/// How a flux participates in the solver's stage evaluation.
///
/// * `Forcing` and `Static` fluxes are computed once per step (forcing is
///   sampled directly; static fluxes come from instantaneous processes /
///   splitters evaluated in step 3). Because their rate is held fixed for
///   the whole step they are folded into every stage's rate sum with a
///   constant contribution -- any Runge-Kutta-style combination of a
///   constant term always nets to exactly `rate * dt`, which is why spec
///   §4.C can describe them as "added directly... not integrated": the
///   *effect* is identical to direct addition, but the containers'
///   provisional content used by genuinely content-dependent (`Dynamic`)
///   rate laws during later stages must already reflect that contribution.
/// * `Dynamic` fluxes come from ODE processes and are recomputed from the
///   provisional stage content at every evaluation.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FluxCategory {
    Forcing,
    Static,
    Dynamic,
}

/// Where a flux's water/snow/ice ends up.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FluxTarget {
    Outlet,
    Container(BrickIndex),
    Compartment(BrickIndex, CompartmentKind),
}

/// A directed edge carrying an instantaneous change-rate from a source
/// (process or forcing) to a target.
#[derive(Debug, Clone)]
pub struct Flux {
    pub index: FluxIndex,
    pub source: Option<ProcessIndex>,
    pub target: FluxTarget,
    pub kind: FluxKind,
    pub category: FluxCategory,
    /// Weight in `[0, 1]`: product of land-cover fractions along the
    /// flux's source path (spec §4.B point 5).
    pub area_weight: f64,
    /// Last rate computed for this flux (mm/time-step), written by the
    /// solver each stage; used both for constraint enforcement and to
    /// integrate a per-flux logged amount.
    pub rate: f64,
}

impl Flux {
    pub fn new(index: FluxIndex, source: Option<ProcessIndex>, target: FluxTarget, kind: FluxKind, category: FluxCategory) -> Self {
        Self {
            index,
            source,
            target,
            kind,
            category,
            area_weight: 1.0,
            rate: 0.0,
        }
    }
}

#[derive(Default, Debug)]
pub struct FluxVec {
    fluxes: Vec<Flux>,
}

impl Deref for FluxVec {
    type Target = Vec<Flux>;
    fn deref(&self) -> &Self::Target {
        &self.fluxes
    }
}

impl DerefMut for FluxVec {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.fluxes
    }
}

impl FluxVec {
    pub fn push(
        &mut self,
        source: Option<ProcessIndex>,
        target: FluxTarget,
        kind: FluxKind,
        category: FluxCategory,
    ) -> FluxIndex {
        let index = FluxIndex(self.fluxes.len());
        self.fluxes.push(Flux::new(index, source, target, kind, category));
        index
    }

    pub fn get(&self, index: FluxIndex) -> Result<&Flux, HydroError> {
        self.fluxes
            .get(*index)
            .ok_or_else(|| HydroError::NotFound(format!("flux index {index}")))
    }

    pub fn get_mut(&mut self, index: FluxIndex) -> Result<&mut Flux, HydroError> {
        self.fluxes
            .get_mut(*index)
            .ok_or_else(|| HydroError::NotFound(format!("flux index {index}")))
    }
}
