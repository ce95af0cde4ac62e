//! Splitters: instantaneous, content-free distribution of one input amount
//! across several output fluxes.
//!
//! A splitter never touches a brick's water container directly; it turns one
//! upstream amount (forcing or an incoming flux) into several downstream
//! amounts applied at step commit, the same way an `Instantaneous` process
//! does.

use std::fmt;
use std::ops::{Deref, DerefMut};

use crate::flux::FluxIndex;
use crate::forcing::VariableKind;
use crate::parameter::ParameterIndex;
use crate::HydroError;

#[derive(Debug, Default, Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash)]
pub struct SplitterIndex(usize);

impl Deref for SplitterIndex {
    type Target = usize;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl fmt::Display for SplitterIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Read-only context for one splitter evaluation.
pub struct SplitterContext<'a> {
    pub input_amount: f64,
    pub temperature: Option<f64>,
    pub parameters: &'a [f64],
}

/// A splitting rule: given one input amount, returns one output amount per
/// declared output flux, in the same order as [`SplitterInstance::outputs`].
/// Outputs must sum to `input_amount` (checked by the builder's smoke test,
/// not re-checked every step).
pub trait Splitter: fmt::Debug {
    fn split(&self, ctx: &SplitterContext) -> Result<Vec<f64>, HydroError>;
}

/// A splitter bound into the graph: a rule plus its parameter references and
/// ordered output fluxes.
#[derive(Debug)]
pub struct SplitterInstance {
    pub index: SplitterIndex,
    pub name: String,
    pub rule: Box<dyn Splitter + Send + Sync>,
    pub parameters: Vec<ParameterIndex>,
    pub outputs: Vec<FluxIndex>,
    /// Which forcing slot feeds this splitter's `input_amount` (spec §4.A
    /// splitter declaration's `input` field); almost always `Precipitation`
    /// for a rain/snow split but left generic for a `multi_fluxes` fan-out
    /// driven by a different forcing.
    pub input: VariableKind,
}

#[derive(Default, Debug)]
pub struct SplitterVec {
    splitters: Vec<SplitterInstance>,
}

impl Deref for SplitterVec {
    type Target = Vec<SplitterInstance>;
    fn deref(&self) -> &Self::Target {
        &self.splitters
    }
}

impl DerefMut for SplitterVec {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.splitters
    }
}

impl SplitterVec {
    pub fn get(&self, index: SplitterIndex) -> Result<&SplitterInstance, HydroError> {
        self.splitters
            .get(*index)
            .ok_or_else(|| HydroError::NotFound(format!("splitter index {index}")))
    }

    pub fn get_mut(&mut self, index: SplitterIndex) -> Result<&mut SplitterInstance, HydroError> {
        self.splitters
            .get_mut(*index)
            .ok_or_else(|| HydroError::NotFound(format!("splitter index {index}")))
    }

    pub fn push(&mut self, mut instance: SplitterInstance) -> SplitterIndex {
        let index = SplitterIndex(self.splitters.len());
        instance.index = index;
        self.splitters.push(instance);
        index
    }

    pub fn index_by_name(&self, name: &str) -> Option<SplitterIndex> {
        self.splitters.iter().find(|s| s.name == name).map(|s| s.index)
    }
}
