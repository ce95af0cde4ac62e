//! The solver, time window, and object-graph declarations of a model.

use serde::{Deserialize, Serialize};

use crate::mjd::Mjd;
use crate::parameter::ParameterValue;

/// A target string the builder resolves into a direct [`crate::flux::FluxTarget`]:
/// `"outlet"`, `"<brick-name>"`, or `"<brick-name>:<compartment>"` (spec §4.B).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FluxTargetDef {
    pub target: String,
    #[serde(default = "default_flux_kind")]
    pub kind: String,
}

fn default_flux_kind() -> String {
    "water".to_string()
}

/// A storage or land-cover brick declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrickDef {
    pub name: String,
    /// `"storage"`, or a land-cover kind (`"generic"`, `"glacier"`, `"snowpack"`, `"vegetation"`, `"urban"`).
    pub kind: String,
    #[serde(default)]
    pub capacity: Option<f64>,
    #[serde(default)]
    pub initial_content: f64,
    #[serde(default)]
    pub has_snow_compartment: bool,
    #[serde(default)]
    pub initial_snow_content: f64,
    #[serde(default)]
    pub unlimited_supply: bool,
    #[serde(default)]
    pub no_melt_when_snow_cover: bool,
    #[serde(default)]
    pub gating_snowpack: Option<String>,
    /// When set, the builder wires an implicit forcing flux delivering the
    /// unit's sampled precipitation straight into this brick's container
    /// every step, without requiring an explicit splitter (spec §4.B).
    #[serde(default)]
    pub receives_precipitation: bool,
}

/// A reference to either a literal constant or a named, possibly
/// time-varying, parameter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterRef {
    Literal(f64),
    Named(String),
}

/// A process declaration: one rate law bound to one brick, with its
/// output targets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessDef {
    pub name: String,
    pub brick: String,
    pub kind: String,
    #[serde(default)]
    pub parameters: Vec<ParameterRef>,
    pub outputs: Vec<FluxTargetDef>,
}

/// A named, possibly time-varying, parameter available to any process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterDef {
    pub name: String,
    pub value: ParameterValue,
}

/// A splitter declaration: one input (a forcing variable or a named
/// upstream process output) distributed across named outputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitterDef {
    pub name: String,
    /// `"snow_rain"` or `"multi_fluxes"`.
    pub kind: String,
    /// `"precipitation"` or another forcing kind sampled directly.
    pub input: String,
    pub outputs: Vec<FluxTargetDef>,
    #[serde(default)]
    pub transition_start_c: Option<f64>,
    #[serde(default)]
    pub transition_end_c: Option<f64>,
    #[serde(default)]
    pub weights: Option<Vec<f64>>,
}

/// The full declaration of a model's object graph, solver and time window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSpec {
    /// `"euler_explicit"`, `"heun_explicit"` or `"runge_kutta"`/`"rk4"` (case-insensitive).
    pub solver: String,
    pub start: Mjd,
    pub end: Mjd,
    pub step: u64,
    /// `"minute"`, `"hour"`, `"day"` or `"week"`.
    pub step_unit: String,
    pub bricks: Vec<BrickDef>,
    #[serde(default)]
    pub processes: Vec<ProcessDef>,
    #[serde(default)]
    pub splitters: Vec<SplitterDef>,
    #[serde(default)]
    pub parameters: Vec<ParameterDef>,
}
