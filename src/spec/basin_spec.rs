//! Hydro-unit layout and lateral snow redistribution declarations.

use serde::{Deserialize, Serialize};

use crate::unit::AspectClass;

/// One land-cover brick's areal share of a hydro-unit; shares must sum to `1.0`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LandCoverFractionDef {
    pub brick_name: String,
    pub fraction: f64,
}

/// One hydro-unit: its area and, optionally, the physiographic attributes
/// used by aspect-dependent and elevation-dependent processes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnitDef {
    pub id: String,
    pub area_m2: f64,
    #[serde(default)]
    pub elevation_m: Option<f64>,
    #[serde(default)]
    pub slope_deg: Option<f64>,
    #[serde(default)]
    pub aspect_class: Option<AspectClass>,
    #[serde(default)]
    pub land_covers: Vec<LandCoverFractionDef>,
}

/// One lateral snow transfer between two hydro-units, applied once per
/// step between the forcing sampler and the solver pass (spec §4.E).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnowRedistributionConnection {
    pub donor_unit: String,
    pub receiver_unit: String,
    /// Fraction of the donor's snow water equivalent transferred each step.
    pub fraction: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedistributionSpec {
    #[serde(default)]
    pub connections: Vec<SnowRedistributionConnection>,
    /// Below this donor slope, `transport:snow_slide` moves no mass at all
    /// regardless of `fraction` (spec §4.E).
    #[serde(default)]
    pub slope_holding_threshold_deg: f64,
    /// Below this donor SWE (mm), `transport:snow_slide` moves no mass at
    /// all regardless of `fraction` (spec §4.E).
    #[serde(default)]
    pub swe_holding_threshold_mm: f64,
}

impl Default for RedistributionSpec {
    fn default() -> Self {
        Self {
            connections: Vec::new(),
            slope_holding_threshold_deg: 0.0,
            swe_holding_threshold_mm: 0.0,
        }
    }
}

/// The spatial layout of a basin: its hydro-units and any lateral snow
/// redistribution topology between them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BasinSpec {
    pub units: Vec<UnitDef>,
    #[serde(default)]
    pub redistribution: RedistributionSpec,
}
