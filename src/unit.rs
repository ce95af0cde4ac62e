//! Hydro-units: spatially lumped compute cells.

use std::fmt;
use std::ops::{Deref, DerefMut};

use serde::{Deserialize, Serialize};

use crate::brick::BrickIndex;
use crate::forcing::ForcingSlots;
use crate::splitter::SplitterIndex;
use crate::HydroError;

#[derive(Debug, Default, Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash)]
pub struct UnitIndex(usize);

impl Deref for UnitIndex {
    type Target = usize;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl fmt::Display for UnitIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Compass-aspect class used to select aspect-keyed degree-day factors.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AspectClass {
    N,
    E,
    W,
    S,
}

/// A spatially lumped compute cell: an ordered list of bricks and
/// splitters, per-unit forcing slots, and an outlet accumulator.
#[derive(Debug, Clone)]
pub struct HydroUnit {
    pub index: UnitIndex,
    pub id: String,
    pub area_m2: f64,
    pub elevation_m: Option<f64>,
    pub slope_deg: Option<f64>,
    pub aspect_class: Option<AspectClass>,
    pub bricks: Vec<BrickIndex>,
    pub splitters: Vec<SplitterIndex>,
    pub forcings: ForcingSlots,
    /// Sum of outgoing fluxes targeting `"outlet"` for the step just committed, mm.
    pub outlet_amount: f64,
}

impl HydroUnit {
    pub fn new(index: UnitIndex, id: impl Into<String>, area_m2: f64) -> Self {
        Self {
            index,
            id: id.into(),
            area_m2,
            elevation_m: None,
            slope_deg: None,
            aspect_class: None,
            bricks: Vec::new(),
            splitters: Vec::new(),
            forcings: ForcingSlots::default(),
            outlet_amount: 0.0,
        }
    }
}

#[derive(Default, Debug)]
pub struct UnitVec {
    units: Vec<HydroUnit>,
}

impl Deref for UnitVec {
    type Target = Vec<HydroUnit>;
    fn deref(&self) -> &Self::Target {
        &self.units
    }
}

impl DerefMut for UnitVec {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.units
    }
}

impl UnitVec {
    pub fn push(&mut self, id: impl Into<String>, area_m2: f64) -> UnitIndex {
        let index = UnitIndex(self.units.len());
        self.units.push(HydroUnit::new(index, id, area_m2));
        index
    }

    pub fn get(&self, index: UnitIndex) -> Result<&HydroUnit, HydroError> {
        self.units
            .get(*index)
            .ok_or_else(|| HydroError::NotFound(format!("unit index {index}")))
    }

    pub fn get_mut(&mut self, index: UnitIndex) -> Result<&mut HydroUnit, HydroError> {
        self.units
            .get_mut(*index)
            .ok_or_else(|| HydroError::NotFound(format!("unit index {index}")))
    }

    pub fn index_by_id(&self, id: &str) -> Option<UnitIndex> {
        self.units.iter().find(|u| u.id == id).map(|u| u.index)
    }

    pub fn total_area(&self) -> f64 {
        self.units.iter().map(|u| u.area_m2).sum()
    }
}
