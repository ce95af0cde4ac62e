//! Bricks: storages, snowpacks, glaciers and land-cover surfaces.

use std::fmt;
use std::ops::{Deref, DerefMut};

use serde::{Deserialize, Serialize};

use crate::flux::FluxIndex;
use crate::process::ProcessIndex;
use crate::HydroError;

#[derive(Debug, Default, Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash)]
pub struct BrickIndex(usize);

impl Deref for BrickIndex {
    type Target = usize;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl fmt::Display for BrickIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A named compartment within a brick other than its primary container
/// (e.g. a glacier's `ice` store or a snowpack's `snow` store).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CompartmentKind {
    Snow,
    Ice,
}

/// Land-cover brick sub-type (spec §3 "Brick").
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LandCoverKind {
    Generic,
    Glacier,
    Snowpack,
    Vegetation,
    Urban,
}

/// What kind of brick this is, collapsing the teacher's conceptual
/// "deep virtual inheritance" into a single tagged variant (spec §9).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum BrickKind {
    Storage,
    LandCover(LandCoverKind),
}

/// Small capabilities bitset replacing virtual dispatch (spec §9).
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub has_container: bool,
    pub needs_solver: bool,
    pub is_snowpack: bool,
    pub is_glacier: bool,
}

const EPSILON: f64 = 1e-8;

/// A mutable scalar water container: `content` (mm), a pending
/// `content_change` accumulator used during a solver sub-step, an optional
/// `capacity`, and an optional bound overflow process.
#[derive(Debug, Clone, Default)]
pub struct WaterContainer {
    pub content: f64,
    pub content_change: f64,
    pub capacity: Option<f64>,
    pub overflow: Option<ProcessIndex>,
    pub infinite_storage: bool,
}

impl WaterContainer {
    pub fn new(capacity: Option<f64>) -> Self {
        Self {
            content: 0.0,
            content_change: 0.0,
            capacity,
            overflow: None,
            infinite_storage: false,
        }
    }

    pub fn infinite() -> Self {
        Self {
            infinite_storage: true,
            ..Self::default()
        }
    }

    pub fn with_initial_content(mut self, content: f64) -> Self {
        self.content = content;
        self
    }

    /// Content as it would be if `content_change` were applied now.
    pub fn staged_content(&self) -> f64 {
        self.content + self.content_change
    }

    /// Snapshot the committed content, for the solver to bracket provisional
    /// stage evaluations (spec §9 "provisional state for Heun/RK4").
    pub fn snapshot(&self) -> f64 {
        self.content
    }

    pub fn restore(&mut self, snapshot: f64) {
        self.content = snapshot;
    }

    /// Commit the pending change into `content`, per spec §4.C step 6.
    pub fn commit(&mut self) {
        self.content += self.content_change;
        self.content_change = 0.0;
        if !self.infinite_storage {
            if self.content < 0.0 {
                debug_assert!(self.content > -1e-6, "content went meaningfully negative: {}", self.content);
                self.content = self.content.max(0.0);
            }
        }
    }

    pub fn check_invariants(&self) -> Result<(), HydroError> {
        if self.infinite_storage {
            return Ok(());
        }
        if self.content < -EPSILON {
            return Err(HydroError::NumericFault {
                step: 0,
                unit: String::new(),
                component: String::new(),
                detail: format!("water container content went negative: {}", self.content),
            });
        }
        if let Some(capacity) = self.capacity {
            if self.content > capacity + EPSILON {
                return Err(HydroError::NumericFault {
                    step: 0,
                    unit: String::new(),
                    component: String::new(),
                    detail: format!("water container content {} exceeds capacity {}", self.content, capacity),
                });
            }
        }
        Ok(())
    }
}

/// A reservoir, with zero or more processes, fluxes and a water container.
#[derive(Debug, Clone)]
pub struct Brick {
    pub index: BrickIndex,
    pub name: String,
    pub kind: BrickKind,
    pub capabilities: Capabilities,
    pub container: Option<WaterContainer>,
    /// Glacier-only secondary ice compartment.
    pub ice: Option<WaterContainer>,
    /// Snowpack-only: snow water equivalent plus liquid retention.
    pub snow: Option<WaterContainer>,
    pub liquid_water: f64,
    /// Land-cover fraction of the owning unit's area; `None` for non-land-cover bricks (implicit 1.0).
    pub fraction: Option<f64>,
    pub processes: Vec<ProcessIndex>,
    pub incoming_fluxes: Vec<FluxIndex>,
    /// Glacier-only: treat `ice` as inexhaustible and skip constraint
    /// enforcement / commit finalisation (spec §4.C "Glacier exception").
    pub unlimited_supply: bool,
    /// Glacier-only: zero ice-melt whenever the gating snowpack's `snow` is nonzero.
    pub no_melt_when_snow_cover: bool,
    pub gating_snowpack: Option<BrickIndex>,
}

impl Brick {
    pub fn fraction_or_one(&self) -> f64 {
        self.fraction.unwrap_or(1.0)
    }

    pub fn snapshot_all(&self) -> BrickSnapshot {
        BrickSnapshot {
            container: self.container.as_ref().map(|c| c.snapshot()),
            ice: self.ice.as_ref().map(|c| c.snapshot()),
            snow: self.snow.as_ref().map(|c| c.snapshot()),
        }
    }

    pub fn restore_all(&mut self, snap: &BrickSnapshot) {
        if let (Some(c), Some(v)) = (&mut self.container, snap.container) {
            c.restore(v);
        }
        if let (Some(c), Some(v)) = (&mut self.ice, snap.ice) {
            c.restore(v);
        }
        if let (Some(c), Some(v)) = (&mut self.snow, snap.snow) {
            c.restore(v);
        }
    }

    pub fn commit_all(&mut self) {
        if !self.unlimited_supply {
            if let Some(c) = &mut self.container {
                c.commit();
            }
            if let Some(c) = &mut self.ice {
                c.commit();
            }
        } else if let Some(c) = &mut self.ice {
            // Unlimited supply: content stays conceptually infinite; still drain the accumulator.
            c.content_change = 0.0;
        }
        if let Some(c) = &mut self.snow {
            c.commit();
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct BrickSnapshot {
    pub container: Option<f64>,
    pub ice: Option<f64>,
    pub snow: Option<f64>,
}

#[derive(Default, Debug)]
pub struct BrickVec {
    bricks: Vec<Brick>,
}

impl Deref for BrickVec {
    type Target = Vec<Brick>;
    fn deref(&self) -> &Self::Target {
        &self.bricks
    }
}

impl DerefMut for BrickVec {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.bricks
    }
}

impl BrickVec {
    pub fn get(&self, index: BrickIndex) -> Result<&Brick, HydroError> {
        self.bricks
            .get(*index)
            .ok_or_else(|| HydroError::NotFound(format!("brick index {index}")))
    }

    pub fn get_mut(&mut self, index: BrickIndex) -> Result<&mut Brick, HydroError> {
        self.bricks
            .get_mut(*index)
            .ok_or_else(|| HydroError::NotFound(format!("brick index {index}")))
    }

    pub fn index_by_name(&self, name: &str) -> Option<BrickIndex> {
        self.bricks.iter().find(|b| b.name == name).map(|b| b.index)
    }

    pub fn push(&mut self, mut brick: Brick) -> BrickIndex {
        let index = BrickIndex(self.bricks.len());
        brick.index = index;
        self.bricks.push(brick);
        index
    }
}
