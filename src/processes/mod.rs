//! Concrete rate laws and the kind tag used to select one at build time.

mod direct;
mod et_socont;
mod linear;
mod melt_degree_day;
mod melt_degree_day_aspect;
mod melt_temperature_index;
mod overflow;
mod transform_snow_to_ice;

pub use direct::DirectRule;
pub use et_socont::EtSocontRule;
pub use linear::LinearStorageRule;
pub use melt_degree_day::MeltDegreeDayRule;
pub use melt_degree_day_aspect::MeltDegreeDayAspectRule;
pub use melt_temperature_index::MeltTemperatureIndexRule;
pub use overflow::OverflowRule;
pub use transform_snow_to_ice::TransformSnowToIceRule;

use serde::{Deserialize, Serialize};

use crate::brick::CompartmentKind;
use crate::forcing::VariableKind;
use crate::process::{ProcessCategory, RateLaw};
use crate::HydroError;

/// The rate law a process spec declares by name; the builder resolves this
/// into a boxed [`RateLaw`] (spec §4.A "process kind").
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProcessKind {
    Direct,
    LinearStorage,
    Overflow,
    EtSocont,
    MeltDegreeDay,
    MeltDegreeDayAspect,
    MeltTemperatureIndex,
    TransformSnowToIce,
}

impl ProcessKind {
    pub fn parse(value: &str) -> Result<Self, HydroError> {
        match value {
            "direct" => Ok(Self::Direct),
            "linear_storage" => Ok(Self::LinearStorage),
            "overflow" => Ok(Self::Overflow),
            "et_socont" => Ok(Self::EtSocont),
            "melt_degree_day" => Ok(Self::MeltDegreeDay),
            "melt_degree_day_aspect" => Ok(Self::MeltDegreeDayAspect),
            "melt_temperature_index" => Ok(Self::MeltTemperatureIndex),
            "transform_snow_to_ice" => Ok(Self::TransformSnowToIce),
            other => Err(HydroError::UnknownProcessKind(other.to_string())),
        }
    }

    /// Whether this process's rates are recomputed at every solver stage
    /// from provisional content (`Ode`), computed once per step
    /// (`Instantaneous`), or invoked only by the capacity handler
    /// (`Overflow`, spec §4.D: "only invoked by the capacity handler, never
    /// scheduled directly").
    pub fn category(&self) -> ProcessCategory {
        match self {
            ProcessKind::Direct => ProcessCategory::Instantaneous,
            ProcessKind::Overflow => ProcessCategory::Overflow,
            ProcessKind::LinearStorage
            | ProcessKind::EtSocont
            | ProcessKind::MeltDegreeDay
            | ProcessKind::MeltDegreeDayAspect
            | ProcessKind::MeltTemperatureIndex
            | ProcessKind::TransformSnowToIce => ProcessCategory::Ode,
        }
    }

    /// Whether this process's outflow counts as evapotranspiration for
    /// logging purposes (spec §6 "get_total_et").
    pub fn is_et(&self) -> bool {
        matches!(self, ProcessKind::EtSocont)
    }

    /// Which compartment of the bound brick this rate law reads/drains from.
    ///
    /// Resolved against the concrete brick a process is attached to rather
    /// than fixed per kind: the three melt variants drain a snowpack's snow
    /// compartment when wired onto a snowpack, but drain a glacier's ice
    /// compartment when wired directly onto a glacier brick (no snowpack in
    /// between), matching either melt pathway without a distinct process kind.
    pub fn source_compartment_for(&self, brick: &crate::brick::Brick) -> Option<CompartmentKind> {
        match self {
            ProcessKind::MeltDegreeDay | ProcessKind::MeltDegreeDayAspect | ProcessKind::MeltTemperatureIndex => {
                if brick.capabilities.is_glacier && brick.snow.is_none() {
                    Some(CompartmentKind::Ice)
                } else {
                    Some(CompartmentKind::Snow)
                }
            }
            ProcessKind::TransformSnowToIce => Some(CompartmentKind::Snow),
            ProcessKind::Direct | ProcessKind::LinearStorage | ProcessKind::Overflow | ProcessKind::EtSocont => None,
        }
    }

    pub fn required_forcings(&self) -> &'static [VariableKind] {
        match self {
            ProcessKind::Direct | ProcessKind::LinearStorage | ProcessKind::Overflow | ProcessKind::TransformSnowToIce => &[],
            ProcessKind::EtSocont => &et_socont::ET_SOCONT_FORCINGS,
            ProcessKind::MeltDegreeDay => &melt_degree_day::MELT_DEGREE_DAY_FORCINGS,
            ProcessKind::MeltDegreeDayAspect => &melt_degree_day_aspect::MELT_DEGREE_DAY_ASPECT_FORCINGS,
            ProcessKind::MeltTemperatureIndex => &melt_temperature_index::MELT_TEMPERATURE_INDEX_FORCINGS,
        }
    }

    /// Number of parameters this rate law expects, for early validation by the builder.
    pub fn expected_parameter_count(&self) -> usize {
        match self {
            ProcessKind::Direct => 0,
            ProcessKind::LinearStorage => 1,
            ProcessKind::Overflow => 1,
            ProcessKind::EtSocont => 0,
            ProcessKind::MeltDegreeDay => 2,
            ProcessKind::MeltDegreeDayAspect => 5,
            ProcessKind::MeltTemperatureIndex => 3,
            ProcessKind::TransformSnowToIce => 2,
        }
    }

    pub fn build_rate_law(&self) -> Box<dyn RateLaw + Send + Sync> {
        match self {
            ProcessKind::Direct => Box::new(DirectRule),
            ProcessKind::LinearStorage => Box::new(LinearStorageRule),
            ProcessKind::Overflow => Box::new(OverflowRule),
            ProcessKind::EtSocont => Box::new(EtSocontRule),
            ProcessKind::MeltDegreeDay => Box::new(MeltDegreeDayRule),
            ProcessKind::MeltDegreeDayAspect => Box::new(MeltDegreeDayAspectRule),
            ProcessKind::MeltTemperatureIndex => Box::new(MeltTemperatureIndexRule),
            ProcessKind::TransformSnowToIce => Box::new(TransformSnowToIceRule),
        }
    }
}
