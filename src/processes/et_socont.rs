//! Socont-style actual evapotranspiration: potential ET limited by storage.

use crate::forcing::VariableKind;
use crate::process::{RateContext, RateLaw};
use crate::HydroError;

/// Actual ET drawn from a storage: `min(pet, content / dt)`, i.e. PET is
/// delivered in full whenever enough water is available and otherwise the
/// storage is drawn down to exactly zero over the step (spec §4.D, after the
/// Socont / GSM-Socont actual-ET reduction). `forcings[0]` must be
/// [`VariableKind::Pet`].
#[derive(Debug, Clone)]
pub struct EtSocontRule;

impl RateLaw for EtSocontRule {
    fn compute_rates(&self, ctx: &RateContext) -> Result<Vec<f64>, HydroError> {
        let pet = *ctx
            .forcings
            .first()
            .ok_or_else(|| HydroError::ConceptionIssue("et_socont requires a PET forcing".to_string()))?;
        let available_rate = (ctx.content / ctx.dt_days).max(0.0);
        Ok(vec![pet.max(0.0).min(available_rate)])
    }
}

pub const ET_SOCONT_FORCINGS: [VariableKind; 1] = [VariableKind::Pet];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unit::HydroUnit;

    #[test]
    fn limited_by_available_content() {
        let unit = HydroUnit::new(Default::default(), "u", 1.0);
        let ctx = RateContext {
            content: 2.0,
            glacier_ice_content: None,
            snow_content: None,
            dt_days: 1.0,
            unit: &unit,
            parameters: &[],
            forcings: &[5.0],
            gating_snow_nonzero: None,
        };
        assert_eq!(EtSocontRule.compute_rates(&ctx).unwrap(), vec![2.0]);
    }

    #[test]
    fn full_pet_when_content_sufficient() {
        let unit = HydroUnit::new(Default::default(), "u", 1.0);
        let ctx = RateContext {
            content: 20.0,
            glacier_ice_content: None,
            snow_content: None,
            dt_days: 1.0,
            unit: &unit,
            parameters: &[],
            forcings: &[3.0],
            gating_snow_nonzero: None,
        };
        assert_eq!(EtSocontRule.compute_rates(&ctx).unwrap(), vec![3.0]);
    }
}
