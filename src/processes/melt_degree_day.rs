//! The classic degree-day snow/ice melt model.

use crate::forcing::VariableKind;
use crate::process::{RateContext, RateLaw};
use crate::HydroError;

/// `melt = max(0, factor * (T - threshold))` (spec §4.D, verified against
/// spec §8 scenario 3 including the capped-melt edge case handled by the
/// generic constraint stage, not here). `parameters[0]` is the degree-day
/// factor in mm/day/degC, `parameters[1]` the melt threshold temperature in
/// degC. `forcings[0]` must be [`VariableKind::Temperature`].
#[derive(Debug, Clone)]
pub struct MeltDegreeDayRule;

impl RateLaw for MeltDegreeDayRule {
    fn compute_rates(&self, ctx: &RateContext) -> Result<Vec<f64>, HydroError> {
        let factor = *ctx
            .parameters
            .first()
            .ok_or_else(|| HydroError::MissingParameter("degree_day_factor".to_string(), "melt_degree_day".to_string()))?;
        let threshold = *ctx
            .parameters
            .get(1)
            .ok_or_else(|| HydroError::MissingParameter("melt_threshold".to_string(), "melt_degree_day".to_string()))?;
        let temperature = *ctx
            .forcings
            .first()
            .ok_or_else(|| HydroError::ConceptionIssue("melt_degree_day requires a temperature forcing".to_string()))?;
        if let Some(false) = ctx.gating_snow_nonzero {
            return Ok(vec![0.0]);
        }
        let melt = (factor * (temperature - threshold)).max(0.0);
        Ok(vec![melt])
    }
}

pub const MELT_DEGREE_DAY_FORCINGS: [VariableKind; 1] = [VariableKind::Temperature];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unit::HydroUnit;

    #[test]
    fn no_melt_below_threshold() {
        let unit = HydroUnit::new(Default::default(), "u", 1.0);
        let ctx = RateContext {
            content: 50.0,
            glacier_ice_content: None,
            snow_content: None,
            dt_days: 1.0,
            unit: &unit,
            parameters: &[3.0, 0.0],
            forcings: &[-1.0],
            gating_snow_nonzero: None,
        };
        assert_eq!(MeltDegreeDayRule.compute_rates(&ctx).unwrap(), vec![0.0]);
    }

    #[test]
    fn melt_scales_with_degrees_above_threshold() {
        let unit = HydroUnit::new(Default::default(), "u", 1.0);
        let ctx = RateContext {
            content: 50.0,
            glacier_ice_content: None,
            snow_content: None,
            dt_days: 1.0,
            unit: &unit,
            parameters: &[3.0, 0.0],
            forcings: &[6.0],
            gating_snow_nonzero: None,
        };
        assert_eq!(MeltDegreeDayRule.compute_rates(&ctx).unwrap(), vec![18.0]);
    }

    #[test]
    fn gated_by_glacier_snow_cover() {
        let unit = HydroUnit::new(Default::default(), "u", 1.0);
        let ctx = RateContext {
            content: 50.0,
            glacier_ice_content: None,
            snow_content: None,
            dt_days: 1.0,
            unit: &unit,
            parameters: &[3.0, 0.0],
            forcings: &[6.0],
            gating_snow_nonzero: Some(false),
        };
        assert_eq!(MeltDegreeDayRule.compute_rates(&ctx).unwrap(), vec![0.0]);
    }
}
