//! Firnification: transforms persistent snowpack into glacier ice.

use crate::process::{RateContext, RateLaw};
use crate::HydroError;

/// `rate = max(0, coefficient * (snow_content - threshold))`, converting
/// standing snow water equivalent above `threshold` into ice at a fixed
/// per-day fraction (spec §4.D "snow-to-ice transformation"). Targets the
/// owning glacier brick's `ice` compartment rather than its main container.
/// `parameters` is `[coefficient, threshold]`.
#[derive(Debug, Clone)]
pub struct TransformSnowToIceRule;

impl RateLaw for TransformSnowToIceRule {
    fn compute_rates(&self, ctx: &RateContext) -> Result<Vec<f64>, HydroError> {
        let coefficient = *ctx
            .parameters
            .first()
            .ok_or_else(|| HydroError::MissingParameter("coefficient".to_string(), "transform_snow_to_ice".to_string()))?;
        let threshold = *ctx.parameters.get(1).unwrap_or(&0.0);
        let snow_content = ctx
            .snow_content
            .ok_or_else(|| HydroError::ConceptionIssue("transform_snow_to_ice requires a snow compartment".to_string()))?;
        Ok(vec![(coefficient * (snow_content - threshold)).max(0.0)])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unit::HydroUnit;

    #[test]
    fn no_transform_below_threshold() {
        let unit = HydroUnit::new(Default::default(), "u", 1.0);
        let ctx = RateContext {
            content: 0.0,
            glacier_ice_content: Some(0.0),
            snow_content: Some(500.0),
            dt_days: 1.0,
            unit: &unit,
            parameters: &[0.001, 1000.0],
            forcings: &[],
            gating_snow_nonzero: None,
        };
        assert_eq!(TransformSnowToIceRule.compute_rates(&ctx).unwrap(), vec![0.0]);
    }

    #[test]
    fn transforms_excess_above_threshold() {
        let unit = HydroUnit::new(Default::default(), "u", 1.0);
        let ctx = RateContext {
            content: 0.0,
            glacier_ice_content: Some(0.0),
            snow_content: Some(1500.0),
            dt_days: 1.0,
            unit: &unit,
            parameters: &[0.001, 1000.0],
            forcings: &[],
            gating_snow_nonzero: None,
        };
        assert_eq!(TransformSnowToIceRule.compute_rates(&ctx).unwrap(), vec![0.5]);
    }
}
