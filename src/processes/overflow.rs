//! Spills content above a container's capacity to a bound overflow target.

use crate::process::{RateContext, RateLaw};
use crate::HydroError;

/// Converts the portion of `content` above `capacity` (`parameters[0]`)
/// into a per-day rate. The generic constraint stage still re-derives and
/// caps the actual overflow amount (spec §4.C); this rate law only supplies
/// the "how much is above capacity right now" signal so that a dedicated
/// overflow process can route that excess to an explicit target instead of
/// silently clipping it.
#[derive(Debug, Clone)]
pub struct OverflowRule;

impl RateLaw for OverflowRule {
    fn compute_rates(&self, ctx: &RateContext) -> Result<Vec<f64>, HydroError> {
        let capacity = *ctx
            .parameters
            .first()
            .ok_or_else(|| HydroError::MissingParameter("capacity".to_string(), "overflow".to_string()))?;
        let excess = (ctx.content - capacity).max(0.0);
        Ok(vec![excess / ctx.dt_days])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unit::HydroUnit;

    #[test]
    fn zero_below_capacity() {
        let unit = HydroUnit::new(Default::default(), "u", 1.0);
        let ctx = RateContext {
            content: 5.0,
            glacier_ice_content: None,
            snow_content: None,
            dt_days: 1.0,
            unit: &unit,
            parameters: &[10.0],
            forcings: &[],
            gating_snow_nonzero: None,
        };
        assert_eq!(OverflowRule.compute_rates(&ctx).unwrap(), vec![0.0]);
    }

    #[test]
    fn spills_excess_above_capacity() {
        let unit = HydroUnit::new(Default::default(), "u", 1.0);
        let ctx = RateContext {
            content: 15.0,
            glacier_ice_content: None,
            snow_content: None,
            dt_days: 1.0,
            unit: &unit,
            parameters: &[10.0],
            forcings: &[],
            gating_snow_nonzero: None,
        };
        assert_eq!(OverflowRule.compute_rates(&ctx).unwrap(), vec![5.0]);
    }
}
