//! Passes incoming content straight through to its outputs, unmodified.

use crate::process::{RateContext, RateLaw};
use crate::HydroError;

/// An instantaneous pass-through, e.g. routing a rain splitter's rain
/// fraction straight to the unit outlet without a storage in between.
#[derive(Debug, Clone, Default)]
pub struct DirectRule;

impl RateLaw for DirectRule {
    fn compute_rates(&self, ctx: &RateContext) -> Result<Vec<f64>, HydroError> {
        if ctx.dt_days <= 0.0 {
            return Err(HydroError::ConceptionIssue("direct rule requires dt_days > 0".to_string()));
        }
        Ok(vec![ctx.content / ctx.dt_days])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unit::HydroUnit;

    #[test]
    fn passes_all_content_through_in_one_step() {
        let unit = HydroUnit::new(crate::unit::UnitIndex::default(), "u", 1.0);
        let ctx = RateContext {
            content: 12.0,
            glacier_ice_content: None,
            snow_content: None,
            dt_days: 1.0,
            unit: &unit,
            parameters: &[],
            forcings: &[],
            gating_snow_nonzero: None,
        };
        let rates = DirectRule.compute_rates(&ctx).unwrap();
        assert_eq!(rates[0] * ctx.dt_days, 12.0);
    }
}
