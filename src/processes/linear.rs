//! A linear storage outflow: outflow rate proportional to content.

use crate::process::{RateContext, RateLaw};
use crate::HydroError;

/// `outflow = k * content`, the textbook linear reservoir (spec §4.D
/// "linear storage discharge", verified against spec §8 scenarios 1 and 2).
/// `parameters[0]` is the response coefficient `k`, per day.
#[derive(Debug, Clone)]
pub struct LinearStorageRule;

impl RateLaw for LinearStorageRule {
    fn compute_rates(&self, ctx: &RateContext) -> Result<Vec<f64>, HydroError> {
        let k = *ctx
            .parameters
            .first()
            .ok_or_else(|| HydroError::MissingParameter("k".to_string(), "linear_storage".to_string()))?;
        Ok(vec![k * ctx.content])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unit::HydroUnit;

    #[test]
    fn scales_linearly_with_content() {
        let unit = HydroUnit::new(Default::default(), "u", 1.0);
        let ctx = RateContext {
            content: 20.0,
            glacier_ice_content: None,
            snow_content: None,
            dt_days: 1.0,
            unit: &unit,
            parameters: &[0.1],
            forcings: &[],
            gating_snow_nonzero: None,
        };
        let rates = LinearStorageRule.compute_rates(&ctx).unwrap();
        assert_eq!(rates[0], 2.0);
    }
}
