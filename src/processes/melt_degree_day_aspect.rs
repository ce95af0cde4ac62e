//! Degree-day melt with an aspect-dependent degree-day factor.

use crate::forcing::VariableKind;
use crate::process::{RateContext, RateLaw};
use crate::unit::AspectClass;
use crate::HydroError;

/// As [`crate::processes::MeltDegreeDayRule`], but the degree-day factor is
/// selected by the owning hydro-unit's [`AspectClass`] rather than a single
/// shared value (spec §4.D "aspect-dependent melt", exercised by spec §8
/// scenario 4). `parameters` is `[factor_n, factor_e, factor_w, factor_s,
/// threshold]`; a unit without an `aspect_class` falls back to `factor_n`.
#[derive(Debug, Clone)]
pub struct MeltDegreeDayAspectRule;

impl RateLaw for MeltDegreeDayAspectRule {
    fn compute_rates(&self, ctx: &RateContext) -> Result<Vec<f64>, HydroError> {
        if ctx.parameters.len() < 5 {
            return Err(HydroError::MissingParameter(
                "factor_n/e/w/s + threshold".to_string(),
                "melt_degree_day_aspect".to_string(),
            ));
        }
        let (factor_n, factor_e, factor_w, factor_s, threshold) =
            (ctx.parameters[0], ctx.parameters[1], ctx.parameters[2], ctx.parameters[3], ctx.parameters[4]);
        let factor = match ctx.unit.aspect_class {
            Some(AspectClass::N) | None => factor_n,
            Some(AspectClass::E) => factor_e,
            Some(AspectClass::W) => factor_w,
            Some(AspectClass::S) => factor_s,
        };
        let temperature = *ctx
            .forcings
            .first()
            .ok_or_else(|| HydroError::ConceptionIssue("melt_degree_day_aspect requires a temperature forcing".to_string()))?;
        if let Some(false) = ctx.gating_snow_nonzero {
            return Ok(vec![0.0]);
        }
        Ok(vec![(factor * (temperature - threshold)).max(0.0)])
    }
}

pub const MELT_DEGREE_DAY_ASPECT_FORCINGS: [VariableKind; 1] = [VariableKind::Temperature];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unit::HydroUnit;

    #[test]
    fn south_facing_melts_faster_than_north() {
        let mut unit_s = HydroUnit::new(Default::default(), "s", 1.0);
        unit_s.aspect_class = Some(AspectClass::S);
        let mut unit_n = HydroUnit::new(Default::default(), "n", 1.0);
        unit_n.aspect_class = Some(AspectClass::N);
        let params = [1.0, 2.0, 2.0, 4.0, 0.0];

        let ctx_s = RateContext {
            content: 10.0,
            glacier_ice_content: None,
            snow_content: None,
            dt_days: 1.0,
            unit: &unit_s,
            parameters: &params,
            forcings: &[5.0],
            gating_snow_nonzero: None,
        };
        let ctx_n = RateContext { unit: &unit_n, ..ctx_s };

        let melt_s = MeltDegreeDayAspectRule.compute_rates(&ctx_s).unwrap()[0];
        let melt_n = MeltDegreeDayAspectRule.compute_rates(&ctx_n).unwrap()[0];
        assert!(melt_s > melt_n);
        assert_eq!(melt_s, 20.0);
        assert_eq!(melt_n, 5.0);
    }
}
