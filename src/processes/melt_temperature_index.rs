//! An enhanced temperature-index melt model with a radiation term.

use crate::forcing::VariableKind;
use crate::process::{RateContext, RateLaw};
use crate::HydroError;

/// `melt = max(0, (factor + radiation_factor * radiation) * (T - threshold))`
/// (spec §4.D "radiation-enhanced temperature index"). `parameters` is
/// `[factor, radiation_factor, threshold]`; `forcings` is
/// `[temperature, radiation]`.
#[derive(Debug, Clone)]
pub struct MeltTemperatureIndexRule;

impl RateLaw for MeltTemperatureIndexRule {
    fn compute_rates(&self, ctx: &RateContext) -> Result<Vec<f64>, HydroError> {
        if ctx.parameters.len() < 3 {
            return Err(HydroError::MissingParameter(
                "factor/radiation_factor/threshold".to_string(),
                "melt_temperature_index".to_string(),
            ));
        }
        if ctx.forcings.len() < 2 {
            return Err(HydroError::ConceptionIssue(
                "melt_temperature_index requires temperature and radiation forcings".to_string(),
            ));
        }
        let (factor, radiation_factor, threshold) = (ctx.parameters[0], ctx.parameters[1], ctx.parameters[2]);
        let (temperature, radiation) = (ctx.forcings[0], ctx.forcings[1]);
        if let Some(false) = ctx.gating_snow_nonzero {
            return Ok(vec![0.0]);
        }
        let combined_factor = factor + radiation_factor * radiation;
        Ok(vec![(combined_factor * (temperature - threshold)).max(0.0)])
    }
}

pub const MELT_TEMPERATURE_INDEX_FORCINGS: [VariableKind; 2] = [VariableKind::Temperature, VariableKind::Radiation];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::unit::HydroUnit;

    #[test]
    fn radiation_increases_melt() {
        let unit = HydroUnit::new(Default::default(), "u", 1.0);
        let ctx = RateContext {
            content: 50.0,
            glacier_ice_content: None,
            snow_content: None,
            dt_days: 1.0,
            unit: &unit,
            parameters: &[1.0, 0.01, 0.0],
            forcings: &[5.0, 100.0],
            gating_snow_nonzero: None,
        };
        assert_eq!(MeltTemperatureIndexRule.compute_rates(&ctx).unwrap(), vec![10.0]);
    }
}
