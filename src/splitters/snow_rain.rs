//! Splits precipitation into snow and rain by air temperature.

use crate::splitter::{Splitter, SplitterContext};
use crate::HydroError;

/// Below `transition_start` all precipitation falls as snow; above
/// `transition_end` all of it falls as rain; in between the snow fraction
/// decreases linearly. Setting `transition_start == transition_end`
/// recovers a single threshold.
#[derive(Debug, Clone)]
pub struct SnowRainSplitter {
    pub transition_start_c: f64,
    pub transition_end_c: f64,
}

impl SnowRainSplitter {
    pub fn new(transition_start_c: f64, transition_end_c: f64) -> Self {
        Self {
            transition_start_c,
            transition_end_c,
        }
    }

    fn snow_fraction(&self, temperature: f64) -> f64 {
        if temperature <= self.transition_start_c {
            1.0
        } else if temperature >= self.transition_end_c {
            0.0
        } else {
            let span = self.transition_end_c - self.transition_start_c;
            if span.abs() < f64::EPSILON {
                0.0
            } else {
                1.0 - (temperature - self.transition_start_c) / span
            }
        }
    }
}

impl Splitter for SnowRainSplitter {
    /// Outputs are `[rain_amount, snow_amount]`.
    fn split(&self, ctx: &SplitterContext) -> Result<Vec<f64>, HydroError> {
        let temperature = ctx.temperature.ok_or_else(|| {
            HydroError::ConceptionIssue("snow/rain splitter requires a temperature forcing".to_string())
        })?;
        let snow_fraction = self.snow_fraction(temperature).clamp(0.0, 1.0);
        let snow = ctx.input_amount * snow_fraction;
        let rain = ctx.input_amount - snow;
        Ok(vec![rain, snow])
    }
}
