//! Distributes one input amount across N outputs by fixed weights.

use crate::splitter::{Splitter, SplitterContext};
use crate::HydroError;

/// Static-weight distribution, e.g. a glacier's melt routed partly to
/// direct runoff and partly to a downstream storage. Weights must sum to
/// `1.0`; this is enforced once by the builder, not re-checked every step.
#[derive(Debug, Clone)]
pub struct MultiFluxesSplitter {
    pub weights: Vec<f64>,
}

impl MultiFluxesSplitter {
    pub fn new(weights: Vec<f64>) -> Result<Self, HydroError> {
        let total: f64 = weights.iter().sum();
        if (total - 1.0).abs() > 1e-6 {
            return Err(HydroError::ConceptionIssue(format!(
                "multi-flux splitter weights sum to {total}, expected 1.0"
            )));
        }
        Ok(Self { weights })
    }
}

impl Splitter for MultiFluxesSplitter {
    fn split(&self, ctx: &SplitterContext) -> Result<Vec<f64>, HydroError> {
        Ok(self.weights.iter().map(|w| w * ctx.input_amount).collect())
    }
}
