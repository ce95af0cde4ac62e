//! Named scalar parameters and their time-varying lookup.
//!
//! Parameters are owned by the model spec at build time (see
//! [`crate::spec::model_spec::ParameterDef`]); the [`ParameterStore`] holds
//! the live runtime copies and an [`update`](ParameterStore::update) step
//! rewrites the "current value" slot of every variable parameter once per
//! time-step, mirroring the teacher's split between a parameter's
//! declaration and its live state slot.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::ops::Deref;

use tracing::warn;

use crate::mjd::Mjd;
use crate::HydroError;

/// Index of a parameter in a [`ParameterStore`].
#[derive(Debug, Default, Copy, Clone, Ord, PartialOrd, Eq, PartialEq, Hash)]
pub struct ParameterIndex(usize);

impl Deref for ParameterIndex {
    type Target = usize;
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl fmt::Display for ParameterIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The declared, possibly time-varying, value of a parameter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterValue {
    Constant(f64),
    VariableYearly { start_year: i32, end_year: i32, values: Vec<f64> },
    VariableMonthly { values: [f64; 12] },
    VariableDates { dates: Vec<f64>, values: Vec<f64> },
}

impl ParameterValue {
    /// Validate internal shape invariants (lengths match the declared range).
    pub fn validate(&self, name: &str) -> Result<(), HydroError> {
        match self {
            ParameterValue::VariableYearly {
                start_year,
                end_year,
                values,
            } => {
                let expected = (*end_year - *start_year + 1).max(0) as usize;
                if values.len() != expected {
                    return Err(HydroError::ParameterLengthMismatch {
                        name: name.to_string(),
                        expected,
                        got: values.len(),
                    });
                }
            }
            ParameterValue::VariableDates { dates, values } => {
                if dates.len() != values.len() {
                    return Err(HydroError::ParameterLengthMismatch {
                        name: name.to_string(),
                        expected: dates.len(),
                        got: values.len(),
                    });
                }
            }
            ParameterValue::VariableMonthly { .. } | ParameterValue::Constant(_) => {}
        }
        Ok(())
    }

    /// Resolve the value that is in effect on `date`.
    ///
    /// Lookups outside the declared coverage produce `NaN` and log a warning
    /// rather than aborting (spec §7).
    fn resolve(&self, date: Mjd, name: &str) -> f64 {
        match self {
            ParameterValue::Constant(v) => *v,
            ParameterValue::VariableYearly {
                start_year,
                end_year,
                values,
            } => {
                let year = date.year();
                if year < *start_year || year > *end_year {
                    warn!("parameter `{name}`: year {year} outside coverage [{start_year}, {end_year}]");
                    return f64::NAN;
                }
                values[(year - start_year) as usize]
            }
            ParameterValue::VariableMonthly { values } => {
                let month = date.month();
                values[(month - 1) as usize]
            }
            ParameterValue::VariableDates { dates, values } => {
                // Step function: the value in effect is the last declared date <= `date`.
                match dates.iter().rposition(|d| *d <= date.value()) {
                    Some(i) => values[i],
                    None => {
                        warn!("parameter `{name}`: date {} precedes first declared date", date.value());
                        f64::NAN
                    }
                }
            }
        }
    }
}

/// A named parameter with a live "current value" slot read by processes.
#[derive(Debug, Clone)]
pub struct Parameter {
    pub name: String,
    pub value: ParameterValue,
    current: f64,
}

impl Parameter {
    pub fn new(name: impl Into<String>, value: ParameterValue) -> Self {
        let initial = match &value {
            ParameterValue::Constant(v) => *v,
            _ => 0.0,
        };
        Self {
            name: name.into(),
            value,
            current: initial,
        }
    }

    pub fn current(&self) -> f64 {
        self.current
    }
}

/// Owning collection of all parameters in a model, indexed by name.
#[derive(Debug, Default)]
pub struct ParameterStore {
    parameters: Vec<Parameter>,
    by_name: HashMap<String, ParameterIndex>,
}

impl ParameterStore {
    pub fn push(&mut self, parameter: Parameter) -> ParameterIndex {
        let index = ParameterIndex(self.parameters.len());
        self.by_name.insert(parameter.name.clone(), index);
        self.parameters.push(parameter);
        index
    }

    pub fn index_of(&self, name: &str) -> Option<ParameterIndex> {
        self.by_name.get(name).copied()
    }

    pub fn get(&self, index: ParameterIndex) -> Result<&Parameter, HydroError> {
        self.parameters
            .get(index.0)
            .ok_or_else(|| HydroError::NotFound(format!("parameter index {index}")))
    }

    pub fn value(&self, index: ParameterIndex) -> f64 {
        self.parameters[index.0].current
    }

    /// Parameter updater: walks every variable parameter and rewrites its
    /// live value slot for `date` (spec §3 "Lifecycles").
    pub fn update(&mut self, date: Mjd) {
        for p in self.parameters.iter_mut() {
            if !matches!(p.value, ParameterValue::Constant(_)) {
                p.current = p.value.resolve(date, &p.name);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constant_never_changes() {
        let mut store = ParameterStore::default();
        let idx = store.push(Parameter::new("k", ParameterValue::Constant(0.3)));
        store.update(Mjd::from_ymd(2020, 6, 1));
        assert_eq!(store.value(idx), 0.3);
    }

    #[test]
    fn monthly_lookup() {
        let mut store = ParameterStore::default();
        let mut values = [0.0; 12];
        values[5] = 42.0; // June
        let idx = store.push(Parameter::new("m", ParameterValue::VariableMonthly { values }));
        store.update(Mjd::from_ymd(2020, 6, 15));
        assert_eq!(store.value(idx), 42.0);
    }

    #[test]
    fn yearly_out_of_range_is_nan() {
        let mut store = ParameterStore::default();
        let idx = store.push(Parameter::new(
            "y",
            ParameterValue::VariableYearly {
                start_year: 2000,
                end_year: 2001,
                values: vec![1.0, 2.0],
            },
        ));
        store.update(Mjd::from_ymd(2020, 1, 1));
        assert!(store.value(idx).is_nan());
    }

    #[test]
    fn yearly_length_mismatch_is_rejected() {
        let value = ParameterValue::VariableYearly {
            start_year: 2000,
            end_year: 2002,
            values: vec![1.0, 2.0],
        };
        assert!(value.validate("y").is_err());
    }
}
