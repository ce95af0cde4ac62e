//! In-memory forcing time-series and per-unit forcing slots.
//!
//! The core never reads a forcing file; it consumes [`TimeSeries`] values
//! already resident in memory. A uniform series applies one scalar column
//! to every hydro-unit; a multi-column series maps a column to a specific
//! unit index.

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::mjd::Mjd;
use crate::HydroError;

/// The kind of variable a forcing series carries.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariableKind {
    Precipitation,
    Temperature,
    Pet,
    Radiation,
}

impl VariableKind {
    /// Parses a splitter/process forcing reference by name (spec §4.A
    /// splitter `input` field, §6 "variable kinds"), case-insensitive.
    pub fn parse(value: &str) -> Result<Self, HydroError> {
        match value.to_ascii_lowercase().as_str() {
            "precipitation" | "precip" => Ok(Self::Precipitation),
            "temperature" | "temp" => Ok(Self::Temperature),
            "pet" => Ok(Self::Pet),
            "radiation" => Ok(Self::Radiation),
            other => Err(HydroError::ConceptionIssue(format!("unknown forcing variable `{other}`"))),
        }
    }
}

pub const ALL_VARIABLE_KINDS: [VariableKind; 4] = [
    VariableKind::Precipitation,
    VariableKind::Temperature,
    VariableKind::Pet,
    VariableKind::Radiation,
];

/// A regular time series: `values.len() == floor((t1-t0)/step) + 1`.
///
/// Columns map hydro-unit index -> sample column; a uniform series has a
/// single column shared by every unit.
#[derive(Debug, Clone)]
pub struct TimeSeries {
    pub t0: Mjd,
    pub t1: Mjd,
    pub step_days: f64,
    pub kind: VariableKind,
    /// `values[step][column]`
    pub values: Vec<Vec<f64>>,
    /// Maps hydro-unit index -> column index. Empty means "every unit uses column 0".
    pub unit_columns: Vec<usize>,
}

impl TimeSeries {
    pub fn uniform(t0: Mjd, t1: Mjd, step_days: f64, kind: VariableKind, values: Vec<f64>) -> Result<Self, HydroError> {
        let expected = Self::expected_len(t0, t1, step_days);
        if values.len() != expected {
            return Err(HydroError::ForcingLengthMismatch {
                expected,
                got: values.len(),
            });
        }
        Ok(Self {
            t0,
            t1,
            step_days,
            kind,
            values: values.into_iter().map(|v| vec![v]).collect(),
            unit_columns: Vec::new(),
        })
    }

    pub fn multi_column(
        t0: Mjd,
        t1: Mjd,
        step_days: f64,
        kind: VariableKind,
        values: Vec<Vec<f64>>,
        unit_columns: Vec<usize>,
    ) -> Result<Self, HydroError> {
        let expected = Self::expected_len(t0, t1, step_days);
        if values.len() != expected {
            return Err(HydroError::ForcingLengthMismatch {
                expected,
                got: values.len(),
            });
        }
        Ok(Self {
            t0,
            t1,
            step_days,
            kind,
            values,
            unit_columns,
        })
    }

    fn expected_len(t0: Mjd, t1: Mjd, step_days: f64) -> usize {
        ((t1.value() - t0.value()) / step_days).floor() as usize + 1
    }

    /// Does this series' coverage span `[start, end]`?
    pub fn covers(&self, start: Mjd, end: Mjd) -> bool {
        self.t0.value() <= start.value() + 1e-9 && self.t1.value() >= end.value() - 1e-9
    }

    /// Sample the value at `date` for `unit_index`. Dates outside coverage
    /// return `None` (caller logs and substitutes `NaN`).
    pub fn sample(&self, date: Mjd, unit_index: usize) -> Option<f64> {
        if date.value() < self.t0.value() - 1e-9 || date.value() > self.t1.value() + 1e-9 {
            return None;
        }
        let step_index = (((date.value() - self.t0.value()) / self.step_days).round() as usize).min(self.values.len() - 1);
        let column = self.unit_columns.get(unit_index).copied().unwrap_or(0);
        self.values[step_index].get(column).copied().or_else(|| self.values[step_index].first().copied())
    }
}

/// The set of in-memory forcing series driving a run, one optional series
/// per variable kind. A model may run without, say, a radiation series if
/// no bound process requires [`VariableKind::Radiation`]; that is only
/// discovered (and reported) once a process actually asks for it.
#[derive(Debug, Default)]
pub struct ForcingSeriesSet {
    pub precipitation: Option<TimeSeries>,
    pub temperature: Option<TimeSeries>,
    pub pet: Option<TimeSeries>,
    pub radiation: Option<TimeSeries>,
}

impl ForcingSeriesSet {
    fn series(&self, kind: VariableKind) -> Option<&TimeSeries> {
        match kind {
            VariableKind::Precipitation => self.precipitation.as_ref(),
            VariableKind::Temperature => self.temperature.as_ref(),
            VariableKind::Pet => self.pet.as_ref(),
            VariableKind::Radiation => self.radiation.as_ref(),
        }
    }

    /// Checks every populated series covers `[start, end]`.
    pub fn validate_coverage(&self, start: Mjd, end: Mjd) -> Result<(), HydroError> {
        for kind in ALL_VARIABLE_KINDS {
            if let Some(series) = self.series(kind) {
                if !series.covers(start, end) {
                    return Err(HydroError::DateRangeError(series.t0.value(), series.t1.value(), start.value(), end.value()));
                }
            }
        }
        Ok(())
    }

    /// Samples every populated series for `date`/`unit_index` into `slots`.
    /// A variable with no series at all defaults to `0.0` (it simply isn't
    /// driving this model); a variable whose series doesn't cover `date`
    /// logs a warning and sets the slot to `NaN`.
    pub fn sample_into(&self, date: Mjd, unit_index: usize, slots: &mut ForcingSlots) {
        for kind in ALL_VARIABLE_KINDS {
            let value = match self.series(kind) {
                Some(series) => series.sample(date, unit_index).unwrap_or_else(|| {
                    warn!("forcing `{kind:?}` has no coverage for date {}", date.value());
                    f64::NAN
                }),
                None => 0.0,
            };
            slots.set(kind, value);
        }
    }
}

/// Per-unit forcing slots, refreshed once per time-step by the forcing
/// sampler.
#[derive(Debug, Default, Clone, Copy)]
pub struct ForcingSlots {
    precipitation: f64,
    temperature: f64,
    pet: f64,
    radiation: f64,
}

impl ForcingSlots {
    pub fn get(&self, kind: VariableKind) -> f64 {
        match kind {
            VariableKind::Precipitation => self.precipitation,
            VariableKind::Temperature => self.temperature,
            VariableKind::Pet => self.pet,
            VariableKind::Radiation => self.radiation,
        }
    }

    pub fn set(&mut self, kind: VariableKind, value: f64) {
        match kind {
            VariableKind::Precipitation => self.precipitation = value,
            VariableKind::Temperature => self.temperature = value,
            VariableKind::Pet => self.pet = value,
            VariableKind::Radiation => self.radiation = value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uniform_series_samples_every_unit() {
        let ts = TimeSeries::uniform(
            Mjd::from_ymd(2020, 1, 1),
            Mjd::from_ymd(2020, 1, 3),
            1.0,
            VariableKind::Precipitation,
            vec![0.0, 10.0, 5.0],
        )
        .unwrap();
        assert_eq!(ts.sample(Mjd::from_ymd(2020, 1, 2), 0), Some(10.0));
        assert_eq!(ts.sample(Mjd::from_ymd(2020, 1, 2), 7), Some(10.0));
    }

    #[test]
    fn length_mismatch_is_rejected() {
        let result = TimeSeries::uniform(
            Mjd::from_ymd(2020, 1, 1),
            Mjd::from_ymd(2020, 1, 3),
            1.0,
            VariableKind::Precipitation,
            vec![0.0, 10.0],
        );
        assert!(result.is_err());
    }

    #[test]
    fn out_of_coverage_is_none() {
        let ts = TimeSeries::uniform(
            Mjd::from_ymd(2020, 1, 1),
            Mjd::from_ymd(2020, 1, 3),
            1.0,
            VariableKind::Precipitation,
            vec![0.0, 10.0, 5.0],
        )
        .unwrap();
        assert_eq!(ts.sample(Mjd::from_ymd(2021, 1, 1), 0), None);
    }
}
