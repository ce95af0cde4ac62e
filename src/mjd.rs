//! Modified Julian Date arithmetic and simulation time-stepping.
//!
//! Internally every date is a `f64` MJD (days since 1858-11-17 00:00 UTC).
//! `chrono` is used only at the edges to make tests and any future config
//! layer able to build an `Mjd` from a calendar date; the solver and process
//! library never touch `chrono` types directly.

use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::ops::{Add, Sub};

use crate::HydroError;

const MJD_EPOCH: (i32, u32, u32) = (1858, 11, 17);

/// A Modified Julian Date: days (with fractional part) since 1858-11-17 00:00 UTC.
#[derive(Debug, Copy, Clone, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Mjd(pub f64);

impl Mjd {
    pub fn new(value: f64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    /// Build an `Mjd` from a calendar date at midnight.
    pub fn from_ymd(year: i32, month: u32, day: u32) -> Self {
        let epoch = NaiveDate::from_ymd_opt(MJD_EPOCH.0, MJD_EPOCH.1, MJD_EPOCH.2).expect("valid epoch");
        let date = NaiveDate::from_ymd_opt(year, month, day).expect("valid date");
        Self((date - epoch).num_days() as f64)
    }

    pub fn from_datetime(dt: NaiveDateTime) -> Self {
        let epoch = NaiveDate::from_ymd_opt(MJD_EPOCH.0, MJD_EPOCH.1, MJD_EPOCH.2)
            .expect("valid epoch")
            .and_hms_opt(0, 0, 0)
            .expect("valid time");
        let duration = dt - epoch;
        Self(duration.num_milliseconds() as f64 / 86_400_000.0)
    }

    pub fn to_datetime(self) -> NaiveDateTime {
        let epoch = NaiveDate::from_ymd_opt(MJD_EPOCH.0, MJD_EPOCH.1, MJD_EPOCH.2)
            .expect("valid epoch")
            .and_hms_opt(0, 0, 0)
            .expect("valid time");
        epoch + chrono::Duration::milliseconds((self.0 * 86_400_000.0).round() as i64)
    }

    pub fn year(self) -> i32 {
        self.to_datetime().year()
    }

    pub fn month(self) -> u32 {
        self.to_datetime().month()
    }

    pub fn hour(self) -> u32 {
        self.to_datetime().hour()
    }
}

impl Add<f64> for Mjd {
    type Output = Mjd;
    fn add(self, rhs: f64) -> Mjd {
        Mjd(self.0 + rhs)
    }
}

impl Sub for Mjd {
    type Output = f64;
    fn sub(self, rhs: Mjd) -> f64 {
        self.0 - rhs.0
    }
}

/// The unit in which a simulation time-step's duration is expressed.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeUnit {
    Minute,
    Hour,
    Day,
    Week,
}

impl TimeUnit {
    pub fn parse(value: &str) -> Result<Self, HydroError> {
        match value.to_ascii_lowercase().as_str() {
            "minute" | "minutes" => Ok(Self::Minute),
            "hour" | "hours" => Ok(Self::Hour),
            "day" | "days" => Ok(Self::Day),
            "week" | "weeks" => Ok(Self::Week),
            other => Err(HydroError::UnrecognisedTimeUnit(other.to_string())),
        }
    }

    /// The duration of one unit, expressed in fractional days.
    pub fn in_days(&self) -> f64 {
        match self {
            TimeUnit::Minute => 1.0 / 1440.0,
            TimeUnit::Hour => 1.0 / 24.0,
            TimeUnit::Day => 1.0,
            TimeUnit::Week => 7.0,
        }
    }
}

/// A single time-step in a simulation: its date and duration (in days).
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Timestep {
    pub date: Mjd,
    pub index: usize,
    pub dt_days: f64,
}

impl Timestep {
    pub fn is_first(&self) -> bool {
        self.index == 0
    }
}

/// Generates the sequence of [`Timestep`]s covering a simulation window.
#[derive(Debug, Copy, Clone)]
pub struct Timestepper {
    pub start: Mjd,
    pub end: Mjd,
    pub step: u64,
    pub unit: TimeUnit,
}

impl Timestepper {
    pub fn new(start: Mjd, end: Mjd, step: u64, unit: TimeUnit) -> Self {
        Self { start, end, step, unit }
    }

    fn dt_days(&self) -> f64 {
        self.step as f64 * self.unit.in_days()
    }

    pub fn timesteps(&self) -> Vec<Timestep> {
        let dt = self.dt_days();
        let mut steps = Vec::new();
        let mut date = self.start;
        let mut index = 0;
        // Inclusive of `end`, matching the regular time-series convention in spec §6.
        while date.value() <= self.end.value() + 1e-9 {
            steps.push(Timestep { date, index, dt_days: dt });
            date = date + dt;
            index += 1;
        }
        steps
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mjd_roundtrip() {
        let m = Mjd::from_ymd(2020, 1, 1);
        let dt = m.to_datetime();
        assert_eq!(dt.year(), 2020);
        assert_eq!(dt.month(), 1);
        assert_eq!(dt.day(), 1);
    }

    #[test]
    fn timestepper_daily_count() {
        let ts = Timestepper::new(Mjd::from_ymd(2020, 1, 1), Mjd::from_ymd(2020, 1, 20), 1, TimeUnit::Day);
        assert_eq!(ts.timesteps().len(), 20);
    }

    #[test]
    fn time_unit_parse_is_case_insensitive() {
        assert_eq!(TimeUnit::parse("Day").unwrap(), TimeUnit::Day);
        assert_eq!(TimeUnit::parse("HOUR").unwrap(), TimeUnit::Hour);
        assert!(TimeUnit::parse("fortnight").is_err());
    }
}
