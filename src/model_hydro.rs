//! The top-level drive loop: builds a [`ModelGraph`], then steps every
//! hydro-unit forward across the simulation window.

use std::time::{Duration, Instant};

use tracing::info;

use crate::builder::{Builder, ModelGraph};
use crate::forcing::ForcingSeriesSet;
use crate::logger::Logger;
use crate::redistribution::{self, ResolvedConnection, SnowSlideRule};
use crate::spec::{BasinSpec, ModelSpec};
use crate::solver;
use crate::HydroError;

/// Summary of a completed run: how many steps ran and how long the loop took.
#[derive(Debug, Clone)]
pub struct RunTimings {
    pub steps: usize,
    pub units: usize,
    pub wall_time: Duration,
}

/// A built, runnable model: the object graph, its forcing series, any
/// lateral snow redistribution topology, and the accumulating [`Logger`].
pub struct ModelHydro {
    graph: ModelGraph,
    forcings: ForcingSeriesSet,
    redistribution: Vec<ResolvedConnection>,
    snow_slide_rule: SnowSlideRule,
    logger: Logger,
}

impl ModelHydro {
    pub fn build(model: ModelSpec, basin: BasinSpec, forcings: ForcingSeriesSet) -> Result<Self, HydroError> {
        let redistribution_spec = basin.redistribution.clone();
        let graph = Builder::new(model, basin).build()?;

        forcings.validate_coverage(graph.timestepper.start, graph.timestepper.end)?;
        let redistribution = redistribution::resolve_connections(&graph.units, &redistribution_spec.connections)?;
        let snow_slide_rule = SnowSlideRule::from_spec(&redistribution_spec);

        let step_count = graph.timestepper.timesteps().len();
        let mut logger = Logger::new(&graph.units, step_count);
        logger.set_initial_totals(&graph.units, &graph.bricks)?;

        Ok(Self {
            graph,
            forcings,
            redistribution,
            snow_slide_rule,
            logger,
        })
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    pub fn graph(&self) -> &ModelGraph {
        &self.graph
    }

    /// Runs the model across its whole simulation window, recording every
    /// step's state into the logger.
    pub fn run(&mut self) -> Result<RunTimings, HydroError> {
        let start = Instant::now();
        let timesteps = self.graph.timestepper.timesteps();

        for timestep in &timesteps {
            self.graph.parameters.update(timestep.date);

            let unit_count = self.graph.units.len();
            for unit_pos in 0..unit_count {
                let unit_index = self.graph.units[unit_pos].index;
                let date = timestep.date;
                self.forcings.sample_into(date, unit_pos, &mut self.graph.units.get_mut(unit_index)?.forcings);
            }

            // Solver pass first, across every unit, then the cross-unit
            // redistribution barrier, then logging: redistribution must see
            // every unit's committed post-solver snow content, and the
            // logger must see the post-redistribution content.
            let mut outcomes = Vec::with_capacity(unit_count);
            for unit_pos in 0..unit_count {
                let unit_index = self.graph.units[unit_pos].index;
                let outcome = solver::step_unit(&mut self.graph, unit_index, *timestep)?;
                outcomes.push((unit_index, outcome));
            }

            redistribution::apply(&self.redistribution, &self.snow_slide_rule, &self.graph.units, &mut self.graph.bricks)?;

            for (unit_index, outcome) in outcomes {
                self.logger.record(unit_index, timestep.index, outcome, &self.graph.bricks, &self.graph.units)?;
            }
        }

        let timings = RunTimings {
            steps: timesteps.len(),
            units: self.graph.units.len(),
            wall_time: start.elapsed(),
        };
        info!(steps = timings.steps, units = timings.units, wall_time_ms = timings.wall_time.as_millis(), "simulation run complete");
        Ok(timings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use float_cmp::{approx_eq, F64Margin};

    use crate::test_utils::{
        aspect_snowpack_model, capped_storage_with_overflow_model, capped_storage_without_overflow_model, cascade_linear_storage_model, glacier_unlimited_supply_model, linear_storage_model,
        snow_redistribution_chain_model, snowpack_degree_day_model, uniform_forcing,
    };

    const TIGHT: F64Margin = F64Margin { epsilon: 1e-6, ulps: 4 };
    const LOOSE: F64Margin = F64Margin { epsilon: 1e-3, ulps: 4 };

    fn assert_series_approx(actual: &[f64], expected: &[f64], margin: F64Margin) {
        assert_eq!(actual.len(), expected.len(), "series length mismatch: {actual:?} vs {expected:?}");
        for (i, (&a, &e)) in actual.iter().zip(expected.iter()).enumerate() {
            assert!(approx_eq!(f64, a, e, margin), "index {i}: got {a}, expected {e}");
        }
    }

    fn scenario_precip() -> Vec<f64> {
        let mut v = vec![0.0, 10.0, 10.0, 10.0];
        v.extend(std::iter::repeat(0.0).take(16));
        v
    }

    /// Spec §8 scenario 1: single linear storage, Euler explicit.
    #[test]
    fn scenario_single_linear_storage_euler() {
        let (model, basin) = linear_storage_model("euler_explicit", 0.3, 20);
        let forcings = uniform_forcing(20, Some(scenario_precip()), None);
        let mut m = ModelHydro::build(model, basin, forcings).unwrap();
        m.run().unwrap();

        #[rustfmt::skip]
        let expected = [
            0.000000, 0.000000, 3.000000, 5.100000, 6.570000, 4.599000, 3.219300, 2.253510,
            1.577457, 1.104220, 0.772954, 0.541068, 0.378747, 0.265123, 0.185586, 0.129910,
            0.090937, 0.063656, 0.044559, 0.031191,
        ];
        assert_series_approx(m.logger().basin_discharge(), &expected, TIGHT);

        let store = m.graph().bricks.index_by_name("store").unwrap();
        let content = m.graph().bricks.get(store).unwrap().container.as_ref().unwrap().content;
        assert!(approx_eq!(f64, content, 0.072780, TIGHT), "final storage content {content}");
    }

    /// Spec §8 scenario 2: the same model, Heun.
    #[test]
    fn scenario_single_linear_storage_heun() {
        let (model, basin) = linear_storage_model("heun_explicit", 0.3, 20);
        let forcings = uniform_forcing(20, Some(scenario_precip()), None);
        let mut m = ModelHydro::build(model, basin, forcings).unwrap();
        m.run().unwrap();

        #[rustfmt::skip]
        let expected = [
            0.000000, 1.500000, 3.667500, 5.282288, 4.985304, 3.714052, 2.766968, 2.061392,
            1.535737, 1.144124, 0.852372, 0.635017, 0.473088, 0.352450, 0.262576, 0.195619,
            0.145736, 0.108573, 0.080887, 0.060261,
        ];
        assert_series_approx(m.logger().basin_discharge(), &expected, TIGHT);
    }

    /// Spec §8 scenario 3: degree-day melt on a single snowpack unit.
    #[test]
    fn scenario_snowpack_degree_day() {
        let (model, basin) = snowpack_degree_day_model(10, 3.0, 2.0, 0.0, 2.0);
        let precip = vec![0.0, 10.0, 10.0, 10.0, 10.0, 10.0, 10.0, 10.0, 10.0, 0.0];
        let temp = vec![-2.0, -1.0, -1.0, 1.0, 2.0, 3.0, 4.0, 5.0, 8.0, 9.0];
        let forcings = uniform_forcing(10, Some(precip), Some(temp));
        let mut m = ModelHydro::build(model, basin, forcings).unwrap();
        m.run().unwrap();

        let expected_outlet = [0.0, 0.0, 0.0, 5.0, 10.0, 13.0, 16.0, 19.0, 17.0, 0.0];
        let expected_swe = [0.0, 10.0, 20.0, 25.0, 25.0, 22.0, 16.0, 7.0, 0.0, 0.0];
        assert_series_approx(m.logger().basin_discharge(), &expected_outlet, TIGHT);
        assert_series_approx(m.logger().basin_snow(), &expected_swe, TIGHT);

        // Spec §8 mass balance: outlet + ET + Δstorage + Δsnow == total precipitation.
        let total_precip: f64 = 80.0;
        let balance = m.logger().get_total_outlet_discharge() + m.logger().get_total_et() + m.logger().get_total_water_storage_changes() + m.logger().get_total_snow_storage_changes();
        assert!(approx_eq!(f64, balance, total_precip, TIGHT), "mass balance {balance} != {total_precip}");
    }

    /// Spec §8 scenario 4: degree-day melt keyed by aspect, south unit double-area.
    #[test]
    fn scenario_degree_day_aspect() {
        let (model, basin) = aspect_snowpack_model(10, 2.0, 3.0, 3.0, 4.0, 2.0, 2.0);
        let precip = vec![0.0, 10.0, 10.0, 10.0, 10.0, 10.0, 10.0, 10.0, 10.0, 0.0];
        let temp = vec![-2.0, -1.0, -1.0, 1.0, 2.0, 3.0, 4.0, 5.0, 8.0, 9.0];
        let forcings = uniform_forcing(10, Some(precip), Some(temp));
        let mut m = ModelHydro::build(model, basin, forcings).unwrap();
        m.run().unwrap();

        let expected_outlet = [0.0, 0.0, 0.0, 5.0, 10.0, 13.2, 16.4, 19.6, 15.6, 0.2];
        assert_series_approx(m.logger().basin_discharge(), &expected_outlet, TIGHT);

        // South-facing, with the highest degree-day factor, melts out first and
        // contributes more cumulative discharge per unit area than north.
        let north_total: f64 = m.logger().unit_discharge("n").unwrap().iter().sum();
        let south_total: f64 = m.logger().unit_discharge("s").unwrap().iter().sum();
        assert!(south_total > north_total, "south {south_total} should exceed north {north_total}");

        let total_precip_per_unit = 80.0;
        for id in ["n", "e", "w", "s"] {
            let discharge: f64 = m.logger().unit_discharge(id).unwrap().iter().sum();
            let snow_final = *m.logger().unit_snow(id).unwrap().last().unwrap();
            assert!(approx_eq!(f64, discharge + snow_final, total_precip_per_unit, LOOSE), "unit {id}: {discharge} + {snow_final} != {total_precip_per_unit}");
        }
    }

    /// Spec §8 scenario 5: glacier with `unlimited_supply`, uncapped melt.
    #[test]
    fn scenario_glacier_unlimited_supply() {
        let (model, basin) = glacier_unlimited_supply_model(10, 3.0, 2.0);
        let temp = vec![-2.0, -1.0, -1.0, 1.0, 2.0, 3.0, 4.0, 5.0, 8.0, 9.0];
        let forcings = uniform_forcing(10, None, Some(temp));
        let mut m = ModelHydro::build(model, basin, forcings).unwrap();
        m.run().unwrap();

        let expected_outlet = [0.0, 0.0, 0.0, 0.0, 0.0, 3.0, 6.0, 9.0, 18.0, 21.0];
        assert_series_approx(m.logger().basin_discharge(), &expected_outlet, TIGHT);

        let balance = m.logger().get_total_outlet_discharge() + m.logger().get_total_water_storage_changes();
        let expected_total: f64 = expected_outlet.iter().sum();
        assert!(approx_eq!(f64, balance, expected_total, TIGHT));
    }

    /// Spec §8 scenario 6: two linear stores in cascade, RK4.
    #[test]
    fn scenario_cascade_linear_storage_rk4() {
        let (model, basin) = cascade_linear_storage_model("runge_kutta", 0.5, 0.3, 20);
        let forcings = uniform_forcing(20, Some(scenario_precip()), None);
        let mut m = ModelHydro::build(model, basin, forcings).unwrap();
        m.run().unwrap();

        #[rustfmt::skip]
        let expected = [
            0.000000, 0.200000, 1.158225, 2.490032, 3.654047, 3.935308, 3.660692, 3.164185,
            2.618533, 2.106397, 1.661518, 1.292212, 0.994512, 0.759339, 0.576240, 0.435209,
            0.327461, 0.245654, 0.183846, 0.137326,
        ];
        assert_series_approx(m.logger().basin_discharge(), &expected, TIGHT);

        let total_precip: f64 = scenario_precip().iter().sum();
        let balance = m.logger().get_total_outlet_discharge() + m.logger().get_total_water_storage_changes();
        assert!(approx_eq!(f64, balance, total_precip, TIGHT), "mass balance {balance} != {total_precip}");
    }

    /// Spec §4.C "Capacity": a storage brick capped at 10mm, draining slowly
    /// through `linear_storage` with a bound `overflow` process, under five
    /// days of heavy precipitation (20mm/day) followed by five dry days.
    /// Forcing alone would push the container well past capacity every
    /// heavy day; the overflow process must spill the excess to the outlet
    /// immediately rather than letting content climb past the cap.
    #[test]
    fn scenario_capped_storage_spills_excess_through_overflow() {
        let (model, basin) = capped_storage_with_overflow_model("euler_explicit", 0.05, 10.0, 10);
        let mut precip = vec![20.0; 5];
        precip.extend(vec![0.0; 5]);
        let forcings = uniform_forcing(10, Some(precip), None);
        let mut m = ModelHydro::build(model, basin, forcings).unwrap();
        m.run().unwrap();

        #[rustfmt::skip]
        let expected_outlet = [
            10.000000, 20.500000, 19.975000, 20.001250, 19.999938,
            0.476191, 0.452381, 0.429762, 0.408274, 0.387860,
        ];
        assert_series_approx(m.logger().basin_discharge(), &expected_outlet, TIGHT);

        let storage = m.logger().unit_storage("u0").unwrap();
        for (i, &content) in storage.iter().enumerate() {
            assert!(content <= 10.0 + 1e-6, "step {i}: storage {content} exceeds capacity 10.0");
        }
        let final_storage = *storage.last().unwrap();
        assert!(approx_eq!(f64, final_storage, 7.369345, TIGHT), "final storage {final_storage}");

        let total_precip: f64 = 100.0;
        let balance = m.logger().get_total_outlet_discharge() + m.logger().get_total_water_storage_changes();
        assert!(approx_eq!(f64, balance, total_precip, TIGHT), "mass balance {balance} != {total_precip}");
    }

    /// Spec §4.C / §7: the same capped storage brick with no overflow process
    /// bound raises a `ConceptionIssue` the first time forcing alone would
    /// push content past capacity, rather than silently clipping it.
    #[test]
    fn scenario_capped_storage_without_overflow_is_a_conception_issue() {
        let (model, basin) = capped_storage_without_overflow_model("euler_explicit", 0.05, 10.0, 5);
        let precip = vec![20.0; 5];
        let forcings = uniform_forcing(5, Some(precip), None);
        let mut m = ModelHydro::build(model, basin, forcings).unwrap();
        let err = m.run().unwrap_err();
        assert!(matches!(err, HydroError::ConceptionIssue(_)), "expected ConceptionIssue, got {err:?}");
    }

    /// Spec §8 snow-redistribution scenario: a five-unit donor chain with
    /// `fraction = 1.0` funnels every day's snow toward the terminal unit.
    #[test]
    fn scenario_snow_redistribution_chain() {
        let (model, basin) = snow_redistribution_chain_model(10);
        let mut precip = vec![100.0; 8];
        precip.extend([0.0, 0.0]);
        let temp = vec![-10.0; 10];
        let forcings = uniform_forcing(10, Some(precip), Some(temp));
        let mut m = ModelHydro::build(model, basin, forcings).unwrap();
        m.run().unwrap();

        let basin_swe_final = *m.logger().basin_snow().last().unwrap();
        assert!(approx_eq!(f64, basin_swe_final, 800.0, F64Margin { epsilon: 1e-2, ulps: 4 }), "basin SWE {basin_swe_final} != 800.0");

        let snow_at = |id: &str| *m.logger().unit_snow(id).unwrap().last().unwrap();
        let (u1, u2, u3, u4, u5) = (snow_at("unit1"), snow_at("unit2"), snow_at("unit3"), snow_at("unit4"), snow_at("unit5"));
        assert!(u5 >= u4 && u4 >= u3 && u3 >= u2 && u2 >= u1, "expected a monotonic donor-to-receiver accumulation, got {u1}, {u2}, {u3}, {u4}, {u5}");
        assert!(u5 > u1, "unit5 should accumulate the largest share, unit1 the smallest");
    }

    /// Spec §8 "Laws": a linear reservoir under constant forcing converges to `P/k`.
    #[test]
    fn linear_reservoir_converges_to_p_over_k() {
        let n_days = 300;
        let (model, basin) = linear_storage_model("euler_explicit", 0.2, n_days);
        let forcings = uniform_forcing(n_days, Some(vec![5.0; n_days as usize]), None);
        let mut m = ModelHydro::build(model, basin, forcings).unwrap();
        m.run().unwrap();

        let store = m.graph().bricks.index_by_name("store").unwrap();
        let content = m.graph().bricks.get(store).unwrap().container.as_ref().unwrap().content;
        assert!(approx_eq!(f64, content, 25.0, LOOSE), "content {content} should converge to P/k = 25.0");

        let last_outlet = *m.logger().basin_discharge().last().unwrap();
        assert!(approx_eq!(f64, last_outlet, 5.0, LOOSE), "outlet {last_outlet} should converge to P = 5.0");
    }

    /// Spec §8 "Laws": an empty system with no forcing is a no-op.
    #[test]
    fn empty_system_is_a_no_op() {
        let (model, basin) = linear_storage_model("euler_explicit", 0.3, 5);
        let forcings = uniform_forcing(5, Some(vec![0.0; 5]), None);
        let mut m = ModelHydro::build(model, basin, forcings).unwrap();
        m.run().unwrap();

        assert!(m.logger().basin_discharge().iter().all(|&v| v == 0.0));
        let store = m.graph().bricks.index_by_name("store").unwrap();
        assert_eq!(m.graph().bricks.get(store).unwrap().container.as_ref().unwrap().content, 0.0);
    }
}
