//! Per-brick constraint enforcement for a single stage evaluation: first
//! non-negativity, then capacity (spec §4.C "constraint enforcement").
//!
//! Both checks work from the same four numbers for a brick's compartment:
//! its content at the start of the stage, the combined static/forcing
//! inflow rate (`in_static`), the combined dynamic inflow rate from other
//! processes' outputs (`in_dyn`), and the combined outgoing rate of every
//! process sourced from it (`out`). Scaling is always applied uniformly
//! across every rate sharing the same source or target, never favouring
//! one process over another.

const EPSILON: f64 = 1e-9;

/// If the projected content (`content + (in_static + in_dyn - out) * dt`)
/// would go negative, returns the factor in `[0, 1]` that every outgoing
/// rate sourced from this compartment must be scaled by so the projected
/// content lands at exactly zero. `None` when no scaling is needed.
pub fn non_negativity_scale(content: f64, in_static: f64, in_dyn: f64, out: f64, dt_days: f64) -> Option<f64> {
    if dt_days <= 0.0 || out <= 0.0 {
        return None;
    }
    let net = in_static + in_dyn - out;
    if net >= 0.0 {
        return None;
    }
    let projected = content + net * dt_days;
    if projected >= -EPSILON {
        return None;
    }
    let deficit = projected / dt_days;
    Some((1.0 + deficit / out).clamp(0.0, 1.0))
}

/// What a capped container's capacity check resolved to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CapacityOutcome {
    /// Projected content stays at or below capacity; nothing to do.
    WithinCapacity,
    /// Projected content would exceed capacity and a bound overflow process
    /// exists: invoke it with the carried projected content so it can
    /// derive its own excess-above-capacity rate.
    Overflow { projected: f64 },
    /// No overflow process is bound, but the excess is driven by dynamic
    /// inflow rather than forcing alone: scale every dynamic rate
    /// targeting this compartment by this factor so the projected content
    /// lands at exactly capacity.
    ScaleIncoming(f64),
    /// No overflow process is bound and forcing/static inflow alone would
    /// overflow the container: a model configuration error (spec §4.C,
    /// §7 `ConceptionIssue`).
    ConfigError,
}

/// Spec §4.C "Capacity": checks a capped container's projected content
/// (after non-negativity has already been applied to `out`/`in_dyn`)
/// against `capacity` and decides how the excess should be resolved.
pub fn capacity_outcome(content: f64, in_static: f64, in_dyn: f64, out: f64, dt_days: f64, capacity: f64, has_overflow: bool) -> CapacityOutcome {
    if dt_days <= 0.0 {
        return CapacityOutcome::WithinCapacity;
    }
    let net = in_static + in_dyn - out;
    let projected = content + net * dt_days;
    if projected <= capacity + EPSILON {
        return CapacityOutcome::WithinCapacity;
    }
    if has_overflow {
        return CapacityOutcome::Overflow { projected };
    }
    let forcing_only_projected = content + in_static * dt_days;
    if forcing_only_projected > capacity + EPSILON || in_dyn <= 0.0 {
        return CapacityOutcome::ConfigError;
    }
    let allowed_in_dyn = ((capacity - content) / dt_days - in_static + out).max(0.0);
    CapacityOutcome::ScaleIncoming((allowed_in_dyn / in_dyn).clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_negativity_leaves_rates_untouched_when_within_budget() {
        assert_eq!(non_negativity_scale(10.0, 0.0, 0.0, 5.0, 1.0), None);
    }

    #[test]
    fn non_negativity_scales_down_to_land_exactly_at_zero() {
        // content=9, out=12, dt=1 -> projected = -3, scale = 1 - 3/12 = 0.75
        let scale = non_negativity_scale(9.0, 0.0, 0.0, 12.0, 1.0).unwrap();
        assert!((scale - 0.75).abs() < 1e-12);
        assert!((9.0 + (0.0 - 12.0 * scale) * 1.0).abs() < 1e-9);
    }

    #[test]
    fn non_negativity_accounts_for_simultaneous_inflow() {
        // content=7, in_static=2, out=18, dt=1 -> net deficit covered partly by inflow.
        let scale = non_negativity_scale(7.0, 2.0, 0.0, 18.0, 1.0).unwrap();
        let projected = 7.0 + (2.0 - 18.0 * scale) * 1.0;
        assert!(projected.abs() < 1e-9);
    }

    #[test]
    fn capacity_within_bounds_is_a_no_op() {
        assert_eq!(capacity_outcome(5.0, 1.0, 0.0, 0.0, 1.0, 10.0, true), CapacityOutcome::WithinCapacity);
    }

    #[test]
    fn capacity_routes_excess_through_bound_overflow_process() {
        // content=8, in_static=5, dt=1, capacity=10 -> projected=13, excess=3.
        match capacity_outcome(8.0, 5.0, 0.0, 0.0, 1.0, 10.0, true) {
            CapacityOutcome::Overflow { projected } => assert!((projected - 13.0).abs() < 1e-9),
            other => panic!("expected Overflow, got {other:?}"),
        }
    }

    #[test]
    fn capacity_without_overflow_process_scales_dynamic_inflow() {
        // content=0, in_static=0, in_dyn=20, out=0, dt=1, capacity=10: scale to 0.5.
        match capacity_outcome(0.0, 0.0, 20.0, 0.0, 1.0, 10.0, false) {
            CapacityOutcome::ScaleIncoming(scale) => assert!((scale - 0.5).abs() < 1e-9),
            other => panic!("expected ScaleIncoming, got {other:?}"),
        }
    }

    #[test]
    fn capacity_without_overflow_process_and_forcing_alone_exceeds_is_a_config_error() {
        // content=8, in_static=5, dt=1, capacity=10: forcing alone already projects to 13.
        assert_eq!(capacity_outcome(8.0, 5.0, 0.0, 0.0, 1.0, 10.0, false), CapacityOutcome::ConfigError);
    }
}
