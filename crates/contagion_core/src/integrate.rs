//! Drives a stepper across a caller-supplied time grid.
//!
//! The adaptive path runs [`Tsit5::attempt`] under a standard accept/reject controller
//! and clamps every step so the requested time points are hit exactly; no dense-output
//! interpolation is involved. The fixed paths split each interval between requested
//! points into equal [`RK4`] or [`Tsit5`] substeps.

use crate::error::{ModelError, Result};
use crate::solvers::{Tsit5, RK4};
use crate::traits::{DynamicalSystem, Steppable};
use crate::trajectory::{IntegrationStats, Trajectory};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

const SAFETY: f64 = 0.9;
const MIN_FACTOR: f64 = 0.2;
const MAX_FACTOR: f64 = 5.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Method {
    /// Tsitouras 5(4) with local error control.
    Tsit5Adaptive,
    /// Classical RK4 with substeps no longer than `step`.
    Rk4 { step: f64 },
    /// Tsitouras 5(4) without error control, substeps no longer than `step`.
    Tsit5 { step: f64 },
}

impl Method {
    fn fixed_step(&self) -> Option<f64> {
        match *self {
            Method::Tsit5Adaptive => None,
            Method::Rk4 { step } | Method::Tsit5 { step } => Some(step),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverSettings {
    pub method: Method,
    pub rtol: f64,
    pub atol: f64,
    /// First trial step; chosen from the initial slope when `None`.
    pub initial_step: Option<f64>,
    pub min_step: f64,
    pub max_step: f64,
    /// Upper bound on attempted steps (accepted plus rejected) per call.
    pub max_steps: usize,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            method: Method::Tsit5Adaptive,
            rtol: 1e-8,
            atol: 1e-10,
            initial_step: None,
            min_step: 1e-12,
            max_step: f64::INFINITY,
            max_steps: 100_000,
        }
    }
}

impl SolverSettings {
    pub fn with_tolerances(rtol: f64, atol: f64) -> Self {
        Self {
            rtol,
            atol,
            ..Self::default()
        }
    }

    pub fn rk4(step: f64) -> Self {
        Self {
            method: Method::Rk4 { step },
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !self.rtol.is_finite() || self.rtol <= 0.0 {
            return Err(ModelError::invalid("rtol", "must be finite and positive"));
        }
        if !self.atol.is_finite() || self.atol <= 0.0 {
            return Err(ModelError::invalid("atol", "must be finite and positive"));
        }
        if !self.min_step.is_finite() || self.min_step <= 0.0 {
            return Err(ModelError::invalid("min_step", "must be finite and positive"));
        }
        if self.max_step.is_nan() || self.max_step < self.min_step {
            return Err(ModelError::invalid("max_step", "must be at least min_step"));
        }
        if let Some(h0) = self.initial_step {
            if !h0.is_finite() || h0 <= 0.0 {
                return Err(ModelError::invalid(
                    "initial_step",
                    "must be finite and positive",
                ));
            }
        }
        if self.max_steps == 0 {
            return Err(ModelError::invalid("max_steps", "must be greater than zero"));
        }
        if let Some(step) = self.method.fixed_step() {
            if !step.is_finite() || step <= 0.0 {
                return Err(ModelError::invalid("step", "must be finite and positive"));
            }
        }
        Ok(())
    }
}

/// Integrates `system` from `initial_state` at `times[0]`, sampling at every entry of `times`.
///
/// The first sample is `initial_state` itself. Fails with
/// [`ModelError::NumericalFailure`] if the step size underflows, the step budget runs
/// out, or the state stops being finite; nothing partial is returned.
pub fn integrate<S>(
    system: &S,
    initial_state: &[f64],
    times: &[f64],
    settings: &SolverSettings,
) -> Result<Trajectory>
where
    S: DynamicalSystem<f64>,
{
    settings.validate()?;
    let dim = system.dimension();
    if initial_state.len() != dim {
        return Err(ModelError::invalid(
            "initial state",
            format!(
                "dimension mismatch. Expected {}, got {}",
                dim,
                initial_state.len()
            ),
        ));
    }
    if let Some(value) = initial_state.iter().find(|v| !v.is_finite()) {
        return Err(ModelError::invalid(
            "initial state",
            format!("must be finite, got {value}"),
        ));
    }
    validate_time_grid(times)?;

    debug!(
        points = times.len(),
        start = times[0],
        end = times[times.len() - 1],
        method = ?settings.method,
        "integrating"
    );

    let mut trajectory = Trajectory::with_capacity(dim, times.len());
    trajectory.push(times[0], initial_state);

    let result = match settings.method {
        Method::Tsit5Adaptive => {
            let mut driver = AdaptiveDriver::new(system, initial_state, times, settings);
            driver.run(system, initial_state, times, &mut trajectory)
        }
        Method::Rk4 { step } => run_fixed(
            RK4::new(dim),
            system,
            initial_state,
            times,
            step,
            settings,
            &mut trajectory,
        ),
        Method::Tsit5 { step } => run_fixed(
            Tsit5::new(dim),
            system,
            initial_state,
            times,
            step,
            settings,
            &mut trajectory,
        ),
    };

    match result {
        Ok(stats) => {
            debug!(
                accepted = stats.accepted_steps,
                rejected = stats.rejected_steps,
                "integration finished"
            );
            trajectory.set_stats(stats);
            Ok(trajectory)
        }
        Err(err) => {
            warn!(error = %err, "integration failed");
            Err(err)
        }
    }
}

fn validate_time_grid(times: &[f64]) -> Result<()> {
    if times.is_empty() {
        return Err(ModelError::invalid(
            "time points",
            "at least one time point is required",
        ));
    }
    if let Some(t) = times.iter().find(|t| !t.is_finite()) {
        return Err(ModelError::invalid(
            "time points",
            format!("must be finite, got {t}"),
        ));
    }
    if let Some(index) = times.windows(2).position(|pair| pair[1] <= pair[0]) {
        return Err(ModelError::invalid(
            "time points",
            format!(
                "must be strictly increasing; t[{}] = {} follows t[{}] = {}",
                index + 1,
                times[index + 1],
                index,
                times[index]
            ),
        ));
    }
    Ok(())
}

fn ensure_finite(t: f64, state: &[f64]) -> Result<()> {
    if state.iter().all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(ModelError::numerical(t, "state became non-finite"))
    }
}

fn run_fixed<S: DynamicalSystem<f64>>(
    mut stepper: impl Steppable<f64>,
    system: &S,
    initial_state: &[f64],
    times: &[f64],
    step: f64,
    settings: &SolverSettings,
    trajectory: &mut Trajectory,
) -> Result<IntegrationStats> {
    let mut state = initial_state.to_vec();
    let mut stats = IntegrationStats::default();

    for window in times.windows(2) {
        let (start, end) = (window[0], window[1]);
        // Saturates at usize::MAX for tiny steps; the budget check below rejects that.
        let substeps = ((end - start) / step).ceil().max(1.0) as usize;
        let Some(total) = stats
            .accepted_steps
            .checked_add(substeps)
            .filter(|total| *total <= settings.max_steps)
        else {
            return Err(ModelError::numerical(
                start,
                format!("exceeded max_steps = {}", settings.max_steps),
            ));
        };
        let dt = (end - start) / substeps as f64;
        let mut t = start;
        for _ in 0..substeps {
            stepper.step(system, &mut t, &mut state, dt);
        }
        stats.accepted_steps = total;
        ensure_finite(end, &state)?;
        trajectory.push(end, &state);
    }

    Ok(stats)
}

struct AdaptiveDriver<'a> {
    settings: &'a SolverSettings,
    stepper: Tsit5<f64>,
    proposal: Vec<f64>,
    error: Vec<f64>,
    h: f64,
    stats: IntegrationStats,
}

impl<'a> AdaptiveDriver<'a> {
    fn new<S: DynamicalSystem<f64>>(
        system: &S,
        initial_state: &[f64],
        times: &[f64],
        settings: &'a SolverSettings,
    ) -> Self {
        let dim = initial_state.len();
        let span = times[times.len() - 1] - times[0];
        let h = settings
            .initial_step
            .unwrap_or_else(|| initial_step(system, times[0], initial_state, settings))
            .min(settings.max_step)
            .max(settings.min_step);
        Self {
            settings,
            stepper: Tsit5::new(dim),
            proposal: vec![0.0; dim],
            error: vec![0.0; dim],
            h: if span > 0.0 { h.min(span) } else { h },
            stats: IntegrationStats::default(),
        }
    }

    fn run<S: DynamicalSystem<f64>>(
        &mut self,
        system: &S,
        initial_state: &[f64],
        times: &[f64],
        trajectory: &mut Trajectory,
    ) -> Result<IntegrationStats> {
        let mut t = times[0];
        let mut state = initial_state.to_vec();
        for &target in &times[1..] {
            self.advance(system, &mut t, &mut state, target)?;
            trajectory.push(target, &state);
        }
        Ok(self.stats)
    }

    /// Steps from `t` to exactly `target`, adapting `h` along the way.
    fn advance<S: DynamicalSystem<f64>>(
        &mut self,
        system: &S,
        t: &mut f64,
        state: &mut [f64],
        target: f64,
    ) -> Result<()> {
        let settings = self.settings;
        while *t < target {
            if self.stats.accepted_steps + self.stats.rejected_steps >= settings.max_steps {
                return Err(ModelError::numerical(
                    *t,
                    format!(
                        "exceeded max_steps = {} before reaching t = {}",
                        settings.max_steps, target
                    ),
                ));
            }

            let clamped = self.h >= target - *t;
            let t_next = if clamped { target } else { *t + self.h };
            // The step actually representable at this time, not the nominal one.
            let h = t_next - *t;
            if h <= 0.0 {
                return Err(ModelError::numerical(
                    *t,
                    format!(
                        "step size {:e} is below the time resolution at this t",
                        self.h
                    ),
                ));
            }

            self.stepper
                .attempt(system, *t, state, h, &mut self.proposal, &mut self.error);
            let err = self.error_norm(state);
            let factor = if err == 0.0 {
                MAX_FACTOR
            } else {
                (SAFETY * err.powf(-0.2)).clamp(MIN_FACTOR, MAX_FACTOR)
            };

            if err <= 1.0 {
                self.stats.accepted_steps += 1;
                state.copy_from_slice(&self.proposal);
                *t = t_next;
                let next = (h * factor).min(settings.max_step);
                // A step shortened to land on a sample point says nothing about the scale.
                self.h = if clamped { next.max(self.h) } else { next };
            } else {
                self.stats.rejected_steps += 1;
                let next = h * factor.min(1.0);
                trace!(t = *t, h, err, "step rejected");
                if next < settings.min_step {
                    return Err(ModelError::numerical(
                        *t,
                        format!(
                            "step size {next:e} fell below min_step = {:e}; tolerance cannot be met",
                            settings.min_step
                        ),
                    ));
                }
                self.h = next;
            }
        }
        ensure_finite(*t, state)
    }

    /// RMS of the error scaled by `atol + rtol * max(|y|, |y_new|)`; non-finite maps to infinity.
    fn error_norm(&self, state: &[f64]) -> f64 {
        let n = state.len().max(1) as f64;
        let sum: f64 = state
            .iter()
            .zip(&self.proposal)
            .zip(&self.error)
            .map(|((y, y_new), e)| {
                let scale = self.settings.atol + self.settings.rtol * y.abs().max(y_new.abs());
                (e / scale).powi(2)
            })
            .sum();
        let norm = (sum / n).sqrt();
        if norm.is_finite() {
            norm
        } else {
            f64::INFINITY
        }
    }
}

/// Starting step from the size of the state relative to its initial slope.
fn initial_step<S: DynamicalSystem<f64>>(
    system: &S,
    t0: f64,
    state: &[f64],
    settings: &SolverSettings,
) -> f64 {
    let mut slope = vec![0.0; state.len()];
    system.apply(t0, state, &mut slope);
    let n = state.len().max(1) as f64;
    let scaled_norm = |values: &[f64]| {
        let sum: f64 = values
            .iter()
            .zip(state)
            .map(|(v, y)| (v / (settings.atol + settings.rtol * y.abs())).powi(2))
            .sum();
        (sum / n).sqrt()
    };
    let d0 = scaled_norm(state);
    let d1 = scaled_norm(&slope);
    if d0 < 1e-5 || d1 < 1e-5 || !d1.is_finite() {
        1e-6
    } else {
        0.01 * d0 / d1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Decay {
        rate: f64,
    }

    impl DynamicalSystem<f64> for Decay {
        fn dimension(&self) -> usize {
            1
        }

        fn apply(&self, _t: f64, x: &[f64], out: &mut [f64]) {
            out[0] = -self.rate * x[0];
        }
    }

    /// dx/dt = x², which blows up at t = 1 from x(0) = 1.
    struct Blowup;

    impl DynamicalSystem<f64> for Blowup {
        fn dimension(&self) -> usize {
            1
        }

        fn apply(&self, _t: f64, x: &[f64], out: &mut [f64]) {
            out[0] = x[0] * x[0];
        }
    }

    fn assert_err_contains<T: std::fmt::Debug>(result: Result<T>, needle: &str) {
        let err = result.expect_err("expected error");
        let message = format!("{err}");
        assert!(
            message.contains(needle),
            "expected error to contain \"{needle}\", got \"{message}\""
        );
    }

    fn grid(end: f64, n: usize) -> Vec<f64> {
        (0..=n).map(|k| end * k as f64 / n as f64).collect()
    }

    #[test]
    fn adaptive_hits_every_requested_point() {
        let times = grid(5.0, 10);
        let trajectory = integrate(
            &Decay { rate: 0.7 },
            &[2.0],
            &times,
            &SolverSettings::default(),
        )
        .expect("integration should succeed");

        assert_eq!(trajectory.times(), times.as_slice());
        for (t, row) in trajectory.times().iter().zip(trajectory.states()) {
            let exact = 2.0 * (-0.7 * t).exp();
            assert!((row[0] - exact).abs() < 1e-7, "t = {t}");
        }
        assert!(trajectory.stats().accepted_steps >= 10);
    }

    #[test]
    fn first_sample_is_the_initial_state() {
        let trajectory = integrate(
            &Decay { rate: 1.0 },
            &[0.25],
            &[3.0],
            &SolverSettings::default(),
        )
        .expect("single point grid");
        assert_eq!(trajectory.len(), 1);
        assert_eq!(trajectory.state(0), Some(&[0.25][..]));
        assert_eq!(trajectory.times(), &[3.0][..]);
    }

    #[test]
    fn rk4_substeps_match_the_analytic_solution() {
        let trajectory = integrate(
            &Decay { rate: 1.0 },
            &[1.0],
            &[0.0, 0.5, 2.0],
            &SolverSettings::rk4(0.01),
        )
        .expect("rk4 should succeed");
        let last = trajectory.final_state().expect("final state")[0];
        assert!((last - (-2.0_f64).exp()).abs() < 1e-9);
        assert_eq!(trajectory.stats().accepted_steps, 200);
    }

    #[test]
    fn fixed_tsit5_substeps_match_the_analytic_solution() {
        let settings = SolverSettings {
            method: Method::Tsit5 { step: 0.1 },
            ..SolverSettings::default()
        };
        let trajectory = integrate(&Decay { rate: 1.0 }, &[1.0], &[0.0, 0.5, 2.0], &settings)
            .expect("fixed tsit5 should succeed");
        let last = trajectory.final_state().expect("final state")[0];
        assert!((last - (-2.0_f64).exp()).abs() < 1e-9);
        assert_eq!(trajectory.stats().accepted_steps, 20);
        assert_eq!(trajectory.stats().rejected_steps, 0);
    }

    #[test]
    fn adaptive_steps_follow_representable_time() {
        // Far from the origin the spacing of f64 is coarse, so nominal and actual steps differ.
        let start = 1e6;
        let trajectory = integrate(
            &Decay { rate: 0.2 },
            &[1.0],
            &[start, start + 10.0],
            &SolverSettings::default(),
        )
        .expect("integration should succeed");
        let last = trajectory.final_state().expect("final state")[0];
        let exact = (-2.0_f64).exp();
        assert!((last - exact).abs() < 1e-7 * exact, "got {last}, expected {exact}");
    }

    #[test]
    fn steps_below_time_resolution_are_a_numerical_failure() {
        let start = 1e15;
        let result = integrate(
            &Decay { rate: 0.2 },
            &[1.0],
            &[start, start + 10.0],
            &SolverSettings::default(),
        );
        match result {
            Err(ModelError::NumericalFailure { time, reason }) => {
                assert_eq!(time, start);
                assert!(reason.contains("time resolution"), "reason: {reason}");
            }
            other => panic!("expected numerical failure, got {other:?}"),
        }
    }

    #[test]
    fn huge_substep_counts_hit_the_step_budget() {
        assert_err_contains(
            integrate(
                &Decay { rate: 1.0 },
                &[1.0],
                &[0.0, 1e-19, 2.0],
                &SolverSettings::rk4(1e-19),
            ),
            "max_steps",
        );
    }

    #[test]
    fn tighter_tolerance_reduces_error() {
        let times = grid(4.0, 4);
        let exact = (-4.0_f64).exp();
        let error_at = |rtol: f64| {
            let settings = SolverSettings::with_tolerances(rtol, rtol * 1e-2);
            let trajectory =
                integrate(&Decay { rate: 1.0 }, &[1.0], &times, &settings).expect("integrate");
            (trajectory.final_state().expect("final")[0] - exact).abs()
        };
        let loose = error_at(1e-4);
        let tight = error_at(1e-10);
        assert!(tight < loose, "tight = {tight}, loose = {loose}");
        assert!(tight < 1e-9);
    }

    #[test]
    fn rejects_bad_time_grids() {
        let system = Decay { rate: 1.0 };
        let settings = SolverSettings::default();
        assert_err_contains(integrate(&system, &[1.0], &[], &settings), "at least one");
        assert_err_contains(
            integrate(&system, &[1.0], &[0.0, 1.0, 1.0], &settings),
            "strictly increasing",
        );
        assert_err_contains(
            integrate(&system, &[1.0], &[0.0, f64::NAN], &settings),
            "must be finite",
        );
    }

    #[test]
    fn rejects_dimension_mismatch_and_bad_settings() {
        let system = Decay { rate: 1.0 };
        assert_err_contains(
            integrate(&system, &[1.0, 2.0], &[0.0, 1.0], &SolverSettings::default()),
            "dimension mismatch",
        );
        let settings = SolverSettings {
            rtol: 0.0,
            ..SolverSettings::default()
        };
        assert_err_contains(integrate(&system, &[1.0], &[0.0, 1.0], &settings), "rtol");
        assert_err_contains(
            integrate(&system, &[1.0], &[0.0, 1.0], &SolverSettings::rk4(-0.1)),
            "step",
        );
        let settings = SolverSettings {
            method: Method::Tsit5 { step: f64::NAN },
            ..SolverSettings::default()
        };
        assert_err_contains(integrate(&system, &[1.0], &[0.0, 1.0], &settings), "step");
    }

    #[test]
    fn finite_time_blowup_is_a_numerical_failure() {
        let result = integrate(&Blowup, &[1.0], &[0.0, 2.0], &SolverSettings::default());
        match result {
            Err(ModelError::NumericalFailure { time, .. }) => assert!(time < 1.01),
            other => panic!("expected numerical failure, got {other:?}"),
        }
    }

    #[test]
    fn step_budget_is_enforced() {
        let settings = SolverSettings {
            max_steps: 3,
            ..SolverSettings::default()
        };
        assert_err_contains(
            integrate(&Decay { rate: 1.0 }, &[1.0], &grid(10.0, 10), &settings),
            "max_steps",
        );
        let settings = SolverSettings {
            max_steps: 5,
            ..SolverSettings::rk4(0.1)
        };
        assert_err_contains(
            integrate(&Decay { rate: 1.0 }, &[1.0], &[0.0, 1.0], &settings),
            "max_steps",
        );
    }
}
