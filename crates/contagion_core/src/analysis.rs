use crate::error::{ModelError, Result};
use crate::state::Compartment;
use crate::traits::CompartmentalModel;
use crate::trajectory::Trajectory;
use nalgebra::{Complex, DMatrix};
use serde::Serialize;

const BISECTION_MAX_ITERATIONS: usize = 200;

/// Largest value of the infected compartment over a trajectory.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Peak {
    pub index: usize,
    pub time: f64,
    pub value: f64,
}

/// Limiting state of an outbreak as t → ∞.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FinalSize {
    /// Susceptible that escape infection.
    pub susceptible: f64,
    pub recovered: f64,
    /// Fraction of the population infected over the whole outbreak.
    pub attack_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EpidemicSummary {
    pub population: f64,
    pub basic_reproduction_number: f64,
    pub epidemic_threshold: f64,
    pub herd_immunity_threshold: f64,
    pub peak: Peak,
    pub final_size: Option<FinalSize>,
    /// Largest |N(t) - N(0)| over the stored samples.
    pub conservation_drift: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ComplexNumber {
    pub re: f64,
    pub im: f64,
}

impl From<Complex<f64>> for ComplexNumber {
    fn from(value: Complex<f64>) -> Self {
        Self {
            re: value.re,
            im: value.im,
        }
    }
}

/// Spectrum of the Jacobian at a state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Stability {
    pub jacobian: Vec<f64>,
    pub eigenvalues: Vec<ComplexNumber>,
    /// Largest real part; positive means small perturbations grow.
    pub growth_rate: f64,
}

/// R₀ = β/γ. Infinite when γ = 0 and β > 0; zero when β = 0.
pub fn basic_reproduction_number(beta: f64, gamma: f64) -> f64 {
    if beta == 0.0 {
        0.0
    } else if gamma == 0.0 {
        f64::INFINITY
    } else {
        beta / gamma
    }
}

/// S* = γ/β, the susceptible level at which dI/dt changes sign. Infinite when β = 0.
pub fn epidemic_threshold(beta: f64, gamma: f64) -> f64 {
    if beta == 0.0 {
        f64::INFINITY
    } else {
        gamma / beta
    }
}

/// Immune fraction 1 - 1/R₀ needed to stop growth, clamped to [0, 1].
pub fn herd_immunity_threshold(r0: f64) -> f64 {
    if r0 <= 1.0 {
        0.0
    } else {
        (1.0 - 1.0 / r0).clamp(0.0, 1.0)
    }
}

/// First maximum of `values`, paired with its time.
pub fn find_peak(times: &[f64], values: &[f64]) -> Option<Peak> {
    let mut best: Option<Peak> = None;
    for (index, (&time, &value)) in times.iter().zip(values).enumerate() {
        if best.map_or(true, |peak| value > peak.value) {
            best = Some(Peak { index, time, value });
        }
    }
    best
}

/// Solves the final-size relation `S∞ = S₀·exp(-(β/γ)·(N - S∞ - R₀))`.
///
/// `seeded` is everything currently infected or latent; it all ends up removed when
/// γ > 0. With γ = 0 nobody is removed and, given any transmission, every susceptible
/// is eventually infected.
pub fn final_size(
    beta: f64,
    gamma: f64,
    susceptible: f64,
    seeded: f64,
    removed: f64,
) -> FinalSize {
    let population = susceptible + seeded + removed;
    let escaped = if seeded == 0.0 || beta == 0.0 || susceptible == 0.0 {
        susceptible
    } else if gamma == 0.0 {
        0.0
    } else {
        solve_final_susceptible(beta / gamma, susceptible, population, removed)
    };
    let recovered = if gamma > 0.0 {
        population - escaped
    } else {
        removed
    };
    let attack_rate = if population > 0.0 {
        (susceptible - escaped) / population
    } else {
        0.0
    };
    FinalSize {
        susceptible: escaped,
        recovered,
        attack_rate,
    }
}

/// Bisection on [0, S₀], where `x - S₀·exp(-r0·(N - x - R₀))` changes sign exactly once.
fn solve_final_susceptible(r0: f64, s0: f64, population: f64, removed: f64) -> f64 {
    let residual = |x: f64| x - s0 * (-r0 * (population - x - removed)).exp();
    let (mut lo, mut hi) = (0.0, s0);
    for _ in 0..BISECTION_MAX_ITERATIONS {
        let mid = 0.5 * (lo + hi);
        if residual(mid) < 0.0 {
            lo = mid;
        } else {
            hi = mid;
        }
        if hi - lo <= f64::EPSILON * s0 {
            break;
        }
    }
    0.5 * (lo + hi)
}

/// Eigenvalues of the model Jacobian at `state`.
pub fn linear_stability<M: CompartmentalModel>(model: &M, state: &[f64]) -> Result<Stability> {
    let dim = model.dimension();
    if state.len() != dim {
        return Err(ModelError::invalid(
            "state",
            format!("dimension mismatch. Expected {}, got {}", dim, state.len()),
        ));
    }
    if state.iter().any(|v| !v.is_finite()) {
        return Err(ModelError::invalid("state", "must be finite"));
    }

    let mut jacobian = vec![0.0; dim * dim];
    model.jacobian(state, &mut jacobian);
    let matrix = DMatrix::from_row_slice(dim, dim, &jacobian);
    let eigenvalues: Vec<ComplexNumber> = matrix
        .complex_eigenvalues()
        .iter()
        .map(|&lambda| ComplexNumber::from(lambda))
        .collect();
    let growth_rate = eigenvalues
        .iter()
        .map(|lambda| lambda.re)
        .fold(f64::NEG_INFINITY, f64::max);

    Ok(Stability {
        jacobian,
        eigenvalues,
        growth_rate,
    })
}

pub(crate) fn empty_trajectory() -> ModelError {
    ModelError::invalid("trajectory", "contains no samples")
}

/// Builds the summary metrics for `model` over a stored `trajectory`.
pub fn summarize<M: CompartmentalModel>(
    model: &M,
    trajectory: &Trajectory,
) -> Result<EpidemicSummary> {
    let infected_index = model
        .index_of(Compartment::Infected)
        .ok_or_else(|| ModelError::invalid("model", "has no infected compartment"))?;
    let infected = trajectory.column(infected_index).ok_or_else(|| {
        ModelError::invalid(
            "trajectory",
            format!(
                "has dimension {}, model expects {}",
                trajectory.dimension(),
                model.dimension()
            ),
        )
    })?;
    let peak = find_peak(trajectory.times(), &infected).ok_or_else(empty_trajectory)?;

    let totals = trajectory.totals();
    let population = totals.first().copied().unwrap_or(0.0);
    let conservation_drift = totals
        .iter()
        .map(|total| (total - population).abs())
        .fold(0.0, f64::max);

    let (beta, gamma) = (model.transmission_rate(), model.recovery_rate());
    let r0 = basic_reproduction_number(beta, gamma);
    let initial_state = trajectory.state(0).ok_or_else(empty_trajectory)?;

    Ok(EpidemicSummary {
        population,
        basic_reproduction_number: r0,
        epidemic_threshold: epidemic_threshold(beta, gamma),
        herd_immunity_threshold: herd_immunity_threshold(r0),
        peak,
        final_size: model.final_size(initial_state),
        conservation_drift,
    })
}
