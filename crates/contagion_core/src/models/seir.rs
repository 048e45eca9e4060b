use crate::analysis::{final_size, FinalSize};
use crate::error::{ensure_non_negative, Result};
use crate::state::Compartment;
use crate::traits::{constant, CompartmentalModel, DynamicalSystem, Scalar};
use serde::{Deserialize, Serialize};

const COMPARTMENTS: [Compartment; 4] = [
    Compartment::Susceptible,
    Compartment::Exposed,
    Compartment::Infected,
    Compartment::Recovered,
];

/// Rates of the SEIR model. `1 / sigma` is the mean latent period.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeirParameters {
    pub beta: f64,
    pub sigma: f64,
    pub gamma: f64,
}

/// SIR with a latent (exposed, not yet infectious) stage between S and I.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Seir {
    params: SeirParameters,
}

impl Seir {
    pub fn new(params: SeirParameters) -> Result<Self> {
        ensure_non_negative("beta", params.beta)?;
        ensure_non_negative("sigma", params.sigma)?;
        ensure_non_negative("gamma", params.gamma)?;
        Ok(Self { params })
    }

    pub fn parameters(&self) -> SeirParameters {
        self.params
    }
}

impl<T: Scalar> DynamicalSystem<T> for Seir {
    fn dimension(&self) -> usize {
        4
    }

    fn apply(&self, _t: T, x: &[T], out: &mut [T]) {
        let beta: T = constant(self.params.beta);
        let sigma: T = constant(self.params.sigma);
        let gamma: T = constant(self.params.gamma);
        let (s, e, i) = (x[0], x[1], x[2]);

        let infection = beta * s * i;
        let onset = sigma * e;
        let recovery = gamma * i;
        out[0] = -infection;
        out[1] = infection - onset;
        out[2] = onset - recovery;
        out[3] = recovery;
    }
}

impl CompartmentalModel for Seir {
    fn compartments(&self) -> &'static [Compartment] {
        &COMPARTMENTS
    }

    fn transmission_rate(&self) -> f64 {
        self.params.beta
    }

    fn recovery_rate(&self) -> f64 {
        self.params.gamma
    }

    /// Same relation as SIR once everyone latent has become infectious; with σ = 0 the
    /// exposed never leave and there is no closed form.
    fn final_size(&self, initial_state: &[f64]) -> Option<FinalSize> {
        let SeirParameters { beta, sigma, gamma } = self.params;
        match initial_state {
            &[s, e, i, r] if sigma > 0.0 => Some(final_size(beta, gamma, s, e + i, r)),
            _ => None,
        }
    }

    fn jacobian(&self, state: &[f64], out: &mut [f64]) {
        let SeirParameters { beta, sigma, gamma } = self.params;
        let (s, i) = (state[0], state[2]);
        #[rustfmt::skip]
        let jacobian = [
            -beta * i, 0.0,    -beta * s, 0.0,
            beta * i,  -sigma, beta * s,  0.0,
            0.0,       sigma,  -gamma,    0.0,
            0.0,       0.0,    gamma,     0.0,
        ];
        out.copy_from_slice(&jacobian);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seir(beta: f64, sigma: f64, gamma: f64) -> Seir {
        Seir::new(SeirParameters { beta, sigma, gamma }).expect("valid rates")
    }

    fn eval(model: &Seir, x: [f64; 4]) -> [f64; 4] {
        let mut out = [0.0; 4];
        DynamicalSystem::<f64>::apply(model, 0.0, &x, &mut out);
        out
    }

    #[test]
    fn exposed_feed_infected_at_sigma() {
        let model = seir(0.0, 0.5, 0.0);
        let out = eval(&model, [0.5, 0.4, 0.1, 0.0]);
        assert_eq!(out, [0.0, -0.2, 0.2, 0.0]);
    }

    #[test]
    fn derivatives_sum_to_zero() {
        let model = seir(0.9, 0.2, 0.1);
        let out = eval(&model, [0.7, 0.1, 0.15, 0.05]);
        assert!(out.iter().sum::<f64>().abs() < 1e-15);
    }

    #[test]
    fn jacobian_matches_finite_differences() {
        let model = seir(0.8, 0.25, 0.1);
        let state = [0.6, 0.1, 0.2, 0.1];
        let mut jac = [0.0; 16];
        model.jacobian(&state, &mut jac);

        let h = 1e-7;
        for j in 0..4 {
            let mut plus = state;
            let mut minus = state;
            plus[j] += h;
            minus[j] -= h;
            let (f_plus, f_minus) = (eval(&model, plus), eval(&model, minus));
            for i in 0..4 {
                let fd = (f_plus[i] - f_minus[i]) / (2.0 * h);
                assert!((jac[i * 4 + j] - fd).abs() < 1e-8, "entry ({i}, {j})");
            }
        }
    }

    #[test]
    fn final_size_requires_latent_outflow() {
        let state = [0.98, 0.01, 0.01, 0.0];
        let outcome = seir(0.5, 0.2, 0.1).final_size(&state).expect("sigma > 0");
        let sir_outcome = final_size(0.5, 0.1, 0.98, 0.02, 0.0);
        assert_eq!(outcome, sir_outcome);
        assert!(seir(0.5, 0.0, 0.1).final_size(&state).is_none());
    }

    #[test]
    fn new_rejects_negative_sigma() {
        let err = Seir::new(SeirParameters {
            beta: 0.3,
            sigma: -0.2,
            gamma: 0.1,
        })
        .expect_err("negative sigma");
        assert!(err.to_string().contains("sigma"));
    }
}
