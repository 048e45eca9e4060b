use crate::analysis::{final_size, FinalSize};
use crate::error::{ensure_non_negative, Result};
use crate::state::Compartment;
use crate::traits::{constant, CompartmentalModel, DynamicalSystem, Scalar};
use serde::{Deserialize, Serialize};

const COMPARTMENTS: [Compartment; 3] = [
    Compartment::Susceptible,
    Compartment::Infected,
    Compartment::Recovered,
];

/// Rates of the SIR model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SirParameters {
    /// Transmission rate β.
    pub beta: f64,
    /// Recovery rate γ.
    pub gamma: f64,
}

/// The SIR vector field with validated rates.
///
/// ```text
/// dS/dt = -β·S·I
/// dI/dt =  β·S·I - γ·I
/// dR/dt =  γ·I
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sir {
    params: SirParameters,
}

impl Sir {
    pub fn new(params: SirParameters) -> Result<Self> {
        ensure_non_negative("beta", params.beta)?;
        ensure_non_negative("gamma", params.gamma)?;
        Ok(Self { params })
    }

    pub fn parameters(&self) -> SirParameters {
        self.params
    }
}

impl<T: Scalar> DynamicalSystem<T> for Sir {
    fn dimension(&self) -> usize {
        3
    }

    fn apply(&self, _t: T, x: &[T], out: &mut [T]) {
        let beta: T = constant(self.params.beta);
        let gamma: T = constant(self.params.gamma);
        let (s, i) = (x[0], x[1]);

        let infection = beta * s * i;
        let recovery = gamma * i;
        out[0] = -infection;
        out[1] = infection - recovery;
        out[2] = recovery;
    }
}

impl CompartmentalModel for Sir {
    fn compartments(&self) -> &'static [Compartment] {
        &COMPARTMENTS
    }

    fn transmission_rate(&self) -> f64 {
        self.params.beta
    }

    fn recovery_rate(&self) -> f64 {
        self.params.gamma
    }

    fn final_size(&self, initial_state: &[f64]) -> Option<FinalSize> {
        let SirParameters { beta, gamma } = self.params;
        match initial_state {
            &[s, i, r] => Some(final_size(beta, gamma, s, i, r)),
            _ => None,
        }
    }

    fn jacobian(&self, state: &[f64], out: &mut [f64]) {
        let SirParameters { beta, gamma } = self.params;
        let (s, i) = (state[0], state[1]);
        out.copy_from_slice(&[
            -beta * i,
            -beta * s,
            0.0,
            beta * i,
            beta * s - gamma,
            0.0,
            0.0,
            gamma,
            0.0,
        ]);
    }
}
