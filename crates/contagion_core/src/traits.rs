use crate::analysis::FinalSize;
use crate::state::Compartment;
use num_traits::{Float, FromPrimitive};
use std::fmt::Debug;

/// A trait for types that can be used as scalars in our dynamical systems.
/// Must support basic arithmetic, debug printing, and conversion from f64.
pub trait Scalar: Float + FromPrimitive + Debug + 'static {}

impl<T: Float + FromPrimitive + Debug + 'static> Scalar for T {}

/// Represents a continuous-time dynamical system (a vector field).
pub trait DynamicalSystem<T: Scalar> {
    /// Returns the dimension of the state space.
    fn dimension(&self) -> usize;

    /// Evaluates the vector field.
    /// t: current time (ignored by autonomous systems)
    /// x: current state
    /// out: buffer to write dx/dt
    fn apply(&self, t: T, x: &[T], out: &mut [T]);
}

/// A trait for solvers that can step a system forward.
pub trait Steppable<T: Scalar> {
    /// Performs one step of size dt.
    /// t: current time (updated after step)
    /// state: current state (updated after step)
    /// dt: step size
    fn step(&mut self, system: &impl DynamicalSystem<T>, t: &mut T, state: &mut [T], dt: T);
}

/// A compartmental epidemic model whose components sum to a conserved population.
pub trait CompartmentalModel: DynamicalSystem<f64> {
    /// Compartments in state-vector order.
    fn compartments(&self) -> &'static [Compartment];

    /// Transmission rate β.
    fn transmission_rate(&self) -> f64;

    /// Recovery rate γ.
    fn recovery_rate(&self) -> f64;

    /// Row-major Jacobian ∂f/∂x at `state`, written into `out` (len = dim²).
    fn jacobian(&self, state: &[f64], out: &mut [f64]);

    /// Limiting outcome as t → ∞ from `initial_state`, when the model has a closed form for it.
    fn final_size(&self, _initial_state: &[f64]) -> Option<FinalSize> {
        None
    }

    /// Position of `compartment` in the state vector, if the model has it.
    fn index_of(&self, compartment: Compartment) -> Option<usize> {
        self.compartments().iter().position(|c| *c == compartment)
    }
}

/// Lifts an `f64` constant into the scalar type. Non-representable values become NaN,
/// which the integrator reports as a numerical failure.
pub(crate) fn constant<T: Scalar>(value: f64) -> T {
    T::from_f64(value).unwrap_or_else(T::nan)
}
