pub mod analysis;
pub mod error;
pub mod integrate;
pub mod models;
pub mod simulation;
pub mod solvers;
pub mod spectrum;
pub mod state;
/// The `contagion_core` crate models epidemic spread with compartmental ODE systems.
/// The vector fields are generic over the scalar type; integration and analysis run on `f64`.
///
/// Key components:
/// - **Traits**: `Scalar`, `DynamicalSystem` (vector fields), `Steppable` (solvers),
///   `CompartmentalModel` (labels, rates, Jacobian).
/// - **Models**: SIR and SEIR vector fields with validated rates.
/// - **Solvers**: RK4 and Tsit5 steppers, both usable at a fixed step; Tsit5 also reports
///   an embedded error estimate.
/// - **Integrate**: adaptive or fixed-step driver that samples a caller-supplied time grid.
/// - **Simulation**: the engine holding parameters, initial state, and the last trajectory,
///   with time-series and phase-portrait accessors for a plotting layer.
/// - **Analysis / Spectrum**: R₀, thresholds, peak, final size, linear stability, and the
///   FFT amplitude spectrum of a compartment.
pub mod traits;
pub mod trajectory;

pub use error::{ModelError, Result};
pub use integrate::{integrate, Method, SolverSettings};
pub use simulation::{SeirModel, SirModel, Simulation};
pub use state::{Compartment, SeirState, SirState};
