use crate::analysis::{self, EpidemicSummary, FinalSize, Peak, Stability};
use crate::error::{ensure_non_negative, ModelError, Result};
use crate::integrate::{integrate, SolverSettings};
use crate::models::{Seir, SeirParameters, Sir, SirParameters};
use crate::spectrum::{self, Spectrum};
use crate::state::{Compartment, SeirState, SirState};
use crate::traits::CompartmentalModel;
use crate::trajectory::{PhasePortrait, TimeSeries, Trajectory};
use tracing::debug;

/// A model, its initial conditions, and the trajectory of the last successful run.
///
/// Starts without a trajectory; every accessor that reads one fails with
/// [`ModelError::NotSimulated`] until [`Simulation::simulate`] succeeds. A failed run
/// leaves the previously stored trajectory in place.
#[derive(Debug, Clone)]
pub struct Simulation<M: CompartmentalModel> {
    model: M,
    initial_state: Vec<f64>,
    settings: SolverSettings,
    trajectory: Option<Trajectory>,
}

pub type SirModel = Simulation<Sir>;
pub type SeirModel = Simulation<Seir>;

impl<M: CompartmentalModel> Simulation<M> {
    pub fn new(model: M, initial_state: impl Into<Vec<f64>>) -> Result<Self> {
        let initial_state = initial_state.into();
        let compartments = model.compartments();
        if initial_state.len() != compartments.len() {
            return Err(ModelError::invalid(
                "initial state",
                format!(
                    "expected {} compartments, got {}",
                    compartments.len(),
                    initial_state.len()
                ),
            ));
        }
        for (compartment, &value) in compartments.iter().zip(&initial_state) {
            ensure_non_negative(compartment.initial_label(), value)?;
        }

        Ok(Self {
            model,
            initial_state,
            settings: SolverSettings::default(),
            trajectory: None,
        })
    }

    pub fn with_settings(mut self, settings: SolverSettings) -> Result<Self> {
        settings.validate()?;
        self.settings = settings;
        Ok(self)
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn initial_state(&self) -> &[f64] {
        &self.initial_state
    }

    pub fn settings(&self) -> &SolverSettings {
        &self.settings
    }

    /// Total population, conserved by every supported model.
    pub fn population(&self) -> f64 {
        self.initial_state.iter().sum()
    }

    pub fn is_simulated(&self) -> bool {
        self.trajectory.is_some()
    }

    /// Integrates over `times` (strictly increasing, first entry is the start time) and
    /// replaces the stored trajectory.
    pub fn simulate(&mut self, times: &[f64]) -> Result<&Trajectory> {
        let trajectory = integrate(&self.model, &self.initial_state, times, &self.settings)?;
        debug!(
            points = trajectory.len(),
            accepted = trajectory.stats().accepted_steps,
            "trajectory stored"
        );
        Ok(&*self.trajectory.insert(trajectory))
    }

    pub fn trajectory(&self) -> Result<&Trajectory> {
        self.trajectory.as_ref().ok_or(ModelError::NotSimulated)
    }

    /// One aligned sequence per compartment, in state order.
    pub fn time_series(&self) -> Result<TimeSeries> {
        let trajectory = self.trajectory()?;
        Ok(TimeSeries::from_trajectory(
            trajectory,
            self.model.compartments(),
        ))
    }

    /// Aligned (S, I) sequences.
    pub fn phase_portrait(&self) -> Result<PhasePortrait> {
        let trajectory = self.trajectory()?;
        let susceptible = self.column(trajectory, Compartment::Susceptible)?;
        let infected = self.column(trajectory, Compartment::Infected)?;
        let beta = self.model.transmission_rate();
        let threshold = (beta > 0.0).then(|| self.model.recovery_rate() / beta);
        Ok(PhasePortrait {
            susceptible,
            infected,
            threshold,
        })
    }

    pub fn peak(&self) -> Result<Peak> {
        let trajectory = self.trajectory()?;
        let infected = self.column(trajectory, Compartment::Infected)?;
        analysis::find_peak(trajectory.times(), &infected).ok_or_else(analysis::empty_trajectory)
    }

    pub fn basic_reproduction_number(&self) -> f64 {
        analysis::basic_reproduction_number(
            self.model.transmission_rate(),
            self.model.recovery_rate(),
        )
    }

    pub fn epidemic_threshold(&self) -> f64 {
        analysis::epidemic_threshold(self.model.transmission_rate(), self.model.recovery_rate())
    }

    pub fn herd_immunity_threshold(&self) -> f64 {
        analysis::herd_immunity_threshold(self.basic_reproduction_number())
    }

    /// Limiting outcome from the initial state; does not need a trajectory.
    pub fn final_size(&self) -> Option<FinalSize> {
        self.model.final_size(&self.initial_state)
    }

    pub fn summary(&self) -> Result<EpidemicSummary> {
        analysis::summarize(&self.model, self.trajectory()?)
    }

    pub fn linear_stability(&self, state: &[f64]) -> Result<Stability> {
        analysis::linear_stability(&self.model, state)
    }

    /// Amplitude spectrum of one compartment; the run must use a uniform time grid.
    pub fn spectrum(&self, compartment: Compartment) -> Result<Spectrum> {
        let trajectory = self.trajectory()?;
        let values = self.column(trajectory, compartment)?;
        spectrum::spectrum(trajectory.times(), &values)
    }

    fn column(&self, trajectory: &Trajectory, compartment: Compartment) -> Result<Vec<f64>> {
        self.model
            .index_of(compartment)
            .and_then(|index| trajectory.column(index))
            .ok_or_else(|| {
                ModelError::invalid(
                    "compartment",
                    format!("model has no {} compartment", compartment.label()),
                )
            })
    }
}

impl SirModel {
    pub fn sir(beta: f64, gamma: f64, initial_state: impl Into<SirState>) -> Result<Self> {
        let model = Sir::new(SirParameters { beta, gamma })?;
        Simulation::new(model, initial_state.into().to_vec())
    }
}

impl SeirModel {
    pub fn seir(
        beta: f64,
        sigma: f64,
        gamma: f64,
        initial_state: impl Into<SeirState>,
    ) -> Result<Self> {
        let model = Seir::new(SeirParameters { beta, sigma, gamma })?;
        Simulation::new(model, initial_state.into().to_vec())
    }
}
