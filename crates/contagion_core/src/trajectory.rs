use crate::state::Compartment;
use serde::Serialize;

/// Step counters reported by the integrator for one `integrate` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IntegrationStats {
    pub accepted_steps: usize,
    pub rejected_steps: usize,
}

/// States sampled at the requested time points, stored row-major.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trajectory {
    dimension: usize,
    times: Vec<f64>,
    states: Vec<f64>,
    stats: IntegrationStats,
}

impl Trajectory {
    pub(crate) fn with_capacity(dimension: usize, points: usize) -> Self {
        Self {
            dimension,
            times: Vec::with_capacity(points),
            states: Vec::with_capacity(points * dimension),
            stats: IntegrationStats::default(),
        }
    }

    pub(crate) fn push(&mut self, t: f64, state: &[f64]) {
        debug_assert_eq!(state.len(), self.dimension);
        self.times.push(t);
        self.states.extend_from_slice(state);
    }

    pub(crate) fn set_stats(&mut self, stats: IntegrationStats) {
        self.stats = stats;
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn stats(&self) -> IntegrationStats {
        self.stats
    }

    /// State at sample `index`, or `None` past the end.
    pub fn state(&self, index: usize) -> Option<&[f64]> {
        let start = index.checked_mul(self.dimension)?;
        self.states.get(start..start + self.dimension)
    }

    pub fn states(&self) -> impl Iterator<Item = &[f64]> + '_ {
        self.states.chunks_exact(self.dimension.max(1))
    }

    pub fn final_state(&self) -> Option<&[f64]> {
        self.len().checked_sub(1).and_then(|last| self.state(last))
    }

    /// Values of state component `index` across all samples.
    pub fn column(&self, index: usize) -> Option<Vec<f64>> {
        if index >= self.dimension {
            return None;
        }
        Some(self.states().map(|row| row[index]).collect())
    }

    /// Sum of all compartments at each sample.
    pub fn totals(&self) -> Vec<f64> {
        self.states().map(|row| row.iter().sum()).collect()
    }
}

/// Values of one compartment over time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompartmentSeries {
    pub compartment: Compartment,
    pub values: Vec<f64>,
}

/// Aligned per-compartment sequences for time-series plots.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeSeries {
    pub times: Vec<f64>,
    pub compartments: Vec<CompartmentSeries>,
}

impl TimeSeries {
    pub(crate) fn from_trajectory(trajectory: &Trajectory, labels: &[Compartment]) -> Self {
        let compartments = labels
            .iter()
            .enumerate()
            .map(|(index, &compartment)| CompartmentSeries {
                compartment,
                values: trajectory.column(index).unwrap_or_default(),
            })
            .collect();
        Self {
            times: trajectory.times().to_vec(),
            compartments,
        }
    }

    pub fn get(&self, compartment: Compartment) -> Option<&[f64]> {
        self.compartments
            .iter()
            .find(|series| series.compartment == compartment)
            .map(|series| series.values.as_slice())
    }

    pub fn susceptible(&self) -> Option<&[f64]> {
        self.get(Compartment::Susceptible)
    }

    pub fn infected(&self) -> Option<&[f64]> {
        self.get(Compartment::Infected)
    }

    pub fn recovered(&self) -> Option<&[f64]> {
        self.get(Compartment::Recovered)
    }
}

/// Aligned (S, I) pairs for a phase-portrait plot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhasePortrait {
    pub susceptible: Vec<f64>,
    pub infected: Vec<f64>,
    /// S = γ/β, where dI/dt changes sign; `None` when β = 0.
    pub threshold: Option<f64>,
}

impl PhasePortrait {
    pub fn points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.susceptible
            .iter()
            .copied()
            .zip(self.infected.iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Trajectory {
        let mut trajectory = Trajectory::with_capacity(3, 2);
        trajectory.push(0.0, &[0.9, 0.1, 0.0]);
        trajectory.push(1.0, &[0.8, 0.15, 0.05]);
        trajectory
    }

    #[test]
    fn rows_and_columns_index_the_same_data() {
        let trajectory = sample();
        assert_eq!(trajectory.len(), 2);
        assert_eq!(trajectory.state(1), Some(&[0.8, 0.15, 0.05][..]));
        assert_eq!(trajectory.state(2), None);
        assert_eq!(trajectory.column(1), Some(vec![0.1, 0.15]));
        assert_eq!(trajectory.column(3), None);
        assert_eq!(trajectory.final_state(), trajectory.state(1));
    }

    #[test]
    fn time_series_labels_columns_in_state_order() {
        let labels = [
            Compartment::Susceptible,
            Compartment::Infected,
            Compartment::Recovered,
        ];
        let series = TimeSeries::from_trajectory(&sample(), &labels);
        assert_eq!(series.times, vec![0.0, 1.0]);
        assert_eq!(series.susceptible(), Some(&[0.9, 0.8][..]));
        assert_eq!(series.recovered(), Some(&[0.0, 0.05][..]));
        assert_eq!(series.get(Compartment::Exposed), None);
    }

    #[test]
    fn empty_trajectory_has_no_final_state() {
        let trajectory = Trajectory::with_capacity(3, 0);
        assert!(trajectory.is_empty());
        assert_eq!(trajectory.final_state(), None);
        assert_eq!(trajectory.states().count(), 0);
    }
}
