use serde::{Deserialize, Serialize};

/// A population compartment of an epidemic model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Compartment {
    Susceptible,
    Exposed,
    Infected,
    Recovered,
}

impl Compartment {
    pub fn label(self) -> &'static str {
        match self {
            Compartment::Susceptible => "Susceptible",
            Compartment::Exposed => "Exposed",
            Compartment::Infected => "Infected",
            Compartment::Recovered => "Recovered",
        }
    }

    pub(crate) fn initial_label(self) -> &'static str {
        match self {
            Compartment::Susceptible => "initial susceptible",
            Compartment::Exposed => "initial exposed",
            Compartment::Infected => "initial infected",
            Compartment::Recovered => "initial recovered",
        }
    }
}

/// Population split across (S, I, R).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SirState {
    pub susceptible: f64,
    pub infected: f64,
    pub recovered: f64,
}

impl SirState {
    pub fn new(susceptible: f64, infected: f64, recovered: f64) -> Self {
        Self {
            susceptible,
            infected,
            recovered,
        }
    }

    pub fn total(&self) -> f64 {
        self.susceptible + self.infected + self.recovered
    }

    pub fn to_vec(&self) -> Vec<f64> {
        vec![self.susceptible, self.infected, self.recovered]
    }
}

impl From<[f64; 3]> for SirState {
    fn from([s, i, r]: [f64; 3]) -> Self {
        Self::new(s, i, r)
    }
}

/// Population split across (S, E, I, R).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeirState {
    pub susceptible: f64,
    pub exposed: f64,
    pub infected: f64,
    pub recovered: f64,
}

impl SeirState {
    pub fn new(susceptible: f64, exposed: f64, infected: f64, recovered: f64) -> Self {
        Self {
            susceptible,
            exposed,
            infected,
            recovered,
        }
    }

    pub fn total(&self) -> f64 {
        self.susceptible + self.exposed + self.infected + self.recovered
    }

    pub fn to_vec(&self) -> Vec<f64> {
        vec![self.susceptible, self.exposed, self.infected, self.recovered]
    }
}

impl From<[f64; 4]> for SeirState {
    fn from([s, e, i, r]: [f64; 4]) -> Self {
        Self::new(s, e, i, r)
    }
}
