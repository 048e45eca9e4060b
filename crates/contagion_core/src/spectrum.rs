//! Frequency-domain view of epidemic waves.

use crate::error::{ModelError, Result};
use rustfft::{num_complex::Complex, FftPlanner};
use serde::Serialize;

/// Relative tolerance on sample spacing for a grid to count as uniform.
const UNIFORM_SPACING_TOLERANCE: f64 = 1e-9;

/// One-sided amplitude spectrum of a mean-removed, uniformly sampled signal.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Spectrum {
    /// Bin frequencies `k / (n·dt)` for k = 0..=n/2, in cycles per time unit.
    pub frequencies: Vec<f64>,
    pub amplitudes: Vec<f64>,
    pub sample_spacing: f64,
}

impl Spectrum {
    /// Frequency and amplitude of the strongest non-DC bin.
    pub fn dominant_frequency(&self) -> Option<(f64, f64)> {
        self.frequencies
            .iter()
            .zip(&self.amplitudes)
            .skip(1)
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(&f, &a)| (f, a))
    }

    /// Period of the dominant frequency, if there is one.
    pub fn dominant_period(&self) -> Option<f64> {
        self.dominant_frequency()
            .filter(|(f, _)| *f > 0.0)
            .map(|(f, _)| 1.0 / f)
    }
}

/// Computes the amplitude spectrum of `values` sampled at `times`.
pub fn spectrum(times: &[f64], values: &[f64]) -> Result<Spectrum> {
    if times.len() != values.len() {
        return Err(ModelError::invalid(
            "spectrum input",
            format!(
                "times and values differ in length ({} vs {})",
                times.len(),
                values.len()
            ),
        ));
    }
    let n = values.len();
    if n < 2 {
        return Err(ModelError::invalid(
            "spectrum input",
            "at least two samples are required",
        ));
    }
    let dt = sample_spacing(times)?;
    if values.iter().any(|v| !v.is_finite()) {
        return Err(ModelError::invalid("spectrum input", "values must be finite"));
    }

    let mean = values.iter().sum::<f64>() / n as f64;
    let mut buffer: Vec<Complex<f64>> = values
        .iter()
        .map(|&v| Complex::new(v - mean, 0.0))
        .collect();

    let mut planner = FftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(n);
    fft.process(&mut buffer);

    let bins = n / 2 + 1;
    let scale = 1.0 / n as f64;
    let amplitudes = buffer
        .iter()
        .take(bins)
        .enumerate()
        .map(|(k, c)| {
            // Interior bins carry the energy of their negative-frequency mirror too.
            let mirrored = k != 0 && !(n % 2 == 0 && k == n / 2);
            let factor = if mirrored { 2.0 } else { 1.0 };
            factor * c.norm() * scale
        })
        .collect();
    let frequencies = (0..bins).map(|k| k as f64 / (n as f64 * dt)).collect();

    Ok(Spectrum {
        frequencies,
        amplitudes,
        sample_spacing: dt,
    })
}

fn sample_spacing(times: &[f64]) -> Result<f64> {
    let dt = times[1] - times[0];
    if !dt.is_finite() || dt <= 0.0 {
        return Err(ModelError::invalid(
            "spectrum input",
            "times must be finite and strictly increasing",
        ));
    }
    let uniform = times
        .windows(2)
        .all(|pair| ((pair[1] - pair[0]) - dt).abs() <= UNIFORM_SPACING_TOLERANCE * dt);
    if !uniform {
        return Err(ModelError::invalid(
            "spectrum input",
            "times must be uniformly spaced",
        ));
    }
    Ok(dt)
}
