//! Ordinary least-squares fit of the distance/duration line

use ndarray::Array1;

use super::model::{CalibrationSample, LinearModel};
use super::CalibrationError;

/// Spread below which all distances count as identical
const MIN_DISTANCE_SPREAD: f64 = 1e-12;

/// Result of fitting a line through the recorded samples
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitReport {
    pub model: LinearModel,
    /// Root mean square of the duration residuals, in seconds
    pub rms_residual: f64,
    pub sample_count: usize,
}

/// Fit `duration = slope * distance + intercept` minimising squared residuals.
///
/// Works on centred data, which keeps the slope accurate when distances are
/// large compared to their spread.
pub fn fit_least_squares(samples: &[CalibrationSample]) -> Result<FitReport, CalibrationError> {
    if samples.len() < 2 {
        return Err(CalibrationError::NotEnoughSamples {
            have: samples.len(),
        });
    }

    let distances: Array1<f64> = samples.iter().map(|s| s.distance_cm).collect();
    let durations: Array1<f64> = samples.iter().map(|s| s.duration_secs).collect();
    if distances.iter().chain(durations.iter()).any(|v| !v.is_finite()) {
        return Err(CalibrationError::NonFinite);
    }

    let mean_distance = distances.mean().ok_or(CalibrationError::NotEnoughSamples { have: 0 })?;
    let mean_duration = durations.mean().ok_or(CalibrationError::NotEnoughSamples { have: 0 })?;

    let dx = &distances - mean_distance;
    let dy = &durations - mean_duration;
    let sxx = dx.dot(&dx);
    if sxx < MIN_DISTANCE_SPREAD {
        return Err(CalibrationError::Degenerate);
    }

    let slope = dx.dot(&dy) / sxx;
    let intercept = mean_duration - slope * mean_distance;
    let model = LinearModel::new(slope, intercept);

    let residuals = &durations - &distances.mapv(|d| model.evaluate(d));
    let rms_residual = (residuals.dot(&residuals) / samples.len() as f64).sqrt();

    Ok(FitReport {
        model,
        rms_residual,
        sample_count: samples.len(),
    })
}
