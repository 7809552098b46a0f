//! Distance to press-duration calibration
//!
//! Keeps the operator's fixed model, the sample history and the model fitted
//! from it. Only the sample list is mutable history; switching the active
//! model never touches it.

pub mod fit;
pub mod model;

pub use fit::{fit_least_squares, FitReport};
pub use model::{CalibrationSample, LinearModel, ModelKind, SampleSource};

/// Calibration book for one session
#[derive(Debug, Clone)]
pub struct Calibration {
    fixed: LinearModel,
    active: ModelKind,
    samples: Vec<CalibrationSample>,
    fitted: Option<FitReport>,
}

impl Calibration {
    /// Create a calibration with the given fixed model
    pub fn new(fixed: LinearModel, active: ModelKind) -> Self {
        Self {
            fixed,
            active,
            samples: Vec::new(),
            fitted: None,
        }
    }

    pub fn fixed(&self) -> LinearModel {
        self.fixed
    }

    /// Replace the operator-set coefficients
    pub fn set_fixed(&mut self, model: LinearModel) {
        log::info!("Fixed model updated: {}", model);
        self.fixed = model;
    }

    pub fn active(&self) -> ModelKind {
        self.active
    }

    /// Select which model drives jumps
    pub fn select(&mut self, kind: ModelKind) {
        self.active = kind;
    }

    pub fn samples(&self) -> &[CalibrationSample] {
        &self.samples
    }

    /// Latest fit, if at least two usable samples exist
    pub fn fitted(&self) -> Option<&FitReport> {
        self.fitted.as_ref()
    }

    /// Append a sample and refit
    pub fn record(&mut self, sample: CalibrationSample) -> Result<Option<&FitReport>, CalibrationError> {
        if !(sample.distance_cm.is_finite() && sample.duration_secs.is_finite()) {
            return Err(CalibrationError::NonFinite);
        }
        self.samples.push(sample);
        self.refit();
        Ok(self.fitted.as_ref())
    }

    /// Drop every sample and the fitted model
    pub fn clear_samples(&mut self) {
        self.samples.clear();
        self.fitted = None;
    }

    fn refit(&mut self) {
        match fit_least_squares(&self.samples) {
            Ok(report) => {
                log::info!(
                    "Fitted {} over {} samples (rms {:.4}s)",
                    report.model,
                    report.sample_count,
                    report.rms_residual
                );
                self.fitted = Some(report);
            }
            Err(e) => {
                log::debug!("No fitted model yet: {}", e);
                self.fitted = None;
            }
        }
    }

    /// Model for the given kind, if it exists
    pub fn model(&self, kind: ModelKind) -> Result<LinearModel, CalibrationError> {
        match kind {
            ModelKind::Fixed => Ok(self.fixed),
            ModelKind::Fitted => match &self.fitted {
                Some(report) => Ok(report.model),
                None if self.samples.len() < 2 => Err(CalibrationError::NotEnoughSamples {
                    have: self.samples.len(),
                }),
                None => Err(CalibrationError::Degenerate),
            },
        }
    }

    /// Press duration for a distance using the active model
    pub fn compute_duration(&self, distance_cm: f64) -> Result<f64, CalibrationError> {
        self.compute_duration_with(distance_cm, self.active)
    }

    /// Press duration for a distance using an explicit model
    pub fn compute_duration_with(
        &self,
        distance_cm: f64,
        kind: ModelKind,
    ) -> Result<f64, CalibrationError> {
        if !distance_cm.is_finite() {
            return Err(CalibrationError::NonFinite);
        }
        let seconds = self.model(kind)?.evaluate(distance_cm);
        if !(seconds.is_finite() && seconds > 0.0) {
            return Err(CalibrationError::NonPositiveDuration { seconds });
        }
        Ok(seconds)
    }
}

/// Calibration errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CalibrationError {
    #[error("Fitted model needs at least 2 samples, have {have}")]
    NotEnoughSamples { have: usize },
    #[error("Samples do not span more than one distance")]
    Degenerate,
    #[error("Calibration values must be finite")]
    NonFinite,
    #[error("Model produced a non-positive press duration ({seconds:.3}s)")]
    NonPositiveDuration { seconds: f64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn calibration() -> Calibration {
        Calibration::new(LinearModel::new(0.09, -0.05), ModelKind::Fixed)
    }

    #[test]
    fn test_fixed_model_duration() {
        let calibration = calibration();
        let seconds = calibration.compute_duration(2.976).unwrap();
        assert!((seconds - 0.21784).abs() < 1e-9);
    }

    #[test]
    fn test_fitted_requires_two_samples() {
        let mut calibration = calibration();
        calibration.select(ModelKind::Fitted);
        assert_eq!(
            calibration.compute_duration(5.0),
            Err(CalibrationError::NotEnoughSamples { have: 0 })
        );

        calibration.record(CalibrationSample::measured(2.0, 0.3)).unwrap();
        assert_eq!(
            calibration.compute_duration(5.0),
            Err(CalibrationError::NotEnoughSamples { have: 1 })
        );

        let fit = calibration.record(CalibrationSample::measured(6.0, 0.7)).unwrap();
        assert!(fit.is_some());
        assert!((calibration.compute_duration(5.0).unwrap() - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_switching_model_keeps_samples() {
        let mut calibration = calibration();
        calibration.record(CalibrationSample::measured(2.0, 0.3)).unwrap();
        calibration.record(CalibrationSample::measured(6.0, 0.7)).unwrap();

        calibration.select(ModelKind::Fitted);
        calibration.select(ModelKind::Fixed);
        assert_eq!(calibration.samples().len(), 2);
        assert!(calibration.fitted().is_some());
        assert!((calibration.compute_duration(10.0).unwrap() - 0.85).abs() < 1e-12);
    }

    #[test]
    fn test_clear_drops_fit() {
        let mut calibration = calibration();
        calibration.record(CalibrationSample::measured(2.0, 0.3)).unwrap();
        calibration.record(CalibrationSample::measured(6.0, 0.7)).unwrap();
        calibration.clear_samples();

        assert!(calibration.samples().is_empty());
        assert!(calibration.fitted().is_none());
        assert!(calibration.compute_duration_with(3.0, ModelKind::Fitted).is_err());
    }

    #[test]
    fn test_non_positive_duration_rejected() {
        let calibration = calibration();
        assert!(matches!(
            calibration.compute_duration(0.1),
            Err(CalibrationError::NonPositiveDuration { .. })
        ));
        assert_eq!(
            calibration.compute_duration(f64::NAN),
            Err(CalibrationError::NonFinite)
        );
    }

    #[test]
    fn test_non_finite_sample_rejected() {
        let mut calibration = calibration();
        assert!(calibration
            .record(CalibrationSample::measured(f64::INFINITY, 0.3))
            .is_err());
        assert!(calibration.samples().is_empty());
    }
}
