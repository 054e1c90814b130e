use crate::error::CoreError;

/// Un signal échantillonné mono, immuable une fois construit.
///
/// # Example
/// ```
/// use lx_core::signal::Signal;
/// let signal = Signal::new(vec![0.0; 32000], 32000.0).unwrap();
/// assert!((signal.duration() - 1.0).abs() < 1e-9);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Signal {
    samples: Vec<f32>,
    sample_rate: f32,
}

impl Signal {
    /// Construit un signal à partir d'échantillons et d'un taux d'échantillonnage.
    ///
    /// # Errors
    /// Returns [`CoreError::Configuration`] if `sample_rate` is not a finite
    /// positive number.
    pub fn new(samples: Vec<f32>, sample_rate: f32) -> Result<Self, CoreError> {
        if !sample_rate.is_finite() || sample_rate <= 0.0 {
            return Err(CoreError::Configuration(format!(
                "sample rate must be > 0, got {sample_rate}"
            )));
        }
        Ok(Self {
            samples,
            sample_rate,
        })
    }

    /// Échantillons, dans l'ordre temporel.
    #[must_use]
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Sample rate in Hz.
    #[must_use]
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Number of samples.
    #[must_use]
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// `true` if the signal holds no samples.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Durée en secondes.
    #[must_use]
    pub fn duration(&self) -> f64 {
        self.samples.len() as f64 / f64::from(self.sample_rate)
    }

    /// Valeur efficace (RMS) sur tout le signal. 0 pour un signal vide.
    #[must_use]
    pub fn rms(&self) -> f32 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let sum_sq: f64 = self.samples.iter().map(|&s| f64::from(s) * f64::from(s)).sum();
        (sum_sq / self.samples.len() as f64).sqrt() as f32
    }

    /// Consomme le signal et rend ses échantillons.
    #[must_use]
    pub fn into_samples(self) -> Vec<f32> {
        self.samples
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_positive_rate() {
        assert!(Signal::new(vec![0.0], 0.0).is_err());
        assert!(Signal::new(vec![0.0], -1.0).is_err());
        assert!(Signal::new(vec![0.0], f32::NAN).is_err());
    }

    #[test]
    fn rms_of_constant() {
        let signal = Signal::new(vec![0.5; 100], 1000.0).expect("valid rate");
        assert!((signal.rms() - 0.5).abs() < 1e-6);
        assert_eq!(signal.len(), 100);
        assert!(!signal.is_empty());
    }

    #[test]
    fn empty_signal_has_zero_rms() {
        let signal = Signal::new(Vec::new(), 1000.0).expect("valid rate");
        assert!(signal.is_empty());
        assert!(signal.rms().abs() < f32::EPSILON);
    }
}
