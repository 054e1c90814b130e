use lx_core::error::CoreError;
use lx_core::signal::Signal;

use crate::fft::REFERENCE_PRESSURE;

/// Mesure utilisée pour les niveaux et la normalisation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Normalisation {
    /// Valeur efficace.
    Rms,
    /// Valeur crête absolue.
    Peak,
}

/// Générateur et éditeur de signaux de test.
///
/// Par défaut les niveaux sont en dB relatifs à 1.0 (dBFS). Après
/// [`Sound::use_db_spl`], les échantillons sont des pascals et les niveaux des
/// dB SPL (référence 20 µPa), l'unité attendue par le modèle de sonie.
///
/// # Example
/// ```
/// use lx_audio::sound::{Normalisation, Sound};
///
/// let mut sound = Sound::tone(&[1000.0, 3000.0], 1.0, 32000.0).unwrap();
/// sound.use_db_spl();
/// sound.normalise(40.0, Normalisation::Rms);
/// sound.apply_ramp(0.1);
/// assert!((sound.level_db(Normalisation::Rms) - 40.0).abs() < 1.0);
/// let signal = sound.into_signal().unwrap();
/// assert_eq!(signal.len(), 32000);
/// ```
#[derive(Clone, Debug)]
pub struct Sound {
    samples: Vec<f32>,
    sample_rate: f32,
    reference: f32,
}

impl Sound {
    /// Somme de sinusoïdes d'amplitude unitaire, phase nulle.
    ///
    /// # Errors
    /// Returns [`CoreError::Configuration`] on a non-positive sample rate or a
    /// negative duration.
    pub fn tone(freqs: &[f32], duration: f32, sample_rate: f32) -> Result<Self, CoreError> {
        let len = sample_count(duration, sample_rate)?;
        let fs = f64::from(sample_rate);
        let samples = (0..len)
            .map(|i| {
                let t = i as f64 / fs;
                freqs
                    .iter()
                    .map(|&f| (2.0 * std::f64::consts::PI * f64::from(f) * t).sin())
                    .sum::<f64>() as f32
            })
            .collect();
        Ok(Self {
            samples,
            sample_rate,
            reference: 1.0,
        })
    }

    /// Silence de `duration` secondes.
    ///
    /// # Errors
    /// Same as [`Sound::tone`].
    pub fn silence(duration: f32, sample_rate: f32) -> Result<Self, CoreError> {
        let len = sample_count(duration, sample_rate)?;
        Ok(Self {
            samples: vec![0.0; len],
            sample_rate,
            reference: 1.0,
        })
    }

    /// Enveloppe un signal existant (niveaux en dBFS).
    #[must_use]
    pub fn from_signal(signal: Signal) -> Self {
        let sample_rate = signal.sample_rate();
        Self {
            samples: signal.into_samples(),
            sample_rate,
            reference: 1.0,
        }
    }

    /// Les niveaux deviennent des dB SPL (référence 20 µPa).
    pub fn use_db_spl(&mut self) -> &mut Self {
        self.reference = REFERENCE_PRESSURE;
        self
    }

    /// Les niveaux redeviennent des dBFS.
    pub fn use_db_fs(&mut self) -> &mut Self {
        self.reference = 1.0;
        self
    }

    /// Niveau courant en dB. `-inf` pour un silence.
    #[must_use]
    pub fn level_db(&self, mode: Normalisation) -> f32 {
        20.0 * (self.measure(mode) / self.reference).log10()
    }

    /// Met le signal à `level_db` selon `mode`. Sans effet sur un silence.
    pub fn normalise(&mut self, level_db: f32, mode: Normalisation) -> &mut Self {
        let current = self.measure(mode);
        if current <= 0.0 {
            log::warn!("Normalisation ignorée : signal silencieux");
            return self;
        }
        let target = self.reference * 10f32.powf(level_db / 20.0);
        let gain = target / current;
        for s in &mut self.samples {
            *s *= gain;
        }
        self
    }

    /// Rampes cosinus surélevé en début et fin, de `seconds` chacune.
    ///
    /// La durée est bornée à la moitié du signal.
    pub fn apply_ramp(&mut self, seconds: f32) -> &mut Self {
        let n = ((seconds.max(0.0) * self.sample_rate).round() as usize).min(self.samples.len() / 2);
        if n == 0 {
            return self;
        }
        let len = self.samples.len();
        for i in 0..n {
            let gain = 0.5 * (1.0 - (std::f32::consts::PI * i as f32 / n as f32).cos());
            self.samples[i] *= gain;
            self.samples[len - 1 - i] *= gain;
        }
        self
    }

    /// Échantillons courants.
    #[must_use]
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Sample rate in Hz.
    #[must_use]
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Fige le son en [`Signal`].
    ///
    /// # Errors
    /// Returns [`CoreError::Configuration`] if the sample rate is invalid.
    pub fn into_signal(self) -> Result<Signal, CoreError> {
        Signal::new(self.samples, self.sample_rate)
    }

    fn measure(&self, mode: Normalisation) -> f32 {
        if self.samples.is_empty() {
            return 0.0;
        }
        match mode {
            Normalisation::Rms => {
                let sum_sq: f64 = self.samples.iter().map(|&s| f64::from(s) * f64::from(s)).sum();
                (sum_sq / self.samples.len() as f64).sqrt() as f32
            }
            Normalisation::Peak => self.samples.iter().map(|s| s.abs()).fold(0.0, f32::max),
        }
    }
}

/// Nombre d'échantillons pour une durée, après validation.
fn sample_count(duration: f32, sample_rate: f32) -> Result<usize, CoreError> {
    if !sample_rate.is_finite() || sample_rate <= 0.0 {
        return Err(CoreError::Configuration(format!(
            "sample rate must be > 0, got {sample_rate}"
        )));
    }
    if !duration.is_finite() || duration < 0.0 {
        return Err(CoreError::Configuration(format!(
            "duration must be >= 0, got {duration}"
        )));
    }
    Ok((duration * sample_rate).round() as usize)
}
