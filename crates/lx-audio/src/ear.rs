use crate::stage::Stage;

/// Atténuation maximale appliquée par l'oreille externe/moyenne (dB).
const FLOOR_DB: f32 = -60.0;

/// Seuil d'audition absolu (dB SPL) selon l'approximation de Terhardt.
///
/// # Example
/// ```
/// use lx_audio::ear::threshold_in_quiet_db;
/// let t1k = threshold_in_quiet_db(1000.0);
/// assert!((t1k - 3.37).abs() < 0.05);
/// assert!(threshold_in_quiet_db(3300.0) < t1k);
/// ```
#[must_use]
pub fn threshold_in_quiet_db(freq_hz: f32) -> f32 {
    let f = (freq_hz / 1000.0).max(1e-3);
    3.64 * f.powf(-0.8) - 6.5 * (-0.6 * (f - 3.3) * (f - 3.3)).exp() + 1e-3 * f.powi(4)
}

/// Gain en puissance (linéaire) de l'oreille externe et moyenne, 1 à 1 kHz.
///
/// Le gain est l'inverse du seuil d'audition relatif à 1 kHz, plafonné en
/// atténuation à `FLOOR_DB`.
#[must_use]
pub fn transfer_gain(freq_hz: f32) -> f32 {
    let db = (threshold_in_quiet_db(1000.0) - threshold_in_quiet_db(freq_hz)).max(FLOOR_DB);
    10f32.powf(db / 10.0)
}

/// Pondère un spectre de puissance bin par bin.
pub struct OuterMiddleEar {
    gains: Vec<f32>,
}

impl OuterMiddleEar {
    /// Name of the output.
    pub const NAME: &'static str = "WeightedPowerSpectrum";

    /// Gains pour `bins` bins espacés de `sample_rate / fft_size`.
    #[must_use]
    pub fn new(sample_rate: f32, fft_size: usize, bins: usize) -> Self {
        let bin_hz = sample_rate / fft_size as f32;
        let gains = (0..bins).map(|k| transfer_gain(k as f32 * bin_hz)).collect();
        Self { gains }
    }
}

impl Stage for OuterMiddleEar {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn output_width(&self) -> usize {
        self.gains.len()
    }

    fn process(&mut self, input: &[f32], output: &mut Vec<f32>) {
        output.clear();
        output.extend(input.iter().zip(&self.gains).map(|(p, g)| p * g));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unity_at_one_kilohertz() {
        assert!((transfer_gain(1000.0) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn extremes_are_attenuated() {
        assert!(transfer_gain(30.0) < 0.1);
        assert!(transfer_gain(15000.0) < 0.01);
        // DC hits the floor instead of blowing up
        assert!((transfer_gain(0.0) - 1e-6).abs() < 1e-7);
    }

    #[test]
    fn ear_canal_resonance_boosts() {
        assert!(transfer_gain(3300.0) > 3.0);
    }

    #[test]
    fn weighting_is_elementwise() {
        let mut stage = OuterMiddleEar::new(32000.0, 64, 33);
        let mut out = Vec::new();
        stage.process(&[1.0; 33], &mut out);
        assert_eq!(out.len(), 33);
        // bin 2 = 1000 Hz
        assert!((out[2] - 1.0).abs() < 1e-5);
    }
}
