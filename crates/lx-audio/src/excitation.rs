use crate::stage::Stage;

/// Poids roex en dessous duquel un bin est ignoré.
const MIN_WEIGHT: f32 = 1e-4;

/// Equivalent rectangular bandwidth (Hz) at `freq_hz` (Glasberg & Moore 1990).
///
/// # Example
/// ```
/// use lx_audio::excitation::erb_hz;
/// assert!((erb_hz(1000.0) - 132.45).abs() < 0.1);
/// ```
#[inline]
#[must_use]
pub fn erb_hz(freq_hz: f32) -> f32 {
    24.673 * (4.368e-3 * freq_hz + 1.0)
}

/// Fréquence (Hz) → nombre d'ERB (Cam).
#[inline]
#[must_use]
pub fn hz_to_cam(freq_hz: f32) -> f32 {
    21.366 * (4.368e-3 * freq_hz + 1.0).log10()
}

/// Nombre d'ERB (Cam) → fréquence (Hz).
#[inline]
#[must_use]
pub fn cam_to_hz(cam: f32) -> f32 {
    (10f32.powf(cam / 21.366) - 1.0) / 4.368e-3
}

/// Centres des filtres auditifs, de `min_hz` à `max_hz` par pas de `step` Cam.
///
/// # Example
/// ```
/// use lx_audio::excitation::centre_frequencies;
/// let centres = centre_frequencies(50.0, 15000.0, 0.25);
/// assert_eq!(centres.len(), 149);
/// assert!((centres[0] - 50.0).abs() < 0.01);
/// ```
#[must_use]
pub fn centre_frequencies(min_hz: f32, max_hz: f32, step: f32) -> Vec<f32> {
    if step <= 0.0 || max_hz < min_hz {
        return Vec::new();
    }
    let lo = hz_to_cam(min_hz);
    let hi = hz_to_cam(max_hz);
    let count = ((hi - lo) / step).floor() as usize + 1;
    (0..count).map(|i| cam_to_hz(lo + i as f32 * step)).collect()
}

/// Une réponse de filtre : premier bin et poids consécutifs.
struct Filter {
    start: usize,
    weights: Vec<f32>,
}

/// Banque de filtres roex(p) symétriques appliquée à un spectre de puissance.
///
/// La sortie est le motif d'excitation : la puissance transmise par chaque
/// filtre auditif, en intensité relative à 20 µPa.
pub struct ExcitationPattern {
    filters: Vec<Filter>,
    centres: Vec<f32>,
}

impl ExcitationPattern {
    /// Name of the output.
    pub const NAME: &'static str = "Excitation";

    /// Builds filters for `centres` over `bins` bins spaced by `bin_hz`.
    #[must_use]
    pub fn new(centres: Vec<f32>, bin_hz: f32, bins: usize) -> Self {
        let filters = centres
            .iter()
            .map(|&fc| {
                let p = 4.0 * fc / erb_hz(fc);
                let weights: Vec<(usize, f32)> = (0..bins)
                    .filter_map(|k| {
                        let g = (k as f32 * bin_hz - fc).abs() / fc;
                        let w = (1.0 + p * g) * (-p * g).exp();
                        (w >= MIN_WEIGHT).then_some((k, w))
                    })
                    .collect();
                // Weights above the floor form one contiguous run around fc
                let start = weights.first().map_or(0, |&(k, _)| k);
                Filter {
                    start,
                    weights: weights.into_iter().map(|(_, w)| w).collect(),
                }
            })
            .collect();

        log::debug!(
            "Excitation : {} filtres roex, {} bins @ {:.2} Hz",
            centres.len(),
            bins,
            bin_hz
        );

        Self { filters, centres }
    }

    /// Centre frequency of each filter (Hz).
    #[must_use]
    pub fn centres(&self) -> &[f32] {
        &self.centres
    }
}

impl Stage for ExcitationPattern {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn output_width(&self) -> usize {
        self.filters.len()
    }

    fn process(&mut self, input: &[f32], output: &mut Vec<f32>) {
        output.clear();
        output.extend(self.filters.iter().map(|filter| {
            input
                .iter()
                .skip(filter.start)
                .zip(&filter.weights)
                .map(|(p, w)| p * w)
                .sum::<f32>()
        }));
    }
}

/// Sonie spécifique par filtre : `C · max(0, E^α - E_thr^α)` (sone/Cam).
pub struct SpecificLoudness {
    exponent: f32,
    threshold_term: f32,
    scale: f32,
    width: usize,
}

impl SpecificLoudness {
    /// Name of the output.
    pub const NAME: &'static str = "SpecificLoudness";

    /// `threshold` est l'excitation au seuil d'audition (intensité linéaire).
    #[must_use]
    pub fn new(width: usize, exponent: f32, threshold: f32, scale: f32) -> Self {
        Self {
            exponent,
            threshold_term: threshold.powf(exponent),
            scale,
            width,
        }
    }
}

impl Stage for SpecificLoudness {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn output_width(&self) -> usize {
        self.width
    }

    fn process(&mut self, input: &[f32], output: &mut Vec<f32>) {
        output.clear();
        output.extend(
            input
                .iter()
                .map(|&e| self.scale * (e.max(0.0).powf(self.exponent) - self.threshold_term).max(0.0)),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cam_round_trip() {
        for f in [50.0f32, 440.0, 1000.0, 8000.0] {
            assert!((cam_to_hz(hz_to_cam(f)) - f).abs() / f < 1e-3);
        }
    }

    #[test]
    fn tone_at_centre_passes_unattenuated() {
        let bin_hz = 15.625;
        let bins = 1025;
        let mut spectrum = vec![0.0f32; bins];
        spectrum[64] = 100.0; // 1000 Hz
        let mut stage = ExcitationPattern::new(vec![1000.0, 2000.0], bin_hz, bins);
        let mut out = Vec::new();
        stage.process(&spectrum, &mut out);
        assert_eq!(out.len(), 2);
        assert!((out[0] - 100.0).abs() < 1e-3);
        assert!(out[1] < 1.0);
    }

    #[test]
    fn specific_loudness_is_zero_below_threshold() {
        let mut stage = SpecificLoudness::new(3, 0.3, 2.0, 1.0);
        let mut out = Vec::new();
        stage.process(&[0.0, 2.0, 1000.0], &mut out);
        assert!(out[0].abs() < f32::EPSILON);
        assert!(out[1].abs() < 1e-6);
        assert!(out[2] > 0.0);
    }

    #[test]
    fn ten_decibels_roughly_doubles_specific_loudness() {
        let mut stage = SpecificLoudness::new(2, 0.3, 2.0, 1.0);
        let mut out = Vec::new();
        stage.process(&[1e6, 1e7], &mut out);
        let ratio = out[1] / out[0];
        assert!(ratio > 1.9 && ratio < 2.1, "ratio {ratio}");
    }
}
