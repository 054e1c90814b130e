use crate::fft::FftPipeline;

/// Un étage de la chaîne de traitement du modèle.
///
/// Chaque étage lit la sortie de son prédécesseur (ou la frame brute pour le
/// premier) et écrit sa propre sortie, accessible sous `name()`.
///
/// # Example
/// ```
/// use lx_audio::stage::Stage;
///
/// struct Gain(f32);
/// impl Stage for Gain {
///     fn name(&self) -> &'static str { "Gain" }
///     fn output_width(&self) -> usize { 1 }
///     fn process(&mut self, input: &[f32], output: &mut Vec<f32>) {
///         output.clear();
///         output.push(input.first().copied().unwrap_or(0.0) * self.0);
///     }
/// }
/// ```
pub trait Stage: Send {
    /// Nom de la sortie produite.
    fn name(&self) -> &'static str;

    /// Nombre de valeurs écrites par frame.
    fn output_width(&self) -> usize;

    /// Traite une entrée et écrit exactement `output_width()` valeurs.
    ///
    /// CONTRAT : ne doit pas allouer une fois `output` dimensionné.
    fn process(&mut self, input: &[f32], output: &mut Vec<f32>);

    /// Remet à zéro l'état temporel. Sans effet pour les étages statiques.
    fn reset(&mut self) {}
}

/// Power spectrum of the windowed frame.
pub struct PowerSpectrum {
    fft: FftPipeline,
}

impl PowerSpectrum {
    /// Name of the output.
    pub const NAME: &'static str = "PowerSpectrum";

    /// FFT over `frame_len` samples.
    #[must_use]
    pub fn new(frame_len: usize) -> Self {
        Self {
            fft: FftPipeline::new(frame_len),
        }
    }
}

impl Stage for PowerSpectrum {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    fn output_width(&self) -> usize {
        self.fft.bins()
    }

    fn process(&mut self, input: &[f32], output: &mut Vec<f32>) {
        self.fft.power_into(input, output);
    }
}

/// Somme d'un vecteur, multipliée par un pas (intégration sur l'échelle Cam).
pub struct Summation {
    name: &'static str,
    step: f32,
}

impl Summation {
    /// Sums specific loudness into instantaneous loudness.
    #[must_use]
    pub fn new(name: &'static str, step: f32) -> Self {
        Self { name, step }
    }
}

impl Stage for Summation {
    fn name(&self) -> &'static str {
        self.name
    }

    fn output_width(&self) -> usize {
        1
    }

    fn process(&mut self, input: &[f32], output: &mut Vec<f32>) {
        output.clear();
        output.push(input.iter().sum::<f32>() * self.step);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summation_scales_by_step() {
        let mut stage = Summation::new("Total", 0.25);
        let mut out = Vec::new();
        stage.process(&[1.0, 2.0, 3.0, 2.0], &mut out);
        assert_eq!(out, vec![2.0]);
        assert_eq!(stage.output_width(), 1);
    }

    #[test]
    fn power_spectrum_width() {
        let mut stage = PowerSpectrum::new(512);
        let mut out = Vec::new();
        stage.process(&[0.0; 512], &mut out);
        assert_eq!(out.len(), stage.output_width());
        assert_eq!(stage.name(), "PowerSpectrum");
    }
}
