use lx_core::config::ModelConfig;
use lx_core::error::CoreError;
use lx_core::traits::{FrameOutputs, LoudnessModel};

use crate::ear::{threshold_in_quiet_db, OuterMiddleEar};
use crate::excitation::{centre_frequencies, ExcitationPattern, SpecificLoudness};
use crate::fft::REFERENCE_PRESSURE;
use crate::integration::TemporalIntegrator;
use crate::stage::{PowerSpectrum, Stage, Summation};

/// Fréquence du ton de calibration (Hz).
const CALIBRATION_FREQ: f32 = 1000.0;

/// Sorties de la chaîne, dans l'ordre de traitement.
pub const OUTPUT_NAMES: &[&str] = &[
    PowerSpectrum::NAME,
    OuterMiddleEar::NAME,
    ExcitationPattern::NAME,
    SpecificLoudness::NAME,
    INSTANTANEOUS,
    SHORT_TERM,
    LONG_TERM,
];

/// Instantaneous loudness (sone).
pub const INSTANTANEOUS: &str = "InstantaneousLoudness";
/// Short-term loudness (sone).
pub const SHORT_TERM: &str = "ShortTermLoudness";
/// Long-term loudness (sone).
pub const LONG_TERM: &str = "LongTermLoudness";

/// Modèle de sonie dynamique : une chaîne linéaire d'étages nommés.
///
/// Spectre de puissance → pondération oreille externe/moyenne → excitation
/// (filtres roex sur l'échelle ERB) → sonie spécifique → sonie instantanée →
/// sonie court-terme → sonie long-terme. La sortie de chaque étage est exposée
/// sous son nom.
///
/// # Example
/// ```
/// use lx_audio::model::DynamicLoudnessModel;
/// use lx_core::config::ModelConfig;
/// use lx_core::traits::{FrameOutputs, LoudnessModel};
///
/// let mut model = DynamicLoudnessModel::new(ModelConfig::default());
/// model.initialize(32000.0, 32).unwrap();
/// assert_eq!(model.frame_len(), 2048);
///
/// let mut outputs = FrameOutputs::default();
/// model.process_frame(&vec![0.0; 2048], &mut outputs).unwrap();
/// assert_eq!(outputs.get("InstantaneousLoudness"), Some(&[0.0][..]));
/// ```
pub struct DynamicLoudnessModel {
    config: ModelConfig,
    chain: Vec<Box<dyn Stage>>,
    buffers: Vec<Vec<f32>>,
    frame_len: usize,
    sample_rate: f32,
    hop_size: usize,
    centres: Vec<f32>,
}

impl DynamicLoudnessModel {
    /// Crée un modèle non initialisé.
    #[must_use]
    pub fn new(config: ModelConfig) -> Self {
        Self {
            config,
            chain: Vec::new(),
            buffers: Vec::new(),
            frame_len: 0,
            sample_rate: 0.0,
            hop_size: 0,
            centres: Vec::new(),
        }
    }

    /// Model parameters.
    #[must_use]
    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// Centre frequencies of the auditory filters. Empty before `initialize()`.
    #[must_use]
    pub fn centre_frequencies(&self) -> &[f32] {
        &self.centres
    }

    /// Processing rate in Hz (frames per second). 0 before `initialize()`.
    #[must_use]
    pub fn rate(&self) -> f32 {
        if self.hop_size == 0 {
            0.0
        } else {
            self.sample_rate / self.hop_size as f32
        }
    }

    /// Number of stages in the chain.
    #[must_use]
    pub fn stage_count(&self) -> usize {
        self.chain.len()
    }

    /// Étages statiques jusqu'à la sonie spécifique, pour un facteur d'échelle donné.
    fn static_chain(&self, centres: &[f32], scale: f32) -> Vec<Box<dyn Stage>> {
        let spectrum = PowerSpectrum::new(self.frame_len);
        let bins = spectrum.output_width();
        let bin_hz = self.sample_rate / self.frame_len as f32;
        let excitation = ExcitationPattern::new(centres.to_vec(), bin_hz, bins);
        let width = excitation.output_width();
        let threshold = 10f32.powf(threshold_in_quiet_db(CALIBRATION_FREQ) / 10.0);

        let mut chain: Vec<Box<dyn Stage>> = Vec::with_capacity(OUTPUT_NAMES.len());
        chain.push(Box::new(spectrum));
        chain.push(Box::new(OuterMiddleEar::new(
            self.sample_rate,
            self.frame_len,
            bins,
        )));
        chain.push(Box::new(excitation));
        chain.push(Box::new(SpecificLoudness::new(
            width,
            self.config.exponent,
            threshold,
            scale,
        )));
        chain.push(Box::new(Summation::new(INSTANTANEOUS, self.config.erb_step)));
        chain
    }

    /// Sonie instantanée d'un ton 1 kHz stationnaire au niveau de calibration,
    /// passée dans `chain`.
    fn calibration_loudness(&self, chain: &mut [Box<dyn Stage>]) -> f32 {
        let amplitude = REFERENCE_PRESSURE
            * 10f32.powf(self.config.calibration_db / 20.0)
            * std::f32::consts::SQRT_2;
        let w = 2.0 * std::f64::consts::PI * f64::from(CALIBRATION_FREQ)
            / f64::from(self.sample_rate);
        let tone: Vec<f32> = (0..self.frame_len)
            .map(|i| amplitude * (w * i as f64).sin() as f32)
            .collect();

        let mut input = tone;
        let mut output = Vec::new();
        for stage in chain.iter_mut() {
            stage.process(&input, &mut output);
            std::mem::swap(&mut input, &mut output);
        }
        input.first().copied().unwrap_or(0.0)
    }
}

impl LoudnessModel for DynamicLoudnessModel {
    fn name(&self) -> &str {
        "DynamicLoudness"
    }

    fn initialize(&mut self, sample_rate: f32, hop_size: usize) -> Result<(), CoreError> {
        lx_core::config::validate_rate_and_hop(sample_rate, hop_size)?;

        let nyquist = sample_rate / 2.0;
        if nyquist <= CALIBRATION_FREQ {
            return Err(CoreError::Configuration(format!(
                "sample rate {sample_rate} Hz is too low: the model needs content above {CALIBRATION_FREQ} Hz"
            )));
        }

        self.sample_rate = sample_rate;
        self.hop_size = hop_size;
        self.frame_len = ((self.config.window_ms / 1000.0 * sample_rate).round() as usize).max(2);

        let max_freq = self.config.max_freq.min(nyquist);
        let centres = centre_frequencies(self.config.min_freq, max_freq, self.config.erb_step);
        if centres.is_empty() {
            return Err(CoreError::Configuration(format!(
                "no auditory filter between {} Hz and {max_freq} Hz",
                self.config.min_freq
            )));
        }

        // Calibration : 1 kHz au niveau de référence = 1 sone
        let mut probe = self.static_chain(&centres, 1.0);
        let reference = self.calibration_loudness(&mut probe);
        if !(reference.is_finite() && reference > 0.0) {
            return Err(CoreError::Configuration(format!(
                "calibration tone at {} dB SPL produced no loudness",
                self.config.calibration_db
            )));
        }

        let dt = hop_size as f32 / sample_rate;
        let mut chain = self.static_chain(&centres, 1.0 / reference);
        chain.push(Box::new(TemporalIntegrator::new(
            SHORT_TERM,
            dt,
            self.config.stl_attack_ms / 1000.0,
            self.config.stl_release_ms / 1000.0,
        )));
        chain.push(Box::new(TemporalIntegrator::new(
            LONG_TERM,
            dt,
            self.config.ltl_attack_ms / 1000.0,
            self.config.ltl_release_ms / 1000.0,
        )));

        self.buffers = chain
            .iter()
            .map(|stage| Vec::with_capacity(stage.output_width()))
            .collect();
        self.chain = chain;
        self.centres = centres;

        log::debug!(
            "{} initialisé : {} Hz, frame {} éch., hop {} éch., {} filtres, calibration {:.4}",
            self.name(),
            sample_rate,
            self.frame_len,
            hop_size,
            self.centres.len(),
            reference
        );
        Ok(())
    }

    fn is_initialized(&self) -> bool {
        !self.chain.is_empty()
    }

    fn frame_len(&self) -> usize {
        self.frame_len
    }

    fn output_names(&self) -> Vec<String> {
        OUTPUT_NAMES.iter().map(ToString::to_string).collect()
    }

    fn output_width(&self, name: &str) -> Option<usize> {
        self.chain
            .iter()
            .find(|stage| stage.name() == name)
            .map(|stage| stage.output_width())
    }

    fn process_frame(
        &mut self,
        frame: &[f32],
        outputs: &mut FrameOutputs,
    ) -> Result<(), CoreError> {
        if !self.is_initialized() {
            return Err(CoreError::NotInitialized(self.name().to_string()));
        }
        if frame.len() != self.frame_len {
            return Err(CoreError::Shape {
                output: "frame".into(),
                expected: self.frame_len,
                actual: frame.len(),
            });
        }

        for (i, stage) in self.chain.iter_mut().enumerate() {
            let (done, rest) = self.buffers.split_at_mut(i);
            let input: &[f32] = if i == 0 { frame } else { &done[i - 1] };
            let output = &mut rest[0];
            stage.process(input, output);
            outputs.set(stage.name(), output);
        }
        Ok(())
    }

    fn reset(&mut self) {
        for stage in &mut self.chain {
            stage.reset();
        }
        for buffer in &mut self.buffers {
            buffer.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FS: f32 = 32000.0;

    fn tone(freq: f32, level_db: f32, len: usize) -> Vec<f32> {
        let amplitude = REFERENCE_PRESSURE * 10f32.powf(level_db / 20.0) * std::f32::consts::SQRT_2;
        (0..len)
            .map(|i| amplitude * (2.0 * std::f32::consts::PI * freq * i as f32 / FS).sin())
            .collect()
    }

    fn steady_loudness(model: &mut DynamicLoudnessModel, samples: &[f32]) -> (f32, f32, f32) {
        let frame_len = model.frame_len();
        let hop = 32;
        let mut outputs = FrameOutputs::default();
        let mut start = 0;
        while start + frame_len <= samples.len() {
            model
                .process_frame(&samples[start..start + frame_len], &mut outputs)
                .expect("initialised");
            start += hop;
        }
        let get = |name: &str| outputs.get(name).and_then(|v| v.first().copied()).unwrap_or(0.0);
        (get(INSTANTANEOUS), get(SHORT_TERM), get(LONG_TERM))
    }

    fn initialised() -> DynamicLoudnessModel {
        let mut model = DynamicLoudnessModel::new(ModelConfig::default());
        model.initialize(FS, 32).expect("valid rate");
        model
    }

    #[test]
    fn process_before_initialize_fails() {
        let mut model = DynamicLoudnessModel::new(ModelConfig::default());
        let mut outputs = FrameOutputs::default();
        assert_eq!(
            model.process_frame(&[0.0; 16], &mut outputs),
            Err(CoreError::NotInitialized("DynamicLoudness".into()))
        );
    }

    #[test]
    fn low_sample_rate_is_rejected() {
        let mut model = DynamicLoudnessModel::new(ModelConfig::default());
        assert!(matches!(
            model.initialize(1500.0, 2),
            Err(CoreError::Configuration(_))
        ));
    }

    #[test]
    fn wrong_frame_length_is_a_shape_error() {
        let mut model = initialised();
        let mut outputs = FrameOutputs::default();
        assert!(matches!(
            model.process_frame(&[0.0; 10], &mut outputs),
            Err(CoreError::Shape { .. })
        ));
    }

    #[test]
    fn declared_widths_match_outputs() {
        let mut model = initialised();
        let mut outputs = FrameOutputs::default();
        model
            .process_frame(&tone(440.0, 60.0, 2048), &mut outputs)
            .expect("initialised");
        for name in model.output_names() {
            let width = model.output_width(&name).expect("declared");
            assert_eq!(outputs.get(&name).map(<[f32]>::len), Some(width), "{name}");
        }
        assert_eq!(model.output_width("Excitation"), Some(model.centre_frequencies().len()));
        assert!((model.rate() - 1000.0).abs() < f32::EPSILON);
        assert_eq!(model.stage_count(), OUTPUT_NAMES.len());
    }

    #[test]
    fn calibration_tone_is_one_sone() {
        let mut model = initialised();
        let (inst, stl, ltl) = steady_loudness(&mut model, &tone(1000.0, 40.0, 32000));
        assert!((inst - 1.0).abs() < 0.05, "inst {inst}");
        assert!((stl - 1.0).abs() < 0.05, "stl {stl}");
        assert!((ltl - 1.0).abs() < 0.05, "ltl {ltl}");
    }

    #[test]
    fn ten_decibels_roughly_doubles_loudness() {
        let mut model = initialised();
        let (quiet, _, _) = steady_loudness(&mut model, &tone(1000.0, 50.0, 4096));
        model.reset();
        let (loud, _, _) = steady_loudness(&mut model, &tone(1000.0, 60.0, 4096));
        let ratio = loud / quiet;
        assert!(ratio > 1.7 && ratio < 2.4, "ratio {ratio}");
    }

    #[test]
    fn silence_is_silent() {
        let mut model = initialised();
        let (inst, stl, ltl) = steady_loudness(&mut model, &vec![0.0; 4096]);
        assert!(inst.abs() < f32::EPSILON);
        assert!(stl.abs() < f32::EPSILON);
        assert!(ltl.abs() < f32::EPSILON);
    }

    #[test]
    fn reset_restores_initial_state() {
        let mut model = initialised();
        let signal = tone(1000.0, 60.0, 4096);
        let first = steady_loudness(&mut model, &signal);
        model.reset();
        let second = steady_loudness(&mut model, &signal);
        assert_eq!(first, second);
    }
}
