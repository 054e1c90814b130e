use lx_core::config::{validate_rate_and_hop, ExtractorConfig, TailPolicy};
use lx_core::error::CoreError;
use lx_core::signal::Signal;
use lx_core::timeline::LoudnessTimeline;
use lx_core::traits::{FrameOutputs, LoudnessModel};

/// Extracteur de frames pour le traitement offline d'un signal complet.
///
/// Découpe les échantillons en frames de `model.frame_len()` avançant de
/// `hop_size`, passe chaque frame au modèle et accumule les sorties demandées
/// dans une [`LoudnessTimeline`].
///
/// # Example
/// ```
/// use lx_audio::extractor::FrameExtractor;
/// use lx_audio::model::DynamicLoudnessModel;
/// use lx_core::config::ModelConfig;
///
/// let model = DynamicLoudnessModel::new(ModelConfig::default());
/// let mut extractor =
///     FrameExtractor::new(model, 32000.0, &["ShortTermLoudness"], 32).unwrap();
/// extractor.set_frame_time_offset(-0.064);
/// extractor.process(&vec![0.0; 32000]).unwrap();
/// assert_eq!(extractor.frame_count(), (32000 - 2048) / 32 + 1);
/// ```
pub struct FrameExtractor<M> {
    model: M,
    sample_rate: f32,
    hop_size: usize,
    frame_len: usize,
    tail_policy: TailPolicy,
    timeline: LoudnessTimeline,
    outputs: FrameOutputs,
    /// Frame finale complétée par des zéros.
    padded: Vec<f32>,
}

impl<M: LoudnessModel> FrameExtractor<M> {
    /// Lie un modèle à un taux d'échantillonnage et une avance fixe.
    ///
    /// Initialise le modèle. Chaque nom demandé doit être une sortie du modèle.
    ///
    /// # Errors
    /// - [`CoreError::Configuration`] if `sample_rate <= 0`, `hop_size == 0`,
    ///   no output is requested, a name is requested twice, or the model
    ///   rejects the rate.
    /// - [`CoreError::UnknownOutput`] if a requested name is not produced.
    pub fn new<S: AsRef<str>>(
        mut model: M,
        sample_rate: f32,
        output_names: &[S],
        hop_size: usize,
    ) -> Result<Self, CoreError> {
        validate_rate_and_hop(sample_rate, hop_size)?;
        if output_names.is_empty() {
            return Err(CoreError::Configuration(
                "at least one output name is required".into(),
            ));
        }

        let available = model.output_names();
        for (i, name) in output_names.iter().enumerate() {
            let name = name.as_ref();
            if output_names[..i].iter().any(|n| n.as_ref() == name) {
                return Err(CoreError::Configuration(format!(
                    "output '{name}' requested more than once"
                )));
            }
            if !available.iter().any(|a| a == name) {
                return Err(CoreError::UnknownOutput {
                    name: name.to_string(),
                    available,
                });
            }
        }

        model.initialize(sample_rate, hop_size)?;
        let frame_len = model.frame_len();
        if frame_len == 0 {
            return Err(CoreError::Configuration(format!(
                "model '{}' reports a zero frame length",
                model.name()
            )));
        }

        let mut widths = Vec::with_capacity(output_names.len());
        for name in output_names {
            let name = name.as_ref();
            let width = model.output_width(name).ok_or_else(|| CoreError::Shape {
                output: name.to_string(),
                expected: 1,
                actual: 0,
            })?;
            widths.push((name, width));
        }

        log::debug!(
            "Extracteur : modèle {}, {} Hz, frame {} éch., hop {} éch., sorties {:?}",
            model.name(),
            sample_rate,
            frame_len,
            hop_size,
            widths
        );

        Ok(Self {
            timeline: LoudnessTimeline::new(sample_rate, hop_size, 0.0, &widths),
            model,
            sample_rate,
            hop_size,
            frame_len,
            tail_policy: TailPolicy::default(),
            outputs: FrameOutputs::default(),
            padded: Vec::new(),
        })
    }

    /// Construit depuis une [`ExtractorConfig`] (taux, avance, sorties, décalage, politique).
    ///
    /// # Errors
    /// Same as [`FrameExtractor::new`].
    pub fn from_config(model: M, config: &ExtractorConfig) -> Result<Self, CoreError> {
        let mut extractor =
            Self::new(model, config.sample_rate, config.outputs.as_slice(), config.hop_size)?;
        extractor.set_frame_time_offset(config.frame_time_offset);
        extractor.set_tail_policy(config.tail_policy);
        Ok(extractor)
    }

    /// Décalage (s) ajouté aux timestamps. N'affecte jamais les valeurs calculées.
    pub fn set_frame_time_offset(&mut self, offset: f64) {
        self.timeline.frame_time_offset = offset;
    }

    /// Current timestamp offset (s).
    #[must_use]
    pub fn frame_time_offset(&self) -> f64 {
        self.timeline.frame_time_offset
    }

    /// Politique appliquée à la dernière frame incomplète.
    pub fn set_tail_policy(&mut self, policy: TailPolicy) {
        self.tail_policy = policy;
    }

    /// Current tail policy.
    #[must_use]
    pub fn tail_policy(&self) -> TailPolicy {
        self.tail_policy
    }

    /// Nombre de frames que `process` produira pour `len` échantillons.
    #[must_use]
    pub fn expected_frames(&self, len: usize) -> usize {
        self.tail_policy
            .frame_count(len, self.frame_len, self.hop_size)
    }

    /// Traite l'intégralité des échantillons.
    ///
    /// Le modèle est remis à zéro et les séries vidées avant le traitement :
    /// deux appels sur la même entrée donnent des séries identiques.
    ///
    /// # Errors
    /// Returns [`CoreError::Shape`] if the model omits a requested output or
    /// changes its width. The timeline is left empty on error.
    pub fn process(&mut self, samples: &[f32]) -> Result<(), CoreError> {
        let num_frames = self.expected_frames(samples.len());
        self.model.reset();
        self.timeline.reset(num_frames);

        if let Err(e) = self.run(samples, num_frames) {
            self.timeline.reset(0);
            return Err(e);
        }

        log::info!(
            "{} : {} frames traitées ({:.3} s de signal, hop {} éch.)",
            self.model.name(),
            num_frames,
            samples.len() as f64 / f64::from(self.sample_rate),
            self.hop_size
        );
        Ok(())
    }

    /// Traite un [`Signal`], dont le taux doit être celui de l'extracteur.
    ///
    /// # Errors
    /// Returns [`CoreError::Configuration`] on a sample-rate mismatch, plus
    /// the errors of [`FrameExtractor::process`].
    pub fn process_signal(&mut self, signal: &Signal) -> Result<(), CoreError> {
        if (signal.sample_rate() - self.sample_rate).abs() > f32::EPSILON {
            return Err(CoreError::Configuration(format!(
                "signal sampled at {} Hz, extractor configured for {} Hz",
                signal.sample_rate(),
                self.sample_rate
            )));
        }
        self.process(signal.samples())
    }

    fn run(&mut self, samples: &[f32], num_frames: usize) -> Result<(), CoreError> {
        for i in 0..num_frames {
            let start = i * self.hop_size;
            let end = start + self.frame_len;

            let frame: &[f32] = if end <= samples.len() {
                &samples[start..end]
            } else {
                // Zero-pad la fin
                let available = &samples[start.min(samples.len())..];
                self.padded.clear();
                self.padded.extend_from_slice(available);
                self.padded.resize(self.frame_len, 0.0);
                &self.padded
            };

            // Une sortie non réécrite pour cette frame reste vide
            self.outputs.clear();
            self.model.process_frame(frame, &mut self.outputs)?;

            for series in &mut self.timeline.series {
                let values = self.outputs.get(series.name()).ok_or_else(|| CoreError::Shape {
                    output: series.name().to_string(),
                    expected: series.width(),
                    actual: 0,
                })?;
                series.push_frame(values)?;
            }
        }
        Ok(())
    }

    /// Séries accumulées par le dernier `process`.
    #[must_use]
    pub fn timeline(&self) -> &LoudnessTimeline {
        &self.timeline
    }

    /// Consomme l'extracteur et rend la timeline.
    #[must_use]
    pub fn into_timeline(self) -> LoudnessTimeline {
        self.timeline
    }

    /// Frames produced by the last `process`.
    #[must_use]
    pub fn frame_count(&self) -> usize {
        self.timeline.frame_count()
    }

    /// Frame length required by the model (samples).
    #[must_use]
    pub fn frame_len(&self) -> usize {
        self.frame_len
    }

    /// Hop size (samples).
    #[must_use]
    pub fn hop_size(&self) -> usize {
        self.hop_size
    }

    /// Sample rate (Hz).
    #[must_use]
    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// The bound model.
    #[must_use]
    pub fn model(&self) -> &M {
        &self.model
    }
}
