use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Sorties tracées par défaut : les trois sonies du modèle dynamique.
pub const DEFAULT_OUTPUTS: &[&str] = &[
    "InstantaneousLoudness",
    "ShortTermLoudness",
    "LongTermLoudness",
];

/// Configuration complète d'une analyse.
///
/// Sérialisable en TOML. Chaque champ a une valeur par défaut saine.
///
/// # Example
/// ```
/// use lx_core::config::AnalysisConfig;
/// let config = AnalysisConfig::default();
/// assert_eq!(config.extractor.hop_size, 32);
/// assert!((config.model.window_ms - 64.0).abs() < f32::EPSILON);
/// ```
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct AnalysisConfig {
    /// Découpage en frames et sorties demandées.
    pub extractor: ExtractorConfig,
    /// Paramètres du modèle de sonie.
    pub model: ModelConfig,
    /// Rendu des séries temporelles.
    pub plot: PlotConfig,
}

/// Politique pour la dernière frame incomplète.
///
/// # Example
/// ```
/// use lx_core::config::TailPolicy;
/// assert_eq!(TailPolicy::default(), TailPolicy::Drop);
/// ```
#[derive(Clone, Copy, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub enum TailPolicy {
    /// Seules les frames complètes sont traitées.
    #[default]
    Drop,
    /// La dernière frame partielle est complétée par des zéros.
    ZeroPad,
}

impl TailPolicy {
    /// Nombre de frames produites pour `len` échantillons.
    ///
    /// # Example
    /// ```
    /// use lx_core::config::TailPolicy;
    /// assert_eq!(TailPolicy::Drop.frame_count(10, 4, 2), 4);
    /// assert_eq!(TailPolicy::ZeroPad.frame_count(11, 4, 2), 5);
    /// assert_eq!(TailPolicy::ZeroPad.frame_count(3, 4, 2), 1);
    /// // hop plus long que la frame : pas de frame vide après la fin
    /// assert_eq!(TailPolicy::ZeroPad.frame_count(5, 4, 10), 1);
    /// ```
    #[must_use]
    pub fn frame_count(self, len: usize, frame_len: usize, hop_size: usize) -> usize {
        if len == 0 || hop_size == 0 {
            return 0;
        }
        match self {
            Self::Drop => {
                if len < frame_len {
                    0
                } else {
                    (len - frame_len) / hop_size + 1
                }
            }
            // Toute frame commence avant la fin de l'entrée
            Self::ZeroPad => {
                if len <= frame_len {
                    1
                } else {
                    ((len - frame_len).div_ceil(hop_size) + 1).min(len.div_ceil(hop_size))
                }
            }
        }
    }
}

/// Paramètres de l'extracteur de frames.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct ExtractorConfig {
    /// Taux d'échantillonnage attendu (Hz).
    pub sample_rate: f32,
    /// Avance entre frames, en échantillons.
    pub hop_size: usize,
    /// Sorties du modèle à collecter.
    pub outputs: Vec<String>,
    /// Décalage appliqué aux timestamps (s). N'affecte jamais les valeurs.
    pub frame_time_offset: f64,
    /// Traitement de la frame finale incomplète.
    pub tail_policy: TailPolicy,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            sample_rate: 32000.0,
            // 1 ms at 32 kHz
            hop_size: 32,
            outputs: DEFAULT_OUTPUTS.iter().map(ToString::to_string).collect(),
            frame_time_offset: 0.0,
            tail_policy: TailPolicy::Drop,
        }
    }
}

impl ExtractorConfig {
    /// Vérifie taux d'échantillonnage, avance et liste de sorties.
    ///
    /// # Errors
    /// Returns [`CoreError::Configuration`] on a non-positive rate, a zero hop
    /// or an empty output list.
    ///
    /// # Example
    /// ```
    /// use lx_core::config::ExtractorConfig;
    /// let mut config = ExtractorConfig::default();
    /// assert!(config.validate().is_ok());
    /// config.hop_size = 0;
    /// assert!(config.validate().is_err());
    /// ```
    pub fn validate(&self) -> Result<(), CoreError> {
        validate_rate_and_hop(self.sample_rate, self.hop_size)?;
        if self.outputs.is_empty() {
            return Err(CoreError::Configuration(
                "at least one output name is required".into(),
            ));
        }
        Ok(())
    }

    /// Avance (échantillons) correspondant à un taux de traitement `rate_hz`.
    ///
    /// # Example
    /// ```
    /// use lx_core::config::ExtractorConfig;
    /// assert_eq!(ExtractorConfig::hop_for_rate(32000.0, 1000.0), 32);
    /// assert_eq!(ExtractorConfig::hop_for_rate(32000.0, 1e9), 1);
    /// ```
    #[must_use]
    pub fn hop_for_rate(sample_rate: f32, rate_hz: f32) -> usize {
        if rate_hz <= 0.0 {
            return 0;
        }
        ((sample_rate / rate_hz).round() as usize).max(1)
    }
}

/// Validation partagée entre la config et la construction de l'extracteur.
///
/// # Errors
/// Returns [`CoreError::Configuration`] if `sample_rate` is not finite and
/// positive, or if `hop_size` is zero.
pub fn validate_rate_and_hop(sample_rate: f32, hop_size: usize) -> Result<(), CoreError> {
    if !sample_rate.is_finite() || sample_rate <= 0.0 {
        return Err(CoreError::Configuration(format!(
            "sample rate must be > 0, got {sample_rate}"
        )));
    }
    if hop_size == 0 {
        return Err(CoreError::Configuration("hop size must be > 0".into()));
    }
    Ok(())
}

/// Paramètres du modèle de sonie dynamique.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct ModelConfig {
    /// Fenêtre d'analyse FFT (ms).
    pub window_ms: f32,
    /// Pas entre filtres auditifs, en Cam.
    pub erb_step: f32,
    /// Fréquence centrale du premier filtre (Hz).
    pub min_freq: f32,
    /// Fréquence centrale maximale (Hz), bornée par Nyquist.
    pub max_freq: f32,
    /// Exposant de compression de la sonie spécifique.
    pub exponent: f32,
    /// Niveau (dB SPL) du ton 1 kHz de calibration, qui vaut 1 sone.
    pub calibration_db: f32,
    /// Sonie court-terme : constante d'attaque (ms).
    pub stl_attack_ms: f32,
    /// Sonie court-terme : constante de relâchement (ms).
    pub stl_release_ms: f32,
    /// Sonie long-terme : constante d'attaque (ms).
    pub ltl_attack_ms: f32,
    /// Sonie long-terme : constante de relâchement (ms).
    pub ltl_release_ms: f32,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            window_ms: 64.0,
            erb_step: 0.25,
            min_freq: 50.0,
            max_freq: 15000.0,
            exponent: 0.3,
            calibration_db: 40.0,
            stl_attack_ms: 22.0,
            stl_release_ms: 50.0,
            ltl_attack_ms: 100.0,
            ltl_release_ms: 2000.0,
        }
    }
}

impl ModelConfig {
    /// Clamp all numeric fields to their valid ranges.
    pub fn clamp_all(&mut self) {
        self.window_ms = self.window_ms.clamp(1.0, 1000.0);
        self.erb_step = self.erb_step.clamp(0.05, 2.0);
        self.min_freq = self.min_freq.clamp(20.0, 1000.0);
        self.max_freq = self.max_freq.clamp(self.min_freq, 20000.0);
        self.exponent = self.exponent.clamp(0.05, 1.0);
        self.calibration_db = self.calibration_db.clamp(10.0, 100.0);
        self.stl_attack_ms = self.stl_attack_ms.clamp(0.1, 10_000.0);
        self.stl_release_ms = self.stl_release_ms.clamp(0.1, 10_000.0);
        self.ltl_attack_ms = self.ltl_attack_ms.clamp(0.1, 10_000.0);
        self.ltl_release_ms = self.ltl_release_ms.clamp(0.1, 10_000.0);
    }
}

/// Rendu hors-écran des séries.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq)]
pub struct PlotConfig {
    /// Largeur en cellules terminal.
    pub width: u16,
    /// Hauteur en cellules terminal.
    pub height: u16,
    /// Titre du graphe.
    pub title: String,
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self {
            width: 100,
            height: 30,
            title: "Loudness".into(),
        }
    }
}

impl PlotConfig {
    /// Bornes minimales pour qu'un graphe reste lisible.
    pub fn clamp_all(&mut self) {
        self.width = self.width.clamp(20, 500);
        self.height = self.height.clamp(8, 200);
    }
}

/// Structure TOML intermédiaire pour désérialisation avec valeurs optionnelles.
#[derive(Deserialize)]
struct ConfigFile {
    extractor: Option<ExtractorSection>,
    model: Option<ModelSection>,
    plot: Option<PlotSection>,
}

/// Extractor section, all fields optional for partial override.
#[derive(Deserialize)]
struct ExtractorSection {
    sample_rate: Option<f32>,
    hop_size: Option<usize>,
    /// Alternative à `hop_size` : taux de traitement en Hz.
    rate: Option<f32>,
    outputs: Option<Vec<String>>,
    frame_time_offset: Option<f64>,
    tail_policy: Option<TailPolicy>,
}

/// Model section, all fields optional.
#[derive(Deserialize)]
struct ModelSection {
    window_ms: Option<f32>,
    erb_step: Option<f32>,
    min_freq: Option<f32>,
    max_freq: Option<f32>,
    exponent: Option<f32>,
    calibration_db: Option<f32>,
    stl_attack_ms: Option<f32>,
    stl_release_ms: Option<f32>,
    ltl_attack_ms: Option<f32>,
    ltl_release_ms: Option<f32>,
}

/// Plot section, all fields optional.
#[derive(Deserialize)]
struct PlotSection {
    width: Option<u16>,
    height: Option<u16>,
    title: Option<String>,
}

/// Charge un fichier TOML et fusionne avec les valeurs par défaut.
///
/// Les paramètres du modèle et du rendu sont bornés ; taux d'échantillonnage et
/// avance sont validés, une valeur invalide est une erreur.
///
/// # Errors
/// Returns an error if the file cannot be read, parsed, or fails validation.
///
/// # Example
/// ```no_run
/// use lx_core::config::load_config;
/// use std::path::Path;
/// let config = load_config(Path::new("config/default.toml")).unwrap();
/// ```
pub fn load_config(path: &Path) -> Result<AnalysisConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Impossible de lire {}", path.display()))?;
    parse_config(&content).with_context(|| format!("Configuration invalide dans {}", path.display()))
}

/// Parse un contenu TOML (voir [`load_config`]).
///
/// # Errors
/// Returns an error if the TOML is malformed or fails validation.
pub fn parse_config(content: &str) -> Result<AnalysisConfig> {
    let file: ConfigFile = toml::from_str(content).context("Erreur de parsing TOML")?;
    let mut config = AnalysisConfig::default();

    if let Some(e) = file.extractor {
        let ex = &mut config.extractor;
        if let Some(v) = e.sample_rate {
            ex.sample_rate = v;
        }
        if let Some(v) = e.hop_size {
            ex.hop_size = v;
        } else if let Some(rate) = e.rate {
            ex.hop_size = ExtractorConfig::hop_for_rate(ex.sample_rate, rate);
        }
        if let Some(v) = e.outputs {
            ex.outputs = v;
        }
        if let Some(v) = e.frame_time_offset {
            ex.frame_time_offset = v;
        }
        if let Some(v) = e.tail_policy {
            ex.tail_policy = v;
        }
    }

    if let Some(m) = file.model {
        let mc = &mut config.model;
        if let Some(v) = m.window_ms {
            mc.window_ms = v;
        }
        if let Some(v) = m.erb_step {
            mc.erb_step = v;
        }
        if let Some(v) = m.min_freq {
            mc.min_freq = v;
        }
        if let Some(v) = m.max_freq {
            mc.max_freq = v;
        }
        if let Some(v) = m.exponent {
            mc.exponent = v;
        }
        if let Some(v) = m.calibration_db {
            mc.calibration_db = v;
        }
        if let Some(v) = m.stl_attack_ms {
            mc.stl_attack_ms = v;
        }
        if let Some(v) = m.stl_release_ms {
            mc.stl_release_ms = v;
        }
        if let Some(v) = m.ltl_attack_ms {
            mc.ltl_attack_ms = v;
        }
        if let Some(v) = m.ltl_release_ms {
            mc.ltl_release_ms = v;
        }
    }

    if let Some(p) = file.plot {
        if let Some(v) = p.width {
            config.plot.width = v;
        }
        if let Some(v) = p.height {
            config.plot.height = v;
        }
        if let Some(v) = p.title {
            config.plot.title = v;
        }
    }

    config.model.clamp_all();
    config.plot.clamp_all();
    config.extractor.validate()?;
    log::debug!("Configuration chargée : {config:?}");
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn partial_file_merges_over_defaults() {
        let config = parse_config(
            r#"
            [extractor]
            hop_size = 64
            outputs = ["ShortTermLoudness"]
            frame_time_offset = -0.064

            [model]
            erb_step = 0.5
            "#,
        )
        .expect("valid config");
        assert_eq!(config.extractor.hop_size, 64);
        assert_eq!(config.extractor.outputs, vec!["ShortTermLoudness"]);
        assert!((config.extractor.frame_time_offset + 0.064).abs() < 1e-12);
        assert!((config.model.erb_step - 0.5).abs() < f32::EPSILON);
        assert!((config.model.window_ms - 64.0).abs() < f32::EPSILON);
        assert_eq!(config.plot, PlotConfig::default());
    }

    #[test]
    fn rate_sets_hop_when_hop_absent() {
        let config = parse_config(
            r"
            [extractor]
            sample_rate = 48000.0
            rate = 500.0
            ",
        )
        .expect("valid config");
        assert_eq!(config.extractor.hop_size, 96);
    }

    #[test]
    fn zero_hop_is_rejected() {
        let err = parse_config("[extractor]\nhop_size = 0\n").expect_err("zero hop");
        assert!(format!("{err:#}").contains("hop size"));
    }

    #[test]
    fn negative_rate_is_rejected() {
        assert!(parse_config("[extractor]\nsample_rate = -1.0\n").is_err());
    }

    #[test]
    fn model_values_are_clamped() {
        let config = parse_config("[model]\nexponent = 9.0\nwindow_ms = 0.0\n").expect("valid");
        assert!((config.model.exponent - 1.0).abs() < f32::EPSILON);
        assert!((config.model.window_ms - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "[extractor]\ntail_policy = \"ZeroPad\"").expect("write");
        let config = load_config(file.path()).expect("load");
        assert_eq!(config.extractor.tail_policy, TailPolicy::ZeroPad);
    }

    #[test]
    fn missing_file_has_context() {
        let err = load_config(Path::new("/nonexistent/loudex.toml")).expect_err("missing");
        assert!(err.to_string().contains("Impossible de lire"));
    }

    #[test]
    fn frame_counts_match_policies() {
        // len 2048 + 5 * 32 + 10
        let len = 2048 + 170;
        assert_eq!(TailPolicy::Drop.frame_count(len, 2048, 32), 6);
        assert_eq!(TailPolicy::ZeroPad.frame_count(len, 2048, 32), 7);
        assert_eq!(TailPolicy::Drop.frame_count(100, 2048, 32), 0);
        assert_eq!(TailPolicy::ZeroPad.frame_count(0, 2048, 32), 0);
    }

    #[test]
    fn zero_pad_with_hop_longer_than_frame() {
        // Frames at 0, 10, 20 for 21 and 25 samples; a start at 30 would be empty
        assert_eq!(TailPolicy::ZeroPad.frame_count(21, 4, 10), 3);
        assert_eq!(TailPolicy::ZeroPad.frame_count(25, 4, 10), 3);
        assert_eq!(TailPolicy::ZeroPad.frame_count(30, 4, 10), 3);
        assert_eq!(TailPolicy::ZeroPad.frame_count(31, 4, 10), 4);
        assert_eq!(TailPolicy::Drop.frame_count(25, 4, 10), 3);
    }

    #[test]
    fn shipped_default_file_matches_defaults() {
        let config = parse_config(include_str!("../../../config/default.toml")).expect("valid");
        assert_eq!(config, AnalysisConfig::default());
    }
}
