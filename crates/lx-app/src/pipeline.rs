use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use lx_audio::decode::decode_file;
use lx_audio::sound::{Normalisation, Sound};
use lx_audio::{DynamicLoudnessModel, FrameExtractor};
use lx_core::config::AnalysisConfig;
use lx_core::signal::Signal;
use lx_core::timeline::LoudnessTimeline;
use rayon::prelude::*;

/// Résultat d'une analyse, étiqueté par sa source.
pub struct Analysis {
    /// Nom court de la source (nom de fichier ou description du ton).
    pub label: String,
    /// Séries extraites.
    pub timeline: LoudnessTimeline,
}

/// Signal de démonstration : somme de sinusoïdes en dB SPL efficaces, rampes
/// aux extrémités, au taux d'échantillonnage de la configuration.
///
/// # Errors
/// Returns an error if the tone parameters are invalid.
pub fn tone_signal(
    freqs: &[f32],
    duration: f32,
    level_db_spl: f32,
    ramp: f32,
    sample_rate: f32,
) -> Result<Signal> {
    let mut sound = Sound::tone(freqs, duration, sample_rate).context("Signal synthétique")?;
    sound
        .use_db_spl()
        .normalise(level_db_spl, Normalisation::Rms)
        .apply_ramp(ramp);
    log::info!(
        "Ton {freqs:?} Hz, {duration} s @ {sample_rate} Hz, {:.1} dB SPL",
        sound.level_db(Normalisation::Rms)
    );
    Ok(sound.into_signal()?)
}

/// Étiquette d'un ton, utilisée pour les titres et les noms de fichiers.
#[must_use]
pub fn tone_label(freqs: &[f32]) -> String {
    let parts: Vec<String> = freqs.iter().map(|f| format!("{f}")).collect();
    format!("tone_{}", parts.join("_"))
}

/// Extrait les séries configurées d'un signal.
///
/// Le taux d'échantillonnage du signal remplace celui de la configuration.
///
/// # Errors
/// Returns an error if the extractor cannot be configured for this signal.
pub fn analyse(signal: &Signal, config: &AnalysisConfig) -> Result<LoudnessTimeline> {
    let mut extractor_config = config.extractor.clone();
    if (extractor_config.sample_rate - signal.sample_rate()).abs() > f32::EPSILON {
        log::debug!(
            "Taux du signal {} Hz utilisé à la place de {} Hz",
            signal.sample_rate(),
            extractor_config.sample_rate
        );
        extractor_config.sample_rate = signal.sample_rate();
    }

    let model = DynamicLoudnessModel::new(config.model.clone());
    let mut extractor = FrameExtractor::from_config(model, &extractor_config)
        .context("Configuration de l'extracteur")?;
    extractor
        .process_signal(signal)
        .context("Extraction des frames")?;
    Ok(extractor.into_timeline())
}

/// Décode et analyse chaque fichier en parallèle.
///
/// Les résultats gardent l'ordre des chemins ; un échec n'interrompt pas les
/// autres fichiers.
pub fn analyse_files(paths: &[PathBuf], config: &AnalysisConfig) -> Vec<Result<Analysis>> {
    paths
        .par_iter()
        .map(|path| {
            let signal = decode_file(path)?;
            let timeline = analyse(&signal, config)
                .with_context(|| format!("Analyse de {}", path.display()))?;
            Ok(Analysis {
                label: file_label(path),
                timeline,
            })
        })
        .collect()
}

fn file_label(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map_or_else(|| path.display().to_string(), String::from)
}

/// Chemin d'export JSON pour `label`.
///
/// Un dossier existant, ou plusieurs analyses, donnent `<json>/<label>.json` ;
/// sinon `json` est le fichier lui-même.
#[must_use]
pub fn json_target(json: &Path, label: &str, multiple: bool) -> PathBuf {
    if multiple || json.is_dir() {
        json.join(format!("{label}.json"))
    } else {
        json.to_path_buf()
    }
}

/// Écrit la timeline en JSON.
///
/// # Errors
/// Returns an error if serialization or the write fails.
pub fn export_json(timeline: &LoudnessTimeline, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Impossible de créer {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(timeline).context("Sérialisation JSON")?;
    std::fs::write(path, json).with_context(|| format!("Impossible d'écrire {}", path.display()))?;
    log::info!(
        "Export JSON : {} ({} frames)",
        path.display(),
        timeline.frame_count()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lx_core::config::TailPolicy;

    fn short_config() -> AnalysisConfig {
        let mut config = AnalysisConfig::default();
        config.extractor.hop_size = 320;
        config
    }

    #[test]
    fn demo_tone_produces_loudness_series() {
        let signal = tone_signal(&[1000.0, 3000.0], 0.5, 40.0, 0.1, 32000.0).expect("valid tone");
        let mut config = short_config();
        config.extractor.frame_time_offset = -0.064;

        let timeline = analyse(&signal, &config).expect("analysis");
        // (16000 - 2048) / 320 + 1
        assert_eq!(timeline.frame_count(), 44);
        assert_eq!(timeline.names().len(), 3);
        assert!((timeline.frame_time(0) + 0.064).abs() < 1e-12);

        let stats = timeline
            .stats("ShortTermLoudness")
            .expect("known output")
            .expect("non empty");
        assert!(stats.max > 0.5, "max {}", stats.max);
    }

    #[test]
    fn signal_rate_overrides_config() {
        let signal = tone_signal(&[1000.0], 0.2, 60.0, 0.0, 16000.0).expect("valid tone");
        let mut config = short_config();
        config.extractor.tail_policy = TailPolicy::ZeroPad;
        let timeline = analyse(&signal, &config).expect("analysis");
        assert!((timeline.sample_rate - 16000.0).abs() < f32::EPSILON);
        // Partial tail padded: ceil((3200 - 1024) / 320) + 1
        assert_eq!(timeline.frame_count(), 8);
    }

    #[test]
    fn missing_files_fail_individually() {
        let dir = tempfile::tempdir().expect("temp dir");
        let paths = vec![dir.path().join("a.wav"), dir.path().join("b.wav")];
        let results = analyse_files(&paths, &short_config());
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(Result::is_err));
    }

    #[test]
    fn json_export_round_trip() {
        let dir = tempfile::tempdir().expect("temp dir");
        let signal = tone_signal(&[1000.0], 0.2, 40.0, 0.05, 32000.0).expect("valid tone");
        let timeline = analyse(&signal, &short_config()).expect("analysis");

        let path = json_target(dir.path(), &tone_label(&[1000.0]), false);
        assert!(path.ends_with("tone_1000.json"));
        export_json(&timeline, &path).expect("export");

        let text = std::fs::read_to_string(&path).expect("read back");
        let parsed: LoudnessTimeline = serde_json::from_str(&text).expect("valid json");
        assert_eq!(parsed, timeline);
    }

    #[test]
    fn json_target_for_single_file() {
        let target = json_target(Path::new("out/result.json"), "x", false);
        assert_eq!(target, PathBuf::from("out/result.json"));
        let target = json_target(Path::new("out"), "x", true);
        assert_eq!(target, PathBuf::from("out/x.json"));
    }
}
