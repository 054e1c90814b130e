use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use lx_core::config::{AnalysisConfig, TailPolicy};

/// loudex : extraction de sonie dynamique trame par trame.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Fichier(s) audio à analyser (WAV, MP3, FLAC, OGG, AAC). Répétable.
    #[arg(short, long)]
    pub input: Vec<PathBuf>,

    /// Signal synthétique : fréquences (Hz) séparées par des virgules.
    #[arg(long, value_delimiter = ',')]
    pub tone: Vec<f32>,

    /// Durée du signal synthétique (s).
    #[arg(long, default_value_t = 1.0)]
    pub duration: f32,

    /// Niveau efficace du signal synthétique (dB SPL).
    #[arg(long, default_value_t = 40.0)]
    pub level: f32,

    /// Rampes d'entrée et de sortie du signal synthétique (s).
    #[arg(long, default_value_t = 0.1)]
    pub ramp: f32,

    /// Fichier de configuration TOML. Défaut : config/default.toml.
    #[arg(short, long, default_value = "config/default.toml")]
    pub config: PathBuf,

    /// Avance entre frames, en échantillons.
    #[arg(long)]
    pub hop: Option<usize>,

    /// Sorties du modèle à collecter, séparées par des virgules.
    #[arg(long, value_delimiter = ',')]
    pub outputs: Vec<String>,

    /// Décalage des timestamps (s), ex. -0.064.
    #[arg(long, allow_hyphen_values = true)]
    pub offset: Option<f64>,

    /// Traitement de la dernière frame incomplète.
    #[arg(long, value_enum)]
    pub tail: Option<TailArg>,

    /// Export JSON : fichier (une entrée) ou dossier.
    #[arg(long)]
    pub json: Option<PathBuf>,

    /// Ne pas ouvrir le graphe interactif.
    #[arg(long, default_value_t = false)]
    pub no_plot: bool,

    /// Niveau de log : error, warn, info, debug, trace.
    #[arg(long, default_value = "warn")]
    pub log_level: String,
}

/// Valeurs de `--tail`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum TailArg {
    /// Frames complètes uniquement.
    Drop,
    /// Dernière frame complétée par des zéros.
    ZeroPad,
}

impl From<TailArg> for TailPolicy {
    fn from(arg: TailArg) -> Self {
        match arg {
            TailArg::Drop => Self::Drop,
            TailArg::ZeroPad => Self::ZeroPad,
        }
    }
}

impl Cli {
    /// Validate that exactly one kind of source is provided.
    ///
    /// # Errors
    /// Returns an error if neither or both of `--input` and `--tone` are given,
    /// or if the tone parameters are out of range.
    pub fn validate_source(&self) -> anyhow::Result<()> {
        match (self.input.is_empty(), self.tone.is_empty()) {
            (true, true) => {
                anyhow::bail!("Aucune source spécifiée. Utilisez --input ou --tone.")
            }
            (false, false) => {
                anyhow::bail!("Une seule source à la fois : --input OU --tone.")
            }
            _ => {}
        }
        if let Some(f) = self.tone.iter().find(|f| !f.is_finite() || **f <= 0.0) {
            anyhow::bail!("Fréquence invalide : {f} Hz");
        }
        if !self.tone.is_empty() && (!self.duration.is_finite() || self.duration <= 0.0) {
            anyhow::bail!("Durée invalide : {} s", self.duration);
        }
        Ok(())
    }

    /// Applique les options de ligne de commande par-dessus la configuration.
    pub fn apply_overrides(&self, config: &mut AnalysisConfig) {
        if let Some(hop) = self.hop {
            config.extractor.hop_size = hop;
        }
        if !self.outputs.is_empty() {
            config.extractor.outputs.clone_from(&self.outputs);
        }
        if let Some(offset) = self.offset {
            config.extractor.frame_time_offset = offset;
        }
        if let Some(tail) = self.tail {
            config.extractor.tail_policy = tail.into();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("loudex").chain(args.iter().copied()))
            .expect("valid arguments")
    }

    #[test]
    fn demo_arguments() {
        let cli = parse(&["--tone", "1000,3000", "--offset", "-0.064", "--hop", "2"]);
        assert_eq!(cli.tone, vec![1000.0, 3000.0]);
        assert!(cli.validate_source().is_ok());

        let mut config = AnalysisConfig::default();
        cli.apply_overrides(&mut config);
        assert_eq!(config.extractor.hop_size, 2);
        assert!((config.extractor.frame_time_offset + 0.064).abs() < 1e-12);
        assert_eq!(config.extractor.tail_policy, TailPolicy::Drop);
    }

    #[test]
    fn outputs_and_tail_override() {
        let cli = parse(&[
            "-i",
            "a.wav",
            "-i",
            "b.wav",
            "--outputs",
            "ShortTermLoudness,Excitation",
            "--tail",
            "zero-pad",
        ]);
        assert_eq!(cli.input.len(), 2);
        let mut config = AnalysisConfig::default();
        cli.apply_overrides(&mut config);
        assert_eq!(
            config.extractor.outputs,
            vec!["ShortTermLoudness".to_string(), "Excitation".to_string()]
        );
        assert_eq!(config.extractor.tail_policy, TailPolicy::ZeroPad);
    }

    #[test]
    fn exactly_one_source() {
        assert!(parse(&[]).validate_source().is_err());
        assert!(parse(&["-i", "a.wav", "--tone", "440"]).validate_source().is_err());
        assert!(parse(&["--tone", "0"]).validate_source().is_err());
        assert!(parse(&["--tone", "440", "--duration", "0"])
            .validate_source()
            .is_err());
    }
}
