use thiserror::Error;

/// Errors originating from the core module.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    /// Invalid configuration value (sample rate, hop size, output set...).
    #[error("Configuration invalide : {0}")]
    Configuration(String),

    /// A model output does not have the width it declared.
    #[error("Forme inattendue pour '{output}' : {expected} valeurs attendues, {actual} reçues")]
    Shape {
        /// Output name.
        output: String,
        /// Width declared by the model at initialisation.
        expected: usize,
        /// Width actually produced (0 if the output was missing).
        actual: usize,
    },

    /// Requested an output the model does not produce.
    #[error("Sortie inconnue '{name}' (disponibles : {})", available.join(", "))]
    UnknownOutput {
        /// The requested name.
        name: String,
        /// Names the model does produce.
        available: Vec<String>,
    },

    /// Model used before `initialize()`.
    #[error("Modèle '{0}' non initialisé")]
    NotInitialized(String),
}
