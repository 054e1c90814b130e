/// Configuration, types, and shared structures for loudex.
///
/// This crate contains the model contract, signal and timeline types, and the
/// configuration logic used across the loudex workspace.

pub mod config;
pub mod error;
pub mod signal;
pub mod timeline;
pub mod traits;

pub use config::{AnalysisConfig, ExtractorConfig, ModelConfig, TailPolicy};
pub use error::CoreError;
pub use signal::Signal;
pub use timeline::{LoudnessTimeline, OutputSeries};
pub use traits::{FrameOutputs, LoudnessModel};
