// Dynamic loudness model, frame extraction, and test-signal tooling for loudex.

pub mod decode;
pub mod ear;
pub mod excitation;
pub mod extractor;
pub mod fft;
pub mod integration;
pub mod model;
pub mod sound;
pub mod stage;

pub use extractor::FrameExtractor;
pub use model::DynamicLoudnessModel;
