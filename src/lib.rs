// Fall Monitor Core - acoustic fall and distress detection
// Per-clip DSP pipeline, rule/model classification and per-subject sessions

// Module declarations
pub mod analysis;
pub mod audio;
pub mod config;
pub mod context;
pub mod error;
pub mod keywords;
pub mod managers;
pub mod model;
pub mod session;
pub mod telemetry;
pub mod transcription;

// Re-exports for convenience
pub use analysis::DetectionResult;
pub use audio::AudioClip;
pub use config::MonitorConfig;
pub use context::MonitorContext;
pub use session::{Sensitivity, SessionSnapshot, SessionState};
