//! Speech pipelines: batch transcription, synthesis, and the streaming
//! transcription coordinator.

pub mod batch;
pub mod stream;

pub use batch::SpeechService;
pub use stream::StreamingTranscriptionCoordinator;
