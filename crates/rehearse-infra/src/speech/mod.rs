//! Speech provider clients: AssemblyAI batch transcription, Deepgram
//! streaming transcription and synthesis.

pub mod assemblyai;
pub mod deepgram;

pub use assemblyai::AssemblyAiClient;
pub use deepgram::{DeepgramSynthesis, DeepgramTranscriber};
