use thiserror::Error;

/// The only conditions that abort the process: the audio sink could not be
/// acquired. Everything else in the engine degrades and logs.
#[derive(Debug, Error)]
pub enum SetupError {
  #[error("no audio output device available")]
  NoOutputDevice,
  #[error("no usable output configuration: {0}")]
  OutputConfig(String),
  #[error("failed to build audio stream: {0}")]
  BuildStream(#[from] cpal::BuildStreamError),
  #[error("failed to start audio stream: {0}")]
  PlayStream(#[from] cpal::PlayStreamError),
}
