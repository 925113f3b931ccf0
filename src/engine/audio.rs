use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::{bounded, Receiver, Sender};

use super::config::EngineConfig;
use super::error::SetupError;
use super::messages::EngineMsg;
use super::render::RenderEngine;

/// Command queue depth. The render side drains fully every cycle, so this
/// only has to absorb one cycle's burst of events.
const QUEUE_DEPTH: usize = 256;

/// The audio sink glue: owns the command queue endpoints and the cpal
/// stream, and moves a RenderEngine into the callback when started.
pub struct AudioEngine {
  tx: Sender<EngineMsg>,
  rx: Receiver<EngineMsg>,
  rec_tx: Sender<Vec<f32>>,
  rec_rx: Receiver<Vec<f32>>,
  idle: Arc<AtomicBool>,
  pub sample_rate: f32,
  config: EngineConfig,
  stream: Option<cpal::Stream>,
  paused: bool,
}

impl AudioEngine {
  pub fn new(config: EngineConfig) -> Self {
    let (tx, rx) = bounded(QUEUE_DEPTH);
    let (rec_tx, rec_rx) = bounded(1);
    Self {
      tx,
      rx,
      rec_tx,
      rec_rx,
      idle: Arc::new(AtomicBool::new(true)),
      sample_rate: 0.0,
      config,
      stream: None,
      paused: false,
    }
  }

  /// Open the default output (mono 16-bit preferred) and move a fresh
  /// RenderEngine into the callback. Failure here is fatal to the process.
  pub fn start(&mut self) -> Result<(), SetupError> {
    if self.stream.is_some() {
      return Ok(());
    }
    let host = cpal::default_host();
    let device = host.default_output_device().ok_or(SetupError::NoOutputDevice)?;
    let supported = pick_output_config(&device)?;
    let sample_format = supported.sample_format();
    let channels = supported.channels() as usize;
    let mut cfg: cpal::StreamConfig = supported.into();
    cfg.buffer_size = cpal::BufferSize::Fixed(512);
    self.sample_rate = cfg.sample_rate.0 as f32;
    log::info!(
      "opened sound for playback: rate {}, format {:?}, channels {}",
      cfg.sample_rate.0,
      sample_format,
      channels
    );

    let mut engine = RenderEngine::new(
      &self.config,
      self.sample_rate,
      self.rx.clone(),
      self.idle.clone(),
      self.rec_tx.clone(),
    );

    let err_fn = |e: cpal::StreamError| log::warn!("stream error: {e}");
    let stream = match sample_format {
      cpal::SampleFormat::I16 => {
        // the engine renders the sink's native format directly
        let mut frame_buf: Vec<i16> = Vec::new();
        device.build_output_stream(
          &cfg,
          move |data: &mut [i16], _| {
            if channels == 1 {
              engine.render(data);
            } else {
              let frames = data.len() / channels;
              if frame_buf.len() != frames {
                frame_buf.resize(frames, 0);
              }
              engine.render(&mut frame_buf);
              for (frame, &s) in data.chunks_mut(channels).zip(frame_buf.iter()) {
                frame.fill(s);
              }
            }
          },
          err_fn,
          None,
        )?
      }
      cpal::SampleFormat::F32 => {
        let mut frame_buf: Vec<i16> = Vec::new();
        device.build_output_stream(
          &cfg,
          move |data: &mut [f32], _| {
            let frames = data.len() / channels;
            if frame_buf.len() != frames {
              frame_buf.resize(frames, 0);
            }
            engine.render(&mut frame_buf);
            for (frame, &s) in data.chunks_mut(channels).zip(frame_buf.iter()) {
              frame.fill(s as f32 / 32768.0);
            }
          },
          err_fn,
          None,
        )?
      }
      other => {
        return Err(SetupError::OutputConfig(format!("unsupported sample format {other:?}")))
      }
    };
    stream.play()?;
    self.stream = Some(stream);
    self.paused = false;
    Ok(())
  }

  pub fn stop(&mut self) {
    self.stream.take();
  }

  pub fn sender(&self) -> Sender<EngineMsg> {
    self.tx.clone()
  }

  /// Silence optimization: once the render side flags an empty voice pool,
  /// stop pulling buffers until the next note arrives.
  pub fn pause_if_idle(&mut self) {
    if self.paused || !self.idle.load(Ordering::Acquire) {
      return;
    }
    if let Some(stream) = &self.stream {
      if stream.pause().is_ok() {
        self.paused = true;
      }
    }
  }

  /// Resume on NoteOn. Clearing the idle flag here closes the race where a
  /// just-queued note would be judged idle before it ever rendered.
  pub fn resume(&mut self) {
    self.idle.store(false, Ordering::Release);
    if !self.paused {
      return;
    }
    if let Some(stream) = &self.stream {
      if let Err(e) = stream.play() {
        log::warn!("couldn't resume stream: {e}");
        return;
      }
    }
    self.paused = false;
  }

  /// Completed capture buffers coming back from the render thread.
  pub fn poll_recording(&self) -> Option<Vec<f32>> {
    self.rec_rx.try_recv().ok()
  }
}

fn pick_output_config(device: &cpal::Device) -> Result<cpal::SupportedStreamConfig, SetupError> {
  let mut fallback = None;
  if let Ok(supported) = device.supported_output_configs() {
    for range in supported {
      let rate = 48_000u32.clamp(range.min_sample_rate().0, range.max_sample_rate().0);
      let cfg = range.with_sample_rate(cpal::SampleRate(rate));
      match (cfg.channels(), cfg.sample_format()) {
        (1, cpal::SampleFormat::I16) => return Ok(cfg),
        (_, cpal::SampleFormat::I16) | (_, cpal::SampleFormat::F32) => {
          if fallback.is_none() {
            fallback = Some(cfg);
          }
        }
        _ => {}
      }
    }
  }
  if let Some(cfg) = fallback {
    return Ok(cfg);
  }
  device.default_output_config().map_err(|e| SetupError::OutputConfig(e.to_string()))
}

/// Write a capture to `~/Documents/calliope/takeNNN.wav`, mono 16-bit.
pub fn save_capture(samples: &[f32], sample_rate: f32) -> anyhow::Result<PathBuf> {
  let dir = dirs::document_dir()
    .ok_or_else(|| anyhow::anyhow!("could not find a documents directory"))?
    .join("calliope");
  std::fs::create_dir_all(&dir)?;
  let mut take = 1u32;
  let path = loop {
    let candidate = dir.join(format!("take{take}.wav"));
    if !candidate.exists() {
      break candidate;
    }
    take += 1;
  };
  let spec = hound::WavSpec {
    channels: 1,
    sample_rate: sample_rate as u32,
    bits_per_sample: 16,
    sample_format: hound::SampleFormat::Int,
  };
  let mut writer = hound::WavWriter::create(&path, spec)?;
  for &s in samples {
    writer.write_sample((s.clamp(-1.0, 1.0) * 32767.0) as i16)?;
  }
  writer.finalize()?;
  log::info!("saved capture to {}", path.display());
  Ok(path)
}
